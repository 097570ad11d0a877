//! Error types for the permission catalog.
//!
//! # Security Note
//! Evaluating a permission never fails: every predicate answers `false`
//! instead of erroring. Errors only arise while loading or validating a
//! catalog, which happens once at start-up before any request is served.

use thiserror::Error;

/// Errors that can occur while loading or validating a permission catalog.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The catalog document could not be parsed.
    ///
    /// This typically indicates a YAML syntax error or a missing field in
    /// `permissions.yaml`.
    #[error("Catalog parsing failed: {0}")]
    CatalogParse(String),

    /// The catalog parsed but violates a structural rule (duplicate role,
    /// malformed permission id, group referencing an unknown permission).
    #[error("Catalog validation failed: {0}")]
    CatalogValidation(String),

    /// The catalog could not be serialized back to YAML.
    #[error("Catalog serialization failed: {0}")]
    Serialization(String),

    /// The catalog file could not be read.
    #[error("Catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::CatalogValidation("duplicate role 'admin'".to_string());
        assert_eq!(
            err.to_string(),
            "Catalog validation failed: duplicate role 'admin'"
        );

        let err = AuthzError::CatalogParse("missing field `roles`".to_string());
        assert!(err.to_string().starts_with("Catalog parsing failed"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: AuthzError = io.into();
        assert!(matches!(err, AuthzError::Io(_)));
    }
}
