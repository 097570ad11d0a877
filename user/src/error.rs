use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Admin user not found: {0}")]
    UserNotFound(String),

    #[error("Admin user already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid admin user record: {0}")]
    InvalidRecord(String),

    #[error("Password hashing error: {0}")]
    Password(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Secure log error: {0}")]
    SecureLogError(String),

    #[error("Hash verification failed")]
    HashVerificationFailed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Admin database is open read-only")]
    ReadOnly,

    #[error("Initialization error: {0}")]
    Initialization(String),
}

pub type Result<T> = std::result::Result<T, UserError>;
