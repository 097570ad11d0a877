use std::env;
use std::path::{Path, PathBuf};

/// Find the storefront admin project root by looking for marker files.
///
/// Returns `None` outside a checkout; commands then resolve paths against
/// the current directory and fall back to the builtin catalog.
pub fn find_project_root() -> Option<PathBuf> {
    let current_dir = env::current_dir().ok()?;

    current_dir
        .ancestors()
        .find(|path| is_project_root(path))
        .map(Path::to_path_buf)
}

/// A project root holds the workspace manifest, the server crate and `config/`
fn is_project_root(path: &Path) -> bool {
    path.join("Cargo.toml").is_file()
        && path.join("config").is_dir()
        && path.join("app").join("Cargo.toml").is_file()
}
