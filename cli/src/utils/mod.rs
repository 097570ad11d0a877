pub mod env_paths;
pub mod project_root;
