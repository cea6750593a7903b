pub mod memory;
pub mod pg;
pub mod repo;
pub mod repo_types;

pub use repo::{RepoError, UserRepo};
pub use repo_types::{NewUser, Role, User};
