pub mod memory;
pub mod models;
pub mod repository;
pub mod validation;

pub use memory::MemoryRepository;
pub use repository::{BlogRepository, PgRepository, RepoError, UserRepository};
