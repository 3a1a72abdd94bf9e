pub mod db;
pub mod repository;

pub use repository::{CardRepository, RepositoryError, SqliteRepository};
