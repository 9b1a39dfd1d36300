pub mod repository;

pub use repository::{RepositoryError, RuleRepository, RuleSnapshot};
