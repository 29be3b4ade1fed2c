pub mod catalog;
pub mod config;
pub mod error;
pub mod server;

pub use catalog::{ModelCatalog, OpenArtifact};
pub use config::AppConfig;
pub use error::ServiceError;
pub use server::build_router;
