pub mod config;
pub mod error;
pub mod run_graph;
pub mod types;

pub use config::{ConfigLoader, GraphConfig};
pub use error::AppError;
pub use types::*;
