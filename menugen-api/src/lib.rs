pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod generation;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod naming;
pub mod provisioning;
pub mod schema;
pub mod storage;

pub use config::Config;
pub use error::ApiError;
