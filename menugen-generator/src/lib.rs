pub mod config;
pub mod error;
pub mod handlers;
pub mod pages;
pub mod render;
pub mod themes;

pub use config::Config;
pub use error::GeneratorError;
