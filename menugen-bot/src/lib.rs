pub mod backend;
pub mod config;
pub mod dialogue;
pub mod fsm;
pub mod session;

pub use config::Config;
pub use dialogue::{Button, Dialogue, Reply};
