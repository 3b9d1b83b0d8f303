// scummy runtime library
// Audio channels, layered costumes, actors and dialogue sequencing

pub mod actor;
pub mod cli;
pub mod comm;
pub mod config;
pub mod costume;
pub mod engine;
pub mod graphics;
pub mod logging;
pub mod resource;
pub mod sound;
pub mod time;

pub use cli::Cli;
pub use config::{EngineConfig, Options};
pub use engine::Engine;
pub use logging::LogLevel;
