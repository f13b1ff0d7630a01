pub mod blocks;
pub mod cli;
pub mod config;
pub mod delay;
pub mod error;
pub mod events;
pub mod project;
pub mod runtime;
pub mod runtime_host;
pub mod script_harness;
pub mod scripts;
pub mod world;

pub use error::{DocumentError, ScriptError};
pub use runtime::Runtime;
pub use runtime_host::{PlayState, RuntimeHost};
