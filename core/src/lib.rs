pub mod cli;
pub mod config;
pub mod executor;
pub mod normalizer;
pub mod types;

// Re-export main types
pub use types::*;

// Re-export the engine entry points for convenience
pub use executor::{execute, execute_program, RunPhase, Sandbox};
pub use normalizer::{normalize, Program};
