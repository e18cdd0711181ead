pub mod cli;
pub mod config;
pub mod orchestrator;

pub use cli::{parse, Mode, Options, ParseOutcome, UsageError};
pub use config::Config;
pub use orchestrator::{prepare_args, Orchestrator, EXIT_FAILURE, EXIT_SUCCESS};
