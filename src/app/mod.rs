pub mod cli;
pub mod serve;

pub use cli::Cli;
pub use serve::{prepare_config, run};
