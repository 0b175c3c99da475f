use crate::config::DEFAULT_CONFIG_PATH;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "pi-remote",
    version,
    about = "Expose configured scripts over an authenticated HTTP interface"
)]
pub struct Cli {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
    #[arg(short, long)]
    pub port: Option<u16>,
    #[arg(long, default_value_t = false)]
    pub no_discovery: bool,
}
