use clap::Parser;
use pi_remote::app::{self, Cli};
use pi_remote::shared::logging;

#[tokio::main]
async fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = app::run(cli).await {
        tracing::error!("{err:#}");
        std::process::exit(1);
    }
}
