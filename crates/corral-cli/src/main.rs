//! Corral CLI - cluster bootstrap from the command line.
//!
//! The main entry point for the `corral` binary.

use clap::Parser;

use corral_cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let config = cli.config();
    corral_core::init_logging(config.log_format);

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| {
            runtime.block_on(async {
                match cli.command {
                    Commands::Bootstrap => corral_cli::commands::bootstrap::execute(&config).await,
                    Commands::Status(args) => {
                        corral_cli::commands::status::execute(&args, &config).await
                    }
                    Commands::Topology => corral_cli::commands::topology::execute(&config),
                }
            })
        });

    if let Err(err) = &result {
        eprintln!("error: {err:#}");
    }
    std::process::exit(corral_cli::exit_code(&result));
}
