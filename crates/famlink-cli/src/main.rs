//! # famlink CLI Entry Point

use clap::Parser;

use famlink_cli::{config_cmd, logging, serve};

/// Family link lifecycle service.
#[derive(Parser, Debug)]
#[command(name = "famlink", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service.
    Serve(serve::ServeArgs),
    /// Print the effective configuration as YAML.
    Config(config_cmd::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => {
            let config = args.resolve_config()?;
            logging::init(config.log_format);
            serve::run(config).await
        }
        Commands::Config(args) => {
            print!("{}", config_cmd::run(&args)?);
            Ok(())
        }
    }
}
