use azure_ssh_firewall::args::Args;
use azure_ssh_firewall::config::Config;
use azure_ssh_firewall::{logging, run_cli, EXIT_FATAL};
use clap::Parser;
use colored::Colorize;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Do as little as possible in main.rs as it can't contain any tests
    // .env first so clap sees AZ_FW_* values from it
    dotenv::dotenv().ok();
    let args = Args::parse();

    let config = match Config::from_env() {
        Ok(config) => config.with_args(&args),
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            return ExitCode::from(EXIT_FATAL);
        }
    };
    if let Err(e) = logging::init(&config.log_config, args.verbose) {
        eprintln!("{e}");
    }
    log::info!("#Start main()");

    match run_cli(&args, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            log::error!("{e}");
            eprintln!("{}", e.to_string().red());
            ExitCode::from(EXIT_FATAL)
        }
    }
}
// cargo watch -x 'fmt' -x 'run -- --dry-run'
