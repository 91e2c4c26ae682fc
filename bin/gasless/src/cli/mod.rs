use crate::utils::run_until_ctrl_c;
use clap::{value_parser, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub mod args;
pub mod commands;

/// The main gasless CLI interface
#[derive(Debug, Parser)]
#[command(author, version, about = "gasless", long_about = None)]
pub struct Cli {
    /// The command to execute
    #[clap(subcommand)]
    command: Commands,

    /// The verbosity level
    #[clap(long, short, global = true, default_value_t = 2, value_parser = value_parser!(u8).range(..=4))]
    verbosity: u8,
}

impl Cli {
    /// Get the log level based on the verbosity level
    pub fn get_log_level(&self) -> String {
        match self.verbosity {
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
        .into()
    }

    /// Log filter of the gasless crates, on top of `RUST_LOG`
    pub fn env_filter(&self) -> EnvFilter {
        let level = self.get_log_level();
        let crates = ["gasless", "gasless_client", "gasless_contracts", "gasless_primitives"]
            .map(|name| format!("{name}={level}"))
            .join(",");
        let directives = match std::env::var("RUST_LOG") {
            Ok(val) => format!("{val},{crates}"),
            Err(_) => crates,
        };
        EnvFilter::new(directives)
    }
}

/// Commands to be executed
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transfer ERC-20 tokens, the gas being paid by the paymaster
    #[command(name = "transfer")]
    Transfer(Box<commands::TransferCommand>),

    /// Approve a spender of ERC-20 tokens
    #[command(name = "approve")]
    Approve(Box<commands::ApproveCommand>),

    /// Execute an arbitrary call from the account
    #[command(name = "execute")]
    Execute(Box<commands::ExecuteCommand>),

    /// Ask the bundler for the gas limits of a call
    #[command(name = "estimate")]
    Estimate(Box<commands::EstimateCommand>),

    /// Build a user operation and print its hash
    #[command(name = "hash")]
    Hash(Box<commands::HashCommand>),

    /// Print the entry point nonce of an account
    #[command(name = "nonce")]
    Nonce(commands::NonceCommand),

    /// Wait for the receipt of a submitted user operation
    #[command(name = "receipt")]
    Receipt(commands::ReceiptCommand),
}

pub fn run() -> eyre::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_env_filter(cli.env_filter()).with_writer(std::io::stderr).init();

    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    let task = async move {
        match cli.command {
            Commands::Transfer(command) => command.execute().await,
            Commands::Approve(command) => command.execute().await,
            Commands::Execute(command) => command.execute().await,
            Commands::Estimate(command) => command.execute().await,
            Commands::Hash(command) => command.execute().await,
            Commands::Nonce(command) => command.execute().await,
            Commands::Receipt(command) => command.execute().await,
        }
    };

    rt.block_on(run_until_ctrl_c(task))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity() {
        let cli = Cli::try_parse_from(vec![
            "gasless",
            "-v",
            "4",
            "nonce",
            "--sender",
            "0x2222222222222222222222222222222222222222",
        ])
        .unwrap();
        assert_eq!(cli.get_log_level(), "trace");

        let cli = Cli::try_parse_from(vec![
            "gasless",
            "nonce",
            "--sender",
            "0x2222222222222222222222222222222222222222",
        ])
        .unwrap();
        assert_eq!(cli.get_log_level(), "info");

        assert!(Cli::try_parse_from(vec!["gasless", "-v", "5", "nonce"]).is_err());
    }
}
