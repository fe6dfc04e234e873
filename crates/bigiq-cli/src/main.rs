//! # bigiq CLI entry point
//!
//! Parses command-line arguments, connects to the control plane and
//! dispatches to subcommand handlers.

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use bigiq_cli::activation::{run_activation, ActivationArgs};
use bigiq_cli::device::{run_device, DeviceArgs};
use bigiq_cli::member::{run_member, MemberArgs};
use bigiq_cli::pool::{run_pool, PoolArgs};
use bigiq_cli::task::{run_task, TaskArgs};
use bigiq_cli::upload::{run_upload, UploadArgs};
use bigiq_client::{BigIqClient, BigIqConfig};

const ENV_HELP: &str = "Connection settings are read from BIGIQ_HOST, BIGIQ_PORT, \
BIGIQ_USERNAME, BIGIQ_PASSWORD, BIGIQ_TOKEN and BIGIQ_LOGIN_PROVIDER.";

/// BIG-IQ license lifecycle CLI.
#[derive(Parser, Debug)]
#[command(name = "bigiq", version, about, long_about = None, after_help = ENV_HELP)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Registration key pools.
    Pool(PoolArgs),

    /// Registration key activation and EULA acceptance.
    Activation(ActivationArgs),

    /// Per-device license tasks.
    Task(TaskArgs),

    /// Assign and revoke pool members.
    Member(MemberArgs),

    /// Upload a file in chunks.
    Upload(UploadArgs),

    /// Managed device inventory.
    Device(DeviceArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    match run(cli.command, &cancel).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Commands, cancel: &CancellationToken) -> anyhow::Result<u8> {
    let config = BigIqConfig::from_env().context("invalid BIGIQ_* configuration")?;
    tracing::debug!(host = %config.host, "connecting");
    let client = BigIqClient::connect(config)
        .await
        .context("failed to connect to BIG-IQ")?;

    match command {
        Commands::Pool(args) => run_pool(&args, &client).await,
        Commands::Activation(args) => run_activation(&args, &client, cancel).await,
        Commands::Task(args) => run_task(&args, &client, cancel).await,
        Commands::Member(args) => run_member(&args, &client, cancel).await,
        Commands::Upload(args) => run_upload(&args, &client).await,
        Commands::Device(args) => run_device(&args, &client).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigiq_cli::member::MemberCommand;
    use bigiq_cli::pool::PoolCommand;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn help_names_the_variables_config_reads() {
        let help = Cli::command().render_help().to_string();
        for var in ["BIGIQ_HOST", "BIGIQ_PORT", "BIGIQ_USERNAME", "BIGIQ_PASSWORD", "BIGIQ_TOKEN"] {
            assert!(help.contains(var), "help does not mention {var}");
        }
        assert!(!help.contains("BIGIQ_USER,"));
    }

    #[test]
    fn parses_pool_create() {
        let cli = Cli::try_parse_from(["bigiq", "-vv", "pool", "create", "lab", "--description", "lab keys"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Pool(PoolArgs {
                command: PoolCommand::Create { name, description },
            }) => {
                assert_eq!(name, "lab");
                assert_eq!(description, "lab keys");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn member_assign_rejects_device_with_address() {
        let result = Cli::try_parse_from([
            "bigiq", "member", "assign", "--pool", "p", "--reg-key", "k", "--device", "bigip1", "--address", "10.1.1.4",
        ]);
        assert!(result.is_err());

        let cli = Cli::try_parse_from([
            "bigiq", "--json", "member", "assign", "--pool", "p", "--reg-key", "k", "--device", "bigip1",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(
            cli.command,
            Commands::Member(MemberArgs {
                command: MemberCommand::Assign { .. }
            })
        ));
    }

    #[test]
    fn activation_mode_defaults_to_automatic() {
        let cli = Cli::try_parse_from(["bigiq", "activation", "start", "--reg-key", "K", "--name", "n"]).unwrap();
        match cli.command {
            Commands::Activation(ActivationArgs {
                command: bigiq_cli::activation::ActivationCommand::Start { mode, .. },
            }) => assert_eq!(mode, bigiq_cli::activation::ActivationMode::Automatic),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
