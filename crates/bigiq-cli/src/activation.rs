//! # Activation Subcommand
//!
//! Registration key activation: start, poll, accept-eula, remove, and the
//! combined `activate` workflow.

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use bigiq_client::activation::ActivationStatus;
use bigiq_client::{BigIqClient, RegKey};

use crate::print_json;

/// Arguments for the `bigiq activation` subcommand.
#[derive(Args, Debug)]
pub struct ActivationArgs {
    #[command(subcommand)]
    pub command: ActivationCommand,
}

/// How the control plane reaches the licensing server.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Automatic,
    Manual,
}

impl From<ActivationMode> for ActivationStatus {
    fn from(mode: ActivationMode) -> Self {
        match mode {
            ActivationMode::Automatic => ActivationStatus::ActivatingAutomatic,
            ActivationMode::Manual => ActivationStatus::ActivatingManual,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ActivationCommand {
    /// Submit a registration key for activation.
    Start {
        #[arg(long)]
        reg_key: String,
        /// Display name for the activated license.
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = ActivationMode::Automatic)]
        mode: ActivationMode,
    },

    /// Show the activation task for a key.
    Poll {
        #[arg(long)]
        reg_key: String,
        /// Wait until the task is terminal or needs the EULA accepted.
        #[arg(long)]
        wait: bool,
    },

    /// Accept the EULA the control plane is waiting on.
    AcceptEula {
        #[arg(long)]
        reg_key: String,
    },

    /// Delete the activation task for a key.
    Remove {
        #[arg(long)]
        reg_key: String,
    },

    /// Start, accept the EULA when asked, and wait for LICENSING_COMPLETE.
    Activate {
        #[arg(long)]
        reg_key: String,
        #[arg(long)]
        name: String,
        #[arg(long, value_enum, default_value_t = ActivationMode::Automatic)]
        mode: ActivationMode,
    },
}

/// Execute the activation subcommand.
pub async fn run_activation(
    args: &ActivationArgs,
    client: &BigIqClient,
    cancel: &CancellationToken,
) -> Result<u8> {
    let activations = client.activations();
    match &args.command {
        ActivationCommand::Start {
            reg_key,
            name,
            mode,
        } => {
            let message = activations
                .start(&RegKey::new(reg_key.as_str()), name, (*mode).into())
                .await
                .with_context(|| format!("failed to start activation of {reg_key}"))?;
            println!("{message}");
        }
        ActivationCommand::Poll { reg_key, wait } => {
            let key = RegKey::new(reg_key.as_str());
            let task = if *wait {
                activations.wait(&key, cancel).await?
            } else {
                activations.poll(&key).await?
            };
            print_json(&task)?;
        }
        ActivationCommand::AcceptEula { reg_key } => {
            activations
                .accept_eula(&RegKey::new(reg_key.as_str()))
                .await
                .with_context(|| format!("failed to accept EULA for {reg_key}"))?;
            println!("OK: EULA accepted for {reg_key}");
        }
        ActivationCommand::Remove { reg_key } => {
            activations.remove(&RegKey::new(reg_key.as_str())).await?;
            println!("OK: removed activation of {reg_key}");
        }
        ActivationCommand::Activate {
            reg_key,
            name,
            mode,
        } => {
            let task = activations
                .activate(&RegKey::new(reg_key.as_str()), name, (*mode).into(), cancel)
                .await
                .with_context(|| format!("activation of {reg_key} did not complete"))?;
            print_json(&task)?;
        }
    }
    Ok(0)
}
