//! # Device Subcommand
//!
//! Read-only view of the managed BIG-IP inventory.

use anyhow::Result;
use clap::{Args, Subcommand};

use bigiq_client::BigIqClient;

use crate::print_json;

/// Arguments for the `bigiq device` subcommand.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Subcommand, Debug)]
pub enum DeviceCommand {
    /// List managed devices.
    List,

    /// Print the self link of a device, for use as a member reference.
    Find {
        /// Address, hostname or UUID.
        name: String,
    },
}

/// Execute the device subcommand.
pub async fn run_device(args: &DeviceArgs, client: &BigIqClient) -> Result<u8> {
    match &args.command {
        DeviceCommand::List => print_json(&client.devices().list().await?)?,
        DeviceCommand::Find { name } => match client.devices().find_self_link(name).await? {
            Some(link) => println!("{link}"),
            None => {
                tracing::warn!(device = %name, "no managed device matches");
                return Ok(1);
            }
        },
    }
    Ok(0)
}
