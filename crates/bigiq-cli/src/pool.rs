//! # Pool Subcommand
//!
//! Registration key pools: list, find, create, modify, delete.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use bigiq_client::BigIqClient;

use crate::print_json;

/// Arguments for the `bigiq pool` subcommand.
#[derive(Args, Debug)]
pub struct PoolArgs {
    #[command(subcommand)]
    pub command: PoolCommand,
}

#[derive(Subcommand, Debug)]
pub enum PoolCommand {
    /// List all registration pools.
    List,

    /// Show the pool with the given name.
    Find {
        /// Pool name.
        name: String,
    },

    /// Create a pool.
    Create {
        /// Pool name.
        name: String,
        /// Free-form description.
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Replace the description of an existing pool.
    Modify {
        /// Pool name.
        name: String,
        /// New description.
        #[arg(long)]
        description: String,
    },

    /// Delete a pool by name.
    Delete {
        /// Pool name.
        name: String,
    },
}

/// Execute the pool subcommand.
pub async fn run_pool(args: &PoolArgs, client: &BigIqClient) -> Result<u8> {
    let pools = client.pools();
    match &args.command {
        PoolCommand::List => print_json(&pools.list().await?)?,
        PoolCommand::Find { name } => match pools.find_by_name(name).await? {
            Some(pool) => print_json(&pool)?,
            None => {
                tracing::warn!(name = %name, "no registration pool with this name");
                return Ok(1);
            }
        },
        PoolCommand::Create { name, description } => print_json(
            &pools
                .create(name, description)
                .await
                .with_context(|| format!("failed to create pool {name}"))?,
        )?,
        PoolCommand::Modify { name, description } => print_json(
            &pools
                .modify(name, description)
                .await
                .with_context(|| format!("failed to modify pool {name}"))?,
        )?,
        PoolCommand::Delete { name } => {
            pools
                .delete(name)
                .await
                .with_context(|| format!("failed to delete pool {name}"))?;
            println!("OK: deleted pool {name}");
        }
    }
    Ok(0)
}
