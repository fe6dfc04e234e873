//! # Member Subcommand
//!
//! Binding registration keys to devices: assign, list, revoke.
//!
//! A managed device is named by address, hostname or UUID and resolved
//! through the device inventory. An unmanaged device is reached directly
//! with `--address`, `--user` and `--password`.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use tokio_util::sync::CancellationToken;

use bigiq_client::members::MemberAssignmentRequest;
use bigiq_client::{BigIqClient, MemberId, PoolId, RegKey};

use crate::print_json;

/// Arguments for the `bigiq member` subcommand.
#[derive(Args, Debug)]
pub struct MemberArgs {
    #[command(subcommand)]
    pub command: MemberCommand,
}

/// Pool and key a membership belongs to.
#[derive(Args, Debug, Clone)]
pub struct OfferingArgs {
    /// Pool name.
    #[arg(long)]
    pub pool: String,
    #[arg(long)]
    pub reg_key: String,
}

/// Credentials for a device the control plane does not manage.
#[derive(Args, Debug, Clone, Default)]
pub struct UnmanagedArgs {
    /// Device address.
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub user: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub https_port: Option<u16>,
}

impl UnmanagedArgs {
    fn request(&self) -> Result<Option<MemberAssignmentRequest>> {
        let Some(address) = &self.address else {
            return Ok(None);
        };
        let (Some(user), Some(password)) = (&self.user, &self.password) else {
            bail!("--address needs --user and --password");
        };
        Ok(Some(MemberAssignmentRequest::Unmanaged {
            device_address: address.clone(),
            username: user.clone(),
            password: password.clone(),
            https_port: self.https_port,
        }))
    }
}

#[derive(Subcommand, Debug)]
pub enum MemberCommand {
    /// Assign a key to a device and wait until it is LICENSED.
    Assign {
        #[command(flatten)]
        offering: OfferingArgs,
        /// Managed device address, hostname or UUID.
        #[arg(long, conflicts_with = "address")]
        device: Option<String>,
        #[command(flatten)]
        unmanaged: UnmanagedArgs,
    },

    /// List the members of a key.
    List {
        #[command(flatten)]
        offering: OfferingArgs,
    },

    /// Revoke a membership.
    Revoke {
        #[command(flatten)]
        offering: OfferingArgs,
        /// Member id.
        #[arg(long)]
        member: String,
        #[command(flatten)]
        unmanaged: UnmanagedArgs,
    },
}

/// Execute the member subcommand.
pub async fn run_member(args: &MemberArgs, client: &BigIqClient, cancel: &CancellationToken) -> Result<u8> {
    match &args.command {
        MemberCommand::Assign {
            offering,
            device,
            unmanaged,
        } => {
            let request = match (device, unmanaged.request()?) {
                (Some(name), _) => {
                    let link = client
                        .devices()
                        .find_self_link(name)
                        .await?
                        .ok_or_else(|| anyhow!("no managed device matches {name}"))?;
                    MemberAssignmentRequest::managed(link)
                }
                (None, Some(request)) => request,
                (None, None) => bail!("either --device or --address is required"),
            };
            let pool_id = resolve_pool(client, &offering.pool).await?;
            let member = client
                .members()
                .assign(&request, &pool_id, &RegKey::new(offering.reg_key.as_str()), cancel)
                .await
                .with_context(|| format!("license assignment from {} failed", offering.reg_key))?;
            print_json(&member)?;
        }
        MemberCommand::List { offering } => {
            let pool_id = resolve_pool(client, &offering.pool).await?;
            let members = client
                .members()
                .list(&pool_id, &RegKey::new(offering.reg_key.as_str()))
                .await?;
            print_json(&members)?;
        }
        MemberCommand::Revoke {
            offering,
            member,
            unmanaged,
        } => {
            let pool_id = resolve_pool(client, &offering.pool).await?;
            let reg_key = RegKey::new(offering.reg_key.as_str());
            let member_id = MemberId::new(member.as_str());
            match unmanaged.request()? {
                Some(body) => {
                    client
                        .members()
                        .revoke_with_body(&body, &pool_id, &reg_key, &member_id)
                        .await?
                }
                None => client.members().revoke(&pool_id, &reg_key, &member_id).await?,
            }
            println!("OK: revoked member {member}");
        }
    }
    Ok(0)
}

async fn resolve_pool(client: &BigIqClient, name: &str) -> Result<PoolId> {
    client
        .pools()
        .find_by_name(name)
        .await?
        .map(|pool| pool.id)
        .ok_or_else(|| anyhow!("no registration pool named {name}"))
}
