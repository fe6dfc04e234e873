//! # Task Subcommand
//!
//! Per-device license tasks against utility and purchased pools.

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;

use bigiq_client::tasks::{LicenseCommand, LicenseTask, LicenseTaskRequest, LicenseTaskStatus};
use bigiq_client::{BigIqClient, TaskId};

use crate::print_json;

/// Arguments for the `bigiq task` subcommand.
#[derive(Args, Debug)]
pub struct TaskArgs {
    #[command(subcommand)]
    pub command: TaskCommand,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Assign,
    Revoke,
}

impl From<TaskAction> for LicenseCommand {
    fn from(action: TaskAction) -> Self {
        match action {
            TaskAction::Assign => LicenseCommand::Assign,
            TaskAction::Revoke => LicenseCommand::Revoke,
        }
    }
}

/// Fields of a task submission.
#[derive(Args, Debug, Clone, Default)]
pub struct SubmitArgs {
    /// Device address.
    #[arg(long)]
    pub address: Option<String>,
    /// Device management port.
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub assignment_type: Option<String>,
    #[arg(long, value_enum)]
    pub command: Option<TaskAction>,
    #[arg(long)]
    pub hypervisor: Option<String>,
    /// Name of the pool to draw the license from.
    #[arg(long)]
    pub pool: Option<String>,
    #[arg(long)]
    pub mac_address: Option<String>,
    /// Device admin user.
    #[arg(long)]
    pub user: Option<String>,
    /// Device admin password.
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub sku_keyword1: Option<String>,
    #[arg(long)]
    pub sku_keyword2: Option<String>,
    #[arg(long)]
    pub tenant: Option<String>,
    /// Billing unit for utility pools (e.g. hourly, yearly).
    #[arg(long)]
    pub unit_of_measure: Option<String>,
}

impl From<&SubmitArgs> for LicenseTaskRequest {
    fn from(args: &SubmitArgs) -> Self {
        Self {
            address: args.address.clone(),
            port: args.port,
            assignment_type: args.assignment_type.clone(),
            command: args.command.map(Into::into),
            hypervisor: args.hypervisor.clone(),
            license_pool_name: args.pool.clone(),
            mac_address: args.mac_address.clone(),
            password: args.password.clone(),
            sku_keyword1: args.sku_keyword1.clone(),
            sku_keyword2: args.sku_keyword2.clone(),
            tenant: args.tenant.clone(),
            unit_of_measure: args.unit_of_measure.clone(),
            user: args.user.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Submit a license task and print its id.
    Submit {
        #[command(flatten)]
        fields: SubmitArgs,
        /// Wait for the task to finish.
        #[arg(long)]
        wait: bool,
    },

    /// Show a task once.
    Status {
        /// Task id.
        id: String,
    },

    /// Wait until a task is FINISHED or FAILED.
    Wait {
        /// Task id.
        id: String,
    },
}

/// Execute the task subcommand.
pub async fn run_task(args: &TaskArgs, client: &BigIqClient, cancel: &CancellationToken) -> Result<u8> {
    let tasks = client.tasks();
    match &args.command {
        TaskCommand::Submit { fields, wait } => {
            let id = tasks
                .submit(&LicenseTaskRequest::from(fields))
                .await
                .context("failed to submit license task")?;
            if !*wait {
                println!("{id}");
                return Ok(0);
            }
            let task = tasks.wait_until_terminal(&id, cancel).await?;
            report(&task)
        }
        TaskCommand::Status { id } => {
            print_json(&tasks.status(&TaskId::new(id.as_str())).await?)?;
            Ok(0)
        }
        TaskCommand::Wait { id } => {
            let task = tasks
                .wait_until_terminal(&TaskId::new(id.as_str()), cancel)
                .await?;
            report(&task)
        }
    }
}

fn report(task: &LicenseTask) -> Result<u8> {
    print_json(task)?;
    Ok(if task.status == LicenseTaskStatus::Failed { 1 } else { 0 })
}
