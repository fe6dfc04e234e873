//! Per-device license tasks (`member-management`).
//!
//! A task grants or revokes a pool license on a BIG-IP, managed or not. It is
//! submitted once and then polled until `FINISHED` or `FAILED`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{require_status, BigIqError};
use crate::path;
use crate::poll::{poll_until, PollPolicy, PollStep};
use crate::session::Session;
use crate::types::TaskId;

/// Status of a license task.
///
/// Values outside the known set are kept as [`LicenseTaskStatus::Other`] and
/// treated as still in progress.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LicenseTaskStatus {
    Started,
    Running,
    Finished,
    Failed,
    Other(String),
}

impl LicenseTaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl std::fmt::Display for LicenseTaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => f.write_str("STARTED"),
            Self::Running => f.write_str("RUNNING"),
            Self::Finished => f.write_str("FINISHED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

impl FromStr for LicenseTaskStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "STARTED" => Self::Started,
            "RUNNING" => Self::Running,
            "FINISHED" => Self::Finished,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        })
    }
}

impl Serialize for LicenseTaskStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Whether a task grants or revokes the license.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseCommand {
    Assign,
    Revoke,
}

/// Body of a license task submission. Unset fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTaskRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignment_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<LicenseCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypervisor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_pool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_keyword1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku_keyword2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// A license task as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseTask {
    pub id: TaskId,
    pub status: LicenseTaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<String>,
}

impl LicenseTask {
    /// Task start time, when the control plane reported a parseable one.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.start_date_time.as_deref())
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.end_date_time.as_deref())
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw?)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    start_date_time: Option<String>,
    #[serde(default)]
    end_date_time: Option<String>,
}

/// Client for `mgmt/cm/device/tasks/licensing/pool/member-management`.
#[derive(Debug, Clone)]
pub struct LicenseTaskClient {
    session: Session,
    poll: PollPolicy,
}

impl LicenseTaskClient {
    pub(crate) fn new(session: Session, poll: PollPolicy) -> Self {
        Self { session, poll }
    }

    /// Submit a task and return its identifier.
    pub async fn submit(&self, request: &LicenseTaskRequest) -> Result<TaskId, BigIqError> {
        let path = path::license_tasks();
        tracing::info!(
            command = ?request.command,
            address = request.address.as_deref().unwrap_or(""),
            pool = request.license_pool_name.as_deref().unwrap_or(""),
            "submitting license task"
        );
        let record: TaskRecord = self.session.post_json(&path, request).await?;
        record
            .id
            .filter(|id| !id.is_empty())
            .map(TaskId)
            .ok_or_else(|| BigIqError::ProtocolViolation {
                endpoint: format!("POST {path}"),
                detail: "license task response has no id".into(),
            })
    }

    /// Read a task once. A response without `status` is a protocol violation.
    pub async fn status(&self, id: &TaskId) -> Result<LicenseTask, BigIqError> {
        let path = path::license_task(id.as_str());
        let record: TaskRecord = self.session.get_json(&path).await?;
        task_from_record(&format!("GET {path}"), record, id)
    }

    /// Poll until the task is `FINISHED` or `FAILED`.
    ///
    /// A `FAILED` task is logged and returned as-is rather than turned into
    /// an error; callers inspect [`LicenseTask::status`].
    pub async fn wait_until_terminal(
        &self,
        id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<LicenseTask, BigIqError> {
        let operation = format!("license task {id}");
        let task = poll_until(&operation, &self.poll, cancel, move || async move {
            let task = self.status(id).await?;
            let pending = match &task.status {
                LicenseTaskStatus::Finished | LicenseTaskStatus::Failed => None,
                LicenseTaskStatus::Other(raw) => {
                    tracing::warn!(task = %id, status = %raw, "unrecognised license task status, still waiting");
                    Some(raw.clone())
                }
                other => Some(other.to_string()),
            };
            Ok(match pending {
                None => PollStep::Done(task),
                Some(status) => PollStep::Pending(status),
            })
        })
        .await?;

        if task.status == LicenseTaskStatus::Failed {
            tracing::error!(
                task = %id,
                error = task.error_message.as_deref().unwrap_or(""),
                "license assign/revoke task failed"
            );
        } else {
            tracing::info!(task = %id, "license task finished");
        }
        Ok(task)
    }
}

fn task_from_record(endpoint: &str, record: TaskRecord, id: &TaskId) -> Result<LicenseTask, BigIqError> {
    let status = require_status(endpoint, "license task", record.status.as_deref())?;
    Ok(LicenseTask {
        id: record.id.map(TaskId).unwrap_or_else(|| id.clone()),
        status,
        error_message: record.error_message,
        start_date_time: record.start_date_time,
        end_date_time: record.end_date_time,
    })
}
