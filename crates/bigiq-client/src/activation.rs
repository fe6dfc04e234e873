//! # Registration Key Activation
//!
//! Turns a raw registration key into a usable license through the
//! `initial-activation` resource.
//!
//! ## States
//!
//! ```text
//! start ──▶ PENDING / ACTIVATING_* / LICENSING_ACTIVATION_IN_PROGRESS
//!                 │
//!                 ├──▶ NEED_EULA_ACCEPT ──(accept_eula)──▶ ACTIVATING_AUTOMATIC_EULA_ACCEPTED
//!                 │                                              │
//!                 ├──▶ LICENSING_COMPLETE (terminal) ◀───────────┘
//!                 └──▶ LICENSING_FAILED (terminal)
//! ```

use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{require_status, BigIqError};
use crate::path;
use crate::poll::{poll_until, PollPolicy, PollStep};
use crate::session::{Request, Session};
use crate::types::RegKey;

// ─── Activation Status ───────────────────────────────────────────────

/// Status of an activation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivationStatus {
    Pending,
    /// Requested mode: license over the internet.
    ActivatingAutomatic,
    /// Written back by [`ActivationClient::accept_eula`].
    ActivatingAutomaticEulaAccepted,
    /// Requested mode: dossier exchanged out of band.
    ActivatingManual,
    LicensingActivationInProgress,
    /// Waiting for the EULA to be accepted.
    NeedEulaAccept,
    /// License is active (terminal).
    LicensingComplete,
    /// Activation failed (terminal).
    LicensingFailed,
}

impl ActivationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::LicensingComplete | Self::LicensingFailed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::ActivatingAutomatic => "ACTIVATING_AUTOMATIC",
            Self::ActivatingAutomaticEulaAccepted => "ACTIVATING_AUTOMATIC_EULA_ACCEPTED",
            Self::ActivatingManual => "ACTIVATING_MANUAL",
            Self::LicensingActivationInProgress => "LICENSING_ACTIVATION_IN_PROGRESS",
            Self::NeedEulaAccept => "NEED_EULA_ACCEPT",
            Self::LicensingComplete => "LICENSING_COMPLETE",
            Self::LicensingFailed => "LICENSING_FAILED",
        }
    }
}

impl std::fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "ACTIVATING_AUTOMATIC" => Ok(Self::ActivatingAutomatic),
            "ACTIVATING_AUTOMATIC_EULA_ACCEPTED" => Ok(Self::ActivatingAutomaticEulaAccepted),
            "ACTIVATING_MANUAL" => Ok(Self::ActivatingManual),
            "LICENSING_ACTIVATION_IN_PROGRESS" => Ok(Self::LicensingActivationInProgress),
            "NEED_EULA_ACCEPT" => Ok(Self::NeedEulaAccept),
            "LICENSING_COMPLETE" => Ok(Self::LicensingComplete),
            "LICENSING_FAILED" => Ok(Self::LicensingFailed),
            other => Err(format!("unknown activation status {other}")),
        }
    }
}

// ─── Wire Types ──────────────────────────────────────────────────────

/// An activation task as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationTask {
    pub reg_key: RegKey,
    pub name: String,
    pub status: ActivationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eula_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivationRecord {
    #[serde(default)]
    reg_key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    eula_text: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StartActivation<'a> {
    reg_key: &'a RegKey,
    name: &'a str,
    status: ActivationStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EulaAcceptance<'a> {
    status: ActivationStatus,
    eula_text: &'a str,
}

#[derive(Deserialize)]
struct StartResponse {
    #[serde(default)]
    message: Option<String>,
}

// ─── Client ──────────────────────────────────────────────────────────

/// Client for `mgmt/cm/device/licensing/pool/initial-activation`.
#[derive(Debug, Clone)]
pub struct ActivationClient {
    session: Session,
    poll: PollPolicy,
}

impl ActivationClient {
    pub(crate) fn new(session: Session, poll: PollPolicy) -> Self {
        Self { session, poll }
    }

    /// Submit `reg_key` for activation in `mode` and return the server's
    /// status message.
    ///
    /// On rejection the error carries the server's message (see
    /// [`BigIqError::server_message`]).
    pub async fn start(
        &self,
        reg_key: &RegKey,
        name: &str,
        mode: ActivationStatus,
    ) -> Result<String, BigIqError> {
        let path = path::activations();
        let endpoint = format!("POST {path}");
        let response: StartResponse = self
            .session
            .post_json(&path, &StartActivation { reg_key, name, status: mode })
            .await
            .map_err(|e| {
                tracing::warn!(
                    %reg_key,
                    message = e.server_message().as_deref().unwrap_or(""),
                    "activation rejected"
                );
                e
            })?;

        let message = response.message.ok_or_else(|| BigIqError::ProtocolViolation {
            endpoint,
            detail: "activation response has no message".into(),
        })?;
        tracing::info!(%reg_key, name, %mode, %message, "activation submitted");
        Ok(message)
    }

    /// Read the activation task for `reg_key` once.
    ///
    /// A response without a `status` field is a protocol violation.
    pub async fn poll(&self, reg_key: &RegKey) -> Result<ActivationTask, BigIqError> {
        let path = path::activation(reg_key.as_str());
        let endpoint = format!("GET {path}");
        let record: ActivationRecord = self.session.get_json(&path).await?;
        task_from_record(&endpoint, record, reg_key)
    }

    /// Accept the EULA the control plane is waiting on, echoing its text
    /// verbatim.
    pub async fn accept_eula(&self, reg_key: &RegKey) -> Result<(), BigIqError> {
        let task = self.poll(reg_key).await?;
        let path = path::activation(reg_key.as_str());
        let eula_text = task
            .eula_text
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BigIqError::ProtocolViolation {
                endpoint: format!("GET {path}"),
                detail: format!("no EULA text to accept (status {})", task.status),
            })?;

        let request = Request::new(Method::PATCH, path).json(&EulaAcceptance {
            status: ActivationStatus::ActivatingAutomaticEulaAccepted,
            eula_text: &eula_text,
        })?;
        self.session.send(&request).await?;
        tracing::info!(%reg_key, "EULA accepted");
        Ok(())
    }

    /// Delete the activation task for `reg_key`.
    pub async fn remove(&self, reg_key: &RegKey) -> Result<(), BigIqError> {
        self.session
            .delete(&path::activation(reg_key.as_str()))
            .await?;
        tracing::info!(%reg_key, "activation removed");
        Ok(())
    }

    /// Poll until the task needs the EULA accepted or completes.
    ///
    /// `LICENSING_FAILED` ends the wait with `TerminalFailure`.
    pub async fn wait(
        &self,
        reg_key: &RegKey,
        cancel: &CancellationToken,
    ) -> Result<ActivationTask, BigIqError> {
        self.wait_for(reg_key, cancel, true).await
    }

    /// Run the whole workflow: start, wait, accept the EULA when asked, and
    /// wait for `LICENSING_COMPLETE`.
    pub async fn activate(
        &self,
        reg_key: &RegKey,
        name: &str,
        mode: ActivationStatus,
        cancel: &CancellationToken,
    ) -> Result<ActivationTask, BigIqError> {
        self.start(reg_key, name, mode).await?;
        let task = self.wait_for(reg_key, cancel, true).await?;
        if task.status != ActivationStatus::NeedEulaAccept {
            return Ok(task);
        }
        self.accept_eula(reg_key).await?;
        self.wait_for(reg_key, cancel, false).await
    }

    async fn wait_for(
        &self,
        reg_key: &RegKey,
        cancel: &CancellationToken,
        stop_at_eula: bool,
    ) -> Result<ActivationTask, BigIqError> {
        let operation = format!("activation {reg_key}");
        poll_until(&operation, &self.poll, cancel, move || async move {
            let task = self.poll(reg_key).await?;
            match task.status {
                ActivationStatus::LicensingComplete => Ok(PollStep::Done(task)),
                ActivationStatus::NeedEulaAccept if stop_at_eula => Ok(PollStep::Done(task)),
                ActivationStatus::LicensingFailed => {
                    tracing::error!(%reg_key, message = ?task.message, "activation failed");
                    Err(BigIqError::TerminalFailure {
                        entity: format!("activation {reg_key}"),
                        status: task.status.to_string(),
                        message: task.message.unwrap_or_default(),
                    })
                }
                other => Ok(PollStep::Pending(other.to_string())),
            }
        })
        .await
    }
}

fn task_from_record(
    endpoint: &str,
    record: ActivationRecord,
    reg_key: &RegKey,
) -> Result<ActivationTask, BigIqError> {
    let status = require_status(endpoint, "license", record.status.as_deref())?;
    Ok(ActivationTask {
        reg_key: if record.reg_key.is_empty() {
            reg_key.clone()
        } else {
            RegKey(record.reg_key)
        },
        name: record.name,
        status,
        eula_text: record.eula_text,
        message: record.message,
    })
}
