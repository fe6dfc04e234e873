//! Pool membership: one device bound to one registration key in one pool.
//!
//! ```text
//! assign ──▶ INSTALLING ──▶ LICENSED (terminal)
//!                 └───────▶ INSTALLATION_FAILED (terminal)
//! revoke ──▶ REVOKING ──▶ REVOKED / gone
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{require_status, BigIqError};
use crate::path;
use crate::poll::{poll_until, PollPolicy, PollStep};
use crate::session::Session;
use crate::types::{MemberId, PoolId, RegKey};

/// Status of a pool member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberStatus {
    Installing,
    /// License installed on the device (terminal).
    Licensed,
    /// License could not be installed (terminal).
    InstallationFailed,
    Revoking,
    Revoked,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installing => "INSTALLING",
            Self::Licensed => "LICENSED",
            Self::InstallationFailed => "INSTALLATION_FAILED",
            Self::Revoking => "REVOKING",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for MemberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSTALLING" => Ok(Self::Installing),
            "LICENSED" => Ok(Self::Licensed),
            "INSTALLATION_FAILED" => Ok(Self::InstallationFailed),
            "REVOKING" => Ok(Self::Revoking),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(format!("unknown member status {other}")),
        }
    }
}

/// A device's membership in a pool offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAssignment {
    pub id: MemberId,
    pub device_address: String,
    pub device_machine_id: String,
    pub device_name: String,
    pub assignment_type: String,
    pub status: MemberStatus,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MemberRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    device_address: String,
    #[serde(default)]
    device_machine_id: String,
    #[serde(default)]
    device_name: String,
    #[serde(default)]
    assignment_type: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: String,
}

impl MemberRecord {
    fn into_assignment(self, endpoint: &str) -> Result<MemberAssignment, BigIqError> {
        let status = require_status(endpoint, "member", self.status.as_deref())?;
        Ok(MemberAssignment {
            id: MemberId(self.id),
            device_address: self.device_address,
            device_machine_id: self.device_machine_id,
            device_name: self.device_name,
            assignment_type: self.assignment_type,
            status,
            message: self.message,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MemberList {
    #[serde(default)]
    items: Vec<MemberRecord>,
}

/// Link to a device already managed by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceReference {
    pub link: String,
}

/// Device to assign a key to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MemberAssignmentRequest {
    /// A device in the managed inventory, referenced by its self link.
    #[serde(rename_all = "camelCase")]
    Managed { device_reference: DeviceReference },
    /// A device reached directly with its own admin credentials.
    #[serde(rename_all = "camelCase")]
    Unmanaged {
        device_address: String,
        username: String,
        password: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        https_port: Option<u16>,
    },
}

impl MemberAssignmentRequest {
    pub fn managed(self_link: impl Into<String>) -> Self {
        Self::Managed {
            device_reference: DeviceReference {
                link: self_link.into(),
            },
        }
    }

    fn target(&self) -> &str {
        match self {
            Self::Managed { device_reference } => &device_reference.link,
            Self::Unmanaged { device_address, .. } => device_address,
        }
    }
}

/// Client for `.../regkey/licenses/<pool>/offerings/<key>/members`.
#[derive(Debug, Clone)]
pub struct MemberClient {
    session: Session,
    poll: PollPolicy,
}

impl MemberClient {
    pub(crate) fn new(session: Session, poll: PollPolicy) -> Self {
        Self { session, poll }
    }

    /// Assign `reg_key` in `pool_id` to a device and wait for `LICENSED`.
    pub async fn assign(
        &self,
        request: &MemberAssignmentRequest,
        pool_id: &PoolId,
        reg_key: &RegKey,
        cancel: &CancellationToken,
    ) -> Result<MemberAssignment, BigIqError> {
        let path = path::members(pool_id.as_str(), reg_key.as_str());
        let record: MemberRecord = self.session.post_json(&path, request).await?;
        if record.id.is_empty() {
            return Err(BigIqError::ProtocolViolation {
                endpoint: format!("POST {path}"),
                detail: "member assignment response has no id".into(),
            });
        }
        let member_id = MemberId(record.id);
        tracing::info!(
            pool = %pool_id,
            %reg_key,
            member = %member_id,
            device = request.target(),
            "license assignment submitted"
        );
        self.wait_for_member(pool_id, reg_key, &member_id, cancel)
            .await
    }

    /// Poll a member until `LICENSED`.
    ///
    /// `INSTALLATION_FAILED` ends the wait with `TerminalFailure` carrying the
    /// server's message, and `REVOKING`/`REVOKED` end it with
    /// `TerminalFailure` since the member can no longer become licensed. A
    /// member that disappears is `NotFound`.
    pub async fn wait_for_member(
        &self,
        pool_id: &PoolId,
        reg_key: &RegKey,
        member_id: &MemberId,
        cancel: &CancellationToken,
    ) -> Result<MemberAssignment, BigIqError> {
        let operation = format!("member {member_id}");
        poll_until(&operation, &self.poll, cancel, move || async move {
            let member = self
                .get(pool_id, reg_key, member_id)
                .await?
                .ok_or_else(|| BigIqError::NotFound {
                    entity: format!("member {member_id} of {pool_id}/{reg_key}"),
                })?;
            match member.status {
                MemberStatus::Licensed => Ok(PollStep::Done(member)),
                MemberStatus::InstallationFailed => {
                    tracing::error!(member = %member_id, message = %member.message, "license installation failed");
                    Err(BigIqError::TerminalFailure {
                        entity: format!("member {member_id}"),
                        status: member.status.to_string(),
                        message: member.message,
                    })
                }
                MemberStatus::Revoking | MemberStatus::Revoked => {
                    tracing::warn!(member = %member_id, status = %member.status, "member revoked while waiting for license");
                    Err(BigIqError::TerminalFailure {
                        entity: format!("member {member_id}"),
                        status: member.status.to_string(),
                        message: if member.message.is_empty() {
                            "member revoked before it was licensed".into()
                        } else {
                            member.message
                        },
                    })
                }
                MemberStatus::Installing => Ok(PollStep::Pending(member.status.to_string())),
            }
        })
        .await
    }

    /// Read one member; a structured 404 is `Ok(None)`.
    pub async fn get(
        &self,
        pool_id: &PoolId,
        reg_key: &RegKey,
        member_id: &MemberId,
    ) -> Result<Option<MemberAssignment>, BigIqError> {
        let path = path::member(pool_id.as_str(), reg_key.as_str(), member_id.as_str());
        let endpoint = format!("GET {path}");
        match self.session.get_entity::<MemberRecord>(&path).await? {
            Some(record) => record.into_assignment(&endpoint).map(Some),
            None => Ok(None),
        }
    }

    pub async fn list(&self, pool_id: &PoolId, reg_key: &RegKey) -> Result<Vec<MemberAssignment>, BigIqError> {
        let path = path::members(pool_id.as_str(), reg_key.as_str());
        let endpoint = format!("GET {path}");
        let list: MemberList = self.session.get_json(&path).await?;
        list.items
            .into_iter()
            .map(|r| r.into_assignment(&endpoint))
            .collect()
    }

    /// Delete a membership.
    pub async fn revoke(&self, pool_id: &PoolId, reg_key: &RegKey, member_id: &MemberId) -> Result<(), BigIqError> {
        let path = path::member(pool_id.as_str(), reg_key.as_str(), member_id.as_str());
        tracing::info!(member = %member_id, "revoking license");
        self.session.delete(&path).await?;
        self.confirm_revoked(&path, member_id).await
    }

    /// Delete a membership, sending `body` (typically the unmanaged device's
    /// credentials) with the request.
    pub async fn revoke_with_body<B: Serialize + ?Sized>(
        &self,
        body: &B,
        pool_id: &PoolId,
        reg_key: &RegKey,
        member_id: &MemberId,
    ) -> Result<(), BigIqError> {
        let path = path::member(pool_id.as_str(), reg_key.as_str(), member_id.as_str());
        tracing::info!(member = %member_id, "revoking license with device credentials");
        self.session.delete_with_body(&path, body).await?;
        self.confirm_revoked(&path, member_id).await
    }

    /// One read-back for diagnostics; absence is the expected outcome.
    async fn confirm_revoked(&self, path: &str, member_id: &MemberId) -> Result<(), BigIqError> {
        match self.session.get_entity::<serde_json::Value>(path).await? {
            None => tracing::debug!(member = %member_id, "member gone after revoke"),
            Some(remaining) => tracing::debug!(member = %member_id, %remaining, "member after revoke"),
        }
        Ok(())
    }
}
