//! Registration key pools (`regkey/licenses`).
//!
//! Single-shot CRUD. Name lookups scan the full pool list, which holds tens
//! of pools, not thousands.

use serde::{Deserialize, Serialize};

use crate::error::BigIqError;
use crate::path;
use crate::session::Session;
use crate::types::PoolId;

/// A registration key pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPool {
    pub id: PoolId,
    pub name: String,
    #[serde(default)]
    pub sort_name: String,
    #[serde(default)]
    pub self_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Fields sent when creating or patching a pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoolList {
    #[serde(default)]
    items: Vec<RegistrationPool>,
}

/// Client for `mgmt/cm/device/licensing/pool/regkey/licenses`.
#[derive(Debug, Clone)]
pub struct PoolClient {
    session: Session,
}

impl PoolClient {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Create a pool and return it as stored by the control plane.
    pub async fn create(&self, name: &str, description: &str) -> Result<RegistrationPool, BigIqError> {
        let pool: RegistrationPool = self
            .session
            .post_json(
                &path::pools(),
                &PoolUpdate {
                    name: Some(name.to_string()),
                    description: Some(description.to_string()),
                },
            )
            .await?;
        tracing::info!(pool = %pool.id, name, "registration pool created");
        Ok(pool)
    }

    /// Patch a pool by id.
    pub async fn patch(&self, pool_id: &PoolId, update: &PoolUpdate) -> Result<RegistrationPool, BigIqError> {
        let pool = self
            .session
            .patch_json(&path::pool(pool_id.as_str()), update)
            .await?;
        tracing::info!(pool = %pool_id, "registration pool patched");
        Ok(pool)
    }

    /// Look `name` up and patch its description.
    pub async fn modify(&self, name: &str, description: &str) -> Result<RegistrationPool, BigIqError> {
        let pool = self.require(name).await?;
        self.patch(
            &pool.id,
            &PoolUpdate {
                name: Some(name.to_string()),
                description: Some(description.to_string()),
            },
        )
        .await
    }

    /// Look `name` up and delete it.
    pub async fn delete(&self, name: &str) -> Result<(), BigIqError> {
        let pool = self.require(name).await?;
        self.session.delete(&path::pool(pool.id.as_str())).await?;
        tracing::info!(pool = %pool.id, name, "registration pool deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<RegistrationPool>, BigIqError> {
        let list: PoolList = self.session.get_json(&path::pools()).await?;
        Ok(list.items)
    }

    /// First pool whose name equals `name`, if any.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<RegistrationPool>, BigIqError> {
        Ok(self.list().await?.into_iter().find(|p| p.name == name))
    }

    async fn require(&self, name: &str) -> Result<RegistrationPool, BigIqError> {
        self.find_by_name(name)
            .await?
            .ok_or_else(|| BigIqError::NotFound {
                entity: format!("registration pool {name}"),
            })
    }
}
