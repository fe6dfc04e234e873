//! Managed BIG-IP inventory, used to build [`MemberAssignmentRequest::Managed`]
//! references.
//!
//! [`MemberAssignmentRequest::Managed`]: crate::members::MemberAssignmentRequest::Managed

use serde::{Deserialize, Serialize};

use crate::error::BigIqError;
use crate::path;
use crate::session::Session;

/// A BIG-IP in the `cm-bigip-allBigIpDevices` group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedDevice {
    pub address: String,
    pub device_uri: String,
    pub hostname: String,
    pub https_port: u16,
    pub is_clustered: bool,
    pub machine_id: String,
    pub management_address: String,
    pub mcp_device_name: String,
    pub product: String,
    pub self_link: String,
    pub state: String,
    pub uuid: String,
    pub version: String,
}

impl Default for ManagedDevice {
    fn default() -> Self {
        Self {
            address: String::new(),
            device_uri: String::new(),
            hostname: String::new(),
            https_port: 443,
            is_clustered: false,
            machine_id: String::new(),
            management_address: String::new(),
            mcp_device_name: String::new(),
            product: String::new(),
            self_link: String::new(),
            state: String::new(),
            uuid: String::new(),
            version: String::new(),
        }
    }
}

impl ManagedDevice {
    /// Whether `name` is this device's address, hostname or UUID.
    pub fn matches(&self, name: &str) -> bool {
        self.address == name || self.hostname == name || self.uuid == name
    }
}

#[derive(Debug, Deserialize)]
struct DeviceList {
    #[serde(default)]
    items: Vec<ManagedDevice>,
}

/// Client for the managed device resolver group.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    session: Session,
}

impl DeviceClient {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    pub async fn list(&self) -> Result<Vec<ManagedDevice>, BigIqError> {
        let list: DeviceList = self.session.get_json(&path::managed_devices()).await?;
        Ok(list.items)
    }

    /// Self link of the device whose address, hostname or UUID is `name`.
    pub async fn find_self_link(&self, name: &str) -> Result<Option<String>, BigIqError> {
        let found = self
            .list()
            .await?
            .into_iter()
            .find(|d| d.matches(name))
            .map(|d| d.self_link);
        match &found {
            Some(link) => tracing::debug!(device = name, self_link = %link, "resolved managed device"),
            None => tracing::debug!(device = name, "no managed device matches"),
        }
        Ok(found)
    }
}
