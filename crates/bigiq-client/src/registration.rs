//! License installed directly on the appliance (`shared/licensing/registration`
//! under `mgmt/tm`).

use serde::Serialize;

use crate::error::BigIqError;
use crate::path;
use crate::session::{Request, Session};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LicenseText<'a> {
    license_text: &'a str,
}

/// Client for the appliance's own license registration.
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    session: Session,
}

impl RegistrationClient {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Install a license from its full text.
    pub async fn install(&self, license_text: &str) -> Result<(), BigIqError> {
        let request = Request::new(reqwest::Method::PUT, path::license_registration())
            .json(&LicenseText { license_text })?;
        self.session.send(&request).await?;
        tracing::info!(host = %self.session.host(), "appliance license installed");
        Ok(())
    }

    /// Remove the appliance's license.
    pub async fn revoke(&self) -> Result<(), BigIqError> {
        self.session.delete(&path::license_registration()).await?;
        tracing::info!(host = %self.session.host(), "appliance license revoked");
        Ok(())
    }
}
