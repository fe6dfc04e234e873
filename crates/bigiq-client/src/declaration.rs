//! Declaration deploy (`mgmt/shared/appsvcs/declare`).
//!
//! The declaration is passed through untouched as a `serde_json::Value`. Only
//! the per-tenant results of the deploy are interpreted: every tenant
//! succeeded, none did, or some did.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{decode, BigIqError};
use crate::path;
use crate::session::{Request, Session};

/// Deploy result for one tenant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantResult {
    pub code: i64,
    pub message: String,
    pub host: String,
    pub tenant: String,
    pub run_time: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeployResponse {
    code: i64,
    results: Vec<TenantResult>,
}

/// A deploy in which every tenant succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployOutcome {
    pub tenants: Vec<String>,
    pub results: Vec<TenantResult>,
}

/// Names of the tenants in a declaration.
///
/// Accepts either the wrapper form (`{"class": "AS3", "declaration": {...}}`)
/// or the bare ADC object; tenants are the members whose `class` is `Tenant`.
pub fn tenants(declaration: &Value) -> Vec<String> {
    let adc = match declaration.get("declaration") {
        Some(inner) if inner.is_object() => inner,
        _ => declaration,
    };
    match adc {
        Value::Object(members) => members
            .iter()
            .filter_map(|(name, member)| match member {
                Value::Object(body) => match body.get("class") {
                    Some(Value::String(class)) if class == "Tenant" => Some(name.clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Client for declaration deploys.
#[derive(Debug, Clone)]
pub struct DeclarationClient {
    session: Session,
}

impl DeclarationClient {
    pub(crate) fn new(session: Session) -> Self {
        Self { session }
    }

    /// Post `declaration` and classify the per-tenant results.
    ///
    /// Returns `TerminalFailure` when no tenant succeeded and
    /// `PartialSuccess` when some did.
    pub async fn deploy(&self, declaration: &Value) -> Result<DeployOutcome, BigIqError> {
        let request = Request::new(reqwest::Method::POST, path::declarations()).json(declaration)?;
        let bytes = self.session.call(&request).await?;
        let response: DeployResponse = decode(&request.endpoint(), &bytes)?;
        classify(tenants(declaration), response)
    }
}

fn classify(tenants: Vec<String>, response: DeployResponse) -> Result<DeployOutcome, BigIqError> {
    if response.code == 200 || response.code == 0 {
        tracing::debug!(?tenants, "declaration deployed");
        return Ok(DeployOutcome {
            tenants,
            results: response.results,
        });
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for result in &response.results {
        if result.code == 200 {
            succeeded.push(result.tenant.clone());
        } else {
            if result.code >= 400 {
                tracing::error!(
                    tenant = %result.tenant,
                    code = result.code,
                    message = %result.message,
                    "tenant deploy failed"
                );
            }
            failed.push(result.tenant.clone());
        }
    }

    if failed.is_empty() && !succeeded.is_empty() {
        tracing::debug!(?succeeded, "declaration deployed");
        return Ok(DeployOutcome {
            tenants: succeeded,
            results: response.results,
        });
    }
    if succeeded.is_empty() {
        let message = response
            .results
            .iter()
            .map(|r| format!("{}: {}", r.tenant, r.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(BigIqError::TerminalFailure {
            entity: "declaration".into(),
            status: response.code.to_string(),
            message: if message.is_empty() {
                "tenant creation failed".into()
            } else {
                message
            },
        });
    }
    Err(BigIqError::PartialSuccess { succeeded, failed })
}
