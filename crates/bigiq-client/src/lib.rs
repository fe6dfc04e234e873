//! # bigiq-client -- Typed Rust client for the BIG-IQ licensing control plane
//!
//! Covers the license lifecycle of a BIG-IQ centralized manager:
//! - **Activation** of registration keys, including EULA acceptance
//! - **Registration pools** (create, patch, look up, delete)
//! - **Pool membership**: assigning a key to a BIG-IP and revoking it
//! - **License tasks** for utility/purchased pools (`member-management`)
//! - **Chunked upload** through the file-transfer resource
//!
//! Plus thin plumbing the lifecycle needs: the managed device inventory, the
//! appliance's own license registration, and declaration deploys.
//!
//! ## Architecture
//!
//! Every call goes through one [`session::Session`], which owns the HTTP
//! client, the host and the credentials. Sub-clients are cheap clones that
//! hold the session plus, for lifecycle waits, a [`poll::PollPolicy`]. Waits
//! are bounded loops with backoff that take a
//! [`tokio_util::sync::CancellationToken`].
//!
//! ## Path Convention
//!
//! Paths starting with `mgmt/` are used as-is under the host; anything else is
//! placed under `mgmt/tm`. Segments are joined by [`path::encode`], which
//! turns a `/` inside a segment into `~`.

pub mod activation;
pub mod config;
pub mod declaration;
pub mod devices;
pub mod error;
pub mod members;
pub mod path;
pub mod poll;
pub mod pools;
pub mod registration;
pub mod session;
pub mod tasks;
pub mod types;
pub mod upload;

pub use config::BigIqConfig;
pub use error::BigIqError;
pub use session::Session;
pub use types::{MemberId, PoolId, RegKey, TaskId};

/// Top-level BIG-IQ client. Holds sub-clients for each resource family.
#[derive(Debug, Clone)]
pub struct BigIqClient {
    session: session::Session,
    activations: activation::ActivationClient,
    tasks: tasks::LicenseTaskClient,
    pools: pools::PoolClient,
    members: members::MemberClient,
    uploads: upload::UploadClient,
    devices: devices::DeviceClient,
    registration: registration::RegistrationClient,
    declarations: declaration::DeclarationClient,
}

impl BigIqClient {
    /// Create a client from configuration. No request is sent.
    pub fn new(config: BigIqConfig) -> Result<Self, BigIqError> {
        let session = session::Session::new(&config)?;
        Ok(Self::from_session(session, &config))
    }

    /// Create a client and, when a login provider is configured and no token
    /// was supplied, exchange the credentials for a token first.
    pub async fn connect(config: BigIqConfig) -> Result<Self, BigIqError> {
        let mut session = session::Session::new(&config)?;
        if let Some(provider) = config.login_provider.as_deref() {
            if !session.has_token() {
                session = session.login(provider).await?;
            }
        }
        Ok(Self::from_session(session, &config))
    }

    fn from_session(session: session::Session, config: &BigIqConfig) -> Self {
        Self {
            activations: activation::ActivationClient::new(session.clone(), config.poll.clone()),
            tasks: tasks::LicenseTaskClient::new(session.clone(), config.poll.clone()),
            pools: pools::PoolClient::new(session.clone()),
            members: members::MemberClient::new(session.clone(), config.poll.clone()),
            uploads: upload::UploadClient::new(session.clone()),
            devices: devices::DeviceClient::new(session.clone()),
            registration: registration::RegistrationClient::new(session.clone()),
            declarations: declaration::DeclarationClient::new(session.clone()),
            session,
        }
    }

    /// The underlying session, for calls no sub-client covers.
    pub fn session(&self) -> &session::Session {
        &self.session
    }

    /// Access the registration key activation client.
    pub fn activations(&self) -> &activation::ActivationClient {
        &self.activations
    }

    /// Access the per-device license task client.
    pub fn tasks(&self) -> &tasks::LicenseTaskClient {
        &self.tasks
    }

    /// Access the registration pool client.
    pub fn pools(&self) -> &pools::PoolClient {
        &self.pools
    }

    /// Access the pool membership client.
    pub fn members(&self) -> &members::MemberClient {
        &self.members
    }

    /// Access the chunked upload client.
    pub fn uploads(&self) -> &upload::UploadClient {
        &self.uploads
    }

    /// Access the managed device inventory client.
    pub fn devices(&self) -> &devices::DeviceClient {
        &self.devices
    }

    /// Access the appliance license registration client.
    pub fn registration(&self) -> &registration::RegistrationClient {
        &self.registration
    }

    /// Access the declaration deploy client.
    pub fn declarations(&self) -> &declaration::DeclarationClient {
        &self.declarations
    }
}
