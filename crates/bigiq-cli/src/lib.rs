//! # bigiq-cli -- Command-line front end for the BIG-IQ licensing client
//!
//! Provides the `bigiq` binary. Connection settings come from the
//! `BIGIQ_*` environment variables (see [`bigiq_client::BigIqConfig::from_env`]).
//!
//! ## Subcommands
//!
//! - `bigiq pool` -- Registration pool CRUD.
//! - `bigiq activation` -- Registration key activation and EULA acceptance.
//! - `bigiq task` -- Per-device license tasks.
//! - `bigiq member` -- Assigning and revoking pool members.
//! - `bigiq upload` -- Chunked file upload.
//! - `bigiq device` -- Managed device inventory.
//!
//! ```bash
//! bigiq pool list
//! bigiq activation activate --reg-key ABCDE-FGHIJ --name lab-key
//! bigiq member assign --pool utility --reg-key ABCDE-FGHIJ --device bigip1.example.net
//! ```
//!
//! Handlers print results as pretty JSON on stdout and return the process
//! exit code. Logs go to stderr.

pub mod activation;
pub mod device;
pub mod member;
pub mod pool;
pub mod task;
pub mod upload;

use serde::Serialize;

/// Print `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
