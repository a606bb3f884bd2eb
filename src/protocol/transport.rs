//! Process-wide transport lifecycle
//!
//! Higher-level clients look the transport up here instead of carrying an
//! `IpcClient` around. Using a channel before `init` fails with
//! `TransportUnavailable`.

use super::client::IpcClient;
use crate::error::{Result, SoundboyError};
use once_cell::sync::Lazy;
use std::sync::{PoisonError, RwLock};

static TRANSPORT: Lazy<RwLock<Option<IpcClient>>> = Lazy::new(|| RwLock::new(None));

/// Install `client` as the process-wide transport
pub fn init(client: IpcClient) -> Result<()> {
    let mut slot = TRANSPORT.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(SoundboyError::AlreadyInitialized);
    }
    *slot = Some(client);
    log::info!("Transport initialized");
    Ok(())
}

/// Remove the process-wide transport
///
/// Returns false if none was installed. Clones handed out by `current`
/// keep working until the connection itself closes.
pub fn teardown() -> bool {
    let previous = TRANSPORT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if previous.is_some() {
        log::info!("Transport torn down");
    }
    previous.is_some()
}

/// The installed transport
pub fn current() -> Result<IpcClient> {
    TRANSPORT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(SoundboyError::TransportUnavailable)
}

pub fn is_initialized() -> bool {
    TRANSPORT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}
