//! Process-wide Houston instance.
//!
//! For code that cannot thread a [`Houston`] handle through. The slot starts
//! empty; [`crate::Builder::launch_global`] fills it and a later launch
//! replaces it. Until then, messages are dropped and `set_enabled` does
//! nothing.

use crate::dispatch::Houston;
use crate::message::MessageBuilder;
use std::sync::{PoisonError, RwLock};

static ACTIVE: RwLock<Option<Houston>> = RwLock::new(None);

/// Install `houston` as the active instance, returning the previous one.
pub fn install(houston: Houston) -> Option<Houston> {
    ACTIVE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(houston)
}

/// Remove the active instance.
pub fn reset() -> Option<Houston> {
    ACTIVE.write().unwrap_or_else(PoisonError::into_inner).take()
}

/// Handle to the active instance, if one was launched.
pub fn current() -> Option<Houston> {
    ACTIVE.read().unwrap_or_else(PoisonError::into_inner).clone()
}

pub fn is_launched() -> bool {
    ACTIVE.read().unwrap_or_else(PoisonError::into_inner).is_some()
}

/// Start a message for the active instance.
///
/// The instance is resolved now, not at `over()`.
pub fn send(name: impl Into<String>) -> MessageBuilder {
    MessageBuilder::new(name.into(), current())
}

/// Enable or disable the active instance; a no-op before launch.
pub async fn set_enabled(enabled: bool) {
    match current() {
        Some(houston) => houston.set_enabled(enabled).await,
        None => tracing::debug!("set_enabled({}) ignored: Houston not launched", enabled),
    }
}
