//! Tracking messages and the fluent builder that dispatches them.
//!
//! ```no_run
//! # async fn demo(houston: houston::Houston) -> houston::Result<()> {
//! houston
//!     .send("I believe we've had a problem here.")
//!     .with("problem", "explosion and rupture of oxygen tank 2")
//!     .over()
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::dispatch::{DispatchOutcome, Houston};
use crate::types::{Error, EventName, MessageId, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An immutable tracking event: a name plus string parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    name: EventName,
    parameters: BTreeMap<String, String>,
    timestamp_ms: i64,
}

impl Message {
    /// Start a detached builder. Calling `over()` on it dispatches nowhere;
    /// use [`Houston::send`] or [`crate::global::send`] to target tools.
    pub fn builder(name: impl Into<String>) -> MessageBuilder {
        MessageBuilder::new(name.into(), None)
    }

    /// Unique id assigned when the message was built.
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.parameters
    }

    /// Look up a single parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }

    /// Creation time, milliseconds since the Unix epoch (UTC).
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// Accumulates parameters for a message, finalized by [`MessageBuilder::over`].
#[derive(Debug)]
#[must_use = "a message is only dispatched when `over()` is awaited"]
pub struct MessageBuilder {
    target: Option<Houston>,
    name: String,
    parameters: BTreeMap<String, String>,
    timestamp_ms: i64,
}

impl MessageBuilder {
    pub(crate) fn new(name: String, target: Option<Houston>) -> Self {
        Self {
            target,
            name,
            parameters: BTreeMap::new(),
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Set a parameter. A later call with the same key overwrites the value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Set a parameter when `value` is `Some`, remove it when `None`.
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self.without(key),
        }
    }

    /// Remove a parameter set earlier.
    pub fn without(mut self, key: impl Into<String>) -> Self {
        self.parameters.remove(&key.into());
        self
    }

    /// Finalize into a [`Message`] without dispatching it.
    pub fn build(self) -> Result<Message> {
        self.into_parts().1
    }

    /// Finalize the message and fan it out to the registered tools.
    ///
    /// Tool failures are never returned here; they go to the dispatcher's
    /// error handler. The only error is an empty event name.
    pub async fn over(self) -> Result<DispatchOutcome> {
        let (target, message) = self.into_parts();
        let message = message?;

        match target {
            Some(houston) => Ok(houston.dispatch(message).await),
            None => {
                tracing::debug!(
                    "Dropping message {} ({}): Houston not launched",
                    message.name(),
                    message.id()
                );
                Ok(DispatchOutcome::NotLaunched)
            }
        }
    }

    fn into_parts(self) -> (Option<Houston>, Result<Message>) {
        let message = EventName::from_string(self.name)
            .map_err(Error::validation)
            .map(|name| Message {
                id: MessageId::new(),
                name,
                parameters: self.parameters,
                timestamp_ms: self.timestamp_ms,
            });
        (self.target, message)
    }
}
