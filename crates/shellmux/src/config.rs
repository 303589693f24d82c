//! Hub configuration

use crate::{Result, ShellmuxError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default window in which a data connection must present its header
pub const DEFAULT_CLASSIFY_WINDOW: Duration = Duration::from_millis(200);

/// Default time `start` waits for its data connection
pub const DEFAULT_STREAM_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Timing knobs of a [`Hub`](crate::Hub) and the sessions it creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// How long a new connection gets to send a session header before it is
    /// taken to be the control connection of a new session
    #[serde(rename = "classify_window_ms", with = "millis")]
    pub classify_window: Duration,
    /// How long `start` waits for the shell to dial back
    #[serde(rename = "stream_open_timeout_ms", with = "millis")]
    pub stream_open_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            classify_window: DEFAULT_CLASSIFY_WINDOW,
            stream_open_timeout: DEFAULT_STREAM_OPEN_TIMEOUT,
        }
    }
}

impl HubConfig {
    /// Reject settings the hub cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.classify_window.is_zero() {
            return Err(ShellmuxError::Configuration(
                "classify window must be greater than zero".to_string(),
            ));
        }
        if self.stream_open_timeout.is_zero() {
            return Err(ShellmuxError::Configuration(
                "stream open timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
