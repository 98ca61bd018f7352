//! Service configuration.

use std::time::Duration;

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8080;

/// Default enlistment timeout in seconds.
const DEFAULT_ENLIST_TIMEOUT_SECS: u64 = 30;

/// Path segment under which participant resources are exposed.
pub const DEFAULT_PARTICIPANT_SEGMENT: &str = "participant";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    /// Public base URL of this service; participant URLs are built from it.
    pub base_url: String,
    /// Segment between the base URL and the participant id.
    pub participant_segment: String,
    /// Upper bound on the enlistment round-trip.
    pub enlist_timeout_secs: u64,
}

impl ServiceConfig {
    pub fn enlist_timeout(&self) -> Duration {
        Duration::from_secs(self.enlist_timeout_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_url: format!("http://localhost:{}/", DEFAULT_PORT),
            participant_segment: DEFAULT_PARTICIPANT_SEGMENT.to_string(),
            enlist_timeout_secs: DEFAULT_ENLIST_TIMEOUT_SECS,
        }
    }
}
