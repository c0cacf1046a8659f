// [libs/api/messaging/src/options.rs]

use std::time::Duration;

/// Attempt/timeout budget for `MessagingApi::send_message`.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub max_attempts: u32,
    pub total_timeout: Option<Duration>,
    pub per_attempt_timeout: Duration,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { max_attempts: 1, total_timeout: None, per_attempt_timeout: Duration::from_secs(10) }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SendOutcome {
    pub acked: Vec<String>,
    pub not_acked: Vec<String>,
}
