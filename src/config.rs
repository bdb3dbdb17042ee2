use std::time::Duration;

/// Tunable timings and ceilings for the navigation loop. The defaults are
/// the values the system was originally tuned with; callers that need a
/// faster or more patient loop override individual fields.
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// Verify -> plan -> execute cycles before a target is declared
    /// unreachable.
    pub max_attempts: u32,
    /// Attempts per atomic action inside the executor.
    pub action_retries: u32,
    /// How long the executor waits for an action's selector to become
    /// visible, per attempt.
    pub selector_timeout: Duration,
    /// Sleep between executor retries.
    pub retry_pause: Duration,
    /// Pause after scrolling an element into view, and after every
    /// dispatched action, before the readiness wait runs.
    pub action_settle: Duration,
    /// Ceiling for each readiness-wait stage (network idle, DOM content,
    /// document-ready poll).
    pub load_timeout: Duration,
    /// Interval of the document-ready predicate poll.
    pub ready_poll_interval: Duration,
    /// Fixed delay after the readiness stages, absorbing deferred
    /// script-driven mutations.
    pub settle_delay: Duration,
    /// Default pause for a `wait` action whose value is not a valid
    /// non-negative integer.
    pub default_wait: Duration,
    /// Body-text cap applied when a snapshot is rendered into a prompt.
    pub text_limit: usize,
    /// Minimum relevance score for a job listing to be kept.
    pub relevance_threshold: f64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            action_retries: 3,
            selector_timeout: Duration::from_secs(5),
            retry_pause: Duration::from_secs(1),
            action_settle: Duration::from_millis(500),
            load_timeout: Duration::from_secs(30),
            ready_poll_interval: Duration::from_millis(250),
            settle_delay: Duration::from_secs(2),
            default_wait: Duration::from_secs(1),
            text_limit: 1000,
            relevance_threshold: 0.7,
        }
    }
}

impl NavigatorConfig {
    /// A configuration with all waits collapsed to near-zero. Keeps the
    /// loop semantics intact while letting tests run in milliseconds.
    pub fn fast() -> Self {
        Self {
            selector_timeout: Duration::from_millis(1),
            retry_pause: Duration::from_millis(1),
            action_settle: Duration::from_millis(1),
            load_timeout: Duration::from_millis(5),
            ready_poll_interval: Duration::from_millis(1),
            settle_delay: Duration::from_millis(1),
            default_wait: Duration::from_millis(1),
            ..Self::default()
        }
    }
}
