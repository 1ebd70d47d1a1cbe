//! Reconnection policy over an ordered list of candidate endpoints.
//!
//! Pure state machine: the transport owner asks where to dial and for how
//! long to wait, and reports opens and failures back. Nothing here performs
//! I/O, so the backoff/fallback behaviour is directly testable.

pub const INITIAL_BACKOFF_MS: f64 = 2000.0;
pub const BACKOFF_GROWTH: f64 = 1.7;
pub const MAX_BACKOFF_MS: f64 = 15_000.0;

/// Expands one configured endpoint into dial candidates: a bare origin gets
/// the conventional `/ws` path tried first, an explicit path is used as-is.
pub fn expand_endpoint(url: &str) -> Vec<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    let after_scheme = trimmed.split_once("://").map(|(_, r)| r).unwrap_or(trimmed);
    if after_scheme.contains('/') {
        vec![trimmed.to_string()]
    } else {
        vec![format!("{trimmed}/ws"), trimmed.to_string()]
    }
}

/// Builds the dial list from a primary endpoint and fallbacks, expanded and
/// de-duplicated in order.
pub fn candidate_endpoints<'a>(
    primary: Option<&'a str>,
    fallbacks: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for url in primary.into_iter().chain(fallbacks) {
        for candidate in expand_endpoint(url) {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectSchedule {
    endpoints: Vec<String>,
    index: usize,
    locked: Option<usize>,
    backoff_ms: f64,
    open_timeout_ms: f64,
}

impl ReconnectSchedule {
    pub fn new(endpoints: Vec<String>, open_timeout_ms: f64) -> Self {
        Self {
            endpoints,
            index: 0,
            locked: None,
            backoff_ms: INITIAL_BACKOFF_MS,
            open_timeout_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// How long a dial may sit unopened before it counts as failed.
    pub fn open_timeout_ms(&self) -> f64 {
        self.open_timeout_ms
    }

    /// The endpoint to dial next: the one that last opened successfully if
    /// any, otherwise the current position in the cycle.
    pub fn current(&self) -> Option<&str> {
        let idx = self.locked.unwrap_or(self.index);
        self.endpoints.get(idx).map(|s| s.as_str())
    }

    /// A connection opened: pin this endpoint for future reconnects and
    /// reset the backoff.
    pub fn on_open(&mut self) {
        self.locked = Some(self.locked.unwrap_or(self.index));
        self.backoff_ms = INITIAL_BACKOFF_MS;
    }

    /// A dial failed (or an open connection dropped): unpin, advance the
    /// cycle, and return how long to wait before the next attempt.
    pub fn on_failure(&mut self) -> f64 {
        if let Some(locked) = self.locked.take() {
            self.index = locked;
        }
        if !self.endpoints.is_empty() {
            self.index = (self.index + 1) % self.endpoints.len();
        }
        let delay = self.backoff_ms;
        self.backoff_ms = (self.backoff_ms * BACKOFF_GROWTH).min(MAX_BACKOFF_MS);
        delay
    }
}
