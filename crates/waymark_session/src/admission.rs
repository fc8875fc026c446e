use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Identifies one admitted route fetch. Tokens increase monotonically; only
/// the most recently minted one is ever current.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdmissionConfig {
    pub daily_quota: u32,
    pub safety_fraction: f64,
    pub min_interval: SignedDuration,
    /// Disables the quota check; spacing is still enforced.
    pub bypass_guard: bool,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            daily_quota: 2000,
            safety_fraction: 0.75,
            min_interval: SignedDuration::from_millis(15_000),
            bypass_guard: false,
        }
    }
}

impl AdmissionConfig {
    pub fn safety_limit(&self) -> u64 {
        (self.daily_quota as f64 * self.safety_fraction).floor().max(0.0) as u64
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaState {
    /// Never reset during the life of the process.
    pub request_count: u64,
    pub last_request: Option<Timestamp>,
    pub in_flight: Option<RequestToken>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted(RequestToken),
    RejectedQuotaExceeded,
    RejectedTooSoon,
}

impl Decision {
    pub fn token(&self) -> Option<RequestToken> {
        match self {
            Decision::Admitted(token) => Some(*token),
            _ => None,
        }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admitted(_))
    }
}

pub struct AdmissionController {
    config: AdmissionConfig,
    state: QuotaState,
    next_token: u64,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            state: QuotaState::default(),
            next_token: 1,
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    pub fn state(&self) -> &QuotaState {
        &self.state
    }

    /// Requests still available before the safety limit, `None` when the
    /// guard is bypassed.
    pub fn remaining(&self) -> Option<u64> {
        if self.config.bypass_guard {
            None
        } else {
            Some(
                self.config
                    .safety_limit()
                    .saturating_sub(self.state.request_count),
            )
        }
    }

    pub fn try_admit(&mut self, now: Timestamp) -> Decision {
        if !self.config.bypass_guard && self.state.request_count >= self.config.safety_limit() {
            debug!(
                "Admission: quota guard reached ({}/{})",
                self.state.request_count,
                self.config.safety_limit()
            );
            return Decision::RejectedQuotaExceeded;
        }

        if let Some(last) = self.state.last_request {
            let elapsed = now.duration_since(last);
            if elapsed < self.config.min_interval {
                debug!(
                    "Admission: too soon, {:?} since last request (min {:?})",
                    elapsed, self.config.min_interval
                );
                return Decision::RejectedTooSoon;
            }
        }

        let token = RequestToken(self.next_token);
        self.next_token += 1;

        self.state.request_count += 1;
        self.state.last_request = Some(now);

        if let Some(previous) = self.state.in_flight.replace(token) {
            debug!("Admission: {} supersedes {}", token, previous);
        }

        Decision::Admitted(token)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.state.in_flight == Some(token)
    }

    /// Marks `token` as finished. Returns false if it was already superseded.
    pub fn complete(&mut self, token: RequestToken) -> bool {
        if self.is_current(token) {
            self.state.in_flight = None;
            true
        } else {
            false
        }
    }

    /// Invalidates the in-flight token without admitting anything new.
    pub fn supersede(&mut self) -> Option<RequestToken> {
        self.state.in_flight.take()
    }
}
