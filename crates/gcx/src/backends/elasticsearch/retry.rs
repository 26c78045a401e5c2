//! 🔄 Retry — because 503 is not a "no", it's a "not right now".
//!
//! 🎬 INT. LOAD BALANCER — PEAK HOURS
//!
//! The cluster is busy. It says 429. We wait. It says 503. We wait a little
//! longer. It says 200. We pretend we were never worried.
//!
//! This module holds the retry knobs and the exponential backoff that decides
//! how long to wait between attempts. The backoff is the classic recipe:
//! start at 500 ms, grow ×1.5 per attempt, cap each wait at 60 s, shake in
//! ±50% jitter so five workers don't all come knocking on the same millisecond,
//! and give up entirely once 15 minutes have gone by. 🦆

use std::time::{Duration, Instant};

use rand::Rng;
use serde::Deserialize;

/// 🔧 Transport-level retry policy. Applies to every request the client sends.
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// 📡 HTTP statuses worth another try. Everything else is final.
    #[serde(default = "default_retry_on_status")]
    pub retry_on_status: Vec<u16>,
    /// 🔢 Total attempts per request, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// ⏱️ Retry requests that timed out. Off by default: a bulk request that timed out
    /// may still have been applied, and replaying it doubles the work for the cluster.
    #[serde(default)]
    pub retry_on_timeout: bool,
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// 🎲 0.5 means each wait lands somewhere in [0.5×, 1.5×] of the current interval.
    #[serde(default = "default_randomization_factor")]
    pub randomization_factor: f64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// ⌛ Stop retrying once this much time has passed since the backoff was reset.
    /// 0 means retry for as long as `max_attempts` allows.
    #[serde(default = "default_max_elapsed_ms")]
    pub max_elapsed_ms: u64,
}

// -- 📡 bad gateway, unavailable, gateway timeout, too many requests. the four horsemen of "later".
fn default_retry_on_status() -> Vec<u16> {
    vec![502, 503, 504, 429]
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_interval_ms() -> u64 {
    500
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_randomization_factor() -> f64 {
    0.5
}

fn default_max_interval_ms() -> u64 {
    60_000
}

// -- ⌛ 15 minutes. if the cluster is still sulking after that, a human should get involved.
fn default_max_elapsed_ms() -> u64 {
    15 * 60 * 1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_on_status: default_retry_on_status(),
            max_attempts: default_max_attempts(),
            retry_on_timeout: false,
            initial_interval_ms: default_initial_interval_ms(),
            multiplier: default_multiplier(),
            randomization_factor: default_randomization_factor(),
            max_interval_ms: default_max_interval_ms(),
            max_elapsed_ms: default_max_elapsed_ms(),
        }
    }
}

impl RetryConfig {
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }
}

/// 📈 Exponential backoff with jitter.
///
/// One instance per request attempt sequence. `reset()` puts the interval back to
/// the initial value and restarts the elapsed clock; the client calls it when the
/// attempt counter is 1.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_interval: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Duration,
    max_elapsed: Option<Duration>,
    current_interval: Duration,
    started_at: Instant,
}

impl ExponentialBackoff {
    pub fn new(config: &RetryConfig) -> Self {
        let initial_interval = Duration::from_millis(config.initial_interval_ms);
        Self {
            initial_interval,
            multiplier: config.multiplier.max(1.0),
            randomization_factor: config.randomization_factor.clamp(0.0, 1.0),
            max_interval: Duration::from_millis(config.max_interval_ms),
            max_elapsed: (config.max_elapsed_ms > 0)
                .then(|| Duration::from_millis(config.max_elapsed_ms)),
            current_interval: initial_interval,
            started_at: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.current_interval = self.initial_interval;
        self.started_at = Instant::now();
    }

    /// ⏭️ How long to sleep before the next attempt, or `None` when the elapsed budget
    /// is spent and it's time to stop asking.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        let next = self.randomized(self.current_interval);
        self.grow();

        if let Some(max_elapsed) = self.max_elapsed {
            if self.started_at.elapsed() + next > max_elapsed {
                return None;
            }
        }
        Some(next)
    }

    fn randomized(&self, interval: Duration) -> Duration {
        if self.randomization_factor == 0.0 || interval.is_zero() {
            return interval;
        }
        let center = interval.as_secs_f64();
        let delta = self.randomization_factor * center;
        let jittered = rand::thread_rng().gen_range((center - delta)..=(center + delta));
        Duration::from_secs_f64(jittered.max(0.0))
    }

    fn grow(&mut self) {
        let grown = self.current_interval.as_secs_f64() * self.multiplier;
        self.current_interval = if grown >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(grown)
        };
    }
}
