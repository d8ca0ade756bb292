// Delay between retry attempts

use rand::Rng;
use std::time::Duration;

/// Lower bound of the jitter factor applied to exponential delays
const JITTER_MIN: f64 = 0.9;

/// Upper bound of the jitter factor applied to exponential delays
const JITTER_MAX: f64 = 1.1;

/// Back-off applied between two attempts of the same phase
///
/// The delay only ever happens between attempts: never before the first one
/// and never after the last one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry immediately
    #[default]
    None,
    /// Wait the same duration before every retry
    Fixed(Duration),
    /// `initial * 2^(retry - 1)`, capped at `max`
    ///
    /// With `jitter`, the delay is scaled by a random factor in 0.9..=1.1
    /// (still capped at `max`).
    Exponential {
        initial: Duration,
        max: Duration,
        jitter: bool,
    },
}

impl Backoff {
    /// Exponential back-off without jitter
    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Backoff::Exponential {
            initial,
            max,
            jitter: false,
        }
    }

    /// Delay to wait before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential {
                initial,
                max,
                jitter,
            } => {
                let exponent = retry.saturating_sub(1);
                let base = 2u32
                    .checked_pow(exponent)
                    .and_then(|factor| initial.checked_mul(factor))
                    .unwrap_or(max)
                    .min(max);

                if jitter {
                    let factor = rand::thread_rng().gen_range(JITTER_MIN..=JITTER_MAX);
                    // Scaling a near-maximal base can overflow Duration
                    Duration::try_from_secs_f64(base.as_secs_f64() * factor)
                        .unwrap_or(max)
                        .min(max)
                } else {
                    base
                }
            }
        }
    }
}
