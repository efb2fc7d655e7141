//! Countdown timer duration solver.
//!
//! The PCF8563 timer counts an 8-bit value down at one of four source
//! frequencies, so a duration is realized as `count / frequency`. Given a
//! requested duration in seconds, [`Timer::for_duration`] picks the source
//! and count that come closest.
//!
//! | source  | resolution | range            |
//! |---------|------------|------------------|
//! | 4096 Hz | 244 us     | 244 us - 62.3 ms |
//! | 64 Hz   | 15.6 ms    | 15.6 ms - 3.98 s |
//! | 1 Hz    | 1 s        | 1 s - 255 s      |
//! | 1/60 Hz | 60 s       | 60 s - 4 h 15 min |

use crate::{Timer, TimerSource};

/// Shortest duration the timer can realize, one 4096 Hz tick.
pub const MIN_DURATION: f64 = 1.0 / 4096.0;

/// Longest duration the timer can realize, 255 minutes.
pub const MAX_DURATION: f64 = 255.0 * 60.0;

// Minute resolution starts at 240 s, below the 255 s the 1 Hz source reaches.
const MINUTES_FROM: f64 = 240.0;

impl TimerSource {
    /// Duration of `count` ticks of this source, in seconds.
    #[must_use]
    pub fn duration(self, count: u8) -> f64 {
        let count = f64::from(count);
        match self {
            TimerSource::Hz4096 => count / 4096.0,
            TimerSource::Hz64 => count / 64.0,
            TimerSource::Hz1 => count,
            TimerSource::OneSixtiethHz => count * 60.0,
        }
    }
}

// Round half up; `seconds` is never negative here.
fn round_count(ticks: f64) -> u8 {
    (ticks + 0.5) as u8
}

impl Timer {
    /// Solves an enabled timer setting for `seconds`.
    ///
    /// Returns `None` when `seconds` is below [`MIN_DURATION`] or above
    /// [`MAX_DURATION`].
    #[must_use]
    pub fn for_duration(seconds: f64) -> Option<Self> {
        if !(MIN_DURATION..=MAX_DURATION).contains(&seconds) {
            return None;
        }

        let (source, count) = if seconds >= MINUTES_FROM {
            (TimerSource::OneSixtiethHz, round_count(seconds / 60.0))
        } else if seconds > 255.0 / 64.0 {
            (TimerSource::Hz1, round_count(seconds))
        } else if seconds > 255.0 / 4096.0 {
            (TimerSource::Hz64, round_count(seconds * 64.0))
        } else {
            (TimerSource::Hz4096, round_count(seconds * 4096.0))
        };

        Some(Timer {
            enabled: true,
            source,
            count,
        })
    }

    /// Duration this setting counts down, in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.source.duration(self.count)
    }
}
