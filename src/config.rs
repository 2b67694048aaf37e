//! Game-mode settings for an arson round.
//!
//! | Setting | Default | Meaning |
//! |---------|---------|---------|
//! | `fire_spread_interval` | 20s | time between spread steps, measured from the latest ignition |
//! | `extinguish_time` | 10s | win grace period, and how long an extinguisher must be held |
//! | `rooms_to_win` | 3 | simultaneously burning rooms that start the win countdown |
//! | `pause_fire_during_meetings` | true | freeze fire timers while a meeting is open |
//! | `extinguisher_charges` | 2 | rooms one extinguisher can put out before depleting |
//! | `extinguisher_respawn_time` | 30s | delay before a depleted extinguisher is restocked |
//! | `arson_task_cooldown` | 0s | minimum gap between consecutive arson tasks (zero disables) |
//! | `arsonist_count` | 1 | arsonists drawn per round |
//!
//! # Example
//!
//! ```
//! use arson_mode::ArsonConfig;
//! use web_time::Duration;
//!
//! let config = ArsonConfig {
//!     rooms_to_win: 2,
//!     fire_spread_interval: Duration::from_secs(15),
//!     ..ArsonConfig::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use web_time::Duration;

use crate::{ArsonError, InvalidRequestKind};

/// Upper bound for any of the timing settings.
const MAX_DURATION_MS: u64 = 600_000;

/// Settings that control fire timing, the win condition, and the task chain.
///
/// # Forward Compatibility
///
/// New fields may be added in future versions. Always construct with
/// `..ArsonConfig::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[must_use = "ArsonConfig has no effect unless passed to RoundBuilder::with_config()"]
pub struct ArsonConfig {
    /// Seconds between fire spreading to the next adjacent room.
    ///
    /// Default: 20s
    pub fire_spread_interval: Duration,

    /// Grace period once the room threshold is met. Also the hold time needed to put
    /// out a room with an extinguisher.
    ///
    /// Default: 10s
    pub extinguish_time: Duration,

    /// Number of simultaneously burning rooms required for the arsonist to win.
    ///
    /// Default: 3
    pub rooms_to_win: usize,

    /// Whether fire timers freeze while a meeting is in progress.
    ///
    /// Default: `true`
    pub pause_fire_during_meetings: bool,

    /// Number of rooms a single extinguisher can put out before depleting.
    ///
    /// Default: 2
    pub extinguisher_charges: u32,

    /// Time before a depleted extinguisher respawns on its wall mount.
    ///
    /// Default: 30s
    pub extinguisher_respawn_time: Duration,

    /// Minimum time between consecutive accepted arson tasks. Zero disables the check.
    ///
    /// Default: 0s
    pub arson_task_cooldown: Duration,

    /// Number of arsonists drawn per round.
    ///
    /// Default: 1
    pub arsonist_count: usize,
}

impl Default for ArsonConfig {
    fn default() -> Self {
        Self {
            fire_spread_interval: Duration::from_secs(20),
            extinguish_time: Duration::from_secs(10),
            rooms_to_win: 3,
            pause_fire_during_meetings: true,
            extinguisher_charges: 2,
            extinguisher_respawn_time: Duration::from_secs(30),
            arson_task_cooldown: Duration::ZERO,
            arsonist_count: 1,
        }
    }
}

impl ArsonConfig {
    /// Creates a new `ArsonConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset for relaxed lobbies: slower spread, a longer grace period, and more
    /// extinguisher charges.
    pub fn casual() -> Self {
        Self {
            fire_spread_interval: Duration::from_secs(30),
            extinguish_time: Duration::from_secs(15),
            extinguisher_charges: 3,
            ..Self::default()
        }
    }

    /// Preset for experienced groups: fast spread, a short grace period, and a
    /// cooldown between arson tasks so the chain cannot be rushed.
    pub fn competitive() -> Self {
        Self {
            fire_spread_interval: Duration::from_secs(15),
            extinguish_time: Duration::from_secs(8),
            extinguisher_charges: 1,
            extinguisher_respawn_time: Duration::from_secs(45),
            arson_task_cooldown: Duration::from_secs(20),
            ..Self::default()
        }
    }

    /// Returns a copy scaled for the number of participants.
    ///
    /// Up to 8 players need 2 burning rooms, up to 14 need 3. Larger lobbies need 5
    /// and fire spreads 20% slower.
    ///
    /// # Examples
    ///
    /// ```
    /// use arson_mode::ArsonConfig;
    ///
    /// assert_eq!(ArsonConfig::default().with_player_count_scaling(6).rooms_to_win, 2);
    /// assert_eq!(ArsonConfig::default().with_player_count_scaling(20).rooms_to_win, 5);
    /// ```
    pub fn with_player_count_scaling(mut self, player_count: usize) -> Self {
        if player_count <= 8 {
            self.rooms_to_win = 2;
        } else if player_count <= 14 {
            self.rooms_to_win = 3;
        } else {
            self.rooms_to_win = 5;
            self.fire_spread_interval = self.fire_spread_interval * 6 / 5;
        }
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ArsonError::InvalidRequest`] if a timing value is zero or larger than
    /// ten minutes, or if a count is zero.
    pub fn validate(&self) -> Result<(), ArsonError> {
        check_duration("fire_spread_interval", self.fire_spread_interval, 1)?;
        check_duration("extinguish_time", self.extinguish_time, 1)?;
        check_duration("extinguisher_respawn_time", self.extinguisher_respawn_time, 0)?;
        check_duration("arson_task_cooldown", self.arson_task_cooldown, 0)?;

        if self.rooms_to_win < 1 || self.rooms_to_win > 64 {
            return Err(InvalidRequestKind::ConfigValueOutOfRange {
                field: "rooms_to_win",
                min: 1,
                max: 64,
                actual: self.rooms_to_win as u64,
            }
            .into());
        }

        if self.extinguisher_charges < 1 || self.extinguisher_charges > 99 {
            return Err(InvalidRequestKind::ConfigValueOutOfRange {
                field: "extinguisher_charges",
                min: 1,
                max: 99,
                actual: u64::from(self.extinguisher_charges),
            }
            .into());
        }

        if self.arsonist_count < 1 || self.arsonist_count > 16 {
            return Err(InvalidRequestKind::ConfigValueOutOfRange {
                field: "arsonist_count",
                min: 1,
                max: 16,
                actual: self.arsonist_count as u64,
            }
            .into());
        }

        Ok(())
    }
}

fn check_duration(field: &'static str, value: Duration, min_ms: u64) -> Result<(), ArsonError> {
    let actual_ms = value.as_millis() as u64;
    if actual_ms < min_ms || actual_ms > MAX_DURATION_MS {
        return Err(InvalidRequestKind::DurationConfigOutOfRange {
            field,
            min_ms,
            max_ms: MAX_DURATION_MS,
            actual_ms,
        }
        .into());
    }
    Ok(())
}
