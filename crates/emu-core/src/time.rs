//! The fundamental units of emulated time.
//!
//! An [`EmuTime`] is an instant measured in ticks of the master time base
//! since power-on; an [`EmuDuration`] is the distance between two instants.
//! Both are plain `u64` tick counts, so all hot-path arithmetic is integer.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

/// Ticks per second of the master time base.
///
/// 960 times the 3.58 MHz system clock. The CPU (3.58 MHz), the video chip
/// (6 x 3.58 MHz) and the sound chip dividers all divide this exactly.
pub const MAIN_FREQ: u64 = 3_579_545 * 960;

/// Rescale a tick count from `from_hz` to `to_hz`, rounding down.
///
/// The intermediate product is 128-bit, so the result is exact whenever
/// `ticks * to_hz` is a multiple of `from_hz`. Saturates at `u64::MAX`.
#[must_use]
pub fn rescale(ticks: u64, from_hz: u64, to_hz: u64) -> u64 {
    assert!(from_hz != 0, "cannot rescale from a zero frequency");
    let scaled = u128::from(ticks) * u128::from(to_hz) / u128::from(from_hz);
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// An instant in emulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct EmuTime(u64);

impl EmuTime {
    pub const ZERO: Self = Self(0);

    /// An instant later than any reachable time. Used as the "nothing
    /// pending" sentinel.
    pub const INFINITY: Self = Self(u64::MAX);

    #[must_use]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Master ticks since power-on.
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_infinity(self) -> bool {
        self.0 == u64::MAX
    }

    /// Whole cycles of a clock running at `hz` that have elapsed by this
    /// instant.
    #[must_use]
    pub fn ticks_at(self, hz: u64) -> u64 {
        rescale(self.0, MAIN_FREQ, hz)
    }

    /// The instant at which a clock running at `hz`, started at power-on,
    /// reaches its `cycles`-th cycle.
    #[must_use]
    pub fn from_ticks_at(cycles: u64, hz: u64) -> Self {
        Self(rescale(cycles, hz, MAIN_FREQ))
    }
}

impl Add<EmuDuration> for EmuTime {
    type Output = Self;

    fn add(self, rhs: EmuDuration) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<EmuDuration> for EmuTime {
    fn add_assign(&mut self, rhs: EmuDuration) {
        *self = *self + rhs;
    }
}

impl Sub<EmuDuration> for EmuTime {
    type Output = Self;

    fn sub(self, rhs: EmuDuration) -> Self {
        debug_assert!(self.0 >= rhs.0, "EmuTime underflow: {self:?} - {rhs:?}");
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign<EmuDuration> for EmuTime {
    fn sub_assign(&mut self, rhs: EmuDuration) {
        *self = *self - rhs;
    }
}

impl Sub for EmuTime {
    type Output = EmuDuration;

    /// Distance between two instants. The left operand must not be earlier.
    fn sub(self, rhs: Self) -> EmuDuration {
        debug_assert!(self >= rhs, "negative duration: {self:?} - {rhs:?}");
        EmuDuration(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for EmuTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinity() {
            write!(f, "infinity")
        } else {
            write!(f, "{}t", self.0)
        }
    }
}

/// A span of emulated time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct EmuDuration(u64);

impl EmuDuration {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Duration of `cycles` cycles of a clock running at `hz`.
    #[must_use]
    pub fn from_ticks_at(cycles: u64, hz: u64) -> Self {
        Self(rescale(cycles, hz, MAIN_FREQ))
    }

    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(MAIN_FREQ))
    }

    /// Rounds down to the nearest master tick.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self(rescale(millis, 1_000, MAIN_FREQ))
    }

    /// Rounds down to the nearest master tick.
    #[must_use]
    pub fn from_micros(micros: u64) -> Self {
        Self(rescale(micros, 1_000_000, MAIN_FREQ))
    }

    /// Seconds as a float, for reporting only.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MAIN_FREQ as f64
    }
}

impl Add for EmuDuration {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for EmuDuration {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for EmuDuration {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        debug_assert!(self >= rhs, "negative duration: {self:?} - {rhs:?}");
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u64> for EmuDuration {
    type Output = Self;

    fn mul(self, rhs: u64) -> Self {
        Self(self.0.saturating_mul(rhs))
    }
}

impl Div<u64> for EmuDuration {
    type Output = Self;

    fn div(self, rhs: u64) -> Self {
        Self(self.0 / rhs)
    }
}

impl Div for EmuDuration {
    type Output = u64;

    /// How many whole `rhs` spans fit in `self`.
    fn div(self, rhs: Self) -> u64 {
        self.0 / rhs.0
    }
}

impl fmt::Display for EmuDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.as_secs_f64())
    }
}
