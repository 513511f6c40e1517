//! Per-device views of the master time base.
//!
//! A device counts in its own cycles but stores the instant of its last
//! cycle as an [`EmuTime`]. Because every period is a whole number of master
//! ticks, stepping a clock a billion times lands exactly where a single
//! `duration(1_000_000_000)` jump would.

use crate::{ClockError, EmuDuration, EmuTime, MAIN_FREQ};

/// A clock running at the fixed frequency `FREQ_NUM / FREQ_DENOM` Hz.
///
/// Using a frequency whose period is not a whole number of master ticks is
/// rejected at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Clock<const FREQ_NUM: u64, const FREQ_DENOM: u64 = 1> {
    last_tick: EmuTime,
}

impl<const FREQ_NUM: u64, const FREQ_DENOM: u64> Clock<FREQ_NUM, FREQ_DENOM> {
    /// Master ticks per cycle.
    const STEP: u64 = {
        assert!(FREQ_NUM != 0 && FREQ_DENOM != 0, "clock frequency must be non-zero");
        assert!(
            (MAIN_FREQ * FREQ_DENOM) % FREQ_NUM == 0,
            "clock frequency must divide MAIN_FREQ exactly"
        );
        MAIN_FREQ * FREQ_DENOM / FREQ_NUM
    };

    #[must_use]
    pub const fn new(time: EmuTime) -> Self {
        Self { last_tick: time }
    }

    /// Instant of the most recent cycle.
    #[must_use]
    pub const fn time(&self) -> EmuTime {
        self.last_tick
    }

    /// Restart counting at `time`.
    pub fn reset(&mut self, time: EmuTime) {
        self.last_tick = time;
    }

    #[must_use]
    pub const fn period() -> EmuDuration {
        EmuDuration::from_ticks(Self::STEP)
    }

    /// Length of `cycles` cycles.
    #[must_use]
    pub const fn duration(cycles: u64) -> EmuDuration {
        EmuDuration::from_ticks(Self::STEP.saturating_mul(cycles))
    }

    /// Whole cycles between the last tick and `time`, rounded down.
    #[must_use]
    pub fn ticks_till(&self, time: EmuTime) -> u64 {
        debug_assert!(time >= self.last_tick, "{time} is before {}", self.last_tick);
        (time - self.last_tick).ticks() / Self::STEP
    }

    /// Cycles needed to reach or pass `time`.
    #[must_use]
    pub fn ticks_till_up(&self, time: EmuTime) -> u64 {
        debug_assert!(time >= self.last_tick, "{time} is before {}", self.last_tick);
        (time - self.last_tick).ticks().div_ceil(Self::STEP)
    }

    /// The instant `cycles` cycles after the last tick.
    #[must_use]
    pub fn time_after(&self, cycles: u64) -> EmuTime {
        self.last_tick + Self::duration(cycles)
    }

    /// Move to the last cycle at or before `time`.
    pub fn advance(&mut self, time: EmuTime) {
        let cycles = self.ticks_till(time);
        self.advance_by(cycles);
    }

    pub fn advance_by(&mut self, cycles: u64) {
        self.last_tick += Self::duration(cycles);
    }
}

impl<const FREQ_NUM: u64, const FREQ_DENOM: u64> core::ops::AddAssign<u64>
    for Clock<FREQ_NUM, FREQ_DENOM>
{
    fn add_assign(&mut self, cycles: u64) {
        self.advance_by(cycles);
    }
}

/// A clock whose frequency is chosen at runtime.
///
/// Frequencies are validated when set: a period that is not a whole number
/// of master ticks is an error rather than a rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DynamicClock {
    last_tick: EmuTime,
    step: EmuDuration,
}

impl DynamicClock {
    pub fn new(time: EmuTime, hz: u64) -> Result<Self, ClockError> {
        Self::with_freq_ratio(time, hz, 1)
    }

    pub fn with_freq_ratio(time: EmuTime, num: u64, denom: u64) -> Result<Self, ClockError> {
        Ok(Self {
            last_tick: time,
            step: period_for(num, denom)?,
        })
    }

    pub fn with_period(time: EmuTime, period: EmuDuration) -> Result<Self, ClockError> {
        if period.is_zero() {
            return Err(ClockError::ZeroPeriod);
        }
        Ok(Self {
            last_tick: time,
            step: period,
        })
    }

    pub fn set_freq(&mut self, hz: u64) -> Result<(), ClockError> {
        self.set_freq_ratio(hz, 1)
    }

    pub fn set_freq_ratio(&mut self, num: u64, denom: u64) -> Result<(), ClockError> {
        self.step = period_for(num, denom)?;
        Ok(())
    }

    pub fn set_period(&mut self, period: EmuDuration) -> Result<(), ClockError> {
        if period.is_zero() {
            return Err(ClockError::ZeroPeriod);
        }
        self.step = period;
        Ok(())
    }

    #[must_use]
    pub const fn period(&self) -> EmuDuration {
        self.step
    }

    /// Frequency in whole Hz (reporting only).
    #[must_use]
    pub const fn freq(&self) -> u64 {
        MAIN_FREQ / self.step.ticks()
    }

    #[must_use]
    pub const fn time(&self) -> EmuTime {
        self.last_tick
    }

    pub fn reset(&mut self, time: EmuTime) {
        self.last_tick = time;
    }

    #[must_use]
    pub const fn duration(&self, cycles: u64) -> EmuDuration {
        EmuDuration::from_ticks(self.step.ticks().saturating_mul(cycles))
    }

    #[must_use]
    pub fn ticks_till(&self, time: EmuTime) -> u64 {
        debug_assert!(time >= self.last_tick, "{time} is before {}", self.last_tick);
        (time - self.last_tick) / self.step
    }

    #[must_use]
    pub fn ticks_till_up(&self, time: EmuTime) -> u64 {
        debug_assert!(time >= self.last_tick, "{time} is before {}", self.last_tick);
        (time - self.last_tick).ticks().div_ceil(self.step.ticks())
    }

    #[must_use]
    pub fn time_after(&self, cycles: u64) -> EmuTime {
        self.last_tick + self.duration(cycles)
    }

    pub fn advance(&mut self, time: EmuTime) {
        let cycles = self.ticks_till(time);
        self.advance_by(cycles);
    }

    pub fn advance_by(&mut self, cycles: u64) {
        self.last_tick += self.duration(cycles);
    }
}

impl core::ops::AddAssign<u64> for DynamicClock {
    fn add_assign(&mut self, cycles: u64) {
        self.advance_by(cycles);
    }
}

fn period_for(num: u64, denom: u64) -> Result<EmuDuration, ClockError> {
    if num == 0 || denom == 0 {
        return Err(ClockError::ZeroFrequency);
    }
    let scaled = u128::from(MAIN_FREQ) * u128::from(denom);
    if scaled % u128::from(num) != 0 {
        return Err(ClockError::InexactFrequency { num, denom });
    }
    let ticks = u64::try_from(scaled / u128::from(num))
        .map_err(|_| ClockError::TooSlow { num, denom })?;
    Ok(EmuDuration::from_ticks(ticks))
}
