//! Sound timing.
//!
//! The PSG produces one output sample every `divider` CPU cycles. Sample
//! generation itself is not modelled; the device only keeps the sample
//! clock and counts samples.

use emu_core::{
    ClockError, DeviceId, DynamicClock, EmuTime, Observable, Schedulable, Scheduler, Value,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{CPU_FREQ, CpuClock};

pub const TAG_SAMPLE: u32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsgState {
    pub clock: DynamicClock,
    pub samples: u64,
}

#[derive(Debug)]
pub struct Psg {
    id: DeviceId,
    /// Ticks once per output sample.
    clock: DynamicClock,
    samples: u64,
}

/// Sample clock ticking once every `divider` CPU cycles, starting at `now`.
pub fn sample_clock(divider: u64, now: EmuTime) -> Result<DynamicClock, ClockError> {
    DynamicClock::with_freq_ratio(now, CPU_FREQ, divider)
}

impl Psg {
    #[must_use]
    pub fn new(id: DeviceId, clock: DynamicClock) -> Self {
        Self {
            id,
            clock,
            samples: 0,
        }
    }

    #[must_use]
    pub fn from_state(id: DeviceId, state: &PsgState) -> Self {
        Self {
            id,
            clock: state.clock,
            samples: state.samples,
        }
    }

    #[must_use]
    pub fn state(&self) -> PsgState {
        PsgState {
            clock: self.clock,
            samples: self.samples,
        }
    }

    pub fn power_on(&self, scheduler: &Scheduler) {
        scheduler.set_sync_point(self.clock.time_after(1), self.id, TAG_SAMPLE);
    }

    #[must_use]
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Sample period in CPU cycles.
    #[must_use]
    pub fn divider(&self) -> u64 {
        self.clock.period() / CpuClock::period()
    }

    /// Sample rate in Hz, rounded down.
    #[must_use]
    pub fn sample_rate(&self) -> u64 {
        self.clock.freq()
    }

    /// Change the sample period. The sample clock restarts at the current
    /// time; the pending sample point is replaced.
    ///
    /// On error the old rate stays in effect.
    pub fn set_divider(&mut self, divider: u64, scheduler: &Scheduler) -> Result<(), ClockError> {
        self.clock.set_freq_ratio(CPU_FREQ, divider)?;
        self.clock.reset(scheduler.current_time());
        scheduler.remove_sync_point(self.id, TAG_SAMPLE);
        self.power_on(scheduler);
        debug!(divider, rate = self.clock.freq(), "PSG sample rate changed");
        Ok(())
    }
}

impl Schedulable for Psg {
    fn execute_until(&mut self, time: EmuTime, _tag: u32, scheduler: &Scheduler) {
        self.samples += self.clock.ticks_till(time);
        self.clock.advance(time);
        self.power_on(scheduler);
    }

    fn name(&self) -> &str {
        "psg"
    }
}

impl Observable for Psg {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "samples" => Some(self.samples.into()),
            "divider" => Some(self.divider().into()),
            "rate" => Some(self.clock.freq().into()),
            "period" => Some(self.clock.period().into()),
            "last_sample" => Some(self.clock.time().into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["samples", "divider", "rate", "period", "last_sample"]
    }
}
