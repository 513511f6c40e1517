//! Timer cartridge and the slot that holds it.
//!
//! The cartridge has a 16-bit countdown timer clocked by the CPU clock. When
//! enabled it raises the cartridge interrupt every `period` cycles. Writing
//! the period or control registers cancels the pending expiry and re-arms
//! it from the current time.

use std::cell::RefCell;
use std::rc::Rc;

use emu_core::{DeviceId, EmuTime, Observable, Schedulable, Scheduler, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CartridgeConfig;
use crate::irq::{IRQ_CARTRIDGE, IrqLine};
use crate::{CpuClock, MachineError, MachineResult};

pub const TAG_TIMER: u32 = 0;

/// Control register bit 0: timer running.
pub const CONTROL_ENABLE: u8 = 0x01;
/// Control register bit 1: acknowledge the cartridge interrupt.
pub const CONTROL_ACK: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartridgeState {
    pub period: u16,
    pub enabled: bool,
    pub deadline: Option<EmuTime>,
    pub expirations: u64,
}

#[derive(Debug)]
pub struct TimerCartridge {
    id: DeviceId,
    irq: IrqLine,
    period: u16,
    enabled: bool,
    /// Instant of the pending expiry, if armed.
    deadline: Option<EmuTime>,
    expirations: u64,
}

impl TimerCartridge {
    #[must_use]
    pub fn new(id: DeviceId, irq: IrqLine, config: &CartridgeConfig) -> Self {
        Self {
            id,
            irq,
            period: config.timer_period,
            enabled: config.enabled,
            deadline: None,
            expirations: 0,
        }
    }

    #[must_use]
    pub fn from_state(id: DeviceId, irq: IrqLine, state: &CartridgeState) -> Self {
        Self {
            id,
            irq,
            period: state.period,
            enabled: state.enabled,
            deadline: state.deadline,
            expirations: state.expirations,
        }
    }

    #[must_use]
    pub fn state(&self) -> CartridgeState {
        CartridgeState {
            period: self.period,
            enabled: self.enabled,
            deadline: self.deadline,
            expirations: self.expirations,
        }
    }

    /// Register the pending expiry, arming a fresh one if the timer runs
    /// but has none yet.
    pub fn power_on(&mut self, scheduler: &Scheduler) {
        match self.deadline {
            Some(deadline) => scheduler.set_sync_point(deadline, self.id, TAG_TIMER),
            None if self.enabled => self.arm(scheduler.current_time(), scheduler),
            None => {}
        }
    }

    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[must_use]
    pub fn period(&self) -> u16 {
        self.period
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn deadline(&self) -> Option<EmuTime> {
        self.deadline
    }

    #[must_use]
    pub fn expirations(&self) -> u64 {
        self.expirations
    }

    pub fn write_control(&mut self, value: u8, scheduler: &Scheduler) {
        if value & CONTROL_ACK != 0 {
            self.irq.lower(IRQ_CARTRIDGE);
        }
        let enabled = value & CONTROL_ENABLE != 0;
        if enabled != self.enabled {
            self.enabled = enabled;
            self.rearm(scheduler);
        }
    }

    pub fn write_period_low(&mut self, value: u8, scheduler: &Scheduler) {
        self.period = (self.period & 0xFF00) | u16::from(value);
        self.rearm(scheduler);
    }

    pub fn write_period_high(&mut self, value: u8, scheduler: &Scheduler) {
        self.period = (self.period & 0x00FF) | (u16::from(value) << 8);
        self.rearm(scheduler);
    }

    fn rearm(&mut self, scheduler: &Scheduler) {
        if self.deadline.take().is_some() {
            scheduler.remove_sync_point(self.id, TAG_TIMER);
        }
        if self.enabled {
            self.arm(scheduler.current_time(), scheduler);
        }
        debug!(period = self.period, enabled = self.enabled, "cartridge timer re-armed");
    }

    fn arm(&mut self, from: EmuTime, scheduler: &Scheduler) {
        // A zero period counts the full 16 bits.
        let cycles = if self.period == 0 { 0x1_0000 } else { u64::from(self.period) };
        let deadline = from + CpuClock::duration(cycles);
        scheduler.set_sync_point(deadline, self.id, TAG_TIMER);
        self.deadline = Some(deadline);
    }
}

impl Schedulable for TimerCartridge {
    fn execute_until(&mut self, time: EmuTime, _tag: u32, scheduler: &Scheduler) {
        debug_assert_eq!(Some(time), self.deadline);
        self.expirations += 1;
        self.irq.raise(IRQ_CARTRIDGE);
        self.deadline = None;
        if self.enabled {
            self.arm(time, scheduler);
        }
    }

    fn name(&self) -> &str {
        "cartridge"
    }
}

impl Observable for TimerCartridge {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "period" => Some(u64::from(self.period).into()),
            "enabled" => Some(self.enabled.into()),
            "deadline" => Some(self.deadline.unwrap_or(EmuTime::INFINITY).into()),
            "expirations" => Some(self.expirations.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["period", "enabled", "deadline", "expirations"]
    }
}

/// The machine's single cartridge slot.
#[derive(Debug, Default)]
pub struct CartridgeSlot {
    cartridge: Option<Rc<RefCell<TimerCartridge>>>,
}

impl CartridgeSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        self.cartridge.is_some()
    }

    #[must_use]
    pub fn cartridge(&self) -> Option<&Rc<RefCell<TimerCartridge>>> {
        self.cartridge.as_ref()
    }

    /// Insert a cartridge built by `make` and start its timer.
    pub fn plug<F>(&mut self, scheduler: &Scheduler, make: F) -> MachineResult<()>
    where
        F: FnOnce(DeviceId) -> TimerCartridge,
    {
        if self.is_occupied() {
            return Err(MachineError::SlotOccupied);
        }
        let cartridge = scheduler.create_device(make);
        cartridge.borrow_mut().power_on(scheduler);
        info!(id = %cartridge.borrow().id(), "cartridge inserted");
        self.cartridge = Some(cartridge);
        Ok(())
    }

    /// Remove the cartridge, cancelling all of its pending points.
    ///
    /// Returns the number of points cancelled, or `None` if the slot was
    /// empty.
    pub fn unplug(&mut self, scheduler: &Scheduler) -> Option<usize> {
        let cartridge = self.cartridge.take()?;
        let id = cartridge.borrow().id();
        let cancelled = scheduler.unregister(id);
        info!(%id, cancelled, "cartridge removed");
        Some(cancelled)
    }
}
