//! The driving loop.
//!
//! Instructions are not decoded; each costs a fixed number of cycles. What
//! matters is the loop shape: ask the scheduler how far it is safe to run,
//! run a batch of instructions that far, then hand the new time back with
//! `schedule` so every device due by then catches up.

use emu_core::{EmuTime, Observable, Scheduler, Value};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::CpuClock;
use crate::config::CpuConfig;
use crate::irq::IrqLine;

/// Cycles spent accepting an interrupt (IM 1: RST 38h plus the extra wait).
pub const IRQ_ACK_CYCLES: u64 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuState {
    pub clock: CpuClock,
    pub cycles_per_instruction: u64,
    pub instructions: u64,
    pub interrupts: u64,
    pub batches: u64,
}

#[derive(Debug)]
pub struct Cpu {
    clock: CpuClock,
    cycles_per_instruction: u64,
    instructions: u64,
    interrupts: u64,
    /// Number of `schedule` calls made by the loop.
    batches: u64,
}

impl Cpu {
    #[must_use]
    pub fn new(config: &CpuConfig, now: EmuTime) -> Self {
        Self {
            clock: CpuClock::new(now),
            cycles_per_instruction: config.cycles_per_instruction,
            instructions: 0,
            interrupts: 0,
            batches: 0,
        }
    }

    #[must_use]
    pub fn from_state(state: &CpuState) -> Self {
        Self {
            clock: state.clock,
            cycles_per_instruction: state.cycles_per_instruction,
            instructions: state.instructions,
            interrupts: state.interrupts,
            batches: state.batches,
        }
    }

    #[must_use]
    pub fn state(&self) -> CpuState {
        CpuState {
            clock: self.clock,
            cycles_per_instruction: self.cycles_per_instruction,
            instructions: self.instructions,
            interrupts: self.interrupts,
            batches: self.batches,
        }
    }

    #[must_use]
    pub fn time(&self) -> EmuTime {
        self.clock.time()
    }

    #[must_use]
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    #[must_use]
    pub fn interrupts(&self) -> u64 {
        self.interrupts
    }

    #[must_use]
    pub fn batches(&self) -> u64 {
        self.batches
    }

    /// Run until the CPU clock reaches `target`.
    ///
    /// The last instruction may end past `target`; devices are always
    /// caught up to wherever the CPU stopped.
    pub fn run_until(&mut self, target: EmuTime, scheduler: &Scheduler, irq: &IrqLine) {
        while self.clock.time() < target {
            if irq.is_raised() {
                let sources = irq.clear();
                self.interrupts += 1;
                self.clock += IRQ_ACK_CYCLES;
                trace!(sources, time = %self.clock.time(), "interrupt accepted");
            } else {
                let limit = scheduler.next().min(target);
                let count = self.instructions_until(limit);
                self.instructions += count;
                self.clock += count * self.cycles_per_instruction;
            }
            self.batches += 1;
            scheduler.schedule(self.clock.time());
        }
    }

    /// Whole instructions needed to reach or pass `limit`, at least one.
    fn instructions_until(&self, limit: EmuTime) -> u64 {
        let cycles = self.clock.ticks_till_up(limit);
        cycles.div_ceil(self.cycles_per_instruction).max(1)
    }
}

impl Observable for Cpu {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "time" => Some(self.clock.time().into()),
            "instructions" => Some(self.instructions.into()),
            "interrupts" => Some(self.interrupts.into()),
            "batches" => Some(self.batches.into()),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["time", "instructions", "interrupts", "batches"]
    }
}
