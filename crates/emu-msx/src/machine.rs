//! The MSX machine: one scheduler, one driving loop, and the timed devices.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use emu_core::{DynamicClock, EmuDuration, EmuTime, Observable, Scheduler, Value};
use tracing::{debug, info, trace};

use crate::cartridge::{CartridgeSlot, TimerCartridge};
use crate::config::{CartridgeConfig, MachineConfig, VideoStandard};
use crate::cpu::Cpu;
use crate::irq::{IRQ_CARTRIDGE, IrqLine};
use crate::psg::{self, Psg};
use crate::snapshot::{MachineState, STATE_VERSION};
use crate::vdp::Vdp;
use crate::{MachineError, MachineResult};

/// VDP line interrupt register. `0xFF` disables the interrupt.
pub const PORT_LINE_INTERRUPT: u8 = 0x99;
/// VDP mode register. Bit 0 selects PAL.
pub const PORT_VIDEO_MODE: u8 = 0x9A;
/// PSG sample divider, in CPU cycles.
pub const PORT_PSG_DIVIDER: u8 = 0xA0;
/// Cartridge timer control.
pub const PORT_TIMER_CONTROL: u8 = 0xB0;
pub const PORT_TIMER_PERIOD_LOW: u8 = 0xB1;
pub const PORT_TIMER_PERIOD_HIGH: u8 = 0xB2;

/// Snapshot of the machine's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineStats {
    pub time: EmuTime,
    pub frames: u64,
    pub lines: u64,
    pub line_irqs: u64,
    pub instructions: u64,
    pub interrupts: u64,
    pub batches: u64,
    pub samples: u64,
    pub sample_rate: u64,
    pub timer_expirations: Option<u64>,
    pub pending: usize,
    pub devices: usize,
}

impl fmt::Display for MachineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "emulated time:  {} ({})",
            self.time - EmuTime::ZERO,
            self.time
        )?;
        writeln!(f, "frames:         {}", self.frames)?;
        writeln!(f, "scanlines:      {}", self.lines)?;
        writeln!(f, "line irqs:      {}", self.line_irqs)?;
        writeln!(f, "instructions:   {}", self.instructions)?;
        writeln!(f, "interrupts:     {}", self.interrupts)?;
        writeln!(f, "cpu batches:    {}", self.batches)?;
        writeln!(f, "psg samples:    {} @ {} Hz", self.samples, self.sample_rate)?;
        if let Some(expirations) = self.timer_expirations {
            writeln!(f, "timer expiries: {expirations}")?;
        }
        write!(
            f,
            "sync points:    {} pending, {} devices",
            self.pending, self.devices
        )
    }
}

#[derive(Debug)]
pub struct Msx {
    // Dropped first so devices hear `scheduler_deleted` while still alive.
    scheduler: Scheduler,
    cpu: Cpu,
    vdp: Rc<RefCell<Vdp>>,
    psg: Rc<RefCell<Psg>>,
    slot: CartridgeSlot,
    irq: IrqLine,
    config: MachineConfig,
}

impl Msx {
    /// Build and power on a machine at time zero.
    pub fn new(config: &MachineConfig) -> MachineResult<Self> {
        config.validate()?;
        let scheduler = Scheduler::new();
        let irq = IrqLine::new();
        let now = EmuTime::ZERO;

        let cpu = Cpu::new(&config.cpu, now);
        let vdp = scheduler.create_device(|id| Vdp::new(id, irq.clone(), &config.video, now));
        let clock = psg::sample_clock(config.psg.divider, now)?;
        let psg = scheduler.create_device(|id| Psg::new(id, clock));

        vdp.borrow().power_on(&scheduler);
        psg.borrow().power_on(&scheduler);

        let mut slot = CartridgeSlot::new();
        if let Some(cartridge) = &config.cartridge {
            slot.plug(&scheduler, |id| TimerCartridge::new(id, irq.clone(), cartridge))?;
        }

        info!(
            standard = ?config.video.standard,
            cartridge = slot.is_occupied(),
            "machine powered on"
        );
        Ok(Self {
            scheduler,
            cpu,
            vdp,
            psg,
            slot,
            irq,
            config: *config,
        })
    }

    /// Rebuild a machine from a snapshot taken with
    /// [`save_state`](Self::save_state).
    ///
    /// The scheduler time is restored first; each device then registers its
    /// pending points from its own saved state.
    pub fn restore(config: &MachineConfig, state: &MachineState) -> MachineResult<Self> {
        config.validate()?;
        if state.version != STATE_VERSION {
            return Err(MachineError::StateMismatch(format!(
                "state version {} (expected {STATE_VERSION})",
                state.version
            )));
        }
        if state.cpu.cycles_per_instruction != config.cpu.cycles_per_instruction {
            return Err(MachineError::StateMismatch(format!(
                "state was taken with {} cycles per instruction, configuration has {}",
                state.cpu.cycles_per_instruction, config.cpu.cycles_per_instruction
            )));
        }
        check_devices(state)?;

        let scheduler = Scheduler::new();
        scheduler.restore_state(state.scheduler)?;
        let irq = IrqLine::new();
        irq.set(state.irq);

        let cpu = Cpu::from_state(&state.cpu);
        let vdp = scheduler.create_device(|id| Vdp::from_state(id, irq.clone(), &state.vdp));
        let psg = scheduler.create_device(|id| Psg::from_state(id, &state.psg));
        vdp.borrow().power_on(&scheduler);
        psg.borrow().power_on(&scheduler);

        let mut slot = CartridgeSlot::new();
        if let Some(cartridge) = &state.cartridge {
            slot.plug(&scheduler, |id| {
                TimerCartridge::from_state(id, irq.clone(), cartridge)
            })?;
        }

        info!(time = %state.scheduler.current_time, pending = scheduler.len(), "machine restored");
        Ok(Self {
            scheduler,
            cpu,
            vdp,
            psg,
            slot,
            irq,
            config: *config,
        })
    }

    #[must_use]
    pub fn save_state(&self) -> MachineState {
        MachineState {
            version: STATE_VERSION,
            scheduler: self.scheduler.save_state(),
            cpu: self.cpu.state(),
            irq: self.irq.pending(),
            vdp: self.vdp.borrow().state(),
            psg: self.psg.borrow().state(),
            cartridge: self.slot.cartridge().map(|c| c.borrow().state()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Current CPU time. Devices have been caught up to it.
    #[must_use]
    pub fn time(&self) -> EmuTime {
        self.cpu.time()
    }

    #[must_use]
    pub fn irq(&self) -> &IrqLine {
        &self.irq
    }

    pub fn run_until(&mut self, target: EmuTime) {
        self.cpu.run_until(target, &self.scheduler, &self.irq);
    }

    pub fn run_for(&mut self, duration: EmuDuration) {
        let target = self.cpu.time() + duration;
        self.run_until(target);
    }

    /// Run until `frames` more vertical syncs have happened.
    pub fn run_frames(&mut self, frames: u64) {
        for _ in 0..frames {
            let end = self.vdp.borrow().frame_end();
            self.run_until(end);
        }
        debug!(frames, time = %self.time(), "frames complete");
    }

    /// Write an I/O port. Unmapped ports are ignored.
    pub fn write_io(&mut self, port: u8, value: u8) -> MachineResult<()> {
        let scheduler = &self.scheduler;
        match port {
            PORT_LINE_INTERRUPT => {
                let line = (value != 0xFF).then_some(u16::from(value));
                self.vdp.borrow_mut().set_line_interrupt(line, scheduler);
            }
            PORT_VIDEO_MODE => {
                let standard = if value & 0x01 == 0 {
                    VideoStandard::Ntsc
                } else {
                    VideoStandard::Pal
                };
                self.vdp.borrow_mut().set_standard(standard, scheduler);
            }
            PORT_PSG_DIVIDER => {
                self.psg
                    .borrow_mut()
                    .set_divider(u64::from(value), scheduler)?;
            }
            PORT_TIMER_CONTROL..=PORT_TIMER_PERIOD_HIGH => {
                let Some(cartridge) = self.slot.cartridge() else {
                    trace!(port, value, "write to empty cartridge slot");
                    return Ok(());
                };
                let mut cartridge = cartridge.borrow_mut();
                match port {
                    PORT_TIMER_CONTROL => cartridge.write_control(value, scheduler),
                    PORT_TIMER_PERIOD_LOW => cartridge.write_period_low(value, scheduler),
                    _ => cartridge.write_period_high(value, scheduler),
                }
            }
            _ => trace!(port, value, "write to unmapped port"),
        }
        Ok(())
    }

    /// Insert a timer cartridge. Its timer starts counting from now.
    pub fn plug_cartridge(&mut self, config: &CartridgeConfig) -> MachineResult<()> {
        let irq = self.irq.clone();
        self.slot
            .plug(&self.scheduler, |id| TimerCartridge::new(id, irq, config))
    }

    /// Remove the cartridge. Returns the number of sync points cancelled,
    /// or `None` if the slot was empty.
    pub fn unplug_cartridge(&mut self) -> Option<usize> {
        let cancelled = self.slot.unplug(&self.scheduler)?;
        self.irq.lower(IRQ_CARTRIDGE);
        Some(cancelled)
    }

    #[must_use]
    pub fn has_cartridge(&self) -> bool {
        self.slot.is_occupied()
    }

    #[must_use]
    pub fn stats(&self) -> MachineStats {
        let now = self.time();
        let vdp = self.vdp.borrow();
        let psg = self.psg.borrow();
        MachineStats {
            time: now,
            frames: vdp.frames(),
            lines: vdp.lines_at(now),
            line_irqs: vdp.line_irqs(),
            instructions: self.cpu.instructions(),
            interrupts: self.cpu.interrupts(),
            batches: self.cpu.batches(),
            samples: psg.samples(),
            sample_rate: psg.sample_rate(),
            timer_expirations: self.slot.cartridge().map(|c| c.borrow().expirations()),
            pending: self.scheduler.len(),
            devices: self.scheduler.device_count(),
        }
    }
}

/// Reject device state that would panic once its points are registered:
/// points at or behind the scheduler time, a zero-length frame, a zero
/// sample period, or a disabled timer that still has a deadline.
fn check_devices(state: &MachineState) -> MachineResult<()> {
    let now = state.scheduler.current_time;
    ensure_ahead("cpu clock", state.cpu.clock.time(), now, false)?;

    let vdp = &state.vdp;
    if vdp.frame_start >= vdp.frame_end {
        return Err(MachineError::StateMismatch(format!(
            "vdp frame starts at {} but ends at {}",
            vdp.frame_start, vdp.frame_end
        )));
    }
    ensure_ahead("vdp frame end", vdp.frame_end, now, true)?;

    let clock = &state.psg.clock;
    DynamicClock::with_period(clock.time(), clock.period())
        .map_err(|e| MachineError::StateMismatch(format!("psg sample clock: {e}")))?;
    ensure_ahead("psg next sample", clock.time_after(1), now, true)?;

    if state.cartridge.is_some_and(|c| !c.enabled && c.deadline.is_some()) {
        return Err(MachineError::StateMismatch(
            "cartridge timer is disabled but has a deadline".into(),
        ));
    }
    if let Some(deadline) = state.cartridge.and_then(|c| c.deadline) {
        ensure_ahead("cartridge deadline", deadline, now, true)?;
    }
    Ok(())
}

/// Reject a saved instant that the restored scheduler time has already
/// passed. With `strict`, reaching it exactly also counts as passed.
fn ensure_ahead(what: &str, time: EmuTime, now: EmuTime, strict: bool) -> MachineResult<()> {
    let passed = if strict { time <= now } else { time < now };
    if passed {
        return Err(MachineError::StateMismatch(format!(
            "{what} {time} is behind scheduler time {now}"
        )));
    }
    Ok(())
}

impl Observable for Msx {
    fn query(&self, path: &str) -> Option<Value> {
        if let Some(rest) = path.strip_prefix("scheduler.") {
            self.scheduler.query(rest)
        } else if let Some(rest) = path.strip_prefix("cpu.") {
            self.cpu.query(rest)
        } else if let Some(rest) = path.strip_prefix("vdp.") {
            match rest {
                "line" => Some(self.vdp.borrow().line_at(self.time()).into()),
                _ => self.vdp.borrow().query(rest),
            }
        } else if let Some(rest) = path.strip_prefix("psg.") {
            self.psg.borrow().query(rest)
        } else if let Some(rest) = path.strip_prefix("cartridge.") {
            self.slot.cartridge()?.borrow().query(rest)
        } else {
            match path {
                "time" => Some(self.time().into()),
                "irq" => Some(u64::from(self.irq.pending()).into()),
                "cartridge" => Some(self.has_cartridge().into()),
                _ => None,
            }
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "time",
            "irq",
            "cartridge",
            "scheduler.time",
            "scheduler.next",
            "scheduler.pending",
            "scheduler.draining",
            "scheduler.devices",
            "cpu.time",
            "cpu.instructions",
            "cpu.interrupts",
            "cpu.batches",
            "vdp.line",
            "vdp.frames",
            "vdp.lines",
            "vdp.line_irqs",
            "vdp.frame_start",
            "vdp.frame_end",
            "vdp.standard",
            "vdp.line_interrupt",
            "psg.samples",
            "psg.divider",
            "psg.rate",
            "psg.period",
            "psg.last_sample",
            "cartridge.period",
            "cartridge.enabled",
            "cartridge.deadline",
            "cartridge.expirations",
        ]
    }
}
