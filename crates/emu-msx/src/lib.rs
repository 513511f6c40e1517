//! Headless MSX timing model built on the `emu-core` scheduler.
//!
//! The machine has no memory map or instruction decoder. It keeps exactly
//! the parts that exercise the scheduler: a CPU driving loop, a VDP with
//! frame and line interrupts, a PSG sample clock, and a pluggable timer
//! cartridge, all sharing one interrupt line.

pub mod cartridge;
pub mod config;
pub mod cpu;
mod error;
pub mod irq;
pub mod machine;
pub mod psg;
pub mod snapshot;
pub mod vdp;

use emu_core::Clock;

pub use config::{
    CartridgeConfig, CpuConfig, MachineConfig, PsgConfig, VideoConfig, VideoStandard,
};
pub use error::{MachineError, MachineResult};
pub use machine::{MachineStats, Msx};
pub use snapshot::MachineState;

/// Z80 clock, 3.579545 MHz (colour burst).
pub const CPU_FREQ: u64 = 3_579_545;

/// TMS9918 pixel clock, six times the CPU clock.
pub const VDP_FREQ: u64 = 21_477_270;

pub type CpuClock = Clock<CPU_FREQ>;
pub type VdpClock = Clock<VDP_FREQ>;
