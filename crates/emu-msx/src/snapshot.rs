//! Save-states.
//!
//! A snapshot holds the scheduler time and each device's own timing state.
//! Pending sync points are not stored: on restore every device registers its
//! points again from its own state.

use std::path::Path;

use emu_core::SchedulerState;
use serde::{Deserialize, Serialize};

use crate::MachineResult;
use crate::cartridge::CartridgeState;
use crate::cpu::CpuState;
use crate::psg::PsgState;
use crate::vdp::VdpState;

/// Bumped whenever the layout of [`MachineState`] changes.
pub const STATE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    pub version: u32,
    pub scheduler: SchedulerState,
    pub cpu: CpuState,
    /// Interrupt sources pending at the time of the snapshot.
    pub irq: u8,
    pub vdp: VdpState,
    pub psg: PsgState,
    pub cartridge: Option<CartridgeState>,
}

impl MachineState {
    pub fn to_json(&self) -> MachineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> MachineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> MachineResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> MachineResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
