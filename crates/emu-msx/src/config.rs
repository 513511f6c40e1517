//! Machine configuration.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid
//! configuration for a plain NTSC machine without a cartridge.

use std::path::Path;

use emu_core::{DynamicClock, EmuTime};
use serde::{Deserialize, Serialize};

use crate::{CPU_FREQ, MachineError, MachineResult};

/// Video timing standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStandard {
    /// 60 Hz, 262 lines.
    #[default]
    Ntsc,
    /// 50 Hz, 313 lines.
    Pal,
}

impl VideoStandard {
    #[must_use]
    pub const fn lines_per_frame(self) -> u16 {
        match self {
            Self::Ntsc => 262,
            Self::Pal => 313,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VideoConfig {
    pub standard: VideoStandard,
    /// Scanline whose end raises the line interrupt. `None` disables it.
    pub line_interrupt: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CpuConfig {
    /// Fixed cost of every instruction, in CPU cycles.
    pub cycles_per_instruction: u64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            cycles_per_instruction: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsgConfig {
    /// Sample period in CPU cycles. 81 gives ~44.19 kHz.
    pub divider: u64,
}

impl Default for PsgConfig {
    fn default() -> Self {
        Self { divider: 81 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CartridgeConfig {
    /// Timer period in CPU cycles.
    pub timer_period: u16,
    /// Whether the timer runs from power-on.
    pub enabled: bool,
}

impl Default for CartridgeConfig {
    fn default() -> Self {
        Self {
            timer_period: 59_659,
            enabled: true,
        }
    }
}

/// Configuration for creating a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    pub video: VideoConfig,
    pub cpu: CpuConfig,
    pub psg: PsgConfig,
    pub cartridge: Option<CartridgeConfig>,
}

impl MachineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> MachineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> MachineResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> MachineResult<()> {
        if self.cpu.cycles_per_instruction == 0 {
            return Err(MachineError::InvalidConfig(
                "cpu.cycles_per_instruction must be non-zero".into(),
            ));
        }
        DynamicClock::with_freq_ratio(EmuTime::ZERO, CPU_FREQ, self.psg.divider)?;
        if let Some(line) = self.video.line_interrupt {
            let lines = self.video.standard.lines_per_frame();
            if line >= lines {
                return Err(MachineError::InvalidConfig(format!(
                    "video.line_interrupt {line} is outside the {lines}-line frame"
                )));
            }
        }
        if self.cartridge.is_some_and(|c| c.timer_period == 0) {
            return Err(MachineError::InvalidConfig(
                "cartridge.timer_period must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu_core::ClockError;

    #[test]
    fn empty_json_is_default_machine() {
        let config = MachineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, MachineConfig::default());
        assert_eq!(config.video.standard, VideoStandard::Ntsc);
        assert!(config.cartridge.is_none());
    }

    #[test]
    fn parses_full_config() {
        let config = MachineConfig::from_json_str(
            r#"{
                "video": { "standard": "pal", "line_interrupt": 100 },
                "cpu": { "cycles_per_instruction": 8 },
                "psg": { "divider": 32 },
                "cartridge": { "timer_period": 1000 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.video.standard, VideoStandard::Pal);
        assert_eq!(config.video.line_interrupt, Some(100));
        assert_eq!(config.cpu.cycles_per_instruction, 8);
        assert_eq!(config.psg.divider, 32);
        assert_eq!(
            config.cartridge,
            Some(CartridgeConfig {
                timer_period: 1000,
                enabled: true
            })
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = MachineConfig::from_json_str(r#"{ "cpu": { "mhz": 4 } }"#).unwrap_err();
        assert!(matches!(err, MachineError::Json(_)));
    }

    #[test]
    fn rejects_zero_instruction_cost() {
        let err = MachineConfig::from_json_str(r#"{ "cpu": { "cycles_per_instruction": 0 } }"#)
            .unwrap_err();
        assert!(matches!(err, MachineError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_unusable_psg_divider() {
        let err = MachineConfig::from_json_str(r#"{ "psg": { "divider": 0 } }"#).unwrap_err();
        assert!(matches!(err, MachineError::Clock(ClockError::ZeroFrequency)));

        let json = format!(r#"{{ "psg": {{ "divider": {} }} }}"#, u64::MAX);
        let err = MachineConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, MachineError::Clock(ClockError::TooSlow { .. })));
    }

    #[test]
    fn rejects_line_interrupt_past_frame_end() {
        let ok = r#"{ "video": { "standard": "pal", "line_interrupt": 300 } }"#;
        assert!(MachineConfig::from_json_str(ok).is_ok());
        let bad = r#"{ "video": { "standard": "ntsc", "line_interrupt": 300 } }"#;
        assert!(matches!(
            MachineConfig::from_json_str(bad),
            Err(MachineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = MachineConfig::load("/nonexistent/emu-msx.json").unwrap_err();
        assert!(matches!(err, MachineError::Io(_)));
    }
}
