//! Video timing.
//!
//! Only the beam position is modelled: the VDP counts scanlines and frames
//! and raises the vertical blank and line interrupts. Two sync points are
//! kept per frame, one at the frame end and one at the end of the line
//! interrupt scanline when it falls inside the frame.

use emu_core::{DeviceId, EmuDuration, EmuTime, Observable, Schedulable, Scheduler, Value};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::VdpClock;
use crate::config::{VideoConfig, VideoStandard};
use crate::irq::{IRQ_VDP_LINE, IRQ_VDP_VSYNC, IrqLine};

/// End of frame.
pub const TAG_VSYNC: u32 = 0;
/// End of the line interrupt scanline.
pub const TAG_LINE: u32 = 1;

/// VDP cycles per scanline.
pub const CYCLES_PER_LINE: u64 = 1368;

/// Visible lines before the vertical border.
pub const DISPLAY_LINES: u16 = 192;

/// Timing state carried in a save-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VdpState {
    pub standard: VideoStandard,
    pub line_interrupt: Option<u16>,
    pub frame_start: EmuTime,
    pub frame_end: EmuTime,
    pub frames: u64,
    pub lines: u64,
    pub line_irqs: u64,
}

#[derive(Debug)]
pub struct Vdp {
    id: DeviceId,
    irq: IrqLine,
    standard: VideoStandard,
    line_interrupt: Option<u16>,
    frame_start: EmuTime,
    /// Usually `frame_start` plus one frame; shorter when the standard was
    /// switched late in a frame.
    frame_end: EmuTime,
    frames: u64,
    lines: u64,
    line_irqs: u64,
    detached: bool,
}

#[must_use]
pub fn line_duration() -> EmuDuration {
    VdpClock::duration(CYCLES_PER_LINE)
}

#[must_use]
pub fn frame_duration(standard: VideoStandard) -> EmuDuration {
    VdpClock::duration(u64::from(standard.lines_per_frame()) * CYCLES_PER_LINE)
}

impl Vdp {
    /// A VDP whose first frame starts at `now`. Call
    /// [`power_on`](Self::power_on) to register its points.
    #[must_use]
    pub fn new(id: DeviceId, irq: IrqLine, config: &VideoConfig, now: EmuTime) -> Self {
        Self {
            id,
            irq,
            standard: config.standard,
            line_interrupt: config.line_interrupt,
            frame_start: now,
            frame_end: now + frame_duration(config.standard),
            frames: 0,
            lines: 0,
            line_irqs: 0,
            detached: false,
        }
    }

    #[must_use]
    pub fn from_state(id: DeviceId, irq: IrqLine, state: &VdpState) -> Self {
        Self {
            id,
            irq,
            standard: state.standard,
            line_interrupt: state.line_interrupt,
            frame_start: state.frame_start,
            frame_end: state.frame_end,
            frames: state.frames,
            lines: state.lines,
            line_irqs: state.line_irqs,
            detached: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> VdpState {
        VdpState {
            standard: self.standard,
            line_interrupt: self.line_interrupt,
            frame_start: self.frame_start,
            frame_end: self.frame_end,
            frames: self.frames,
            lines: self.lines,
            line_irqs: self.line_irqs,
        }
    }

    /// Register the points of the current frame. Also used after a restore.
    pub fn power_on(&self, scheduler: &Scheduler) {
        self.arm_vsync(scheduler);
        self.arm_line(scheduler);
    }

    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[must_use]
    pub fn standard(&self) -> VideoStandard {
        self.standard
    }

    #[must_use]
    pub fn line_interrupt(&self) -> Option<u16> {
        self.line_interrupt
    }

    #[must_use]
    pub fn frame_end(&self) -> EmuTime {
        self.frame_end
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn line_irqs(&self) -> u64 {
        self.line_irqs
    }

    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Scanline of the current frame being drawn at `time`.
    #[must_use]
    pub fn line_at(&self, time: EmuTime) -> u64 {
        if time <= self.frame_start {
            return 0;
        }
        (time - self.frame_start) / line_duration()
    }

    /// Scanlines completed since power-on, counting the partial frame.
    #[must_use]
    pub fn lines_at(&self, time: EmuTime) -> u64 {
        self.lines + self.line_at(time)
    }

    /// Instant the given scanline of the current frame ends.
    #[must_use]
    pub fn line_end(&self, line: u16) -> EmuTime {
        self.frame_start + VdpClock::duration((u64::from(line) + 1) * CYCLES_PER_LINE)
    }

    /// Move the line interrupt. `None` disables it.
    ///
    /// The pending point is cancelled; the new one is registered only if its
    /// line is still ahead in this frame.
    pub fn set_line_interrupt(&mut self, line: Option<u16>, scheduler: &Scheduler) {
        if line == self.line_interrupt {
            return;
        }
        let cancelled = scheduler.remove_sync_point(self.id, TAG_LINE);
        self.line_interrupt = line;
        self.arm_line(scheduler);
        debug!(?line, cancelled, "line interrupt moved");
    }

    /// Switch video standard. Takes effect in the current frame: if the
    /// new frame length has already been passed, the frame ends at the next
    /// line boundary.
    pub fn set_standard(&mut self, standard: VideoStandard, scheduler: &Scheduler) {
        if standard == self.standard {
            return;
        }
        let now = scheduler.current_time();
        self.standard = standard;
        let mut end = self.frame_start + frame_duration(standard);
        if end <= now {
            end = self.frame_start + line_duration() * (self.line_at(now) + 1);
        }
        self.frame_end = end;

        scheduler.remove_sync_point(self.id, TAG_VSYNC);
        scheduler.remove_sync_point(self.id, TAG_LINE);
        self.power_on(scheduler);
        debug!(?standard, frame_end = %end, "video standard changed");
    }

    fn arm_vsync(&self, scheduler: &Scheduler) {
        scheduler.set_sync_point(self.frame_end, self.id, TAG_VSYNC);
    }

    fn arm_line(&self, scheduler: &Scheduler) {
        let Some(line) = self.line_interrupt else {
            return;
        };
        let time = self.line_end(line);
        if time > scheduler.current_time() && time <= self.frame_end {
            scheduler.set_sync_point(time, self.id, TAG_LINE);
        }
    }

    fn end_frame(&mut self, time: EmuTime, scheduler: &Scheduler) {
        debug_assert_eq!(time, self.frame_end);
        self.lines += (self.frame_end - self.frame_start) / line_duration();
        self.frames += 1;
        self.irq.raise(IRQ_VDP_VSYNC);

        self.frame_start = time;
        self.frame_end = time + frame_duration(self.standard);
        self.power_on(scheduler);
        trace!(frame = self.frames, %time, "vsync");
    }
}

impl Schedulable for Vdp {
    fn execute_until(&mut self, time: EmuTime, tag: u32, scheduler: &Scheduler) {
        match tag {
            TAG_VSYNC => self.end_frame(time, scheduler),
            TAG_LINE => {
                self.line_irqs += 1;
                self.irq.raise(IRQ_VDP_LINE);
            }
            _ => unreachable!("unknown VDP sync point tag {tag}"),
        }
    }

    fn scheduler_deleted(&mut self) {
        self.detached = true;
    }

    fn name(&self) -> &str {
        "vdp"
    }
}

impl Observable for Vdp {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "frames" => Some(self.frames.into()),
            "lines" => Some(self.lines.into()),
            "line_irqs" => Some(self.line_irqs.into()),
            "frame_start" => Some(self.frame_start.into()),
            "frame_end" => Some(self.frame_end.into()),
            "standard" => Some(match self.standard {
                VideoStandard::Ntsc => "ntsc".into(),
                VideoStandard::Pal => "pal".into(),
            }),
            "line_interrupt" => Some(match self.line_interrupt {
                Some(line) => u64::from(line).into(),
                None => Value::Bool(false),
            }),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &[
            "frames",
            "lines",
            "line_irqs",
            "frame_start",
            "frame_end",
            "standard",
            "line_interrupt",
        ]
    }
}
