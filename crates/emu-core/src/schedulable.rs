//! Trait for devices that receive timed callbacks from the scheduler.

use crate::{EmuTime, Scheduler};

/// A device that can be called back at instants it registered.
///
/// This is the core abstraction for event-driven emulation. A device
/// registers sync points with [`Scheduler::set_sync_point`]; when emulation
/// reaches one, the scheduler calls [`execute_until`](Self::execute_until)
/// with exactly the registered time and tag.
///
/// Devices must cancel their outstanding points (or
/// [`unregister`](Scheduler::unregister)) before they are dropped.
pub trait Schedulable {
    /// Bring the device up to `time` and handle the point tagged `tag`.
    ///
    /// The callback may register new points (including one at `time`
    /// itself), cancel points, or run a nested `schedule`. Points of other
    /// devices may only be touched through the scheduler's public API.
    fn execute_until(&mut self, time: EmuTime, tag: u32, scheduler: &Scheduler);

    /// The scheduler this device was registered with is being dropped.
    ///
    /// Any [`DeviceId`](crate::DeviceId) the device holds is invalid
    /// afterwards.
    fn scheduler_deleted(&mut self) {}

    /// Short name for logs and diagnostics.
    fn name(&self) -> &str {
        "device"
    }
}
