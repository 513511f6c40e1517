//! Virtual clock and discrete-event scheduler for cycle-accurate emulation.
//!
//! Everything is measured in ticks of one master time base. Devices view it
//! through clocks of their own frequency and ask the [`Scheduler`] to call
//! them back at the instants where something happens. No floating point, no
//! drift.

mod clock;
mod error;
mod observable;
mod registry;
mod schedulable;
mod scheduler;
mod sync_point;
mod time;

pub use clock::{Clock, DynamicClock};
pub use error::{ClockError, SchedulerError};
pub use observable::{Observable, Value};
pub use registry::DeviceId;
pub use schedulable::Schedulable;
pub use scheduler::{Scheduler, SchedulerState};
pub use time::{EmuDuration, EmuTime, MAIN_FREQ, rescale};
