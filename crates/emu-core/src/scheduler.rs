//! Discrete-event scheduler driving every device from one virtual clock.
//!
//! The driving loop (normally the CPU) asks [`Scheduler::next`] how far it
//! may run, runs that far, then calls [`Scheduler::schedule`] with its new
//! time. `schedule` fires every sync point at or before that time, in time
//! order, ties broken by registration order.
//!
//! All methods take `&self` so that device callbacks, which receive the
//! scheduler by shared reference, can register and cancel points and even
//! call `schedule` again. A nested `schedule` never drains the queue itself;
//! it records progress and leaves the remaining points to the outer drain.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::registry::DeviceRegistry;
use crate::sync_point::{SyncPoint, SyncPointQueue};
use crate::{DeviceId, EmuTime, Observable, Schedulable, SchedulerError, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DrainState {
    Idle,
    Draining,
}

/// Holds the scheduler in `Draining` for its lifetime, including while
/// unwinding out of a panicking callback.
struct DrainGuard<'a> {
    state: &'a Cell<DrainState>,
}

impl<'a> DrainGuard<'a> {
    fn enter(state: &'a Cell<DrainState>) -> Self {
        debug_assert_eq!(state.get(), DrainState::Idle);
        state.set(DrainState::Draining);
        Self { state }
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.state.set(DrainState::Idle);
    }
}

/// Scheduler time captured for a save-state.
///
/// Pending points are not part of it: every device saves enough of its own
/// state to re-register its points after the time has been restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerState {
    pub current_time: EmuTime,
}

/// The event queue and the clock that all devices share.
#[derive(Debug)]
pub struct Scheduler {
    queue: RefCell<SyncPointQueue>,
    devices: RefCell<DeviceRegistry>,
    current_time: Cell<EmuTime>,
    /// Copy of the queue front so the fast path never touches the heap.
    next_time: Cell<EmuTime>,
    next_seq: Cell<u64>,
    state: Cell<DrainState>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(SyncPointQueue::new()),
            devices: RefCell::new(DeviceRegistry::default()),
            current_time: Cell::new(EmuTime::ZERO),
            next_time: Cell::new(EmuTime::INFINITY),
            next_seq: Cell::new(0),
            state: Cell::new(DrainState::Idle),
        }
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    /// Register a device. The scheduler keeps only a weak reference.
    pub fn register<D: Schedulable + 'static>(&self, device: &Rc<RefCell<D>>) -> DeviceId {
        let device: Rc<RefCell<dyn Schedulable>> = device.clone();
        let id = self.devices.borrow_mut().insert(Rc::downgrade(&device));
        debug!(%id, "device registered");
        id
    }

    /// Construct and register a device that needs its own id up front.
    pub fn create_device<D, F>(&self, make: F) -> Rc<RefCell<D>>
    where
        D: Schedulable + 'static,
        F: FnOnce(DeviceId) -> D,
    {
        let id = self.devices.borrow_mut().reserve();
        let device = Rc::new(RefCell::new(make(id)));
        let erased: Rc<RefCell<dyn Schedulable>> = device.clone();
        self.devices.borrow_mut().fill(id, Rc::downgrade(&erased));
        debug!(%id, name = device.borrow().name(), "device created");
        device
    }

    /// Cancel all of the device's points and invalidate its id.
    ///
    /// Returns the number of points cancelled.
    pub fn unregister(&self, device: DeviceId) -> usize {
        let cancelled = self.remove_sync_points(device);
        self.devices.borrow_mut().remove(device);
        debug!(id = %device, cancelled, "device unregistered");
        cancelled
    }

    #[must_use]
    pub fn is_registered(&self, device: DeviceId) -> bool {
        self.devices.borrow().is_current(device)
    }

    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.borrow().len()
    }

    // -----------------------------------------------------------------------
    // Sync points
    // -----------------------------------------------------------------------

    /// Ask for `device.execute_until(time, tag)` once emulation reaches
    /// `time`.
    ///
    /// # Panics
    ///
    /// If `time` is before the current time, or `device` is not registered.
    pub fn set_sync_point(&self, time: EmuTime, device: DeviceId, tag: u32) {
        assert!(
            time >= self.current_time.get(),
            "sync point for {device} at {time} is before current time {}",
            self.current_time.get()
        );
        self.assert_registered(device);
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);

        let mut queue = self.queue.borrow_mut();
        queue.push(SyncPoint::new(time, device, tag, seq));
        self.next_time.set(queue.front_time());
    }

    /// Cancel one pending point of `device` with `tag`. When several match,
    /// which one is removed is unspecified.
    pub fn remove_sync_point(&self, device: DeviceId, tag: u32) -> bool {
        self.assert_registered(device);
        let mut queue = self.queue.borrow_mut();
        let removed = queue
            .remove_first(|sp| sp.device == device && sp.tag == tag)
            .is_some();
        self.next_time.set(queue.front_time());
        removed
    }

    /// Cancel every pending point of `device`.
    pub fn remove_sync_points(&self, device: DeviceId) -> usize {
        self.assert_registered(device);
        let mut queue = self.queue.borrow_mut();
        let removed = queue.remove_all(|sp| sp.device == device);
        self.next_time.set(queue.front_time());
        removed
    }

    #[must_use]
    pub fn pending_sync_point(&self, device: DeviceId, tag: u32) -> bool {
        self.queue
            .borrow()
            .contains(|sp| sp.device == device && sp.tag == tag)
    }

    // -----------------------------------------------------------------------
    // Time
    // -----------------------------------------------------------------------

    /// The latest instant emulation has reached.
    #[must_use]
    pub fn current_time(&self) -> EmuTime {
        self.current_time.get()
    }

    /// Time of the earliest pending point, [`EmuTime::INFINITY`] if none.
    #[inline]
    #[must_use]
    pub fn next(&self) -> EmuTime {
        self.next_time.get()
    }

    /// Advance emulation to `limit`, firing every point at or before it.
    ///
    /// Called once per driving-loop step; the common case, nothing due, is
    /// a single comparison.
    #[inline]
    pub fn schedule(&self, limit: EmuTime) {
        if limit < self.next_time.get() {
            debug_assert!(
                limit >= self.current_time.get(),
                "schedule({limit}) moves time backwards from {}",
                self.current_time.get()
            );
            self.current_time.set(limit);
        } else {
            self.schedule_helper(limit);
        }
    }

    #[cold]
    #[inline(never)]
    fn schedule_helper(&self, limit: EmuTime) {
        if self.state.get() == DrainState::Draining {
            // Never run ahead of a point the outer drain has yet to fire.
            let reached = limit.min(self.next_time.get());
            if reached > self.current_time.get() {
                self.current_time.set(reached);
            }
            trace!(%limit, %reached, "nested schedule deferred to outer drain");
            return;
        }

        let _guard = DrainGuard::enter(&self.state);
        while let Some(point) = self.pop_due(limit) {
            self.current_time.set(point.time);
            self.dispatch(point);
        }
        if limit > self.current_time.get() {
            self.current_time.set(limit);
        }
    }

    fn pop_due(&self, limit: EmuTime) -> Option<SyncPoint> {
        let mut queue = self.queue.borrow_mut();
        if queue.front()?.time > limit {
            return None;
        }
        let point = queue.pop();
        self.next_time.set(queue.front_time());
        point
    }

    fn dispatch(&self, point: SyncPoint) {
        let device = self.devices.borrow().upgrade(point.device);
        let Some(device) = device else {
            panic!(
                "sync point at {} fired for device {} which was dropped without cancelling it",
                point.time, point.device
            );
        };
        let mut device = device.borrow_mut();
        trace!(
            device = device.name(),
            time = %point.time,
            tag = point.tag,
            "sync point"
        );
        device.execute_until(point.time, point.tag, self);
    }

    // -----------------------------------------------------------------------
    // Diagnostics and save-state
    // -----------------------------------------------------------------------

    /// Number of pending points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// True while a `schedule` call is firing points.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.state.get() == DrainState::Draining
    }

    #[must_use]
    pub fn save_state(&self) -> SchedulerState {
        SchedulerState {
            current_time: self.current_time.get(),
        }
    }

    /// Restore the current time. Devices re-register their points
    /// afterwards, so the queue must be empty.
    pub fn restore_state(&self, state: SchedulerState) -> Result<(), SchedulerError> {
        if self.is_draining() {
            return Err(SchedulerError::Draining);
        }
        let pending = self.len();
        if pending > 0 {
            return Err(SchedulerError::PointsPending(pending));
        }
        self.current_time.set(state.current_time);
        debug!(time = %state.current_time, "scheduler state restored");
        Ok(())
    }

    fn assert_registered(&self, device: DeviceId) {
        assert!(
            self.devices.borrow().is_current(device),
            "device {device} is not registered with this scheduler"
        );
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let devices: Vec<_> = self.devices.get_mut().live().collect();
        for device in devices {
            if let Ok(mut device) = device.try_borrow_mut() {
                device.scheduler_deleted();
            }
        }
    }
}

impl Observable for Scheduler {
    fn query(&self, path: &str) -> Option<Value> {
        match path {
            "time" => Some(Value::Time(self.current_time())),
            "next" => Some(Value::Time(self.next())),
            "pending" => Some(Value::Count(self.len() as u64)),
            "draining" => Some(Value::Bool(self.is_draining())),
            "devices" => Some(Value::Count(self.device_count() as u64)),
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        &["time", "next", "pending", "draining", "devices"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmuDuration;
    use std::panic::{AssertUnwindSafe, catch_unwind};

    type Log = Rc<RefCell<Vec<(&'static str, u64, u32)>>>;

    fn t(ticks: u64) -> EmuTime {
        EmuTime::from_ticks(ticks)
    }

    /// Records every callback it receives.
    struct Probe {
        name: &'static str,
        log: Log,
    }

    impl Schedulable for Probe {
        fn execute_until(&mut self, time: EmuTime, tag: u32, _scheduler: &Scheduler) {
            self.log.borrow_mut().push((self.name, time.ticks(), tag));
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn probe(
        scheduler: &Scheduler,
        name: &'static str,
        log: &Log,
    ) -> (Rc<RefCell<Probe>>, DeviceId) {
        let device = Rc::new(RefCell::new(Probe {
            name,
            log: Rc::clone(log),
        }));
        let id = scheduler.register(&device);
        (device, id)
    }

    #[test]
    fn points_due_by_limit_fire_in_registration_order() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        let (_b, b) = probe(&scheduler, "b", &log);

        scheduler.set_sync_point(t(10), b, 0);
        scheduler.set_sync_point(t(10), a, 1);
        scheduler.set_sync_point(t(30), a, 2);
        scheduler.schedule(t(25));

        assert_eq!(scheduler.current_time(), t(25));
        assert_eq!(*log.borrow(), vec![("b", 10, 0), ("a", 10, 1)]);
        assert_eq!(scheduler.next(), t(30));
        assert!(scheduler.pending_sync_point(a, 2));
    }

    #[test]
    fn fast_path_advances_without_callbacks() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(100), a, 0);

        scheduler.schedule(t(50));
        scheduler.schedule(t(99));

        assert!(log.borrow().is_empty());
        assert_eq!(scheduler.current_time(), t(99));
        assert_eq!(scheduler.next(), t(100));
    }

    #[test]
    fn boundary_is_inclusive() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(40), a, 3);

        scheduler.schedule(t(40));

        assert_eq!(*log.borrow(), vec![("a", 40, 3)]);
        assert_eq!(scheduler.current_time(), t(40));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn fires_in_time_order_regardless_of_registration_order() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        let (_b, b) = probe(&scheduler, "b", &log);
        scheduler.set_sync_point(t(30), a, 0);
        scheduler.set_sync_point(t(10), b, 0);
        scheduler.set_sync_point(t(20), a, 1);
        scheduler.set_sync_point(t(5), b, 1);

        scheduler.schedule(t(30));

        assert_eq!(
            *log.borrow(),
            vec![("b", 5, 1), ("b", 10, 0), ("a", 20, 1), ("a", 30, 0)]
        );
    }

    #[test]
    fn equal_times_fire_in_registration_order_every_run() {
        let run = || {
            let scheduler = Scheduler::new();
            let log = Log::default();
            let (_a, a) = probe(&scheduler, "a", &log);
            let (_b, b) = probe(&scheduler, "b", &log);
            let (_c, c) = probe(&scheduler, "c", &log);
            for (device, tag) in [(c, 0), (a, 0), (b, 0), (a, 1), (c, 1)] {
                scheduler.set_sync_point(t(10), device, tag);
            }
            scheduler.schedule(t(10));
            log.take()
        };
        let first = run();
        assert_eq!(
            first,
            vec![("c", 10, 0), ("a", 10, 0), ("b", 10, 0), ("a", 10, 1), ("c", 10, 1)]
        );
        for _ in 0..10 {
            assert_eq!(run(), first);
        }
    }

    #[test]
    fn tie_order_survives_interior_removal() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        let (_b, b) = probe(&scheduler, "b", &log);
        let (_c, c) = probe(&scheduler, "c", &log);
        let (_d, d) = probe(&scheduler, "d", &log);
        for device in [a, b, c, d] {
            scheduler.set_sync_point(t(10), device, 0);
        }
        scheduler.set_sync_point(t(5), d, 9);

        assert!(scheduler.remove_sync_point(b, 0));
        scheduler.schedule(t(10));

        assert_eq!(
            *log.borrow(),
            vec![("d", 5, 9), ("a", 10, 0), ("c", 10, 0), ("d", 10, 0)]
        );
    }

    #[test]
    fn remove_sync_point_cancels_exactly_one() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), a, 7);
        scheduler.set_sync_point(t(20), a, 7);

        assert!(scheduler.remove_sync_point(a, 7));
        assert!(scheduler.pending_sync_point(a, 7));
        assert!(scheduler.remove_sync_point(a, 7));
        assert!(!scheduler.pending_sync_point(a, 7));
        assert!(!scheduler.remove_sync_point(a, 7));
        assert_eq!(scheduler.next(), EmuTime::INFINITY);
    }

    #[test]
    fn remove_sync_points_cancels_every_point_of_device() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        let (_b, b) = probe(&scheduler, "b", &log);
        scheduler.set_sync_point(t(10), a, 0);
        scheduler.set_sync_point(t(20), a, 1);
        scheduler.set_sync_point(t(30), a, 2);
        scheduler.set_sync_point(t(15), b, 0);

        assert_eq!(scheduler.remove_sync_points(a), 3);
        scheduler.schedule(t(100));

        assert_eq!(*log.borrow(), vec![("b", 15, 0)]);
    }

    #[test]
    fn pending_query_does_not_mutate() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), a, 1);

        assert!(scheduler.pending_sync_point(a, 1));
        assert!(!scheduler.pending_sync_point(a, 0));
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.next(), t(10));
    }

    /// Re-arms itself `delay` ticks later, `remaining` more times.
    struct Repeater {
        id: DeviceId,
        delay: u64,
        remaining: u32,
        fired: Vec<u64>,
    }

    impl Schedulable for Repeater {
        fn execute_until(&mut self, time: EmuTime, _tag: u32, scheduler: &Scheduler) {
            self.fired.push(time.ticks());
            if self.remaining > 0 {
                self.remaining -= 1;
                scheduler.set_sync_point(time + EmuDuration::from_ticks(self.delay), self.id, 0);
            }
        }
    }

    #[test]
    fn callback_may_register_for_the_current_instant() {
        let scheduler = Scheduler::new();
        let rep = scheduler.create_device(|id| Repeater {
            id,
            delay: 0,
            remaining: 2,
            fired: Vec::new(),
        });
        let id = rep.borrow().id;
        scheduler.set_sync_point(t(10), id, 0);

        scheduler.schedule(t(10));

        assert_eq!(rep.borrow().fired, vec![10, 10, 10]);
        assert_eq!(scheduler.current_time(), t(10));
    }

    #[test]
    fn periodic_device_fires_each_period_up_to_limit() {
        let scheduler = Scheduler::new();
        let rep = scheduler.create_device(|id| Repeater {
            id,
            delay: 100,
            remaining: u32::MAX,
            fired: Vec::new(),
        });
        let id = rep.borrow().id;
        scheduler.set_sync_point(t(100), id, 0);

        scheduler.schedule(t(450));

        assert_eq!(rep.borrow().fired, vec![100, 200, 300, 400]);
        assert_eq!(scheduler.next(), t(500));
    }

    /// Cancels another device's points from inside its own callback.
    struct Canceller {
        victim: DeviceId,
    }

    impl Schedulable for Canceller {
        fn execute_until(&mut self, _time: EmuTime, _tag: u32, scheduler: &Scheduler) {
            scheduler.remove_sync_points(self.victim);
        }
    }

    #[test]
    fn callback_may_cancel_points_of_other_devices() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_v, victim) = probe(&scheduler, "victim", &log);
        let canceller = Rc::new(RefCell::new(Canceller { victim }));
        let c = scheduler.register(&canceller);
        scheduler.set_sync_point(t(10), c, 0);
        scheduler.set_sync_point(t(10), victim, 0);
        scheduler.set_sync_point(t(12), victim, 1);

        scheduler.schedule(t(20));

        assert!(log.borrow().is_empty());
    }

    /// Runs a nested driving loop from inside its callback, the way a
    /// device that steals bus cycles would.
    struct SubLoop {
        steps: Vec<u64>,
        seen: Vec<(u64, bool)>,
    }

    impl Schedulable for SubLoop {
        fn execute_until(&mut self, _time: EmuTime, _tag: u32, scheduler: &Scheduler) {
            for &step in &self.steps {
                scheduler.schedule(t(step));
                self.seen
                    .push((scheduler.current_time().ticks(), scheduler.is_draining()));
            }
        }
    }

    #[test]
    fn nested_schedule_neither_refires_nor_skips() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let sub = Rc::new(RefCell::new(SubLoop {
            steps: vec![11, 13, 20],
            seen: Vec::new(),
        }));
        let s = scheduler.register(&sub);
        let (_p, p) = probe(&scheduler, "p", &log);
        scheduler.set_sync_point(t(10), s, 0);
        scheduler.set_sync_point(t(12), p, 0);
        scheduler.set_sync_point(t(15), p, 1);
        scheduler.set_sync_point(t(40), p, 2);

        scheduler.schedule(t(30));

        // Nested calls only record progress, never past the next due point.
        assert_eq!(sub.borrow().seen, vec![(11, true), (12, true), (12, true)]);
        assert_eq!(*log.borrow(), vec![("p", 12, 0), ("p", 15, 1)]);
        assert_eq!(scheduler.current_time(), t(30));
        assert_eq!(scheduler.next(), t(40));
        assert!(!scheduler.is_draining());
    }

    #[test]
    #[should_panic(expected = "before current time")]
    fn scheduling_into_the_past_panics() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.schedule(t(100));
        scheduler.set_sync_point(t(99), a, 0);
    }

    #[test]
    #[should_panic(expected = "dropped without cancelling")]
    fn dropped_device_with_pending_point_panics() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (a_dev, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), a, 0);
        drop(a_dev);
        scheduler.schedule(t(10));
    }

    #[test]
    fn unregister_cancels_points_and_invalidates_id() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), a, 0);
        scheduler.set_sync_point(t(20), a, 1);

        assert_eq!(scheduler.unregister(a), 2);
        assert!(!scheduler.is_registered(a));
        assert_eq!(scheduler.device_count(), 0);
        scheduler.schedule(t(30));
        assert!(log.borrow().is_empty());
    }

    #[test]
    #[should_panic(expected = "not registered")]
    fn stale_id_panics() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.unregister(a);
        scheduler.set_sync_point(t(10), a, 0);
    }

    struct Detaching {
        detached: bool,
    }

    impl Schedulable for Detaching {
        fn execute_until(&mut self, _time: EmuTime, _tag: u32, _scheduler: &Scheduler) {}

        fn scheduler_deleted(&mut self) {
            self.detached = true;
        }
    }

    #[test]
    fn dropping_scheduler_notifies_live_devices() {
        let device = Rc::new(RefCell::new(Detaching { detached: false }));
        let gone = Rc::new(RefCell::new(Detaching { detached: false }));
        {
            let scheduler = Scheduler::new();
            scheduler.register(&device);
            let id = scheduler.register(&gone);
            scheduler.unregister(id);
        }
        assert!(device.borrow().detached);
        assert!(!gone.borrow().detached);
    }

    struct Exploding;

    impl Schedulable for Exploding {
        fn execute_until(&mut self, _time: EmuTime, _tag: u32, _scheduler: &Scheduler) {
            panic!("device fault");
        }
    }

    #[test]
    fn panicking_callback_leaves_scheduler_idle() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let bomb = Rc::new(RefCell::new(Exploding));
        let b = scheduler.register(&bomb);
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), b, 0);
        scheduler.set_sync_point(t(20), a, 0);

        let result = catch_unwind(AssertUnwindSafe(|| scheduler.schedule(t(30))));

        assert!(result.is_err());
        assert!(!scheduler.is_draining());
        scheduler.schedule(t(30));
        assert_eq!(*log.borrow(), vec![("a", 20, 0)]);
    }

    #[test]
    fn restore_requires_empty_queue() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), a, 0);
        let state = SchedulerState {
            current_time: t(5_000),
        };

        assert_eq!(
            scheduler.restore_state(state),
            Err(SchedulerError::PointsPending(1))
        );
        scheduler.remove_sync_points(a);
        assert_eq!(scheduler.restore_state(state), Ok(()));
        assert_eq!(scheduler.current_time(), t(5_000));
        assert_eq!(scheduler.save_state(), state);
    }

    struct Restorer {
        result: Option<Result<(), SchedulerError>>,
    }

    impl Schedulable for Restorer {
        fn execute_until(&mut self, _time: EmuTime, _tag: u32, scheduler: &Scheduler) {
            self.result = Some(scheduler.restore_state(SchedulerState {
                current_time: EmuTime::ZERO,
            }));
        }
    }

    #[test]
    fn restore_is_refused_while_draining() {
        let scheduler = Scheduler::new();
        let restorer = Rc::new(RefCell::new(Restorer { result: None }));
        let r = scheduler.register(&restorer);
        scheduler.set_sync_point(t(10), r, 0);

        scheduler.schedule(t(10));

        assert_eq!(restorer.borrow().result, Some(Err(SchedulerError::Draining)));
        assert_eq!(scheduler.current_time(), t(10));
    }

    #[test]
    fn observable_state() {
        let scheduler = Scheduler::new();
        let log = Log::default();
        let (_a, a) = probe(&scheduler, "a", &log);
        scheduler.set_sync_point(t(10), a, 0);
        scheduler.schedule(t(4));

        assert_eq!(scheduler.query("time"), Some(Value::Time(t(4))));
        assert_eq!(scheduler.query("next"), Some(Value::Time(t(10))));
        assert_eq!(scheduler.query("pending"), Some(Value::Count(1)));
        assert_eq!(scheduler.query("draining"), Some(Value::Bool(false)));
        assert_eq!(scheduler.query("devices"), Some(Value::Count(1)));
        assert_eq!(scheduler.query("bogus"), None);
        for path in scheduler.query_paths() {
            assert!(scheduler.query(path).is_some(), "{path}");
        }
    }
}
