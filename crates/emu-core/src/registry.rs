//! Non-owning table of the devices a scheduler can call back.
//!
//! Sync points name their device by [`DeviceId`], never by reference. The
//! table holds only `Weak` pointers; the owning container keeps the device
//! alive. Slots are recycled with a bumped generation, so an id that has
//! been unregistered can never address a later device.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::Schedulable;

/// Handle to a device registered with a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId {
    index: u32,
    generation: u32,
}

impl DeviceId {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot number. Unique among currently registered devices.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

pub(crate) type DeviceRef = Rc<RefCell<dyn Schedulable>>;

#[derive(Debug)]
enum SlotState {
    Free,
    /// Id handed out, device still being constructed.
    Reserved,
    Live(Weak<RefCell<dyn Schedulable>>),
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    state: SlotState,
}

#[derive(Debug, Default)]
pub(crate) struct DeviceRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl DeviceRegistry {
    pub(crate) fn reserve(&mut self) -> DeviceId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = SlotState::Reserved;
            return DeviceId::new(index, slot.generation);
        }
        let index = u32::try_from(self.slots.len()).unwrap_or_else(|_| {
            panic!("device registry full");
        });
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Reserved,
        });
        DeviceId::new(index, 0)
    }

    pub(crate) fn fill(&mut self, id: DeviceId, device: Weak<RefCell<dyn Schedulable>>) {
        let slot = self.slot_mut(id);
        debug_assert!(matches!(slot.state, SlotState::Reserved));
        slot.state = SlotState::Live(device);
    }

    pub(crate) fn insert(&mut self, device: Weak<RefCell<dyn Schedulable>>) -> DeviceId {
        let id = self.reserve();
        self.fill(id, device);
        id
    }

    /// Free the slot. Returns false for stale or unknown ids.
    pub(crate) fn remove(&mut self, id: DeviceId) -> bool {
        if !self.is_current(id) {
            return false;
        }
        let slot = &mut self.slots[id.index as usize];
        slot.state = SlotState::Free;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        true
    }

    pub(crate) fn is_current(&self, id: DeviceId) -> bool {
        self.slots
            .get(id.index as usize)
            .is_some_and(|slot| {
                slot.generation == id.generation && !matches!(slot.state, SlotState::Free)
            })
    }

    /// The live device behind `id`, if it is registered and not dropped.
    pub(crate) fn upgrade(&self, id: DeviceId) -> Option<DeviceRef> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        match &slot.state {
            SlotState::Live(device) => device.upgrade(),
            SlotState::Free | SlotState::Reserved => None,
        }
    }

    pub(crate) fn live(&self) -> impl Iterator<Item = DeviceRef> + '_ {
        self.slots.iter().filter_map(|slot| match &slot.state {
            SlotState::Live(device) => device.upgrade(),
            SlotState::Free | SlotState::Reserved => None,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn slot_mut(&mut self, id: DeviceId) -> &mut Slot {
        assert!(self.is_current(id), "unknown device {id}");
        &mut self.slots[id.index as usize]
    }
}
