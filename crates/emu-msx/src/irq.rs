//! Shared interrupt request line.
//!
//! Several devices pull the CPU's single INT line. Each source owns one bit;
//! the line is asserted while any bit is set.

use std::cell::Cell;
use std::rc::Rc;

/// Vertical blank (end of frame).
pub const IRQ_VDP_VSYNC: u8 = 0x01;
/// Programmed scanline reached.
pub const IRQ_VDP_LINE: u8 = 0x02;
/// Cartridge timer expired.
pub const IRQ_CARTRIDGE: u8 = 0x04;

/// Cloneable handle to the interrupt line. All clones see the same bits.
#[derive(Debug, Clone, Default)]
pub struct IrqLine(Rc<Cell<u8>>);

impl IrqLine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self, source: u8) {
        self.0.set(self.0.get() | source);
    }

    pub fn lower(&self, source: u8) {
        self.0.set(self.0.get() & !source);
    }

    /// Bitmask of sources currently requesting an interrupt.
    #[must_use]
    pub fn pending(&self) -> u8 {
        self.0.get()
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.get() != 0
    }

    /// Acknowledge every source, returning the bits that were set.
    pub fn clear(&self) -> u8 {
        self.0.replace(0)
    }

    pub(crate) fn set(&self, bits: u8) {
        self.0.set(bits);
    }
}
