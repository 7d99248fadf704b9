//! Execution-unit collaborator contract.
//!
//! The instruction-set interpreter itself is not part of this crate.
//! The board advances each CPU through an opaque [`ExecutionUnit`]
//! that performs every memory access through the [`BusAccess`] view it
//! is handed, which routes through that CPU's own address space. Tests
//! drive the scheduler with scripted units instead of real cores.

use crate::core::board::BoardState;
use crate::core::irq::LineKind;
use crate::core::map::AddressSpace;

/// The bus as one CPU sees it. Every access an execution unit makes
/// must go through this view so the correct per-CPU map is used.
pub trait BusAccess {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, data: u8);
}

/// Opaque CPU interpreter driven by the frame scheduler.
pub trait ExecutionUnit {
    /// Run for up to `budget` cycles, returning the cycles actually
    /// consumed (never more than `budget`). A unit that detects a
    /// side-effect-free poll loop may return early (spin until
    /// interrupt); the scheduler burns the remainder, so total frame
    /// accounting is unaffected. Correctness must not depend on
    /// whether a unit implements the optimization.
    fn advance(&mut self, bus: &mut dyn BusAccess, budget: u64) -> u64;

    /// Vector to the interrupt entry for `line` at the start of the
    /// next slice. Called by the scheduler after acknowledging a
    /// pending assertion; never called while the unit is reset-held.
    fn inject_interrupt(&mut self, line: LineKind);

    /// Reset line edge. While asserted the unit is not advanced at
    /// all; on release execution restarts from the power-on entry.
    fn assert_reset(&mut self, held: bool);
}

/// Concrete [`BusAccess`] pairing one CPU's map with the board state.
pub struct CpuBus<'a> {
    pub(crate) map: &'a AddressSpace,
    pub(crate) state: &'a mut BoardState,
}

impl BusAccess for CpuBus<'_> {
    fn read(&mut self, addr: u16) -> u8 {
        self.map.read(self.state, addr)
    }

    fn write(&mut self, addr: u16, data: u8) {
        self.map.write(self.state, addr, data);
    }
}
