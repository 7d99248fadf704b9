use std::cell::RefCell;
use std::rc::Rc;

use coinop_core::core::irq::LineKind;
use coinop_core::cpu::{BusAccess, ExecutionUnit};

/// Scheduler-visible events observed by one tracing unit.
#[derive(Default)]
pub struct Trace {
    pub interrupts: Vec<LineKind>,
    /// Reset-line edges in delivery order (true = asserted).
    pub resets: Vec<bool>,
    pub advances: u32,
}

/// Execution unit that records what the board does to it and
/// otherwise burns its full budget. Board wiring is exercised through
/// the host bus accessors instead of instruction streams.
pub struct TracingUnit {
    trace: Rc<RefCell<Trace>>,
}

impl TracingUnit {
    pub fn new() -> Self {
        Self {
            trace: Rc::new(RefCell::new(Trace::default())),
        }
    }

    pub fn trace(&self) -> Rc<RefCell<Trace>> {
        Rc::clone(&self.trace)
    }
}

impl ExecutionUnit for TracingUnit {
    fn advance(&mut self, _bus: &mut dyn BusAccess, budget: u64) -> u64 {
        self.trace.borrow_mut().advances += 1;
        budget
    }

    fn inject_interrupt(&mut self, line: LineKind) {
        self.trace.borrow_mut().interrupts.push(line);
    }

    fn assert_reset(&mut self, held: bool) {
        self.trace.borrow_mut().resets.push(held);
    }
}
