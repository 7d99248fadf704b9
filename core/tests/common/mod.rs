use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use coinop_core::core::irq::LineKind;
use coinop_core::cpu::{BusAccess, ExecutionUnit};

/// One scripted bus access.
pub enum Op {
    Read(u16),
    Write(u16, u8),
}

/// Everything a scripted unit observed, shared with the test body.
#[derive(Default)]
pub struct UnitLog {
    /// (address, value) pairs in read order.
    pub reads: Vec<(u16, u8)>,
    pub interrupts: Vec<LineKind>,
    /// Reset-line edges in delivery order (true = asserted).
    pub resets: Vec<bool>,
    /// Number of `advance()` calls.
    pub advances: u32,
}

/// Scripted execution unit for driving the frame scheduler without a
/// real CPU core. Each `advance()` call pops one batch of bus
/// operations and performs them through the provided bus view.
pub struct ScriptedUnit {
    log: Rc<RefCell<UnitLog>>,
    script: VecDeque<Vec<Op>>,
    consume: Option<u64>,
}

impl ScriptedUnit {
    pub fn new() -> Self {
        Self {
            log: Rc::new(RefCell::new(UnitLog::default())),
            script: VecDeque::new(),
            consume: None,
        }
    }

    pub fn log(&self) -> Rc<RefCell<UnitLog>> {
        Rc::clone(&self.log)
    }

    /// Queue a batch of bus operations for the next unscripted
    /// `advance()` call. Batches run one per call, in queue order.
    pub fn queue(&mut self, ops: Vec<Op>) {
        self.script.push_back(ops);
    }

    /// Make every `advance()` report `cycles` consumed instead of the
    /// full budget, imitating a spin-until-interrupt yield.
    pub fn yield_after(&mut self, cycles: u64) {
        self.consume = Some(cycles);
    }
}

impl ExecutionUnit for ScriptedUnit {
    fn advance(&mut self, bus: &mut dyn BusAccess, budget: u64) -> u64 {
        self.log.borrow_mut().advances += 1;
        if let Some(ops) = self.script.pop_front() {
            for op in ops {
                match op {
                    Op::Read(addr) => {
                        let value = bus.read(addr);
                        self.log.borrow_mut().reads.push((addr, value));
                    }
                    Op::Write(addr, data) => bus.write(addr, data),
                }
            }
        }
        self.consume.map_or(budget, |c| c.min(budget))
    }

    fn inject_interrupt(&mut self, line: LineKind) {
        self.log.borrow_mut().interrupts.push(line);
    }

    fn assert_reset(&mut self, held: bool) {
        self.log.borrow_mut().resets.push(held);
    }
}
