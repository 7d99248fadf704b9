//! Per-CPU interrupt and reset-line state.
//!
//! Each CPU carries one [`InterruptLine`]: an enable latch written by
//! the program through a memory-mapped register, a pending assertion
//! set by the frame driver or the coprocessor pulse timer, and a
//! reset-hold flag that sibling CPUs can drive. A request made while
//! the latch is disarmed is lost, never queued: the real latch gates
//! the line and the CPU simply never sees the edge.

/// Which physical interrupt line a CPU receives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// Maskable interrupt, IM 1 style. Enable latch arms on bit 0 = 1.
    Irq,
    /// Non-maskable interrupt with the inverted enable latch found on
    /// the reference board: bit 0 = 0 arms. The inversion is a wired
    /// hardware quirk and is preserved exactly.
    Nmi,
}

pub struct InterruptLine {
    kind: LineKind,
    enabled: bool,
    pending: Option<LineKind>,
    reset_held: bool,
}

impl InterruptLine {
    /// Power-on state. The enable latch clears to 0, which leaves an
    /// IRQ-style line disarmed but arms the inverted NMI-style line.
    pub fn new(kind: LineKind) -> Self {
        Self {
            kind,
            enabled: matches!(kind, LineKind::Nmi),
            pending: None,
            reset_held: false,
        }
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Latch write from a memory-mapped register. Disarming drops any
    /// pending assertion, as the 74LS259 latch on the reference board
    /// does.
    pub fn set_enable(&mut self, bit: bool) {
        self.enabled = match self.kind {
            LineKind::Irq => bit,
            LineKind::Nmi => !bit,
        };
        if !self.enabled {
            self.pending = None;
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Assert `line` if the latch is armed; otherwise the request is
    /// dropped. There is no deferred delivery. A reset-held CPU is
    /// powered off and accumulates nothing.
    pub fn request(&mut self, line: LineKind) {
        if self.enabled && !self.reset_held {
            self.pending = Some(line);
        }
    }

    /// Take the pending assertion for injection into the execution
    /// unit. Returns `None` when the line is idle.
    pub fn acknowledge(&mut self) -> Option<LineKind> {
        self.pending.take()
    }

    pub fn line_asserted(&self) -> bool {
        self.pending.is_some()
    }

    /// Drive this CPU's reset line from another CPU's control write.
    /// Asserting it discards any pending interrupt; the CPU restarts
    /// from its reset vector when released.
    pub fn set_reset_held(&mut self, held: bool) {
        if held {
            self.pending = None;
        }
        self.reset_held = held;
    }

    pub fn reset_held(&self) -> bool {
        self.reset_held
    }

    /// Return to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new(self.kind);
    }
}
