//! Per-CPU memory-map dispatch.
//!
//! Each CPU on a board resolves its 16-bit bus accesses through an
//! [`AddressSpace`]: an ordered table of address ranges bound to ROM
//! backing bytes, windows into the board's shared RAM, handler
//! functions, or explicit no-op regions. Read and write tables are
//! independent, so a ROM region is read-mapped to its bytes while
//! writes to the same addresses fall through and are discarded.
//!
//! Table order matters: the first bound range containing an address
//! services the access, so narrow device registers must be bound
//! before any wider range that shadows them. Overlap between ranges is
//! legal and resolved first-registered-wins. The maps are built once
//! at board construction and are immutable afterwards.

use std::ops::RangeInclusive;

use thiserror::Error;

use crate::core::board::BoardState;

/// Value returned for reads that no device drives. Real hardware
/// floats the bus; we model it as a fixed byte for determinism.
pub const OPEN_BUS: u8 = 0xFF;

/// Read handler: receives the board state and the offset of the access
/// relative to the start of the bound range.
pub type ReadHandler = fn(&mut BoardState, u16) -> u8;

/// Write handler: receives the board state, the range-relative offset,
/// and the byte being written.
pub type WriteHandler = fn(&mut BoardState, u16, u8);

/// Errors detected while binding a range. Always fatal at board
/// construction; never raised at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("malformed address range {start:#06x}-{end:#06x}")]
    MalformedRange { start: u16, end: u16 },
    #[error("rom backing is {got} bytes but range {start:#06x}-{end:#06x} needs {need}")]
    RomSizeMismatch {
        start: u16,
        end: u16,
        got: usize,
        need: usize,
    },
    #[error(
        "shared window {start:#06x}-{end:#06x} at base {base:#06x} overruns the {size}-byte shared region"
    )]
    SharedWindowOverrun {
        start: u16,
        end: u16,
        base: usize,
        size: usize,
    },
}

enum ReadTarget {
    Rom(Vec<u8>),
    Shared { base: usize },
    Handler(ReadHandler),
    NoOp,
}

enum WriteTarget {
    Shared { base: usize },
    Handler(WriteHandler),
    NoOp,
}

struct ReadRange {
    start: u16,
    end: u16,
    target: ReadTarget,
}

struct WriteRange {
    start: u16,
    end: u16,
    target: WriteTarget,
}

/// One CPU's view of the bus: a read table and a write table.
#[derive(Default)]
pub struct AddressSpace {
    reads: Vec<ReadRange>,
    writes: Vec<WriteRange>,
}

fn span(range: &RangeInclusive<u16>) -> Result<(u16, u16, usize), MapError> {
    let (start, end) = (*range.start(), *range.end());
    if start > end {
        return Err(MapError::MalformedRange { start, end });
    }
    Ok((start, end, end as usize - start as usize + 1))
}

impl AddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a ROM region: read-mapped to `backing`, which must match
    /// the range length exactly. Writes are not mapped (discarded).
    pub fn bind_rom(
        &mut self,
        range: RangeInclusive<u16>,
        backing: Vec<u8>,
    ) -> Result<(), MapError> {
        let (start, end, need) = span(&range)?;
        if backing.len() != need {
            return Err(MapError::RomSizeMismatch {
                start,
                end,
                got: backing.len(),
                need,
            });
        }
        self.reads.push(ReadRange {
            start,
            end,
            target: ReadTarget::Rom(backing),
        });
        Ok(())
    }

    /// Bind a read/write window into the board's shared RAM, starting
    /// at `base` within the region. `shared_len` is the region size,
    /// used to reject windows that would run off the end.
    pub fn bind_shared(
        &mut self,
        range: RangeInclusive<u16>,
        base: usize,
        shared_len: usize,
    ) -> Result<(), MapError> {
        let (start, end, need) = span(&range)?;
        if base + need > shared_len {
            return Err(MapError::SharedWindowOverrun {
                start,
                end,
                base,
                size: shared_len,
            });
        }
        self.reads.push(ReadRange {
            start,
            end,
            target: ReadTarget::Shared { base },
        });
        self.writes.push(WriteRange {
            start,
            end,
            target: WriteTarget::Shared { base },
        });
        Ok(())
    }

    pub fn bind_read(
        &mut self,
        range: RangeInclusive<u16>,
        handler: ReadHandler,
    ) -> Result<(), MapError> {
        let (start, end, _) = span(&range)?;
        self.reads.push(ReadRange {
            start,
            end,
            target: ReadTarget::Handler(handler),
        });
        Ok(())
    }

    pub fn bind_write(
        &mut self,
        range: RangeInclusive<u16>,
        handler: WriteHandler,
    ) -> Result<(), MapError> {
        let (start, end, _) = span(&range)?;
        self.writes.push(WriteRange {
            start,
            end,
            target: WriteTarget::Handler(handler),
        });
        Ok(())
    }

    /// Explicit no-device region: reads return [`OPEN_BUS`]. Useful to
    /// shadow part of a wider range registered later.
    pub fn bind_read_noop(&mut self, range: RangeInclusive<u16>) -> Result<(), MapError> {
        let (start, end, _) = span(&range)?;
        self.reads.push(ReadRange {
            start,
            end,
            target: ReadTarget::NoOp,
        });
        Ok(())
    }

    /// Explicit discard region for writes.
    pub fn bind_write_noop(&mut self, range: RangeInclusive<u16>) -> Result<(), MapError> {
        let (start, end, _) = span(&range)?;
        self.writes.push(WriteRange {
            start,
            end,
            target: WriteTarget::NoOp,
        });
        Ok(())
    }

    /// Resolve a read. First matching range wins; no match reads as
    /// [`OPEN_BUS`].
    pub fn read(&self, state: &mut BoardState, addr: u16) -> u8 {
        for r in &self.reads {
            if addr >= r.start && addr <= r.end {
                let off = addr - r.start;
                return match &r.target {
                    ReadTarget::Rom(bytes) => bytes[off as usize],
                    ReadTarget::Shared { base } => state.shared.read(base + off as usize),
                    ReadTarget::Handler(h) => h(state, off),
                    ReadTarget::NoOp => OPEN_BUS,
                };
            }
        }
        OPEN_BUS
    }

    /// Resolve a write. ROM, no-op, and unmapped addresses discard the
    /// byte silently, matching hardware.
    pub fn write(&self, state: &mut BoardState, addr: u16, data: u8) {
        for w in &self.writes {
            if addr >= w.start && addr <= w.end {
                let off = addr - w.start;
                match &w.target {
                    WriteTarget::Shared { base } => state.shared.write(base + off as usize, data),
                    WriteTarget::Handler(h) => h(state, off, data),
                    WriteTarget::NoOp => {}
                }
                return;
            }
        }
    }
}
