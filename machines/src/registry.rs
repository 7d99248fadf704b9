//! Machine registry.
//!
//! Boards register themselves with `inventory::submit!` so the host
//! can enumerate and construct them by name without a hand-maintained
//! list. Each entry declares the CPU cores it needs; the host supplies
//! matching execution units along with the ROM images.

use coinop_core::core::board::ConfigError;
use coinop_core::core::machine::Machine;
use coinop_core::cpu::ExecutionUnit;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("missing rom region {0:?}")]
    MissingRegion(&'static str),
    #[error("machine needs {expected} execution units, got {got}")]
    WrongCpuCount { expected: usize, got: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// ROM images keyed by region name, borrowed from the host's loader.
pub struct RomImages<'a> {
    regions: &'a [(&'a str, &'a [u8])],
}

impl<'a> RomImages<'a> {
    pub fn new(regions: &'a [(&'a str, &'a [u8])]) -> Self {
        Self { regions }
    }

    pub fn get(&self, name: &str) -> Option<&'a [u8]> {
        self.regions
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, bytes)| *bytes)
    }

    pub fn require(&self, name: &'static str) -> Result<&'a [u8], BuildError> {
        self.get(name).ok_or(BuildError::MissingRegion(name))
    }
}

type CreateFn =
    fn(&RomImages, Vec<Box<dyn ExecutionUnit>>) -> Result<Box<dyn Machine>, BuildError>;

pub struct MachineEntry {
    pub name: &'static str,
    /// CPU core names in board index order; the host passes execution
    /// units in the same order.
    pub cpus: &'static [&'static str],
    pub create: CreateFn,
}

impl MachineEntry {
    pub const fn new(
        name: &'static str,
        cpus: &'static [&'static str],
        create: CreateFn,
    ) -> Self {
        Self { name, cpus, create }
    }
}

inventory::collect!(MachineEntry);

/// All registered machines, sorted by name.
pub fn all() -> Vec<&'static MachineEntry> {
    let mut entries: Vec<_> = inventory::iter::<MachineEntry>.into_iter().collect();
    entries.sort_by_key(|e| e.name);
    entries
}

pub fn find(name: &str) -> Option<&'static MachineEntry> {
    inventory::iter::<MachineEntry>
        .into_iter()
        .find(|e| e.name == name)
}
