pub mod digdug;
pub mod registry;

pub use digdug::DigDugBoard;
pub use registry::{BuildError, MachineEntry, RomImages};
