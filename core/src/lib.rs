pub mod core;
pub mod cpu;
pub mod device;

pub mod prelude {
    pub use crate::core::machine::{InputButton, Machine};
    pub use crate::core::{
        Board, BoardBuilder, BoardState, ConfigError, LineKind, OPEN_BUS, TimingConfig,
    };
    pub use crate::cpu::{BusAccess, ExecutionUnit};
}
