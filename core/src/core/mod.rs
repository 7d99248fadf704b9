pub mod board;
pub mod irq;
pub mod machine;
pub mod map;

pub use board::{
    Board, BoardBuilder, BoardState, ConfigError, InputPorts, PulseTimer, SharedMemoryRegion,
    SoundWrite, TimingConfig,
};
pub use irq::{InterruptLine, LineKind};
pub use machine::{InputButton, Machine};
pub use map::{AddressSpace, MapError, OPEN_BUS, ReadHandler, WriteHandler};
