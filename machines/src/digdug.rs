use coinop_core::core::board::{
    Board, BoardBuilder, BoardState, ConfigError, SoundWrite, TimingConfig,
};
use coinop_core::core::irq::LineKind;
use coinop_core::core::machine::{InputButton, Machine};
use coinop_core::cpu::ExecutionUnit;

use crate::registry::{BuildError, MachineEntry, RomImages};

// ---------------------------------------------------------------------------
// Board CPU indices
// ---------------------------------------------------------------------------

pub const CPU_MAIN: usize = 0;
pub const CPU_SUB: usize = 1;
pub const CPU_SOUND: usize = 2;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------
// Master clock:  18.432 MHz
// CPU clock:     18.432 / 6 = 3.072 MHz (all three CPUs)
// HTOTAL:        384 pixels = 192 CPU cycles per scanline
// VTOTAL:        264 lines
// Frame:         192 * 264 = 50688 CPU cycles per frame
//
// The frame is carved into 100 slices. The count is board tuning for
// inter-CPU visibility latency, not an architectural constant; the
// shared-RAM protocol tolerates coarser slicing but the sub CPU then
// sees main-CPU writes later.

const CPU_CLOCK_HZ: u64 = 3_072_000;
const CYCLES_PER_FRAME: u64 = 50_688;
const SLICES_PER_FRAME: u32 = 100;

/// Coprocessor NMI pulse period: 50 µs of simulated time at the CPU
/// clock, rounded up to a whole cycle.
const PULSE_PERIOD_CYCLES: u64 = CPU_CLOCK_HZ.div_ceil(20_000);

// ---------------------------------------------------------------------------
// Shared RAM layout
// ---------------------------------------------------------------------------
// One 8KB buffer backs every CPU's 0x8000-0x9FFF window; all three
// CPUs alias it at the same base. The video collaborator reads two
// sub-windows out of it.

const SHARED_SIZE: usize = 0x2000;

/// Tile codes, first 1KB of the shared region (0x8000-0x83FF).
const VIDEO_RAM_WINDOW: std::ops::Range<usize> = 0x0000..0x0400;

/// Sprite attributes, tail of work RAM 1 (0x8BD8-0x8BFF).
const SPRITE_RAM_WINDOW: std::ops::Range<usize> = 0x0BD8..0x0C00;

// ---------------------------------------------------------------------------
// ROM sizes
// ---------------------------------------------------------------------------

pub const MAIN_ROM_SIZE: usize = 0x4000;
pub const SUB_ROM_SIZE: usize = 0x2000;
pub const SOUND_ROM_SIZE: usize = 0x1000;

/// Program ROM images for the three CPUs. Loading and checksum
/// verification happen outside the core; the board only validates
/// sizes at construction.
pub struct DigDugRoms {
    pub main: Vec<u8>,
    pub sub: Vec<u8>,
    pub sound: Vec<u8>,
}

impl DigDugRoms {
    /// Zero-filled images at the correct sizes, for tests and tooling
    /// that exercise the board without game code.
    pub fn blank() -> Self {
        Self {
            main: vec![0; MAIN_ROM_SIZE],
            sub: vec![0; SUB_ROM_SIZE],
            sound: vec![0; SOUND_ROM_SIZE],
        }
    }
}

// ---------------------------------------------------------------------------
// Input button IDs
// ---------------------------------------------------------------------------

pub const INPUT_COIN1: u8 = 0;
pub const INPUT_COIN2: u8 = 1;
pub const INPUT_P1_START: u8 = 2;
pub const INPUT_P2_START: u8 = 3;
pub const INPUT_P1_UP: u8 = 4;
pub const INPUT_P1_RIGHT: u8 = 5;
pub const INPUT_P1_DOWN: u8 = 6;
pub const INPUT_P1_LEFT: u8 = 7;
pub const INPUT_P1_PUMP: u8 = 8;
pub const INPUT_P2_UP: u8 = 9;
pub const INPUT_P2_RIGHT: u8 = 10;
pub const INPUT_P2_DOWN: u8 = 11;
pub const INPUT_P2_LEFT: u8 = 12;
pub const INPUT_P2_PUMP: u8 = 13;

const DIGDUG_INPUT_MAP: &[InputButton] = &[
    InputButton { id: INPUT_COIN1, name: "Coin 1" },
    InputButton { id: INPUT_COIN2, name: "Coin 2" },
    InputButton { id: INPUT_P1_START, name: "P1 Start" },
    InputButton { id: INPUT_P2_START, name: "P2 Start" },
    InputButton { id: INPUT_P1_UP, name: "P1 Up" },
    InputButton { id: INPUT_P1_RIGHT, name: "P1 Right" },
    InputButton { id: INPUT_P1_DOWN, name: "P1 Down" },
    InputButton { id: INPUT_P1_LEFT, name: "P1 Left" },
    InputButton { id: INPUT_P1_PUMP, name: "P1 Pump" },
    InputButton { id: INPUT_P2_UP, name: "P2 Up" },
    InputButton { id: INPUT_P2_RIGHT, name: "P2 Right" },
    InputButton { id: INPUT_P2_DOWN, name: "P2 Down" },
    InputButton { id: INPUT_P2_LEFT, name: "P2 Left" },
    InputButton { id: INPUT_P2_PUMP, name: "P2 Pump" },
];

// ---------------------------------------------------------------------------
// Memory-map handlers
// ---------------------------------------------------------------------------

/// 0x6820-0x6827: machine control latch, address bits select the
/// output, data bit 0 is the value.
///
///   0: main CPU IRQ enable
///   1: sub CPU IRQ enable
///   2: sound CPU NMI enable (inverted: 0 arms)
///   3: sub + sound CPU reset line (0 holds both in reset)
fn control_latch_w(state: &mut BoardState, offset: u16, data: u8) {
    let bit = data & 1 != 0;
    match offset {
        0 => state.irq[CPU_MAIN].set_enable(bit),
        1 => state.irq[CPU_SUB].set_enable(bit),
        2 => state.irq[CPU_SOUND].set_enable(bit),
        3 => {
            state.irq[CPU_SUB].set_reset_held(!bit);
            state.irq[CPU_SOUND].set_reset_held(!bit);
        }
        // 4-7: not connected
        _ => {}
    }
}

/// 0x7100: custom I/O chip command register. Writing any command but
/// the disarm code restarts the chip's NMI pulse train to the main
/// CPU.
fn customio_command_w(state: &mut BoardState, _offset: u16, data: u8) {
    state.io.write_command(data);
    if state.io.pulse_armed() {
        state.pulse.arm();
    } else {
        state.pulse.cancel();
    }
}

fn customio_command_r(state: &mut BoardState, _offset: u16) -> u8 {
    state.io.read_command()
}

/// 0x7000-0x700F: custom I/O chip parameter window.
fn customio_data_w(state: &mut BoardState, offset: u16, data: u8) {
    state.io.write_parameter(offset, data);
}

fn customio_data_r(state: &mut BoardState, offset: u16) -> u8 {
    let inputs = state.inputs;
    state.io.read_parameter(offset, &inputs)
}

/// 0x6800-0x681F: waveform generator registers. The core logs the
/// writes with cycle timestamps for the audio collaborator.
fn sound_reg_w(state: &mut BoardState, offset: u16, data: u8) {
    state.sound_log.push(SoundWrite {
        offset,
        data,
        cycle: state.cycle,
    });
}

/// 0xA000-0xA007: video control latch. Offsets 0-2 select the
/// playfield graphics, 7 is flip screen; data bit 0 is the value.
fn video_latch_w(state: &mut BoardState, offset: u16, data: u8) {
    let bit = offset as u8 & 7;
    if data & 1 != 0 {
        state.video_latches |= 1 << bit;
    } else {
        state.video_latches &= !(1 << bit);
    }
    if bit == 7 {
        state.flip_screen = data & 1 != 0;
    }
}

// ---------------------------------------------------------------------------
// DigDugBoard
// ---------------------------------------------------------------------------

/// The Dig Dug class Namco board (1982): three Z80s in lockstep
/// around 8KB of shared RAM, a custom I/O coprocessor handling coins
/// and joysticks, and per-CPU interrupt enable latches. The main CPU
/// boots the other two and can hold them in reset.
///
/// The host supplies the three execution units (the instruction-set
/// interpreters); this module supplies the memory maps, the control
/// latches, and the coprocessor wiring.
pub struct DigDugBoard {
    board: Board,
}

impl DigDugBoard {
    pub fn new(
        units: [Box<dyn ExecutionUnit>; 3],
        roms: DigDugRoms,
    ) -> Result<Self, ConfigError> {
        let timing = TimingConfig {
            cycles_per_frame: CYCLES_PER_FRAME,
            slices_per_frame: SLICES_PER_FRAME,
            pulse_period_cycles: PULSE_PERIOD_CYCLES,
        };
        let mut b = BoardBuilder::new(timing, SHARED_SIZE);

        let [main, sub, sound] = units;
        let cpu_main = b.add_cpu(main, LineKind::Irq, 1);
        let cpu_sub = b.add_cpu(sub, LineKind::Irq, 1);
        // The sound CPU's NMI runs at 120 Hz, twice the frame rate.
        let cpu_sound = b.add_cpu(sound, LineKind::Nmi, 2);
        b.pulse_target(cpu_main);

        // Main CPU
        b.map_rom(cpu_main, 0x0000..=0x3FFF, roms.main)?;
        b.map_write(cpu_main, 0x6800..=0x681F, sound_reg_w)?;
        b.map_write(cpu_main, 0x6820..=0x6827, control_latch_w)?;
        b.map_read(cpu_main, 0x7000..=0x700F, customio_data_r)?;
        b.map_write(cpu_main, 0x7000..=0x700F, customio_data_w)?;
        b.map_read(cpu_main, 0x7100..=0x7100, customio_command_r)?;
        b.map_write(cpu_main, 0x7100..=0x7100, customio_command_w)?;
        b.map_shared(cpu_main, 0x8000..=0x9FFF, 0x0000)?;
        b.map_write(cpu_main, 0xA000..=0xA007, video_latch_w)?;

        // Sub CPU
        b.map_rom(cpu_sub, 0x0000..=0x1FFF, roms.sub)?;
        b.map_write(cpu_sub, 0x6820..=0x6827, control_latch_w)?;
        b.map_shared(cpu_sub, 0x8000..=0x9FFF, 0x0000)?;
        b.map_write(cpu_sub, 0xA000..=0xA007, video_latch_w)?;

        // Sound CPU
        b.map_rom(cpu_sound, 0x0000..=0x0FFF, roms.sound)?;
        b.map_write(cpu_sound, 0x6800..=0x681F, sound_reg_w)?;
        b.map_shared(cpu_sound, 0x8000..=0x9FFF, 0x0000)?;

        Ok(Self { board: b.build()? })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn frame_rate_hz(&self) -> f64 {
        CPU_CLOCK_HZ as f64 / CYCLES_PER_FRAME as f64
    }
}

/// Active-low bit manipulation: clear bit on press, set bit on release.
fn set_bit_active_low(reg: &mut u8, bit: u8, pressed: bool) {
    if pressed {
        *reg &= !(1 << bit);
    } else {
        *reg |= 1 << bit;
    }
}

impl Machine for DigDugBoard {
    fn run_frame(&mut self) {
        self.board.run_frame();
    }

    fn set_input(&mut self, button: u8, pressed: bool) {
        let inputs = &mut self.board.state_mut().inputs;
        match button {
            // Port 0: coins and starts (active-low)
            INPUT_COIN1 => set_bit_active_low(&mut inputs.port0, 0, pressed),
            INPUT_COIN2 => set_bit_active_low(&mut inputs.port0, 1, pressed),
            INPUT_P1_START => set_bit_active_low(&mut inputs.port0, 4, pressed),
            INPUT_P2_START => set_bit_active_low(&mut inputs.port0, 5, pressed),

            // Port 1: P1 joystick + pump button
            INPUT_P1_UP => set_bit_active_low(&mut inputs.port1, 0, pressed),
            INPUT_P1_RIGHT => set_bit_active_low(&mut inputs.port1, 1, pressed),
            INPUT_P1_DOWN => set_bit_active_low(&mut inputs.port1, 2, pressed),
            INPUT_P1_LEFT => set_bit_active_low(&mut inputs.port1, 3, pressed),
            INPUT_P1_PUMP => set_bit_active_low(&mut inputs.port1, 4, pressed),

            // Port 2: P2 joystick + pump button
            INPUT_P2_UP => set_bit_active_low(&mut inputs.port2, 0, pressed),
            INPUT_P2_RIGHT => set_bit_active_low(&mut inputs.port2, 1, pressed),
            INPUT_P2_DOWN => set_bit_active_low(&mut inputs.port2, 2, pressed),
            INPUT_P2_LEFT => set_bit_active_low(&mut inputs.port2, 3, pressed),
            INPUT_P2_PUMP => set_bit_active_low(&mut inputs.port2, 4, pressed),

            _ => {}
        }
    }

    fn input_map(&self) -> &[InputButton] {
        DIGDUG_INPUT_MAP
    }

    fn reset(&mut self) {
        self.board.reset();
    }

    fn video_ram(&self) -> &[u8] {
        &self.board.state().shared.as_slice()[VIDEO_RAM_WINDOW]
    }

    fn sprite_ram(&self) -> &[u8] {
        &self.board.state().shared.as_slice()[SPRITE_RAM_WINDOW]
    }

    fn flip_screen(&self) -> bool {
        self.board.state().flip_screen
    }

    fn drain_sound_writes(&mut self) -> Vec<SoundWrite> {
        std::mem::take(&mut self.board.state_mut().sound_log)
    }
}

// ---------------------------------------------------------------------------
// Registry entry
// ---------------------------------------------------------------------------

fn create_digdug(
    roms: &RomImages,
    units: Vec<Box<dyn ExecutionUnit>>,
) -> Result<Box<dyn Machine>, BuildError> {
    let units: [Box<dyn ExecutionUnit>; 3] =
        units
            .try_into()
            .map_err(|got: Vec<Box<dyn ExecutionUnit>>| BuildError::WrongCpuCount {
                expected: 3,
                got: got.len(),
            })?;
    let roms = DigDugRoms {
        main: roms.require("maincpu")?.to_vec(),
        sub: roms.require("subcpu")?.to_vec(),
        sound: roms.require("soundcpu")?.to_vec(),
    };
    Ok(Box::new(DigDugBoard::new(units, roms)?))
}

inventory::submit! {
    MachineEntry::new("digdug", &["z80", "z80", "z80"], create_digdug)
}
