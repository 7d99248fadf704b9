//! Board aggregate and frame scheduler.
//!
//! A [`Board`] owns a fixed set of CPUs, the shared RAM they alias,
//! the custom I/O coprocessor, and the timing configuration. One call
//! to [`Board::run_frame`] advances every CPU through a video frame's
//! worth of cycles, subdivided into equal time slices so that writes
//! from one CPU become visible to the others at slice granularity.
//!
//! Everything here is single-threaded and cooperative by design:
//! deterministic interleaving is what makes the shared-RAM protocol
//! and the interrupt timing reproducible, including the hardware's
//! own timing quirks. Real parallelism would reintroduce races the
//! original board cannot have.

use std::ops::RangeInclusive;

use log::debug;
use thiserror::Error;

use crate::core::irq::{InterruptLine, LineKind};
use crate::core::map::{AddressSpace, MapError, ReadHandler, WriteHandler};
use crate::cpu::{CpuBus, ExecutionUnit};
use crate::device::namco_51xx::Namco51xx;

/// Frame timing parameters. The defaults are the reference board's
/// tuning: a 3.072 MHz CPU clock at a 60 Hz-class frame rate, 100
/// slices per frame, and a 50 µs coprocessor pulse period. The slice
/// count trades scheduling overhead against inter-CPU visibility
/// latency; it is board tuning, not an architectural constant, and
/// boards should document the value they choose.
#[derive(Clone, Copy, Debug)]
pub struct TimingConfig {
    /// Total CPU cycles in one video frame.
    pub cycles_per_frame: u64,
    /// Number of equal slices a frame is divided into.
    pub slices_per_frame: u32,
    /// Period of the coprocessor NMI pulse timer, in cycles.
    pub pulse_period_cycles: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            cycles_per_frame: 51_200,
            slices_per_frame: 100,
            pulse_period_cycles: 154, // 50 µs at 3.072 MHz
        }
    }
}

/// The single byte buffer backing every CPU's shared-RAM windows.
/// Aliasing is by construction: the windows reference this buffer, so
/// a write through any CPU's map is immediately visible to the rest.
pub struct SharedMemoryRegion {
    bytes: Vec<u8>,
}

impl SharedMemoryRegion {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    pub fn write(&mut self, offset: usize, data: u8) {
        self.bytes[offset] = data;
    }

    /// Read-only view for the video collaborator, polled once per
    /// frame after the scheduler completes.
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

/// One write to the sound-register range, timestamped in cycles.
/// The audio collaborator drains these fire-and-forget; the core
/// never waits for consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoundWrite {
    pub offset: u16,
    pub data: u8,
    pub cycle: u64,
}

/// Raw input ports as the custom I/O chip and handlers see them.
/// All switch ports are active-low: 0xFF means everything released.
#[derive(Clone, Copy, Debug)]
pub struct InputPorts {
    /// Coins, starts, service switches.
    pub port0: u8,
    /// Player 1 joystick and buttons.
    pub port1: u8,
    /// Player 2 joystick and buttons.
    pub port2: u8,
    pub dswa: u8,
    pub dswb: u8,
}

impl Default for InputPorts {
    fn default() -> Self {
        Self {
            port0: 0xFF,
            port1: 0xFF,
            port2: 0xFF,
            dswa: 0xFF,
            dswb: 0xFF,
        }
    }
}

/// Recurring logical-time timer driving the coprocessor NMI pulses.
/// Driven by cycles consumed, never by wall clock, so it cancels and
/// re-arms deterministically with the rest of the simulation.
pub struct PulseTimer {
    period: u64,
    remaining: Option<u64>,
}

impl PulseTimer {
    pub fn new(period: u64) -> Self {
        Self {
            period,
            remaining: None,
        }
    }

    /// Start (or restart) the recurring pulse, one full period out.
    pub fn arm(&mut self) {
        self.remaining = Some(self.period);
    }

    pub fn cancel(&mut self) {
        self.remaining = None;
    }

    pub fn armed(&self) -> bool {
        self.remaining.is_some()
    }

    /// Advance the timer by `cycles` of simulated time; returns how
    /// many pulses elapsed in that window.
    pub fn consume(&mut self, cycles: u64) -> u32 {
        let Some(rem) = &mut self.remaining else {
            return 0;
        };
        if cycles < *rem {
            *rem -= cycles;
            return 0;
        }
        let past = cycles - *rem;
        *rem = self.period - (past % self.period);
        1 + (past / self.period) as u32
    }
}

/// Board-wide mutable state reachable from memory-map handlers.
///
/// This is the reified form of what the original machine modules kept
/// in file-scope statics: the shared RAM, the coprocessor state, every
/// CPU's interrupt latches, input ports, video control latches, and
/// the sound write log, all owned by the board with an explicit
/// lifecycle.
pub struct BoardState {
    pub shared: SharedMemoryRegion,
    pub io: Namco51xx,
    pub irq: Vec<InterruptLine>,
    pub inputs: InputPorts,
    /// Coprocessor pulse timer; handlers arm and cancel it, the
    /// scheduler ticks it.
    pub pulse: PulseTimer,
    /// CPU index receiving the pulse NMIs.
    pub pulse_target: usize,
    /// Video control latch outputs (bit per latch line).
    pub video_latches: u8,
    pub flip_screen: bool,
    pub sound_log: Vec<SoundWrite>,
    /// Master cycle counter, slice-granular, used to timestamp sound
    /// writes.
    pub cycle: u64,
}

impl BoardState {
    pub fn new(shared_size: usize, kinds: &[LineKind], timing: &TimingConfig) -> Self {
        Self {
            shared: SharedMemoryRegion::new(shared_size),
            io: Namco51xx::new(),
            irq: kinds.iter().map(|&k| InterruptLine::new(k)).collect(),
            inputs: InputPorts::default(),
            pulse: PulseTimer::new(timing.pulse_period_cycles),
            pulse_target: 0,
            video_latches: 0,
            flip_screen: false,
            sound_log: Vec::new(),
            cycle: 0,
        }
    }
}

/// Configuration errors. All are fatal at board construction; there
/// is no degraded mode and nothing here is recoverable at runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cpu {cpu}: {source}")]
    Map { cpu: usize, source: MapError },
    #[error("cpu index {cpu} out of range (board has {count} cpus)")]
    CpuIndexOutOfRange { cpu: usize, count: usize },
    #[error("slices_per_frame must be nonzero")]
    ZeroSlices,
    #[error(
        "cpu {cpu}: {rate} interrupts per frame does not divide {slices} slices per frame, so requests cannot land on slice boundaries"
    )]
    InterruptRateIndivisible { cpu: usize, rate: u32, slices: u32 },
}

struct CpuContext {
    unit: Box<dyn ExecutionUnit>,
    map: AddressSpace,
    /// Regular interrupt requests per frame (0 = none). The reference
    /// board runs its sound CPU at twice the frame rate.
    irqs_per_frame: u32,
    was_reset_held: bool,
}

/// Builder for a [`Board`]. CPUs are added in execution order; their
/// index order is the observable intra-slice ordering contract.
pub struct BoardBuilder {
    timing: TimingConfig,
    shared_size: usize,
    cpus: Vec<CpuContext>,
    kinds: Vec<LineKind>,
    pulse_target: usize,
}

impl BoardBuilder {
    pub fn new(timing: TimingConfig, shared_size: usize) -> Self {
        Self {
            timing,
            shared_size,
            cpus: Vec::new(),
            kinds: Vec::new(),
            pulse_target: 0,
        }
    }

    /// Register a CPU and return its index. `irqs_per_frame` is the
    /// regular interrupt-request rate as an integer multiple of the
    /// frame rate (1 = once per frame at the vblank boundary).
    pub fn add_cpu(
        &mut self,
        unit: Box<dyn ExecutionUnit>,
        line: LineKind,
        irqs_per_frame: u32,
    ) -> usize {
        self.cpus.push(CpuContext {
            unit,
            map: AddressSpace::new(),
            irqs_per_frame,
            was_reset_held: false,
        });
        self.kinds.push(line);
        self.cpus.len() - 1
    }

    /// Select which CPU receives the coprocessor pulse NMIs
    /// (defaults to CPU 0).
    pub fn pulse_target(&mut self, cpu: usize) {
        self.pulse_target = cpu;
    }

    fn cpu_map(&mut self, cpu: usize) -> Result<&mut AddressSpace, ConfigError> {
        let count = self.cpus.len();
        self.cpus
            .get_mut(cpu)
            .map(|c| &mut c.map)
            .ok_or(ConfigError::CpuIndexOutOfRange { cpu, count })
    }

    pub fn map_rom(
        &mut self,
        cpu: usize,
        range: RangeInclusive<u16>,
        backing: Vec<u8>,
    ) -> Result<(), ConfigError> {
        self.cpu_map(cpu)?
            .bind_rom(range, backing)
            .map_err(|source| ConfigError::Map { cpu, source })
    }

    pub fn map_shared(
        &mut self,
        cpu: usize,
        range: RangeInclusive<u16>,
        base: usize,
    ) -> Result<(), ConfigError> {
        let shared_len = self.shared_size;
        self.cpu_map(cpu)?
            .bind_shared(range, base, shared_len)
            .map_err(|source| ConfigError::Map { cpu, source })
    }

    pub fn map_read(
        &mut self,
        cpu: usize,
        range: RangeInclusive<u16>,
        handler: ReadHandler,
    ) -> Result<(), ConfigError> {
        self.cpu_map(cpu)?
            .bind_read(range, handler)
            .map_err(|source| ConfigError::Map { cpu, source })
    }

    pub fn map_write(
        &mut self,
        cpu: usize,
        range: RangeInclusive<u16>,
        handler: WriteHandler,
    ) -> Result<(), ConfigError> {
        self.cpu_map(cpu)?
            .bind_write(range, handler)
            .map_err(|source| ConfigError::Map { cpu, source })
    }

    pub fn map_read_noop(
        &mut self,
        cpu: usize,
        range: RangeInclusive<u16>,
    ) -> Result<(), ConfigError> {
        self.cpu_map(cpu)?
            .bind_read_noop(range)
            .map_err(|source| ConfigError::Map { cpu, source })
    }

    pub fn map_write_noop(
        &mut self,
        cpu: usize,
        range: RangeInclusive<u16>,
    ) -> Result<(), ConfigError> {
        self.cpu_map(cpu)?
            .bind_write_noop(range)
            .map_err(|source| ConfigError::Map { cpu, source })
    }

    pub fn build(self) -> Result<Board, ConfigError> {
        let slices = self.timing.slices_per_frame;
        if slices == 0 {
            return Err(ConfigError::ZeroSlices);
        }
        for (cpu, ctx) in self.cpus.iter().enumerate() {
            let rate = ctx.irqs_per_frame;
            if rate != 0 && !slices.is_multiple_of(rate) {
                return Err(ConfigError::InterruptRateIndivisible { cpu, rate, slices });
            }
        }
        if self.pulse_target >= self.cpus.len() {
            return Err(ConfigError::CpuIndexOutOfRange {
                cpu: self.pulse_target,
                count: self.cpus.len(),
            });
        }
        let mut state = BoardState::new(self.shared_size, &self.kinds, &self.timing);
        state.pulse_target = self.pulse_target;
        Ok(Board {
            cpus: self.cpus,
            state,
            timing: self.timing,
            clock: 0,
        })
    }
}

/// A powered-on board: N CPUs, their maps, and the shared state,
/// advanced frame by frame until the host stops calling.
pub struct Board {
    cpus: Vec<CpuContext>,
    state: BoardState,
    timing: TimingConfig,
    clock: u64,
}

impl Board {
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BoardState {
        &mut self.state
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn cpu_count(&self) -> usize {
        self.cpus.len()
    }

    /// Total cycles elapsed since power-on, in whole frames.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Host/debug access through a CPU's read map, outside the slice
    /// loop. Uses the same resolution path the CPU itself would.
    pub fn bus_read(&mut self, cpu: usize, addr: u16) -> u8 {
        self.cpus[cpu].map.read(&mut self.state, addr)
    }

    /// Host/debug access through a CPU's write map.
    pub fn bus_write(&mut self, cpu: usize, addr: u16, data: u8) {
        self.cpus[cpu].map.write(&mut self.state, addr, data);
    }

    /// Advance the whole board by one video frame.
    ///
    /// Ordering contract: within a slice, CPUs run in index order, so
    /// a write by CPU i in slice k is visible to CPU j > i in the same
    /// slice and to every CPU from slice k+1 on. The shared-RAM
    /// command protocol depends on this ordering; it is not an
    /// implementation accident.
    pub fn run_frame(&mut self) {
        let slices = self.timing.slices_per_frame;
        let budget = self.timing.cycles_per_frame / slices as u64;

        for slice in 0..slices {
            self.state.cycle = self.clock + slice as u64 * budget;

            // Coprocessor pulse timer: logical time, one slice's worth
            // per slice. Repeated fires inside one slice collapse into
            // a single pending assertion.
            if self.state.pulse.consume(budget) > 0 {
                let target = self.state.pulse_target;
                self.state.irq[target].request(LineKind::Nmi);
            }

            for i in 0..self.cpus.len() {
                // Reset-line edges propagate at slice boundaries.
                let held = self.state.irq[i].reset_held();
                if held != self.cpus[i].was_reset_held {
                    debug!(
                        "cpu {i}: reset line {}",
                        if held { "asserted" } else { "released" }
                    );
                    self.cpus[i].unit.assert_reset(held);
                    self.cpus[i].was_reset_held = held;
                }
                // A held CPU is powered off, not idling: no execution,
                // no interrupt delivery.
                if held {
                    continue;
                }

                if let Some(line) = self.state.irq[i].acknowledge() {
                    self.cpus[i].unit.inject_interrupt(line);
                }

                let ctx = &mut self.cpus[i];
                let mut bus = CpuBus {
                    map: &ctx.map,
                    state: &mut self.state,
                };
                let consumed = ctx.unit.advance(&mut bus, budget);
                // A unit that yields early burns the remainder; the
                // frame's cycle accounting does not change.
                debug_assert!(consumed <= budget);
            }

            // Regular interrupt requests land at the end of the slices
            // that complete each CPU's request interval; rate 1 is the
            // vblank-equivalent boundary at the last slice.
            for i in 0..self.cpus.len() {
                let rate = self.cpus[i].irqs_per_frame;
                if rate == 0 {
                    continue;
                }
                let interval = slices / rate;
                if (slice + 1).is_multiple_of(interval) {
                    let kind = self.state.irq[i].kind();
                    self.state.irq[i].request(kind);
                }
            }
        }

        self.clock += budget * slices as u64;
        self.state.cycle = self.clock;
    }

    /// Machine reset: coprocessor, latches, and timers return to
    /// power-on defaults and every CPU's reset line is pulsed.
    pub fn reset(&mut self) {
        for ctx in &mut self.cpus {
            ctx.unit.assert_reset(true);
            ctx.unit.assert_reset(false);
            ctx.was_reset_held = false;
        }
        for line in &mut self.state.irq {
            line.reset();
        }
        self.state.io.reset();
        self.state.pulse.cancel();
        self.state.video_latches = 0;
        self.state.flip_screen = false;
        self.state.sound_log.clear();
        self.state.inputs.port0 = 0xFF;
        self.state.inputs.port1 = 0xFF;
        self.state.inputs.port2 = 0xFF;
        self.state.cycle = 0;
        self.clock = 0;
        // Shared RAM is deliberately not cleared; the hardware's RAM
        // keeps its contents across a reset.
    }
}
