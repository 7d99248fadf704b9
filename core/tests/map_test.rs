use coinop_core::core::board::{BoardState, TimingConfig};
use coinop_core::core::map::{AddressSpace, MapError, OPEN_BUS};

fn state() -> BoardState {
    BoardState::new(0x2000, &[], &TimingConfig::default())
}

// Handlers receive the offset relative to the start of their range.
fn offset_r(_state: &mut BoardState, offset: u16) -> u8 {
    offset as u8
}

fn latch_r(state: &mut BoardState, _offset: u16) -> u8 {
    state.video_latches
}

fn latch_w(state: &mut BoardState, _offset: u16, data: u8) {
    state.video_latches = data;
}

// ==========================================================================
// Unmapped accesses
// ==========================================================================

#[test]
fn test_unmapped_read_is_open_bus() {
    let map = AddressSpace::new();
    let mut st = state();
    assert_eq!(map.read(&mut st, 0x0000), OPEN_BUS);
    assert_eq!(map.read(&mut st, 0xFFFF), OPEN_BUS);
}

#[test]
fn test_unmapped_write_is_discarded() {
    let map = AddressSpace::new();
    let mut st = state();
    map.write(&mut st, 0x1234, 0x42); // Must not panic, must not land anywhere
    assert_eq!(map.read(&mut st, 0x1234), OPEN_BUS);
}

// ==========================================================================
// ROM regions
// ==========================================================================

#[test]
fn test_rom_read() {
    let mut map = AddressSpace::new();
    let mut backing = vec![0; 0x100];
    backing[0x00] = 0x3E;
    backing[0xFF] = 0xC9;
    map.bind_rom(0x1000..=0x10FF, backing).unwrap();

    let mut st = state();
    assert_eq!(map.read(&mut st, 0x1000), 0x3E);
    assert_eq!(map.read(&mut st, 0x10FF), 0xC9);
    assert_eq!(map.read(&mut st, 0x1080), 0x00);
}

#[test]
fn test_rom_write_is_discarded() {
    let mut map = AddressSpace::new();
    map.bind_rom(0x0000..=0x00FF, vec![0xAA; 0x100]).unwrap();

    let mut st = state();
    map.write(&mut st, 0x0010, 0x55);
    assert_eq!(map.read(&mut st, 0x0010), 0xAA);
}

#[test]
fn test_rom_size_mismatch_rejected() {
    let mut map = AddressSpace::new();
    let err = map.bind_rom(0x0000..=0x0FFF, vec![0; 0x800]).unwrap_err();
    assert_eq!(
        err,
        MapError::RomSizeMismatch {
            start: 0x0000,
            end: 0x0FFF,
            got: 0x800,
            need: 0x1000,
        }
    );
}

#[test]
fn test_malformed_range_rejected() {
    let mut map = AddressSpace::new();
    let err = map.bind_rom(0x2000..=0x1000, vec![]).unwrap_err();
    assert_eq!(
        err,
        MapError::MalformedRange {
            start: 0x2000,
            end: 0x1000,
        }
    );
}

// ==========================================================================
// Shared-RAM windows
// ==========================================================================

#[test]
fn test_shared_window_read_write() {
    let mut map = AddressSpace::new();
    map.bind_shared(0x8000..=0x9FFF, 0x0000, 0x2000).unwrap();

    let mut st = state();
    map.write(&mut st, 0x8123, 0x42);
    assert_eq!(map.read(&mut st, 0x8123), 0x42);
    assert_eq!(st.shared.read(0x0123), 0x42);
}

#[test]
fn test_shared_window_base_offset() {
    let mut map = AddressSpace::new();
    // Window starting 0x1000 bytes into the shared region
    map.bind_shared(0xC000..=0xCFFF, 0x1000, 0x2000).unwrap();

    let mut st = state();
    map.write(&mut st, 0xC000, 0x99);
    assert_eq!(st.shared.read(0x1000), 0x99);
}

#[test]
fn test_shared_window_overrun_rejected() {
    let mut map = AddressSpace::new();
    let err = map.bind_shared(0x8000..=0x9FFF, 0x1000, 0x2000).unwrap_err();
    assert_eq!(
        err,
        MapError::SharedWindowOverrun {
            start: 0x8000,
            end: 0x9FFF,
            base: 0x1000,
            size: 0x2000,
        }
    );
}

// ==========================================================================
// Handler regions
// ==========================================================================

#[test]
fn test_read_handler_gets_relative_offset() {
    let mut map = AddressSpace::new();
    map.bind_read(0x7000..=0x700F, offset_r).unwrap();

    let mut st = state();
    assert_eq!(map.read(&mut st, 0x7000), 0x00);
    assert_eq!(map.read(&mut st, 0x7008), 0x08);
    assert_eq!(map.read(&mut st, 0x700F), 0x0F);
}

#[test]
fn test_write_handler_sees_data_and_state() {
    let mut map = AddressSpace::new();
    map.bind_write(0xA000..=0xA007, latch_w).unwrap();
    map.bind_read(0xA000..=0xA007, latch_r).unwrap();

    let mut st = state();
    map.write(&mut st, 0xA003, 0x5A);
    assert_eq!(st.video_latches, 0x5A);
    assert_eq!(map.read(&mut st, 0xA000), 0x5A);
}

// ==========================================================================
// Overlap resolution and no-op regions
// ==========================================================================

#[test]
fn test_overlap_first_registered_wins() {
    let mut map = AddressSpace::new();
    // Narrow device register bound before a wide open region
    map.bind_read(0x7100..=0x7100, offset_r).unwrap();
    map.bind_read_noop(0x7000..=0x7FFF).unwrap();

    let mut st = state();
    assert_eq!(map.read(&mut st, 0x7100), 0x00); // Handler, not no-op
    assert_eq!(map.read(&mut st, 0x7101), OPEN_BUS);
}

#[test]
fn test_later_binding_is_shadowed() {
    let mut map = AddressSpace::new();
    map.bind_read_noop(0x0000..=0xFFFF).unwrap();
    // Registered after the full-range no-op: never reachable
    map.bind_read(0x4000..=0x4000, offset_r).unwrap();

    let mut st = state();
    assert_eq!(map.read(&mut st, 0x4000), OPEN_BUS);
}

#[test]
fn test_write_noop_shadows_shared_window() {
    let mut map = AddressSpace::new();
    map.bind_write_noop(0x8000..=0x80FF).unwrap();
    map.bind_shared(0x8000..=0x9FFF, 0x0000, 0x2000).unwrap();

    let mut st = state();
    map.write(&mut st, 0x8010, 0x42); // Swallowed by the no-op
    assert_eq!(st.shared.read(0x0010), 0x00);
    map.write(&mut st, 0x8100, 0x42); // Past the no-op, reaches RAM
    assert_eq!(st.shared.read(0x0100), 0x42);
}

#[test]
fn test_read_and_write_tables_are_independent() {
    let mut map = AddressSpace::new();
    map.bind_rom(0x0000..=0x00FF, vec![0x11; 0x100]).unwrap();
    map.bind_write(0x0000..=0x00FF, latch_w).unwrap();

    let mut st = state();
    // Same address: read hits ROM, write hits the handler
    assert_eq!(map.read(&mut st, 0x0042), 0x11);
    map.write(&mut st, 0x0042, 0x77);
    assert_eq!(st.video_latches, 0x77);
}
