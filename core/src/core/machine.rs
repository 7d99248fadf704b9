use crate::core::board::SoundWrite;

/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "P1 Left", "Coin").
    pub name: &'static str,
}

/// Machine-agnostic interface for emulated boards.
///
/// Each board implements this trait to give the host a uniform
/// surface. The host owns rendering and audio synthesis; this core
/// only exposes the state they consume: the shared-RAM video windows,
/// the flip-screen flag, and the timestamped sound-register writes.
pub trait Machine {
    /// Run one frame of emulation (advance every CPU by one frame's
    /// worth of cycles).
    fn run_frame(&mut self);

    /// Handle an input event. `button` is a machine-defined ID from
    /// `input_map()`; `pressed` is true for key-down.
    ///
    /// Called per-event, not per-frame. Each call latches the button
    /// state so that `run_frame()` sees the accumulated input.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// The input buttons this machine accepts. The host uses this to
    /// build key mappings.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Tile RAM window into shared RAM. The rendering collaborator
    /// polls this once per frame after `run_frame()` returns; the core
    /// never calls back into it.
    fn video_ram(&self) -> &[u8];

    /// Sprite attribute window into shared RAM.
    fn sprite_ram(&self) -> &[u8];

    /// Screen-flip flag driven by a video control latch write.
    fn flip_screen(&self) -> bool;

    /// Take the accumulated sound-register writes, timestamped in
    /// cycles. Fire-and-forget: the core never waits on the consumer.
    fn drain_sound_writes(&mut self) -> Vec<SoundWrite>;
}
