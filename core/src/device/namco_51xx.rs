//! Namco 51XX-class custom I/O coprocessor.
//!
//! The chip sits between the main CPU and the cabinet: the CPU writes
//! a command byte to one register and parameter bytes into a 16-byte
//! window, then polls the window back. Depending on the armed command
//! the chip returns raw switch states, DIP switches, a ready status,
//! or the credit counter, and it performs all coin/credit bookkeeping
//! itself so the game program never sees individual coin pulses.
//!
//! Two behaviors here are deliberate hardware quirks, reproduced
//! exactly rather than cleaned up:
//!
//! - Joystick reads in credit mode are re-quantized to one of nine
//!   canonical 8-way codes with a fixed priority order (up beats
//!   right beats down beats left; otherwise neutral). The raw bit
//!   combinations are lost.
//! - The credit counter can be pushed past 99 by a single add, and
//!   the BCD read-out formula then produces an out-of-range byte.
//!   That encoding is logged and returned as-is.
//!
//! Bookkeeping runs as a side effect of the polling read, so its
//! frequency follows how often the program polls, not frame time.

use log::{debug, warn};

use crate::core::board::InputPorts;
use crate::core::map::OPEN_BUS;

/// Disarm code: stops the recurring NMI pulse until any other command
/// re-arms it.
pub const CMD_DISARM: u8 = 0x10;
/// Primary polling command: inputs and credit bookkeeping.
pub const CMD_POLL: u8 = 0x71;
/// Enter switch mode: polls return raw input bits.
pub const CMD_SWITCH_MODE: u8 = 0xA1;
/// Status command: offsets 0-2 read back 0 (chip ready).
pub const CMD_STATUS: u8 = 0xB1;
/// Enter credit mode and accept coin settings through the parameter
/// commit protocol.
pub const CMD_COIN_SETTINGS: u8 = 0xC1;
/// DIP-switch read command.
pub const CMD_READ_DIPS: u8 = 0xD2;
/// Enter credit mode without new settings.
pub const CMD_CREDIT_MODE: u8 = 0xE1;

/// Parameter offset whose write commits the coin settings latched in
/// the buffer. Writes below it stage bytes with no effect.
const COMMIT_OFFSET: u16 = 8;

// Active-low port 0 bit assignments.
pub const IN_COIN1: u8 = 0x01;
pub const IN_COIN2: u8 = 0x02;
pub const IN_START1: u8 = 0x10;
pub const IN_START2: u8 = 0x20;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IoMode {
    /// Polls return raw switch states.
    Switch,
    /// Polls run the credit bookkeeping and quantize joysticks.
    Credit,
}

pub struct Namco51xx {
    command: u8,
    params: [u8; 16],
    mode: IoMode,
    coins_per_credit: [u8; 2],
    credits_per_coin: [u8; 2],
    coin_tally: [u8; 2],
    coin_latched: [bool; 2],
    credits: u8,
    pulse_armed: bool,
}

impl Namco51xx {
    pub fn new() -> Self {
        Self {
            command: 0,
            params: [0; 16],
            mode: IoMode::Switch,
            coins_per_credit: [0; 2],
            credits_per_coin: [0; 2],
            coin_tally: [0; 2],
            coin_latched: [false; 2],
            credits: 0,
            pulse_armed: false,
        }
    }

    /// Command register write. Every command except [`CMD_DISARM`]
    /// re-arms the recurring NMI pulse; the board wiring reads
    /// [`pulse_armed`](Self::pulse_armed) back and drives the timer.
    pub fn write_command(&mut self, value: u8) {
        debug!("custom io command {value:#04x}");
        self.command = value;
        match value {
            CMD_DISARM => {
                self.pulse_armed = false;
                return;
            }
            CMD_SWITCH_MODE => self.mode = IoMode::Switch,
            CMD_COIN_SETTINGS | CMD_CREDIT_MODE => {
                self.mode = IoMode::Credit;
                self.credits = 0;
            }
            _ => {}
        }
        self.pulse_armed = true;
    }

    /// The command register reads back the last command byte.
    pub fn read_command(&self) -> u8 {
        self.command
    }

    pub fn pulse_armed(&self) -> bool {
        self.pulse_armed
    }

    /// Parameter window write. Under [`CMD_COIN_SETTINGS`] the write
    /// hitting the commit offset latches the low nibbles of bytes 2-5
    /// as per-slot coin settings; everything staged before that has no
    /// effect on its own.
    pub fn write_parameter(&mut self, offset: u16, value: u8) {
        self.params[(offset & 0x0F) as usize] = value;
        if self.command == CMD_COIN_SETTINGS && offset == COMMIT_OFFSET {
            self.coins_per_credit = [self.params[2] & 0x0F, self.params[4] & 0x0F];
            self.credits_per_coin = [self.params[3] & 0x0F, self.params[5] & 0x0F];
        }
    }

    /// Parameter window read. Meaning depends on the armed command and
    /// the offset; combinations the chip does not define read as open
    /// bus, never as an error.
    pub fn read_parameter(&mut self, offset: u16, inputs: &InputPorts) -> u8 {
        match (self.command, offset) {
            (CMD_READ_DIPS, 0) => inputs.dswa,
            (CMD_READ_DIPS, 1) => inputs.dswb,
            (CMD_STATUS, 0..=2) => 0,
            (CMD_POLL, 0) => match self.mode {
                IoMode::Switch => inputs.port0,
                IoMode::Credit => self.poll_credits(inputs.port0),
            },
            (CMD_POLL, 1) => self.joystick(inputs.port1),
            (CMD_POLL, 2) => self.joystick(inputs.port2),
            _ => OPEN_BUS,
        }
    }

    /// Coin/credit bookkeeping pass, run on every credit-mode poll of
    /// offset 0. Returns the credit counter encoded as two BCD digits.
    fn poll_credits(&mut self, port: u8) -> u8 {
        if self.coins_per_credit == [0, 0] {
            // Settings never committed: free play, forced every poll.
            self.credits = 2;
        } else {
            for slot in 0..2 {
                if self.coins_per_credit[slot] == 0 {
                    continue;
                }
                let active = port & (IN_COIN1 << slot) == 0;
                if active && !self.coin_latched[slot] && self.credits < 99 {
                    self.coin_tally[slot] += 1;
                    if self.coin_tally[slot] >= self.coins_per_credit[slot] {
                        // No clamp at 99: the chip adds straight
                        // through and the read-out goes out of BCD
                        // range. Reproduced, not fixed.
                        self.credits += self.credits_per_coin[slot];
                        self.coin_tally[slot] = 0;
                    }
                }
                self.coin_latched[slot] = active;
            }
            if port & IN_START1 == 0 && self.credits >= 1 {
                self.credits -= 1;
            } else if port & IN_START2 == 0 && self.credits >= 2 {
                self.credits -= 2;
            }
        }
        if self.credits >= 100 {
            warn!(
                "credit counter {} exceeds two BCD digits; read-out is garbage",
                self.credits
            );
        }
        (self.credits / 10) * 16 + self.credits % 10
    }

    /// Joystick port read. In credit mode the low nibble collapses to
    /// a canonical 8-way code, first match wins: up, right, down,
    /// left, neutral. Upper bits pass through untouched.
    fn joystick(&self, port: u8) -> u8 {
        if self.mode == IoMode::Switch {
            return port;
        }
        let dir = if port & 0x01 == 0 {
            0x00 // up
        } else if port & 0x02 == 0 {
            0x02 // right
        } else if port & 0x04 == 0 {
            0x04 // down
        } else if port & 0x08 == 0 {
            0x06 // left
        } else {
            0x08 // neutral
        };
        (port & 0xF0) | dir
    }

    /// Return to power-on defaults.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Namco51xx {
    fn default() -> Self {
        Self::new()
    }
}
