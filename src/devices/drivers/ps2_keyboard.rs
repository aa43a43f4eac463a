//! # PS/2 Keyboard Driver
//!
//! Turns set-1 scancodes from port 0x60 into ASCII and queues them for polling
//! readers.
//!
//! ```text
//! ┌─────────────┐   IRQ1    ┌──────────────┐   Char   ┌──────────────┐
//! │  Keyboard   │──────────▶│   Keyboard   │─────────▶│  KeyBuffer   │
//! │  (Port 60)  │           │ (modifiers)  │          │ (256 bytes)  │
//! └─────────────┘           └──────┬───────┘          └──────┬───────┘
//!                                  │ Ctrl+R / Ctrl+L         │ poll_char()
//!                                  ▼                         ▼
//!                              KeyAction                shell / games
//! ```
//!
//! ## Decoding
//!
//! 1. Modifier codes update shift, caps-lock and control.
//! 2. Codes at or past the table end are unmapped (this covers every break
//!    code, and caps-lock itself).
//! 3. Letters are upper-case when `caps_lock ^ shift`; everything else uses
//!    the shifted column only while shift is held.
//! 4. Ctrl+R and Ctrl+L become [`KeyAction`]s and never reach the buffer.
//!
//! The decoder only reports hotkeys. The IRQ handler acts on them after the
//! keyboard lock is released, because the register dump blocks until another
//! key arrives through this same lock.

use spin::Mutex;
use x86_64::instructions::port::Port;

pub const DATA_PORT: u16 = 0x60;
pub const STATUS_PORT: u16 = 0x64;
const STATUS_OUTPUT_FULL: u8 = 0x01;
pub const KEYS_AMOUNT: usize = 58;
pub const BUFFER_SIZE: usize = 256;

const LEFT_SHIFT: u8 = 0x2A;
const RIGHT_SHIFT: u8 = 0x36;
const LEFT_SHIFT_RELEASE: u8 = 0xAA;
const RIGHT_SHIFT_RELEASE: u8 = 0xB6;
const CAPS_LOCK: u8 = 0x3A;
const CTRL: u8 = 0x1D;
const CTRL_RELEASE: u8 = 0x9D;

/// (base, shifted) per make code; `0` marks keys with no character.
pub const SCANCODE_TABLE: [[u8; 2]; KEYS_AMOUNT] = [
    [0, 0], [27, 27], [b'1', b'!'], [b'2', b'@'], [b'3', b'#'], [b'4', b'$'], [b'5', b'%'], [b'6', b'^'],
    [b'7', b'&'], [b'8', b'*'], [b'9', b'('], [b'0', b')'], [b'-', b'_'], [b'=', b'+'], [0x08, 0x08],
    [b'\t', b'\t'], [b'q', b'Q'], [b'w', b'W'], [b'e', b'E'], [b'r', b'R'], [b't', b'T'], [b'y', b'Y'],
    [b'u', b'U'], [b'i', b'I'], [b'o', b'O'], [b'p', b'P'], [b'[', b'{'], [b']', b'}'], [b'\n', b'\n'],
    [0, 0], [b'a', b'A'], [b's', b'S'], [b'd', b'D'], [b'f', b'F'], [b'g', b'G'], [b'h', b'H'],
    [b'j', b'J'], [b'k', b'K'], [b'l', b'L'], [b';', b':'], [b'\'', b'"'], [b'`', b'~'], [0, 0],
    [b'\\', b'|'], [b'z', b'Z'], [b'x', b'X'], [b'c', b'C'], [b'v', b'V'], [b'b', b'B'], [b'n', b'N'],
    [b'm', b'M'], [b',', b'<'], [b'.', b'>'], [b'/', b'?'], [0, 0], [0, 0], [0, 0], [b' ', b' '],
];

/// Character for `scancode` under the given modifier state, if any.
pub fn decode(scancode: u8, shift: bool, caps_lock: bool) -> Option<u8> {
    let [base, shifted] = *SCANCODE_TABLE.get(scancode as usize)?;
    let upper = if base.is_ascii_lowercase() { caps_lock ^ shift } else { shift };
    let ch = if upper { shifted } else { base };
    (ch != 0).then_some(ch)
}

/// Circular byte queue. One slot always stays empty so `head == tail` can
/// only mean "empty".
pub struct KeyBuffer {
    buf: [u8; BUFFER_SIZE],
    head: usize,
    tail: usize,
}

impl KeyBuffer {
    pub const fn new() -> Self {
        Self { buf: [0; BUFFER_SIZE], head: 0, tail: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        (self.tail + 1) % BUFFER_SIZE == self.head
    }

    pub fn len(&self) -> usize {
        (self.tail + BUFFER_SIZE - self.head) % BUFFER_SIZE
    }

    /// Queue `c`. Returns `false` (and drops `c`) when full.
    pub fn push(&mut self, c: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.buf[self.tail] = c;
        self.tail = (self.tail + 1) % BUFFER_SIZE;
        true
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let c = self.buf[self.head];
        self.head = (self.head + 1) % BUFFER_SIZE;
        Some(c)
    }
}

impl Default for KeyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub caps_lock: bool,
    pub ctrl: bool,
}

/// What the IRQ handler has to do after a scancode was decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    /// Modifier change, unmapped code or key without a character.
    Ignored,
    Queued(u8),
    /// Buffer full; the character is gone.
    Dropped(u8),
    /// Ctrl+R: capture, freeze and dump the registers, then wait for a key.
    DumpRegisters,
    /// Ctrl+L
    ClearScreen,
}

pub struct Keyboard {
    modifiers: Modifiers,
    buffer: KeyBuffer,
}

impl Keyboard {
    pub const fn new() -> Self {
        Self {
            modifiers: Modifiers { shift: false, caps_lock: false, ctrl: false },
            buffer: KeyBuffer::new(),
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn on_scancode(&mut self, scancode: u8) -> KeyAction {
        match scancode {
            CTRL => self.modifiers.ctrl = true,
            CTRL_RELEASE => self.modifiers.ctrl = false,
            LEFT_SHIFT | RIGHT_SHIFT => self.modifiers.shift = true,
            LEFT_SHIFT_RELEASE | RIGHT_SHIFT_RELEASE => self.modifiers.shift = false,
            CAPS_LOCK => self.modifiers.caps_lock = !self.modifiers.caps_lock,
            _ => {}
        }

        let Some(ch) = decode(scancode, self.modifiers.shift, self.modifiers.caps_lock) else {
            return KeyAction::Ignored;
        };

        if self.modifiers.ctrl {
            match ch {
                b'r' | b'R' => return KeyAction::DumpRegisters,
                b'l' | b'L' => return KeyAction::ClearScreen,
                _ => {}
            }
        }

        if self.buffer.push(ch) {
            KeyAction::Queued(ch)
        } else {
            KeyAction::Dropped(ch)
        }
    }

    pub fn read_char(&mut self) -> Option<u8> {
        self.buffer.pop()
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for Keyboard {
    fn default() -> Self {
        Self::new()
    }
}

pub fn read_scancode() -> u8 {
    let mut port = Port::<u8>::new(DATA_PORT);
    unsafe { port.read() }
}

/// Drain bytes the controller buffered before IRQ1 was unmasked. Returns
/// how many were thrown away.
pub fn flush_output() -> usize {
    let mut status = Port::<u8>::new(STATUS_PORT);
    let mut drained = 0;
    while drained < BUFFER_SIZE && unsafe { status.read() } & STATUS_OUTPUT_FULL != 0 {
        read_scancode();
        drained += 1;
    }
    drained
}

/// Non-blocking read for consumers outside IRQ context. "No data" is a normal
/// answer; callers poll.
pub fn poll_char(keyboard: &Mutex<Keyboard>) -> Option<u8> {
    x86_64::instructions::interrupts::without_interrupts(|| keyboard.lock().read_char())
}
