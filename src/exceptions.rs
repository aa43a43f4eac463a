//! # Exception Reporter
//!
//! Reports a CPU fault (or a Ctrl+R register dump) on the console and waits for
//! the operator to acknowledge it.
//!
//! A report walks a fixed sequence of phases:
//!
//! ```text
//! Capture ──▶ Render ──▶ AwaitAck ──▶ Clear ──▶ Done
//! ```
//!
//! - **Capture**: build the raw snapshot from the trap frame and freeze it
//! - **Render**: banner, fault name, two-column dump of the frozen snapshot
//! - **AwaitAck**: re-enable interrupts, poll the keyboard buffer until exactly
//!   one key has been consumed
//! - **Clear**: wipe the display
//!
//! `AwaitAck` is the reentrant window: timer and keyboard IRQs are serviced
//! while the reporter spins, which is how the acknowledging key reaches the
//! buffer at all.
//!
//! After a fault has been acknowledged the interrupted context is redirected
//! to the recovery entry registered with [`set_recovery`], so the faulting
//! instruction does not run again. Without one, the CPU is parked.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::{
    devices::{
        console::with_console,
        drivers::ps2_keyboard::{self, Keyboard},
        framebuffer::color::Color,
    },
    registers::{RegisterSnapshot, SnapshotSlot, TrapFrame, REGISTER_NAMES, REG_COUNT},
    KernelState,
};

/// Rows in the two-column dump; the left column holds slots `0..DUMP_ROWS`.
pub const DUMP_ROWS: usize = (REG_COUNT + 1) / 2;

const BANNER: &str = "==================== KERNEL EXCEPTION ====================";
const SNAPSHOT_HEADER: &str = "Registers snapshot:";
const FOOTER: &str = "Press any key to continue...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    DivisionByZero,
    InvalidOpcode,
}

impl Fault {
    /// Only vectors 0 and 6 are reportable faults.
    pub fn from_vector(vector: u64) -> Option<Self> {
        match vector {
            0x00 => Some(Self::DivisionByZero),
            0x06 => Some(Self::InvalidOpcode),
            _ => None,
        }
    }

    pub fn vector(self) -> u8 {
        match self {
            Self::DivisionByZero => 0x00,
            Self::InvalidOpcode => 0x06,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::DivisionByZero => "Division by zero",
            Self::InvalidOpcode => "Invalid opcode",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportPhase {
    Capture,
    Render,
    AwaitAck,
    Clear,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Fault(Fault),
    /// Ctrl+R
    Snapshot,
}

/// Display and input the reporter needs.
pub trait AckConsole: Write {
    /// Re-enable interrupts so the acknowledging key can arrive.
    fn open_reentrant_window(&mut self);
    /// One character from the keyboard buffer, if any. Never blocks.
    fn poll_key(&mut self) -> Option<u8>;
    fn clear(&mut self);
    /// Text that should stand out. Plain text by default.
    fn highlight(&mut self, s: &str) -> fmt::Result {
        self.write_str(s)
    }
}

pub struct Report<'a> {
    kind: ReportKind,
    frame: &'a TrapFrame,
    phase: ReportPhase,
}

impl<'a> Report<'a> {
    pub fn new(kind: ReportKind, frame: &'a TrapFrame) -> Self {
        Self { kind, frame, phase: ReportPhase::Capture }
    }

    pub fn phase(&self) -> ReportPhase {
        self.phase
    }

    /// Run the current phase and move to the next one.
    pub fn step<C: AckConsole>(&mut self, slot: &SnapshotSlot, console: &mut C) -> ReportPhase {
        self.phase = match self.phase {
            ReportPhase::Capture => {
                slot.freeze(&RegisterSnapshot::capture(self.frame));
                ReportPhase::Render
            }
            ReportPhase::Render => {
                // a console write error leaves nothing better to do than go on
                let _ = render(self.kind, &slot.read_frozen(), console);
                ReportPhase::AwaitAck
            }
            ReportPhase::AwaitAck => {
                console.open_reentrant_window();
                while console.poll_key().is_none() {
                    core::hint::spin_loop();
                }
                ReportPhase::Clear
            }
            ReportPhase::Clear => {
                console.clear();
                ReportPhase::Done
            }
            ReportPhase::Done => ReportPhase::Done,
        };
        self.phase
    }

    pub fn run<C: AckConsole>(mut self, slot: &SnapshotSlot, console: &mut C) {
        while self.step(slot, console) != ReportPhase::Done {}
    }
}

/// Header for `kind`, then every named slot of `snapshot` in two columns.
pub fn render<W: AckConsole>(kind: ReportKind, snapshot: &RegisterSnapshot, w: &mut W) -> fmt::Result {
    match kind {
        ReportKind::Fault(fault) => {
            w.highlight(BANNER)?;
            writeln!(w)?;
            w.highlight("Exception: ")?;
            w.highlight(fault.name())?;
            writeln!(w)?;
            writeln!(w, "Registers:")?;
        }
        ReportKind::Snapshot => writeln!(w, "{SNAPSHOT_HEADER}")?,
    }

    for row in 0..DUMP_ROWS {
        write_register(w, REGISTER_NAMES[row], snapshot.0[row])?;
        let right = row + DUMP_ROWS;
        if right < REG_COUNT {
            w.write_str("    ")?;
            write_register(w, REGISTER_NAMES[right], snapshot.0[right])?;
        }
        writeln!(w)?;
    }

    writeln!(w)?;
    writeln!(w, "{FOOTER}")
}

fn write_register<W: Write>(w: &mut W, name: &str, value: u64) -> fmt::Result {
    write!(w, "{name}:{:pad$}0x{value:016X}", "", pad = 8 - name.len())
}

static RECOVERY: AtomicU64 = AtomicU64::new(0);

/// Where a faulting context resumes once its report was acknowledged.
pub fn set_recovery(entry: extern "C" fn() -> !) {
    RECOVERY.store(entry as usize as u64, Ordering::Release);
}

/// Point `frame` at the recovery entry with a fresh call-aligned stack
/// pointer. Returns false if no entry is registered.
fn redirect_to_recovery(frame: &mut TrapFrame) -> bool {
    let entry = RECOVERY.load(Ordering::Acquire);
    if entry == 0 {
        return false;
    }
    frame.rip = entry;
    frame.rsp = (frame.rsp & !0xF) - 8;
    true
}

/// Console and keyboard as the reporter sees them on real hardware.
struct ScreenAck<'k> {
    keyboard: &'k Mutex<Keyboard>,
}

impl Write for ScreenAck<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        with_console(|c| c.write_str(s))
    }
}

impl AckConsole for ScreenAck<'_> {
    fn open_reentrant_window(&mut self) {
        x86_64::instructions::interrupts::enable();
    }

    fn poll_key(&mut self) -> Option<u8> {
        ps2_keyboard::poll_char(self.keyboard)
    }

    fn clear(&mut self) {
        with_console(|c| c.clear());
    }

    fn highlight(&mut self, s: &str) -> fmt::Result {
        with_console(|c| c.write_colored(Color::RED, s));
        Ok(())
    }
}

/// Fault path for vectors 0 and 6; anything else is ignored.
pub fn dispatch_exception(state: &KernelState, vector: u64, frame: &mut TrapFrame) {
    let Some(fault) = Fault::from_vector(vector) else {
        return;
    };

    println!(
        "[exception] {} (vector {:#04x}) at rip {:#018x}",
        fault.name(),
        fault.vector(),
        frame.rip
    );

    let mut screen = ScreenAck { keyboard: &state.keyboard };
    Report::new(ReportKind::Fault(fault), frame).run(&state.registers, &mut screen);

    if !redirect_to_recovery(frame) {
        println!("[exception] no recovery entry registered, halting");
        crate::hlt_loop();
    }
}

/// Ctrl+R: same capture and acknowledgment as a fault, then the interrupted
/// code simply continues.
pub fn dump_registers(state: &KernelState, frame: &TrapFrame) {
    let mut screen = ScreenAck { keyboard: &state.keyboard };
    Report::new(ReportKind::Snapshot, frame).run(&state.registers, &mut screen);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::GeneralRegisters;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MockConsole {
        out: String,
        keys: VecDeque<u8>,
        polls: usize,
        window_opened: bool,
        clears: usize,
    }

    impl Write for MockConsole {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.out.push_str(s);
            Ok(())
        }
    }

    impl AckConsole for MockConsole {
        fn open_reentrant_window(&mut self) {
            self.window_opened = true;
        }

        fn poll_key(&mut self) -> Option<u8> {
            assert!(self.window_opened, "polled before interrupts were re-enabled");
            self.polls += 1;
            // every other poll comes back empty, like a real keyboard
            if self.polls % 2 == 1 {
                None
            } else {
                self.keys.pop_front()
            }
        }

        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    fn frame() -> TrapFrame {
        TrapFrame {
            regs: GeneralRegisters { rax: 10, rcx: 0, rdx: 0, r15: 0xF00D, ..Default::default() },
            rip: 0xFFFF_8000_0000_1234,
            cs: 0x08,
            rflags: 0x246,
            rsp: 0xFFFF_8000_0010_0008,
            ss: 0x10,
        }
    }

    fn console_with_keys(keys: &[u8]) -> MockConsole {
        MockConsole { keys: keys.iter().copied().collect(), ..Default::default() }
    }

    #[test]
    fn divide_error_report_names_every_register_once() {
        let slot = SnapshotSlot::new();
        let frame = frame();
        let mut console = console_with_keys(b"xy");

        let fault = Fault::from_vector(0).unwrap();
        Report::new(ReportKind::Fault(fault), &frame).run(&slot, &mut console);

        assert!(console.out.contains("Exception: Division by zero"));
        for name in REGISTER_NAMES {
            let token = format!("{name}:");
            let count = console.out.split_whitespace().filter(|t| *t == token).count();
            assert_eq!(count, 1, "{name} appears {count} times");
        }

        // exactly one key consumed, then the screen is cleared once
        assert_eq!(console.keys, VecDeque::from(vec![b'y']));
        assert_eq!(console.clears, 1);
    }

    #[test]
    fn phases_run_in_order_and_stop_at_done() {
        let slot = SnapshotSlot::new();
        let frame = frame();
        let mut console = console_with_keys(b"k");
        let mut report = Report::new(ReportKind::Snapshot, &frame);

        assert_eq!(report.phase(), ReportPhase::Capture);
        assert_eq!(report.step(&slot, &mut console), ReportPhase::Render);
        assert!(slot.has_frozen());
        assert!(console.out.is_empty());

        assert_eq!(report.step(&slot, &mut console), ReportPhase::AwaitAck);
        assert!(console.out.starts_with("Registers snapshot:"));
        assert!(!console.window_opened);

        assert_eq!(report.step(&slot, &mut console), ReportPhase::Clear);
        assert!(console.keys.is_empty());
        assert_eq!(console.clears, 0);

        assert_eq!(report.step(&slot, &mut console), ReportPhase::Done);
        assert_eq!(console.clears, 1);
        assert_eq!(report.step(&slot, &mut console), ReportPhase::Done);
        assert_eq!(console.clears, 1);
    }

    #[test]
    fn report_freezes_the_captured_frame() {
        let slot = SnapshotSlot::new();
        let frame = frame();
        let mut console = console_with_keys(b" ");
        Report::new(ReportKind::Fault(Fault::InvalidOpcode), &frame).run(&slot, &mut console);

        let frozen = slot.read_frozen();
        assert_eq!(frozen, RegisterSnapshot::capture(&frame));
        assert_eq!(frozen.0[0], 10);
        assert_eq!(frozen.0[14], 0xF00D);
        assert_eq!(frozen.0[16], 0xFFFF_8000_0000_1234);
        assert!(console.out.contains("RIP:     0xFFFF800000001234"));
        assert!(console.out.contains("Exception: Invalid opcode"));
    }

    #[test]
    fn dump_has_two_columns_of_eleven_rows() {
        let snapshot = RegisterSnapshot(core::array::from_fn(|i| i as u64));
        let mut console = MockConsole::default();
        render(ReportKind::Snapshot, &snapshot, &mut console).unwrap();

        let rows: Vec<&str> = console.out.lines().skip(1).take(DUMP_ROWS).collect();
        assert_eq!(rows.len(), 11);
        assert!(rows[0].starts_with("RAX:"));
        assert!(rows[0].contains("R12:"));
        assert!(rows[4].ends_with("RSP:     0x000000000000000F"));
        assert!(rows[9].starts_with("R10:"));
        assert!(rows[9].contains("USS:"));
        // odd count: the last row has no right column
        assert!(rows[10].starts_with("R11:"));
        assert_eq!(rows[10].split_whitespace().count(), 2);
        assert!(console.out.trim_end().ends_with("Press any key to continue..."));
    }

    #[test]
    fn only_vectors_zero_and_six_are_faults() {
        assert_eq!(Fault::from_vector(0), Some(Fault::DivisionByZero));
        assert_eq!(Fault::from_vector(6), Some(Fault::InvalidOpcode));
        for vector in [1, 5, 7, 13, 14, 0x20, 0x21, 0x80] {
            assert_eq!(Fault::from_vector(vector), None);
        }
        assert_eq!(Fault::InvalidOpcode.vector(), 6);
    }

    extern "C" fn recovery_target() -> ! {
        loop {}
    }

    #[test]
    fn recovery_moves_the_frame_to_the_registered_entry() {
        let mut frame = frame();
        frame.rsp = 0x7FF3;
        set_recovery(recovery_target);
        assert!(redirect_to_recovery(&mut frame));
        assert_eq!(frame.rip, recovery_target as usize as u64);
        assert_eq!(frame.rsp, 0x7FF0 - 8);
        assert_eq!(frame.rsp % 16, 8);
    }
}
