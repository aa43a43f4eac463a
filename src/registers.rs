//! # Register Capture and Snapshot Store
//!
//! Trap entry stubs push the general-purpose registers on top of the frame the
//! CPU pushed, which gives a [`TrapFrame`]. From it a handler builds a raw
//! [`RegisterSnapshot`] (21 slots, fixed order) and may freeze it into the
//! process-wide [`SnapshotSlot`], which `regs` consumers read later.
//!
//! ## Slot order
//!
//! | Slots  | Registers                              |
//! |--------|----------------------------------------|
//! | 0-6    | RAX RBX RCX RDX RSI RDI RBP            |
//! | 7-14   | R8 - R15                               |
//! | 15-18  | RSP RIP CS RFLAGS                      |
//! | 19-20  | URSP USS (stack pushed by the CPU)     |
//!
//! This order is an external contract: display routines and the
//! `get-registers` syscall consume it as-is.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

pub const REG_COUNT: usize = 21;

pub const REGISTER_NAMES: [&str; REG_COUNT] = [
    "RAX", "RBX", "RCX", "RDX", "RSI", "RDI", "RBP",
    "R8", "R9", "R10", "R11", "R12", "R13", "R14", "R15",
    "RSP", "RIP", "CS", "RFLAGS", "URSP", "USS",
];

/// General-purpose registers in the order the entry stubs leave them on the
/// stack (RAX at the lowest address).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeneralRegisters {
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rsi: u64,
    pub rdi: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
}

/// Everything on the stack when a trap stub calls into Rust.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub regs: GeneralRegisters,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterSnapshot(pub [u64; REG_COUNT]);

impl RegisterSnapshot {
    pub const fn zeroed() -> Self {
        Self([0; REG_COUNT])
    }

    /// Raw capture of `frame`. The RSP slot holds the handler's stack pointer
    /// at capture time, i.e. the address of the frame itself.
    pub fn capture(frame: &TrapFrame) -> Self {
        let r = &frame.regs;
        Self([
            r.rax, r.rbx, r.rcx, r.rdx, r.rsi, r.rdi, r.rbp,
            r.r8, r.r9, r.r10, r.r11, r.r12, r.r13, r.r14, r.r15,
            frame as *const TrapFrame as u64,
            frame.rip,
            frame.cs,
            frame.rflags,
            frame.rsp,
            frame.ss,
        ])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        REGISTER_NAMES.iter().copied().zip(self.0.iter().copied())
    }
}

impl Default for RegisterSnapshot {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Single-slot store for the frozen snapshot.
///
/// There is no lock. Writers only run inside a trap handler (a fault report or
/// the Ctrl+R hotkey); readers run inside a handler or from the
/// `get-registers` syscall. The one way two of them can overlap is a nested
/// trap delivered while a reporter sits in its acknowledgment window, and no
/// path freezes from there while a read of the same slot is in flight. A torn
/// read is possible only if that stops being true.
pub struct SnapshotSlot {
    slot: UnsafeCell<RegisterSnapshot>,
    frozen: AtomicBool,
}

// SAFETY: single core; see the invariant on the type.
unsafe impl Sync for SnapshotSlot {}

impl SnapshotSlot {
    pub const fn new() -> Self {
        Self {
            slot: UnsafeCell::new(RegisterSnapshot::zeroed()),
            frozen: AtomicBool::new(false),
        }
    }

    /// Positional copy of `raw` into the slot.
    pub fn freeze(&self, raw: &RegisterSnapshot) {
        unsafe { core::ptr::write_volatile(self.slot.get(), *raw) };
        self.frozen.store(true, Ordering::Release);
    }

    /// The most recent frozen snapshot. All zeros until the first freeze.
    pub fn read_frozen(&self) -> RegisterSnapshot {
        unsafe { core::ptr::read_volatile(self.slot.get()) }
    }

    pub fn has_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }
}

impl Default for SnapshotSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: u64) -> RegisterSnapshot {
        let mut regs = [0u64; REG_COUNT];
        for (i, r) in regs.iter_mut().enumerate() {
            *r = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(i as u32) ^ i as u64;
        }
        RegisterSnapshot(regs)
    }

    #[test]
    fn read_after_freeze_returns_the_same_values() {
        let slot = SnapshotSlot::new();
        for seed in [0, 1, 42, u64::MAX] {
            let s = sample(seed);
            slot.freeze(&s);
            assert_eq!(slot.read_frozen(), s);
        }
    }

    #[test]
    fn freeze_replaces_the_previous_snapshot() {
        let slot = SnapshotSlot::new();
        slot.freeze(&sample(1));
        slot.freeze(&sample(2));
        assert_eq!(slot.read_frozen(), sample(2));
    }

    #[test]
    fn slot_reports_whether_anything_was_frozen() {
        let slot = SnapshotSlot::new();
        assert!(!slot.has_frozen());
        assert_eq!(slot.read_frozen(), RegisterSnapshot::zeroed());
        slot.freeze(&sample(7));
        assert!(slot.has_frozen());
    }

    #[test]
    fn capture_keeps_the_documented_slot_order() {
        let frame = TrapFrame {
            regs: GeneralRegisters {
                rax: 1, rbx: 2, rcx: 3, rdx: 4, rsi: 5, rdi: 6, rbp: 7,
                r8: 8, r9: 9, r10: 10, r11: 11, r12: 12, r13: 13, r14: 14, r15: 15,
            },
            rip: 0x1000,
            cs: 0x08,
            rflags: 0x202,
            rsp: 0x7000,
            ss: 0x10,
        };
        let snap = RegisterSnapshot::capture(&frame);
        assert_eq!(&snap.0[..15], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]);
        assert_eq!(snap.0[15], &frame as *const TrapFrame as u64);
        assert_eq!(&snap.0[16..], &[0x1000, 0x08, 0x202, 0x7000, 0x10]);
    }

    #[test]
    fn trap_frame_matches_the_stub_push_layout() {
        assert_eq!(core::mem::size_of::<GeneralRegisters>(), 15 * 8);
        assert_eq!(core::mem::size_of::<TrapFrame>(), 20 * 8);
    }
}
