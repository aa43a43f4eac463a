//! # Interrupt Descriptor Table
//!
//! A 256-entry table of 16-byte gate descriptors. Five vectors are populated;
//! every other entry stays null, so a trap on any of them is not handled.
//!
//! | Vector | Source                 | Entry stub         |
//! |--------|------------------------|--------------------|
//! | 0x00   | Divide error (#DE)     | `divide_error`     |
//! | 0x06   | Invalid opcode (#UD)   | `invalid_opcode`   |
//! | 0x20   | Timer (IRQ0)           | `timer`            |
//! | 0x21   | Keyboard (IRQ1)        | `keyboard`         |
//! | 0x80   | Syscall (`int 0x80`)   | `syscall`          |
//!
//! All five are 64-bit interrupt gates through the kernel code selector, so
//! the CPU clears IF on entry.

use spin::Lazy;
use x86_64::{instructions::tables::lidt, structures::DescriptorTablePointer, VirtAddr};

use super::{gdt::KERNEL_CODE_SELECTOR, pic, stubs};

pub const IDT_ENTRIES: usize = 256;

/// Present, DPL 0, 64-bit interrupt gate.
pub const ACS_INT: u8 = 0x8E;

/// Numbers are the contract with the hardware and the bootstrap code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Vector {
    DivideError = 0x00,
    InvalidOpcode = 0x06,
    Timer = pic::PIC_1_OFFSET,
    Keyboard = pic::PIC_1_OFFSET + 1,
    Syscall = 0x80,
}

impl Vector {
    pub const ALL: [Vector; 5] = [
        Vector::DivideError,
        Vector::InvalidOpcode,
        Vector::Timer,
        Vector::Keyboard,
        Vector::Syscall,
    ];

    pub fn from_u8(vector: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_u8() == vector)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    zero: u8,
    access: u8,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl GateDescriptor {
    pub const NULL: Self = Self {
        offset_low: 0,
        selector: 0,
        zero: 0,
        access: 0,
        offset_mid: 0,
        offset_high: 0,
        reserved: 0,
    };

    pub const fn new(handler: u64, selector: u16, access: u8) -> Self {
        Self {
            offset_low: (handler & 0xFFFF) as u16,
            selector,
            zero: 0,
            access,
            offset_mid: ((handler >> 16) & 0xFFFF) as u16,
            offset_high: (handler >> 32) as u32,
            reserved: 0,
        }
    }

    pub fn handler(&self) -> u64 {
        let (low, mid, high) = (self.offset_low, self.offset_mid, self.offset_high);
        low as u64 | (mid as u64) << 16 | (high as u64) << 32
    }

    pub fn selector(&self) -> u16 {
        self.selector
    }

    pub fn access(&self) -> u8 {
        self.access
    }

    pub fn is_present(&self) -> bool {
        self.access & 0x80 != 0
    }

    pub fn reserved_fields_clear(&self) -> bool {
        let reserved = self.reserved;
        self.zero == 0 && reserved == 0
    }
}

#[repr(C, align(16))]
pub struct InterruptTable {
    entries: [GateDescriptor; IDT_ENTRIES],
}

impl InterruptTable {
    pub const fn new() -> Self {
        Self { entries: [GateDescriptor::NULL; IDT_ENTRIES] }
    }

    pub fn install(&mut self, vector: u8, handler: u64) {
        self.entries[vector as usize] = GateDescriptor::new(handler, KERNEL_CODE_SELECTOR, ACS_INT);
    }

    pub fn entry(&self, vector: u8) -> &GateDescriptor {
        &self.entries[vector as usize]
    }

    /// Gates for the two faults, the two IRQ lines and the syscall.
    pub fn kernel() -> Self {
        let mut idt = Self::new();
        idt.install(Vector::DivideError.as_u8(), stubs::divide_error as usize as u64);
        idt.install(Vector::InvalidOpcode.as_u8(), stubs::invalid_opcode as usize as u64);
        idt.install(Vector::Timer.as_u8(), stubs::timer as usize as u64);
        idt.install(Vector::Keyboard.as_u8(), stubs::keyboard as usize as u64);
        idt.install(Vector::Syscall.as_u8(), stubs::syscall as usize as u64);
        idt
    }

    fn pointer(&'static self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (core::mem::size_of::<Self>() - 1) as u16,
            base: VirtAddr::new(self as *const Self as u64),
        }
    }
}

impl Default for InterruptTable {
    fn default() -> Self {
        Self::new()
    }
}

static IDT: Lazy<InterruptTable> = Lazy::new(InterruptTable::kernel);

/// Load the table, open the timer and keyboard lines, enable interrupts.
pub fn load() {
    unsafe { lidt(&IDT.pointer()) };
    pic::init();
    x86_64::instructions::interrupts::enable();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_sixteen_bytes() {
        assert_eq!(core::mem::size_of::<GateDescriptor>(), 16);
        assert_eq!(core::mem::size_of::<InterruptTable>(), 16 * IDT_ENTRIES);
    }

    #[test]
    fn handler_address_is_split_across_three_fields() {
        let gate = GateDescriptor::new(0xFFFF_8000_1234_5678, KERNEL_CODE_SELECTOR, ACS_INT);
        let (low, mid, high) = (gate.offset_low, gate.offset_mid, gate.offset_high);
        assert_eq!(low, 0x5678);
        assert_eq!(mid, 0x1234);
        assert_eq!(high, 0xFFFF_8000);
        assert_eq!(gate.handler(), 0xFFFF_8000_1234_5678);
        assert!(gate.reserved_fields_clear());
    }

    #[test]
    fn only_the_five_kernel_vectors_are_populated() {
        let idt = InterruptTable::kernel();
        for vector in 0..=255u8 {
            let gate = idt.entry(vector);
            assert!(gate.reserved_fields_clear());
            if Vector::from_u8(vector).is_some() {
                assert!(gate.is_present(), "vector {vector:#x}");
                assert_eq!(gate.selector(), KERNEL_CODE_SELECTOR);
                assert_eq!(gate.access(), ACS_INT);
                assert_ne!(gate.handler(), 0);
            } else {
                assert_eq!(*gate, GateDescriptor::NULL, "vector {vector:#x}");
            }
        }
    }

    #[test]
    fn vector_numbers_are_fixed() {
        let numbers: Vec<u8> = Vector::ALL.iter().map(|v| v.as_u8()).collect();
        assert_eq!(numbers, [0x00, 0x06, 0x20, 0x21, 0x80]);
        assert_eq!(Vector::from_u8(0x0E), None);
    }
}
