//! # Boot Console
//!
//! Minimal prompt that talks to the kernel only through `int 0x80`, the same
//! way any other program on top of the trap core would.
//!
//! ## Available Commands
//!
//! ### General
//! - `help`: List commands
//! - `clear`: Clear the screen
//! - `font <1-3>`: Switch font size
//! - `rect`: Draw a color swatch
//! - `beep`: Play a short tone
//!
//! ### Inspection
//! - `regs`: Show the last frozen register snapshot (Ctrl+R freezes one)
//! - `time`: RTC date and time
//! - `ticks`: Timer ticks since boot
//! - `tsc`: Cycle counter capabilities and a timed sleep
//!
//! ### Faults
//! - `div0`: Divide by zero
//! - `invop`: Execute an undefined opcode
//!
//! A fault report resumes here, at a fresh prompt.

use core::arch::asm;

use barebones::{
    devices::drivers::rtc::RtcTime,
    format_no_std,
    registers::{REGISTER_NAMES, REG_COUNT},
    syscalls::Syscall,
};

const LINE_CAPACITY: usize = 128;
const PROMPT: &str = "> ";

const BACKSPACE: u8 = 0x08;

enum CommandResult {
    Done,
    Error(&'static str),
}

fn syscall(call: Syscall, a1: u64, a2: u64, a3: u64, a4: u64, a5: u64) -> i64 {
    let ret: i64;
    unsafe {
        asm!(
            "int 0x80",
            in("rdi") call as u64,
            in("rsi") a1,
            in("rdx") a2,
            in("rcx") a3,
            in("r8") a4,
            in("r9") a5,
            lateout("rax") ret,
        );
    }
    ret
}

fn write(s: &str) {
    syscall(Syscall::Write, s.as_ptr() as u64, s.len() as u64, 0, 0, 0);
}

macro_rules! out {
    ($($arg:tt)*) => {{
        let mut buf = [0u8; 160];
        match format_no_std!(&mut buf, $($arg)*) {
            Ok(s) => write(s),
            Err(_) => write("<output too long>\n"),
        }
    }};
}

/// Block until a key is available. Halts between polls; the keyboard IRQ
/// wakes the CPU.
fn read_key() -> u8 {
    let mut c = 0u8;
    loop {
        if syscall(Syscall::Read, 0, &mut c as *mut u8 as u64, 1, 0, 0) == 1 {
            return c;
        }
        x86_64::instructions::hlt();
    }
}

/// Edit one line in `buf`, echoing as it goes. Returns its length.
fn read_line(buf: &mut [u8; LINE_CAPACITY]) -> usize {
    let mut len = 0;
    loop {
        match read_key() {
            b'\n' => {
                write("\n");
                return len;
            }
            BACKSPACE => {
                if len > 0 {
                    len -= 1;
                    write("\x08");
                }
            }
            c if len < LINE_CAPACITY && (c == b' ' || c.is_ascii_graphic()) => {
                buf[len] = c;
                len += 1;
                let echo = [c];
                if let Ok(s) = core::str::from_utf8(&echo) {
                    write(s);
                }
            }
            _ => {}
        }
    }
}

pub fn run() -> ! {
    write("Type `help` for a list of commands.\n");
    let mut line = [0u8; LINE_CAPACITY];
    loop {
        write(PROMPT);
        let len = read_line(&mut line);
        let input = core::str::from_utf8(&line[..len]).unwrap_or("");
        if let CommandResult::Error(msg) = execute(input) {
            out!("error: {}\n", msg);
        }
    }
}

/// Entry used after a fault report: a new prompt on a fresh stack frame.
pub extern "C" fn restart() -> ! {
    write("\nRecovered from exception.\n");
    run()
}

fn execute(input: &str) -> CommandResult {
    let mut parts = input.split_whitespace();
    let Some(cmd) = parts.next() else {
        return CommandResult::Done;
    };

    match cmd {
        "help" => help(),
        "clear" => {
            syscall(Syscall::ClearScreen, 0, 0, 0, 0, 0);
            CommandResult::Done
        }
        "font" => font(parts.next()),
        "rect" => rect(),
        "beep" => {
            syscall(Syscall::PlaySound, 440, 200, 0, 0, 0);
            CommandResult::Done
        }
        "regs" => regs(),
        "time" => time(),
        "ticks" => {
            out!("{} ticks\n", syscall(Syscall::GetTicks, 0, 0, 0, 0, 0));
            CommandResult::Done
        }
        "tsc" => tsc(),
        "div0" => divide_by_zero(),
        "invop" => invalid_opcode(),
        _ => CommandResult::Error("unknown command, try `help`"),
    }
}

fn help() -> CommandResult {
    write(
        "help            this list\n\
         clear           clear the screen (also Ctrl+L)\n\
         font <1-3>      change font size\n\
         rect            draw a color swatch\n\
         beep            440 Hz for 200 ms\n\
         regs            last frozen registers (Ctrl+R to freeze)\n\
         time            RTC date and time\n\
         ticks           timer ticks since boot\n\
         tsc             cycle counter info\n\
         div0            trigger a divide error\n\
         invop           trigger an invalid opcode\n",
    );
    CommandResult::Done
}

fn font(arg: Option<&str>) -> CommandResult {
    let Some(level) = arg.and_then(|a| a.parse::<u64>().ok()) else {
        return CommandResult::Error("usage: font <1-3>");
    };
    if !(1..=3).contains(&level) {
        return CommandResult::Error("font size must be 1, 2 or 3");
    }
    syscall(Syscall::ChangeFontSize, level, 0, 0, 0, 0);
    CommandResult::Done
}

fn rect() -> CommandResult {
    const SWATCH: [(u64, u8); 4] = [(0xE0_40_40, b'R'), (0x40_C0_40, b'G'), (0x40_60_E0, b'B'), (0xE0_E0_E0, b'W')];
    const SIZE: u64 = 32;
    const TOP: u64 = 8;

    for (i, &(color, label)) in SWATCH.iter().enumerate() {
        let x = 400 + i as u64 * (SIZE + 8);
        syscall(Syscall::DrawRect, color, x, TOP, SIZE, SIZE);
        syscall(Syscall::PutChar, label as u64, x + SIZE / 2 - 4, TOP + SIZE + 4, color, 0);
    }
    CommandResult::Done
}

fn regs() -> CommandResult {
    let mut regs = [0u64; REG_COUNT];
    syscall(Syscall::GetRegisters, regs.as_mut_ptr() as u64, 0, 0, 0, 0);
    if regs.iter().all(|&r| r == 0) {
        write("no snapshot yet, press Ctrl+R\n");
        return CommandResult::Done;
    }
    for (name, value) in REGISTER_NAMES.iter().zip(regs) {
        out!("{:<8}0x{:016X}\n", name, value);
    }
    CommandResult::Done
}

fn time() -> CommandResult {
    let mut now = RtcTime::default();
    if syscall(Syscall::GetTime, &mut now as *mut RtcTime as u64, 0, 0, 0, 0) < 0 {
        return CommandResult::Error("RTC unavailable");
    }
    out!(
        "20{:02}-{:02}-{:02} {:02}:{:02}:{:02}\n",
        now.year, now.month, now.day, now.hours, now.minutes, now.seconds
    );
    CommandResult::Done
}

fn tsc() -> CommandResult {
    if syscall(Syscall::HasCounter, 0, 0, 0, 0, 0) == 0 {
        return CommandResult::Error("no cycle counter on this CPU");
    }
    let invariant = syscall(Syscall::HasInvariantCounter, 0, 0, 0, 0, 0) == 1;
    let hz = syscall(Syscall::GetFrequency, 0, 0, 0, 0, 0);
    out!("frequency {} Hz, invariant: {}\n", hz, invariant);

    // one second of PIT ticks, measured with the cycle counter
    let start = syscall(Syscall::ReadCycleCounter, 0, 0, 0, 0, 0) as u64;
    syscall(Syscall::Sleep, 18, 0, 0, 0, 0);
    let elapsed = (syscall(Syscall::ReadCycleCounter, 0, 0, 0, 0, 0) as u64).wrapping_sub(start);
    let ms = syscall(Syscall::CyclesToMillis, elapsed, 0, 0, 0, 0);
    let us = syscall(Syscall::CyclesToMicros, elapsed, 0, 0, 0, 0);
    out!("sleep(18): {} cycles = {} ms = {} us\n", elapsed, ms, us);
    CommandResult::Done
}

fn divide_by_zero() -> CommandResult {
    unsafe {
        asm!(
            "xor edx, edx",
            "mov eax, 1",
            "xor ecx, ecx",
            "div ecx",
            out("eax") _,
            out("ecx") _,
            out("edx") _,
        );
    }
    CommandResult::Done
}

fn invalid_opcode() -> CommandResult {
    unsafe { asm!("ud2") };
    CommandResult::Done
}
