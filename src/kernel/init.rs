//! Kernel initialization phases

use bootloader_api::info::FrameBuffer;

use crate::{
    devices::{
        console::with_console,
        drivers::ps2_keyboard,
        framebuffer::framebuffer::FramebufferWriter,
    },
    interrupts::{self, gdt},
    serial,
    time::cpu,
    KERNEL,
};

const PHASES: usize = 5;

/// Bring the kernel up in order: serial log, GDT, console, keyboard,
/// interrupts, cycle counter. Stops at the first phase that fails.
pub fn init_kernel(framebuffer: Option<&'static mut FrameBuffer>) -> Result<(), &'static str> {
    serial::init();
    println!("==== barebones kernel ====");

    init_phase(1, "GDT", gdt::init)?;
    init_phase(2, "Console", || init_console(framebuffer))?;
    init_phase(3, "Keyboard", init_keyboard)?;
    init_phase(4, "Interrupts", interrupts::init)?;
    init_phase(5, "Cycle counter", init_cycle_counter)?;

    println!("Kernel initialization complete\n");
    Ok(())
}

fn init_phase(
    index: usize,
    name: &'static str,
    init_fn: impl FnOnce() -> Result<(), &'static str>,
) -> Result<(), &'static str> {
    println!("[{}/{}] Initializing {}...", index, PHASES, name);

    match init_fn() {
        Ok(()) => {
            println!("    ok: {}", name);
            Ok(())
        }
        Err(e) => {
            println!("    failed: {}: {}", name, e);
            Err(e)
        }
    }
}

fn init_console(framebuffer: Option<&'static mut FrameBuffer>) -> Result<(), &'static str> {
    match framebuffer {
        Some(fb) => {
            let info = fb.info();
            println!(
                "    framebuffer {}x{}, {:?}, {} bytes/pixel",
                info.width, info.height, info.pixel_format, info.bytes_per_pixel
            );
            with_console(|c| c.attach(FramebufferWriter::new(fb)));
        }
        None => println!("    no framebuffer, console output goes to serial"),
    }
    Ok(())
}

/// Needs the timer running: calibration counts PIT ticks.
fn init_cycle_counter() -> Result<(), &'static str> {
    let clock = &KERNEL.clock;
    clock.calibrate();
    if clock.is_calibrated() {
        println!(
            "    TSC at {} Hz (invariant: {})",
            clock.frequency(),
            cpu::has_invariant_tsc()
        );
    } else {
        println!("    no TSC, fine-grained timing disabled");
    }
    Ok(())
}

fn init_keyboard() -> Result<(), &'static str> {
    let stale = ps2_keyboard::flush_output();
    if stale > 0 {
        println!("    discarded {} stale scancodes", stale);
    }
    Ok(())
}
