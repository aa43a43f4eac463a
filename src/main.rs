#![no_std]
#![no_main]

extern crate rlibc;

use bootloader_api::{entry_point, BootInfo};
use core::panic::PanicInfo;

use barebones::{exceptions, hlt_loop, kernel::init_kernel, println};

mod shell;

entry_point!(kernel_main);

pub fn kernel_main(boot_info: &'static mut BootInfo) -> ! {
    let framebuffer = boot_info.framebuffer.as_mut();

    if let Err(e) = init_kernel(framebuffer) {
        println!("Kernel initialization failed: {}", e);
        hlt_loop();
    }

    exceptions::set_recovery(shell::restart);
    shell::run()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    println!("KERNEL PANIC: {}", info);
    hlt_loop()
}
