// gdt.rs
use spin::Lazy;
use x86_64::structures::gdt::{Descriptor, GlobalDescriptorTable, SegmentSelector};

/// Selector every IDT gate jumps through. The code segment is the first entry
/// after the null descriptor.
pub const KERNEL_CODE_SELECTOR: u16 = 0x08;

struct Selectors {
    code_selector: SegmentSelector,
    data_selector: SegmentSelector,
}

static GDT: Lazy<(GlobalDescriptorTable, Selectors)> = Lazy::new(|| {
    let mut gdt = GlobalDescriptorTable::new();

    let code_selector = gdt.append(Descriptor::kernel_code_segment());
    let data_selector = gdt.append(Descriptor::kernel_data_segment());

    (gdt, Selectors { code_selector, data_selector })
});

pub fn init() -> Result<(), &'static str> {
    let (ref gdt, ref selectors) = *GDT;
    if selectors.code_selector.0 != KERNEL_CODE_SELECTOR {
        return Err("kernel code segment is not at selector 0x08");
    }
    gdt.load();

    unsafe {
        use x86_64::instructions::segmentation::{Segment, CS, DS, ES, SS};

        CS::set_reg(selectors.code_selector);
        DS::set_reg(selectors.data_selector);
        ES::set_reg(selectors.data_selector);
        SS::set_reg(selectors.data_selector);
    }
    Ok(())
}
