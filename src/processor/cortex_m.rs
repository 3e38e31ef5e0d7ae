use core::ptr;

use crate::{Address, interrupts::MAX_WORDS, processor::Processor};

/// Vector table offset register, also present on the Cortex-M0+.
const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;

/// Register access for Cortex-M cores without TrustZone.
///
/// Optionally runs a hook to mask interrupts at the scheduler level,
/// for example raising `BASEPRI` to the system call ceiling of an RTOS.
pub struct CortexM {
    task_mask: Option<fn()>,
}

impl CortexM {
    pub const fn new() -> Self {
        Self { task_mask: None }
    }

    pub const fn with_task_mask(task_mask: fn()) -> Self {
        Self {
            task_mask: Some(task_mask),
        }
    }
}

impl Default for CortexM {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for CortexM {
    fn mask_tasks(&mut self) {
        if let Some(task_mask) = self.task_mask {
            task_mask();
        }
    }

    fn disable_interrupts(&mut self) {
        cortex_m::interrupt::disable();
    }

    unsafe fn clear_enable(&mut self, word: usize, mask: u32) {
        // Words past the architectural limit do not exist.
        if word >= MAX_WORDS as usize {
            return;
        }

        let nvic = unsafe { &*cortex_m::peripheral::NVIC::PTR };
        unsafe { nvic.icer[word].write(mask) };
    }

    unsafe fn disable_systick(&mut self) {
        let syst = unsafe { &*cortex_m::peripheral::SYST::PTR };
        unsafe { syst.csr.write(0) };
    }

    unsafe fn read_word(&self, address: Address) -> u32 {
        unsafe { ptr::read_volatile(address as usize as *const u32) }
    }

    unsafe fn set_vector_table(&mut self, address: Address) {
        unsafe { ptr::write_volatile(SCB_VTOR, address) };
    }

    unsafe fn launch(&mut self, stack_pointer: u32, entry: Address) -> ! {
        unsafe { jump(stack_pointer, entry) }
    }
}

/// Switch both stacks and call `entry`, spinning should it return.
///
/// A single block, as no compiler generated code may touch the stack once it has been switched.
#[cfg(target_arch = "arm")]
unsafe fn jump(stack_pointer: u32, entry: Address) -> ! {
    unsafe {
        core::arch::asm!(
            "msr msp, {sp}",
            "msr psp, {sp}",
            "blx {entry}",
            "2:",
            "b 2b",
            sp = in(reg) stack_pointer,
            entry = in(reg) entry,
            options(noreturn),
        )
    }
}

#[cfg(not(target_arch = "arm"))]
unsafe fn jump(stack_pointer: u32, entry: Address) -> ! {
    unimplemented!("jump to {entry:#x} with stack {stack_pointer:#x} requires a Cortex-M core")
}
