//! Control interface over the processor state that the handoff mutates.

use crate::Address;

#[cfg(feature = "cortex_m")]
pub mod cortex_m;

/// Primitive operations on the core and its system peripherals.
///
/// Every write issued through this trait is global and irreversible from the bootloader's point of view.
/// The ordering of these operations is owned by [`crate::trampoline`], implementations only perform them.
///
/// Stack pointers are only ever loaded by [`Processor::launch`], which never hands back control to the bootloader.
pub trait Processor {
    /// Mask interrupts at the level of a task scheduler, if any is running.
    fn mask_tasks(&mut self);

    /// Set the primary interrupt mask of the CPU.
    fn disable_interrupts(&mut self);

    /// Write `mask` to clear-enable register `word` of the interrupt controller.
    ///
    /// Set bits disable the corresponding interrupt, cleared bits are left as is.
    unsafe fn clear_enable(&mut self, word: usize, mask: u32);

    /// Stop the periodic system timer and its interrupt.
    unsafe fn disable_systick(&mut self);

    /// Read a single word from memory.
    unsafe fn read_word(&self, address: Address) -> u32;

    /// Point the core at the vector table located at `address`.
    unsafe fn set_vector_table(&mut self, address: Address);

    /// Load the main and then the process stack pointer with `stack_pointer`, and call into `entry`.
    ///
    /// The routine at `entry` is expected to never return. Should it do so anyway, the core is parked forever.
    /// No code of the bootloader may run in between the stack switch and the call, as the old stack is abandoned.
    unsafe fn launch(&mut self, stack_pointer: u32, entry: Address) -> !;
}
