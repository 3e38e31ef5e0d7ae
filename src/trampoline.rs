//! The handoff from bootloader to application.
//!
//! Runs at most once per boot, as a strict sequence where each step completes before the next begins:
//! 1. silence all interrupt sources;
//! 2. read the initial stack pointer and entry point from the application vector table;
//! 3. point the vector table offset register to the application;
//! 4. load the stack pointers and call the entry point, parking the core forever should it ever return.
//!
//! No step validates the image: that is the responsibility of whoever selected it.
//! See [`try_boot`] for an opt-in plausibility check.

use core::convert::Infallible;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use crate::{
    Address, Error, config::Config, interrupts, log, processor::Processor,
    vector_table::VectorTable,
};

/// Progress of the handoff, retained for inspection from a fault handler or debugger.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Stage {
    /// No handoff has been started.
    Idle = 0,
    Silencing = 1,
    Locating = 2,
    Repointing = 3,
    /// Last stage recorded: the stacks are switched and the application is called, or the core is parked.
    Transferring = 4,
}

impl Stage {
    const fn from_u8(value: u8) -> Stage {
        match value {
            1 => Stage::Silencing,
            2 => Stage::Locating,
            3 => Stage::Repointing,
            4 => Stage::Transferring,
            _ => Stage::Idle,
        }
    }
}

/// Storage for the vector table words that outlives the stack of the bootloader.
///
/// Once the stack pointer is reloaded, anything on the old stack may be overwritten by the application.
/// The values needed after that point are therefore only ever read from a latch placed in static memory.
pub struct Latch {
    stack_pointer: AtomicU32,
    entry_point: AtomicU32,
    stage: AtomicU8,
}

impl Latch {
    pub const fn new() -> Self {
        Self {
            stack_pointer: AtomicU32::new(0),
            entry_point: AtomicU32::new(0),
            stage: AtomicU8::new(Stage::Idle as u8),
        }
    }

    fn hold(&self, table: VectorTable) {
        self.stack_pointer
            .store(table.initial_stack_pointer, Ordering::Relaxed);
        self.entry_point.store(table.entry_point, Ordering::Relaxed);
    }

    fn enter(&self, stage: Stage) {
        self.stage.store(stage as u8, Ordering::Relaxed);
    }

    pub fn stack_pointer(&self) -> u32 {
        self.stack_pointer.load(Ordering::Relaxed)
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point.load(Ordering::Relaxed)
    }

    pub fn stage(&self) -> Stage {
        Stage::from_u8(self.stage.load(Ordering::Relaxed))
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

static LATCH: Latch = Latch::new();

/// Progress of the handoff started by [`boot`].
pub fn stage() -> Stage {
    LATCH.stage()
}

/// Hand off to the application described by `config`.
///
/// # Safety
/// A valid application image must reside at the application base.
/// Nothing of the bootloader runs after this call, including destructors.
pub unsafe fn boot<P: Processor>(processor: &mut P, config: &Config) -> ! {
    unsafe { handoff(processor, config, &LATCH) }
}

/// Hand off to the application, after checking the configuration and the vector table for plausibility.
///
/// The checks are performed before any hardware state is touched, so on failure the bootloader is free to carry on.
///
/// # Safety
/// See [`boot`].
pub unsafe fn try_boot<P: Processor>(
    processor: &mut P,
    config: &Config,
) -> Result<Infallible, Error> {
    config.validate()?;

    let table = unsafe { VectorTable::locate(processor, config.application_base) };
    log::debug!(
        "vector table: sp {=u32:#x}, entry {=u32:#x}",
        table.initial_stack_pointer,
        table.entry_point
    );

    if let Err(e) = table.check() {
        log::warn!("refusing handoff: {}", e);
        return Err(e);
    }

    unsafe { boot(processor, config) }
}

/// The full handoff sequence, holding the vector table words in `latch`.
///
/// # Safety
/// See [`boot`]. `latch` must not live on the stack when running on hardware.
pub unsafe fn handoff<P: Processor>(processor: &mut P, config: &Config, latch: &Latch) -> ! {
    log::info!("handing off to {=u32:#x}", config.application_base);

    latch.enter(Stage::Silencing);
    unsafe { interrupts::disable_all(processor, &config.interrupts) };

    latch.enter(Stage::Locating);
    let table = unsafe { VectorTable::locate(processor, config.application_base) };
    latch.hold(table);

    latch.enter(Stage::Repointing);
    unsafe { repoint(processor, config.application_base) };

    latch.enter(Stage::Transferring);
    unsafe { transfer(processor, latch) }
}

/// Point the core to the vector table of the application.
///
/// This must precede loading the stack pointers: should an exception be taken in between, it must not
/// vector through the bootloader's table whilst on the application's stack.
unsafe fn repoint<P: Processor>(processor: &mut P, base: Address) {
    unsafe { processor.set_vector_table(base) };
}

/// Load the stack pointers and jump to the application entry point, parking the core should it return.
///
/// Both words come from `latch`, as the stack of the bootloader is abandoned within [`Processor::launch`].
unsafe fn transfer<P: Processor>(processor: &mut P, latch: &Latch) -> ! {
    unsafe { processor.launch(latch.stack_pointer(), latch.entry_point()) }
}
