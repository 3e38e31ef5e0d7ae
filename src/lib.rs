//! Final stage of a bootloader: hand execution over to an application image and never come back.
//!
//! The handoff is a strict sequence that silences every interrupt source, reads the application
//! vector table, points the core at that table and its stack, and jumps to the entry point.
//! See [`trampoline::boot`].
#![no_std]

pub mod config;
pub mod interrupts;
pub mod processor;
pub mod trampoline;
pub mod vector_table;

#[cfg(test)]
extern crate std;

#[cfg(test)]
mod mock;

/// Address in the memory map of the core.
pub type Address = u32;

/// Reasons for refusing to hand off, as reported by the opt-in checks.
///
/// The handoff itself never fails: these are only produced before any hardware state is touched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Application base does not satisfy the alignment of the vector table offset register.
    Misaligned,
    /// Interrupt bank describes no clear-enable words, or more than the architecture provides.
    InterruptBank,
    /// Vector table reads as erased or unprogrammed flash.
    Erased,
    /// Entry point does not have the thumb bit set.
    NotThumb,
    /// Initial stack pointer is not word aligned.
    StackMisaligned,
    /// Persistent storage could not be read or written.
    Storage,
}

#[cfg(feature = "defmt")]
pub(crate) use defmt as log;

#[cfg(not(feature = "defmt"))]
pub(crate) mod log {
    macro_rules! info {
        ( $( $x:expr ),* ) => {};
    }
    pub(crate) use info;
    macro_rules! debug {
        ( $( $x:expr ),* ) => {};
    }
    pub(crate) use debug;
    macro_rules! warner {
        ( $( $x:expr ),* ) => {};
    }
    pub(crate) use warner as warn;
}
