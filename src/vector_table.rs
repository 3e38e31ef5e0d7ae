//! Application vector table, of which only the first two words are of interest for the handoff.

use crate::{Address, Error, processor::Processor};

/// Word read back from erased NOR flash.
const ERASED: u32 = 0xFFFF_FFFF;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VectorTable {
    /// Word 0: value of the stack pointer before any application code runs.
    pub initial_stack_pointer: u32,
    /// Word 1: address of the reset routine of the application, with the thumb bit set.
    pub entry_point: Address,
}

impl VectorTable {
    /// Read the table at `base`, without judging its contents.
    ///
    /// # Safety
    /// Both words at `base` must be readable.
    pub unsafe fn locate<P: Processor>(processor: &P, base: Address) -> Self {
        unsafe {
            Self {
                initial_stack_pointer: processor.read_word(base),
                entry_point: processor.read_word(base.wrapping_add(4)),
            }
        }
    }

    /// Plausibility check of the table contents.
    ///
    /// This is no substitute for verifying the image, it only catches blank flash and images linked for a different core.
    pub fn check(&self) -> Result<(), Error> {
        if self.initial_stack_pointer == ERASED
            || self.entry_point == ERASED
            || self.entry_point == 0
        {
            return Err(Error::Erased);
        }

        if self.entry_point & 1 == 0 {
            return Err(Error::NotThumb);
        }

        if self.initial_stack_pointer & 0b11 != 0 {
            return Err(Error::StackMisaligned);
        }

        Ok(())
    }
}
