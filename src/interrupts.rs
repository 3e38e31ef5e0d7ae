//! Silencing of every interrupt source owned by the bootloader.
//!
//! Once the vector table offset is changed, any interrupt taken would vector through the application's table
//! with the bootloader's peripherals still configured. Hence all levels are silenced beforehand, from the outermost inwards:
//! the task scheduler, the CPU primary mask, each clear-enable word of the interrupt controller, and finally the system timer.

use serde::{Deserialize, Serialize};

use crate::{Error, processor::Processor};

/// Number of clear-enable words the ARMv7-M and ARMv8-M architectures provide for.
pub const MAX_WORDS: u8 = 16;

/// Layout of the clear-enable register bank of the interrupt controller.
///
/// All implemented words are written with every bit set, except the last one:
/// vendors may reserve its upper bits, which must not be written.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptBank {
    words: u8,
    last_word_mask: u32,
}

impl InterruptBank {
    /// STM32F4 family, as per PM0214: bits 16 to 31 of `NVIC_ICER7` are reserved.
    pub const STM32F4: Self = Self::with_reserved(8, 0x0000_FFFF);

    /// ARMv6-M cores, implementing a single word.
    pub const ARMV6M: Self = Self::full(1);

    /// Bank of `words` words without any reserved bits.
    pub const fn full(words: u8) -> Self {
        Self::with_reserved(words, u32::MAX)
    }

    /// Bank of `words` words, where only `last_word_mask` may be written to the last word.
    pub const fn with_reserved(words: u8, last_word_mask: u32) -> Self {
        Self {
            words,
            last_word_mask,
        }
    }

    pub const fn words(&self) -> u8 {
        self.words
    }

    pub const fn last_word_mask(&self) -> u32 {
        self.last_word_mask
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.words == 0 || self.words > MAX_WORDS {
            return Err(Error::InterruptBank);
        }

        Ok(())
    }

    /// Word index and value to write for each word in the bank.
    ///
    /// Words past [`MAX_WORDS`] do not exist on any core and are skipped.
    pub fn masks(&self) -> impl Iterator<Item = (usize, u32)> {
        let last = self.words as usize;
        (0..last.min(MAX_WORDS as usize)).map(move |word| {
            if word + 1 == last {
                (word, self.last_word_mask)
            } else {
                (word, u32::MAX)
            }
        })
    }
}

/// Disable delivery of all interrupts, returning once every disabling write has been issued.
///
/// Writes are absolute, so running this more than once has no further effect.
///
/// # Safety
/// Leaves the bootloader without interrupts, timers or any scheduler.
/// Only the remainder of the handoff may run afterwards.
pub unsafe fn disable_all<P: Processor>(processor: &mut P, bank: &InterruptBank) {
    processor.mask_tasks();

    // Past this point no peripheral can fire in between the individual bank writes.
    processor.disable_interrupts();

    for (word, mask) in bank.masks() {
        unsafe { processor.clear_enable(word, mask) };
    }

    unsafe { processor.disable_systick() };
}
