use serde::{Deserialize, Serialize};

use crate::{Address, Error, interrupts::InterruptBank};

#[cfg(feature = "stored_config")]
pub mod stored;

/// Minimal alignment of the vector table offset register, as its lowest seven bits are reserved.
pub const VECTOR_TABLE_ALIGNMENT: Address = 128;

/// Description of the application to hand off to, and of the core it runs on.
///
/// Typically a `const` derived from the linker configuration.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Start of the application image, where its vector table resides.
    pub application_base: Address,
    pub interrupts: InterruptBank,
}

impl Config {
    pub const fn new(application_base: Address, interrupts: InterruptBank) -> Self {
        Self {
            application_base,
            interrupts,
        }
    }

    pub const fn stm32f4(application_base: Address) -> Self {
        Self::new(application_base, InterruptBank::STM32F4)
    }

    /// Check whether the configuration can be programmed into the core.
    ///
    /// Depending on the number of implemented vectors, the core might require a stricter alignment than checked here.
    pub fn validate(&self) -> Result<(), Error> {
        if self.application_base % VECTOR_TABLE_ALIGNMENT != 0 {
            return Err(Error::Misaligned);
        }

        self.interrupts.validate()
    }
}
