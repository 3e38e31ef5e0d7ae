#![no_std]
#![no_main]

use cortex_m_rt::entry;
use handoff::{config::Config, processor::cortex_m::CortexM, trampoline};

use {defmt_rtt as _, panic_halt as _};

/// Application linked right after the bootloader sector.
const APPLICATION: Config = Config::stm32f4(0x0800_4000);

#[entry]
fn main() -> ! {
    defmt::info!("Bootloader");

    let mut processor = CortexM::new();

    match unsafe { trampoline::try_boot(&mut processor, &APPLICATION) } {
        Ok(never) => match never {},
        Err(e) => {
            defmt::error!("No bootable application: {}", e);
            loop {
                cortex_m::asm::wfi();
            }
        }
    }
}
