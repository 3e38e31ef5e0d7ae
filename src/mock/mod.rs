
use core::cell::RefCell;
use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::vec::Vec;

use crate::{Address, interrupts::MAX_WORDS, processor::Processor};

/// Every operation performed on the processor, in order of issue.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event {
    MaskTasks,
    DisableInterrupts,
    ClearEnable { word: usize, mask: u32 },
    DisableSysTick,
    ReadWord(Address),
    SetVectorTable(Address),
    SetMainStackPointer(u32),
    SetProcessStackPointer(u32),
    Call(Address),
    Idle,
}

/// How a handoff on the mock ended.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// The application took over and never handed back control.
    Launched(Address),
    /// The processor was parked in the terminal loop.
    Halted,
}

/// Snapshot of the processor state visible to the application.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Registers {
    pub tasks_masked: bool,
    pub primask: bool,
    pub enabled: [u32; MAX_WORDS as usize],
    pub systick_ctrl: u32,
    pub vtor: u32,
    pub msp: u32,
    pub psp: u32,
}

/// Erased NOR flash.
const BLANK: u32 = 0xFFFF_FFFF;

/// Bootloader reset state: the SysTick enabled with its interrupt, as well as every peripheral interrupt.
const SYSTICK_ENABLED: u32 = 0b011;

pub struct MockProcessor {
    pub tasks_masked: bool,
    pub primask: bool,
    /// Interrupt enable state, as would be read back from the set-enable registers.
    pub enabled: [u32; MAX_WORDS as usize],
    pub systick_ctrl: u32,
    pub vtor: u32,
    pub msp: u32,
    pub psp: u32,
    pub memory: BTreeMap<Address, u32>,
    /// Whether the application hands back control, which it never should.
    pub returns: bool,
    /// Number of times the stacks were switched.
    pub launches: usize,
    events: RefCell<Vec<Event>>,
}

impl MockProcessor {
    pub fn new() -> MockProcessor {
        MockProcessor {
            tasks_masked: false,
            primask: false,
            enabled: [u32::MAX; MAX_WORDS as usize],
            systick_ctrl: SYSTICK_ENABLED,
            vtor: 0,
            msp: 0x2000_0400,
            psp: 0,
            memory: BTreeMap::new(),
            returns: false,
            launches: 0,
            events: RefCell::new(Vec::new()),
        }
    }

    /// Program the first two words of a vector table at `base`.
    pub fn load_table(&mut self, base: Address, initial_stack_pointer: u32, entry_point: Address) {
        self.memory.insert(base, initial_stack_pointer);
        self.memory.insert(base + 4, entry_point);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Position of the first event matching `f`.
    pub fn position(&self, f: impl Fn(&Event) -> bool) -> Option<usize> {
        self.events.borrow().iter().position(f)
    }

    pub fn registers(&self) -> Registers {
        Registers {
            tasks_masked: self.tasks_masked,
            primask: self.primask,
            enabled: self.enabled,
            systick_ctrl: self.systick_ctrl,
            vtor: self.vtor,
            msp: self.msp,
            psp: self.psp,
        }
    }

    fn record(&self, event: Event) {
        let mut events = self.events.borrow_mut();

        // Nothing but the call may follow a stack switch.
        if let Some(Event::SetProcessStackPointer(_)) = events.last() {
            assert!(matches!(event, Event::Call(_)), "{event:?} after stack switch");
        }

        events.push(event);
    }
}

impl Processor for MockProcessor {
    fn mask_tasks(&mut self) {
        self.record(Event::MaskTasks);
        self.tasks_masked = true;
    }

    fn disable_interrupts(&mut self) {
        self.record(Event::DisableInterrupts);
        self.primask = true;
    }

    unsafe fn clear_enable(&mut self, word: usize, mask: u32) {
        self.record(Event::ClearEnable { word, mask });
        self.enabled[word] &= !mask;
    }

    unsafe fn disable_systick(&mut self) {
        self.record(Event::DisableSysTick);
        self.systick_ctrl = 0;
    }

    unsafe fn read_word(&self, address: Address) -> u32 {
        self.record(Event::ReadWord(address));
        self.memory.get(&address).copied().unwrap_or(BLANK)
    }

    unsafe fn set_vector_table(&mut self, address: Address) {
        self.record(Event::SetVectorTable(address));
        self.vtor = address;
    }

    unsafe fn launch(&mut self, stack_pointer: u32, entry: Address) -> ! {
        self.launches += 1;

        self.record(Event::SetMainStackPointer(stack_pointer));
        self.msp = stack_pointer;
        self.record(Event::SetProcessStackPointer(stack_pointer));
        self.psp = stack_pointer;

        self.record(Event::Call(entry));
        if !self.returns {
            std::panic::panic_any(Outcome::Launched(entry));
        }

        self.record(Event::Idle);
        std::panic::panic_any(Outcome::Halted)
    }
}

/// Run a handoff on the mock, until either the application is launched or the processor halts.
pub fn run(f: impl FnOnce()) -> Outcome {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => panic!("handoff returned"),
        Err(payload) => match payload.downcast::<Outcome>() {
            Ok(outcome) => *outcome,
            Err(payload) => std::panic::resume_unwind(payload),
        },
    }
}
