use crate::hal::time::{Delay, Microseconds};
use std::{cell::RefCell, rc::Rc};

/// Delay double that records every requested period instead of waiting.
#[derive(Default)]
pub struct FakeDelay {
    log: Rc<RefCell<Vec<u32>>>,
}

impl FakeDelay {
    /// Cloneable handle to the recorded delay log, so tests keep sight of
    /// it after the delay has been moved into the object under test.
    pub fn log(&self) -> Rc<RefCell<Vec<u32>>> { Rc::clone(&self.log) }
}

impl Delay for FakeDelay {
    fn delay_us(&mut self, period: Microseconds) { self.log.borrow_mut().push(period.0); }
}
