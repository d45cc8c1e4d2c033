//! Full project ports for specific targets. They mainly provide a method
//! to construct the generic loader from board specific parts.

#[cfg(feature = "stm32h743")]
port!(stm32h743: [loader,]);
