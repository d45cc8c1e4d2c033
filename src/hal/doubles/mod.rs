//! Test doubles for the HAL traits. Only ever compiled off-target.
pub mod crypto;
pub mod error;
pub mod flash;
pub mod glitch;
pub mod jump;
pub mod reset;
pub mod rng;
pub mod time;
