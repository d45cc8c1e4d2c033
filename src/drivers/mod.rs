//! Portable driver implementations of the HAL seams.
pub mod cortex;
pub mod mcu_flash;
pub mod software_ecdsa;
pub mod xoroshiro;
