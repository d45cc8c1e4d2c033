//! Fault-injection resistant control flow primitives.
//!
//! Everything above this module assumes an attacker who can glitch the
//! supply voltage or clock to skip a single instruction or flip a single
//! comparison. The defenses are uniform: security decisions are carried
//! as redundantly encoded [`SecureBool`](secure_bool::SecureBool) values,
//! consumed only through the triple-evaluating guards of
//! [`Guardian`](guard::Guardian), with random timing jitter denying the
//! attacker a stable trigger point, and any disagreement between
//! redundant evaluations escalating to the glitch handler.

pub mod counter;
pub mod guard;
pub mod memory;
pub mod secure_bool;

pub use counter::StepCounter;
pub use guard::{fixed_true, glitch_tally, Guardian, GlitchHandler, JitterWindow};
pub use secure_bool::SecureBool;
