use super::error::FakeError;
use crate::hal::crypto::{PublicKey, SignatureBytes, SignatureCheck};
use sha2::Sha256;
use std::collections::VecDeque;

/// Engine double returning a scripted sequence of verdicts. Scripting two
/// different verdicts for one logical verification is how the redundancy
/// disagreement tests model a fault injected inside the engine.
pub struct MockEngine {
    script: VecDeque<bool>,
    pub calls: usize,
}

impl MockEngine {
    pub fn scripted(verdicts: &[bool]) -> Self {
        Self { script: verdicts.iter().copied().collect(), calls: 0 }
    }

    /// An engine that accepts everything.
    pub fn approving() -> Self { Self { script: VecDeque::new(), calls: 0 } }
}

impl SignatureCheck for MockEngine {
    type Error = FakeError;
    fn verify(
        &mut self,
        _key: &PublicKey,
        _digest: Sha256,
        _signature: &SignatureBytes,
    ) -> nb::Result<bool, Self::Error> {
        self.calls += 1;
        Ok(self.script.pop_front().unwrap_or(true))
    }
}

/// Engine double that always refuses.
pub struct RejectingEngine;

impl SignatureCheck for RejectingEngine {
    type Error = FakeError;
    fn verify(
        &mut self,
        _key: &PublicKey,
        _digest: Sha256,
        _signature: &SignatureBytes,
    ) -> nb::Result<bool, Self::Error> {
        Ok(false)
    }
}
