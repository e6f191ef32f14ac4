//! Verifier that dispatches on the algorithm label.

use std::path::Path;

use super::HashVerifier;
use super::PublicKeyVerifier;
use super::SignatureVerifier;
use super::VerifierState;
use crate::PharError;
use crate::Result;
use crate::SignatureAlgorithm;

enum Selected {
    Hash(HashVerifier),
    PublicKey(PublicKeyVerifier),
}

impl Selected {
    fn as_verifier(&mut self) -> &mut dyn SignatureVerifier {
        match self {
            Self::Hash(v) => v,
            Self::PublicKey(v) => v,
        }
    }
}

/// Picks a [`HashVerifier`] or [`PublicKeyVerifier`] during `init` and
/// forwards every later call to it.
///
/// This is the verifier callers should use when the algorithm is only known
/// from the archive.
pub struct VerifierDelegate {
    state: VerifierState,
    inner: Option<Selected>,
}

impl VerifierDelegate {
    /// Creates a delegate with no selected verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: VerifierState::Uninitialized,
            inner: None,
        }
    }
}

impl Default for VerifierDelegate {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for VerifierDelegate {
    fn init(&mut self, algorithm: &str, archive_path: &Path) -> Result<()> {
        let parsed = SignatureAlgorithm::from_label(algorithm).ok_or_else(|| {
            PharError::SignatureConfiguration(format!(
                "unsupported signature algorithm \"{algorithm}\""
            ))
        })?;
        let mut selected = if parsed.is_asymmetric() {
            Selected::PublicKey(PublicKeyVerifier::new()?)
        } else {
            Selected::Hash(HashVerifier::new())
        };
        selected.as_verifier().init(algorithm, archive_path)?;
        self.state.begin();
        self.inner = Some(selected);
        Ok(())
    }

    fn update(&mut self, data: &[u8]) {
        self.state.feed();
        if let Some(inner) = self.inner.as_mut() {
            inner.as_verifier().update(data);
        }
    }

    fn verify(&mut self, signature_hex: &str) -> bool {
        self.state.expect_ready();
        let verified = self
            .inner
            .as_mut()
            .is_some_and(|inner| inner.as_verifier().verify(signature_hex));
        self.state.finish(verified)
    }

    fn state(&self) -> VerifierState {
        self.state
    }
}
