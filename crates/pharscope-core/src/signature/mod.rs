//! Archive signature verification.
//!
//! Every verifier follows the same lifecycle:
//!
//! ```text
//! Uninitialized --init--> Initialized --update*--> Updating --verify--> Verified | Rejected
//! ```
//!
//! A rejected signature is the normal `false` result of
//! [`SignatureVerifier::verify`]. Driving a verifier out of order (verifying
//! before `init`, updating after `verify`) is a bug in the caller and panics.
//!
//! Verifiers hold streaming state and are single-use: create one per
//! verification.
//!
//! # Examples
//!
//! ```no_run
//! use pharscope_core::signature::SignatureVerifier;
//! use pharscope_core::signature::VerifierDelegate;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut verifier = VerifierDelegate::new();
//! verifier.init("SHA-256", Path::new("app.phar"))?;
//! verifier.update(b"signed bytes");
//! let ok = verifier.verify("D7A8FBB3...");
//! # let _ = ok;
//! # Ok(())
//! # }
//! ```

pub mod delegate;
pub mod hash;
pub mod public_key;

use std::path::Path;

use tracing::debug;
use tracing::warn;

use crate::Result;
use crate::phar::SignatureBlock;

pub use delegate::VerifierDelegate;
pub use hash::HashVerifier;
pub use public_key::PublicKeyBackend;
pub use public_key::PublicKeyVerifier;

/// Chunk size used when streaming signed bytes into a verifier.
const UPDATE_CHUNK: usize = 64 * 1024;

/// Lifecycle position of a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierState {
    /// Created, `init` not called yet.
    Uninitialized,
    /// `init` succeeded, no data yet.
    Initialized,
    /// At least one `update` call.
    Updating,
    /// `verify` returned `true`.
    Verified,
    /// `verify` returned `false`.
    Rejected,
}

impl VerifierState {
    /// Returns `true` once `verify` has been called.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Rejected)
    }

    #[track_caller]
    pub(crate) fn begin(&mut self) {
        assert!(
            *self == Self::Uninitialized,
            "signature verifier initialized twice (state: {self:?})"
        );
        *self = Self::Initialized;
    }

    #[track_caller]
    pub(crate) fn feed(&mut self) {
        assert!(
            matches!(self, Self::Initialized | Self::Updating),
            "signature verifier updated in state {self:?}"
        );
        *self = Self::Updating;
    }

    #[track_caller]
    pub(crate) fn finish(&mut self, verified: bool) -> bool {
        assert!(
            matches!(self, Self::Initialized | Self::Updating),
            "signature verifier verified in state {self:?}"
        );
        *self = if verified {
            Self::Verified
        } else {
            Self::Rejected
        };
        verified
    }

    #[track_caller]
    pub(crate) fn expect_ready(self) {
        assert!(
            matches!(self, Self::Initialized | Self::Updating),
            "signature verifier verified in state {self:?}"
        );
    }
}

/// Common contract of all signature verifiers.
pub trait SignatureVerifier {
    /// Prepares verification of an archive signed with `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PharError::SignatureConfiguration`] for unknown
    /// algorithm labels, unusable key sidecars, or a missing crypto backend.
    fn init(&mut self, algorithm: &str, archive_path: &Path) -> Result<()>;

    /// Appends signed bytes.
    fn update(&mut self, data: &[u8]);

    /// Checks the accumulated bytes against a hex-encoded signature.
    ///
    /// Hex is accepted in either case; malformed hex is a rejection.
    fn verify(&mut self, signature_hex: &str) -> bool;

    /// Current lifecycle position.
    fn state(&self) -> VerifierState;
}

/// Decodes a hex signature, tolerating surrounding whitespace.
pub(crate) fn decode_signature(signature_hex: &str) -> Option<Vec<u8>> {
    match hex::decode(signature_hex.trim()) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(error = %e, "signature is not valid hex; rejecting");
            None
        }
    }
}

/// Verifies `block` against `signed` bytes of the archive at `archive_path`.
pub fn verify_block(archive_path: &Path, signed: &[u8], block: &SignatureBlock) -> Result<bool> {
    let mut verifier = VerifierDelegate::new();
    verifier.init(block.algorithm.label(), archive_path)?;
    for chunk in signed.chunks(UPDATE_CHUNK) {
        verifier.update(chunk);
    }
    let verified = verifier.verify(&block.hash_hex());
    debug!(
        archive = %archive_path.display(),
        algorithm = %block.algorithm,
        verified,
        "checked archive signature"
    );
    Ok(verified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() {
        let mut state = VerifierState::Uninitialized;
        state.begin();
        assert_eq!(state, VerifierState::Initialized);
        state.feed();
        state.feed();
        assert_eq!(state, VerifierState::Updating);
        assert!(!state.finish(false));
        assert_eq!(state, VerifierState::Rejected);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_verify_without_update_is_allowed() {
        let mut state = VerifierState::Uninitialized;
        state.begin();
        assert!(state.finish(true));
        assert_eq!(state, VerifierState::Verified);
    }

    #[test]
    #[should_panic(expected = "verified in state Uninitialized")]
    fn test_finish_before_begin_panics() {
        let mut state = VerifierState::Uninitialized;
        state.finish(true);
    }

    #[test]
    #[should_panic(expected = "updated in state Verified")]
    fn test_feed_after_finish_panics() {
        let mut state = VerifierState::Uninitialized;
        state.begin();
        state.finish(true);
        state.feed();
    }

    #[test]
    #[should_panic(expected = "initialized twice")]
    fn test_double_begin_panics() {
        let mut state = VerifierState::Uninitialized;
        state.begin();
        state.begin();
    }

    #[test]
    fn test_decode_signature() {
        assert_eq!(decode_signature("ABcd"), Some(vec![0xAB, 0xCD]));
        assert_eq!(decode_signature(" 00ff\n"), Some(vec![0x00, 0xFF]));
        assert_eq!(decode_signature("xyz"), None);
        assert_eq!(decode_signature("abc"), None);
    }
}
