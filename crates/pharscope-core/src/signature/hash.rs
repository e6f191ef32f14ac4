//! Digest-based signature verification (MD5, SHA-1, SHA-256, SHA-512).

use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha512;

use super::SignatureVerifier;
use super::VerifierState;
use super::decode_signature;
use crate::PharError;
use crate::Result;
use crate::SignatureAlgorithm;

/// Streaming digest context, one variant per supported algorithm.
#[derive(Clone)]
enum HashContext {
    Md5(Md5),
    Sha1(Sha1),
    Sha256(Sha256),
    Sha512(Sha512),
}

impl HashContext {
    fn new(algorithm: SignatureAlgorithm) -> Option<Self> {
        match algorithm {
            SignatureAlgorithm::Md5 => Some(Self::Md5(Md5::new())),
            SignatureAlgorithm::Sha1 => Some(Self::Sha1(Sha1::new())),
            SignatureAlgorithm::Sha256 => Some(Self::Sha256(Sha256::new())),
            SignatureAlgorithm::Sha512 => Some(Self::Sha512(Sha512::new())),
            SignatureAlgorithm::OpenSsl
            | SignatureAlgorithm::OpenSslSha256
            | SignatureAlgorithm::OpenSslSha512 => None,
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Md5(h) => h.update(data),
            Self::Sha1(h) => h.update(data),
            Self::Sha256(h) => h.update(data),
            Self::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Md5(h) => h.finalize().to_vec(),
            Self::Sha1(h) => h.finalize().to_vec(),
            Self::Sha256(h) => h.finalize().to_vec(),
            Self::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// Verifies archives signed with a plain digest.
///
/// Data is hashed incrementally as it arrives.
///
/// # Examples
///
/// ```
/// use pharscope_core::signature::HashVerifier;
/// use pharscope_core::signature::SignatureVerifier;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut verifier = HashVerifier::new();
/// verifier.init("MD5", Path::new("app.phar"))?;
/// verifier.update(b"The quick brown fox jumps over the lazy dog");
/// assert!(verifier.verify("9E107D9D372BB6826BD81D3542A419D6"));
/// # Ok(())
/// # }
/// ```
pub struct HashVerifier {
    state: VerifierState,
    context: Option<HashContext>,
}

impl HashVerifier {
    /// Creates an uninitialized verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: VerifierState::Uninitialized,
            context: None,
        }
    }
}

impl Default for HashVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureVerifier for HashVerifier {
    fn init(&mut self, algorithm: &str, _archive_path: &Path) -> Result<()> {
        let context = SignatureAlgorithm::from_label(algorithm)
            .and_then(HashContext::new)
            .ok_or_else(|| {
                PharError::SignatureConfiguration(format!(
                    "unsupported hash algorithm \"{algorithm}\""
                ))
            })?;
        self.state.begin();
        self.context = Some(context);
        Ok(())
    }

    fn update(&mut self, data: &[u8]) {
        self.state.feed();
        if let Some(context) = self.context.as_mut() {
            context.update(data);
        }
    }

    fn verify(&mut self, signature_hex: &str) -> bool {
        self.state.expect_ready();
        let digest = self.context.take().map(HashContext::finalize);
        let verified = match (digest, decode_signature(signature_hex)) {
            (Some(digest), Some(expected)) => digest == expected,
            _ => false,
        };
        self.state.finish(verified)
    }

    fn state(&self) -> VerifierState {
        self.state
    }
}
