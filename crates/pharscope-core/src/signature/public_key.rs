//! Public-key (RSA) signature verification.
//!
//! Two backends can be compiled in: the system OpenSSL library (feature
//! `openssl`) and the pure Rust `rsa` crate (feature `rsa`, default). The
//! backend is chosen once when the verifier is created and never changes
//! afterwards.

use std::path::Path;

use tracing::debug;

use super::SignatureVerifier;
use super::VerifierState;
use super::decode_signature;
use crate::PharError;
use crate::Result;
use crate::SignatureAlgorithm;
use crate::phar::public_key_path;

/// Crypto library used for RSA verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicKeyBackend {
    /// System OpenSSL through the `openssl` crate.
    #[cfg(feature = "openssl")]
    OpenSsl,
    /// Pure Rust implementation from the `rsa` crate.
    #[cfg(feature = "rsa")]
    Rsa,
}

impl PublicKeyBackend {
    /// Backends compiled into this build, most preferred first.
    #[must_use]
    pub fn available() -> Vec<Self> {
        let mut backends = Vec::new();
        #[cfg(feature = "openssl")]
        backends.push(Self::OpenSsl);
        #[cfg(feature = "rsa")]
        backends.push(Self::Rsa);
        backends
    }

    /// Picks the preferred available backend.
    #[must_use]
    pub fn probe() -> Option<Self> {
        let backend = Self::available().into_iter().next();
        #[cfg(feature = "openssl")]
        if backend == Some(Self::OpenSsl) {
            openssl::init();
        }
        backend
    }

    /// Backend name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            #[cfg(feature = "openssl")]
            Self::OpenSsl => "openssl",
            #[cfg(feature = "rsa")]
            Self::Rsa => "rsa",
        }
    }

    fn load_key(self, pem: &str) -> Result<LoadedKey> {
        match self {
            #[cfg(feature = "openssl")]
            Self::OpenSsl => openssl::pkey::PKey::public_key_from_pem(pem.as_bytes())
                .map(LoadedKey::OpenSsl)
                .map_err(|e| key_error(&e)),
            #[cfg(feature = "rsa")]
            Self::Rsa => {
                use rsa::pkcs1::DecodeRsaPublicKey;
                use rsa::pkcs8::DecodePublicKey;

                rsa::RsaPublicKey::from_public_key_pem(pem)
                    .or_else(|_| rsa::RsaPublicKey::from_pkcs1_pem(pem))
                    .map(LoadedKey::Rsa)
                    .map_err(|e| key_error(&e))
            }
        }
    }
}

fn key_error(err: &dyn std::fmt::Display) -> PharError {
    PharError::SignatureConfiguration(format!("invalid public key: {err}"))
}

/// A parsed public key, tied to the backend that parsed it.
enum LoadedKey {
    #[cfg(feature = "openssl")]
    OpenSsl(openssl::pkey::PKey<openssl::pkey::Public>),
    #[cfg(feature = "rsa")]
    Rsa(rsa::RsaPublicKey),
}

impl LoadedKey {
    fn verify(&self, algorithm: SignatureAlgorithm, data: &[u8], signature: &[u8]) -> bool {
        match self {
            #[cfg(feature = "openssl")]
            Self::OpenSsl(key) => {
                use openssl::hash::MessageDigest;

                let digest = match algorithm {
                    SignatureAlgorithm::OpenSslSha256 => MessageDigest::sha256(),
                    SignatureAlgorithm::OpenSslSha512 => MessageDigest::sha512(),
                    _ => MessageDigest::sha1(),
                };
                openssl::sign::Verifier::new(digest, key)
                    .and_then(|mut verifier| {
                        verifier.update(data)?;
                        verifier.verify(signature)
                    })
                    .unwrap_or_else(|e| {
                        debug!(error = %e, "openssl rejected signature");
                        false
                    })
            }
            #[cfg(feature = "rsa")]
            Self::Rsa(key) => {
                use rsa::Pkcs1v15Sign;
                use sha2::Digest;

                let (scheme, hashed) = match algorithm {
                    SignatureAlgorithm::OpenSslSha256 => (
                        Pkcs1v15Sign::new::<sha2::Sha256>(),
                        sha2::Sha256::digest(data).to_vec(),
                    ),
                    SignatureAlgorithm::OpenSslSha512 => (
                        Pkcs1v15Sign::new::<sha2::Sha512>(),
                        sha2::Sha512::digest(data).to_vec(),
                    ),
                    _ => (
                        Pkcs1v15Sign::new::<sha1::Sha1>(),
                        sha1::Sha1::digest(data).to_vec(),
                    ),
                };
                key.verify(scheme, &hashed, signature)
                    .map_err(|e| debug!(error = %e, "rsa rejected signature"))
                    .is_ok()
            }
        }
    }
}

/// Verifies archives signed with an RSA private key.
///
/// The verify primitive consumes the whole signed payload at once, so
/// `update` accumulates every byte until `verify` is called.
///
/// # Examples
///
/// ```no_run
/// use pharscope_core::signature::PublicKeyVerifier;
/// use pharscope_core::signature::SignatureVerifier;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut verifier = PublicKeyVerifier::new()?;
/// // Reads app.phar.pubkey
/// verifier.init("OpenSSL_SHA256", Path::new("app.phar"))?;
/// verifier.update(b"signed bytes");
/// let verified = verifier.verify("0a1b2c...");
/// # let _ = verified;
/// # Ok(())
/// # }
/// ```
pub struct PublicKeyVerifier {
    backend: PublicKeyBackend,
    state: VerifierState,
    algorithm: Option<SignatureAlgorithm>,
    key: Option<LoadedKey>,
    buffer: Vec<u8>,
}

impl PublicKeyVerifier {
    /// Creates a verifier on the preferred available backend.
    ///
    /// # Errors
    ///
    /// Returns [`PharError::SignatureConfiguration`] when no backend was
    /// compiled in.
    pub fn new() -> Result<Self> {
        let backend = PublicKeyBackend::probe().ok_or_else(|| {
            PharError::SignatureConfiguration(
                "no public-key crypto backend available (enable `openssl` or `rsa`)".to_string(),
            )
        })?;
        debug!(backend = backend.name(), "selected public-key backend");
        Ok(Self::with_backend(backend))
    }

    /// Creates a verifier on a specific backend.
    #[must_use]
    pub const fn with_backend(backend: PublicKeyBackend) -> Self {
        Self {
            backend,
            state: VerifierState::Uninitialized,
            algorithm: None,
            key: None,
            buffer: Vec::new(),
        }
    }

    /// Backend fixed at construction.
    #[must_use]
    pub const fn backend(&self) -> PublicKeyBackend {
        self.backend
    }

    /// Initializes from PEM text instead of the sidecar file.
    pub fn init_with_key(&mut self, algorithm: &str, pem: &str) -> Result<()> {
        let algorithm = SignatureAlgorithm::from_label(algorithm)
            .filter(|algo| algo.is_asymmetric())
            .ok_or_else(|| {
                PharError::SignatureConfiguration(format!(
                    "unsupported public-key algorithm \"{algorithm}\""
                ))
            })?;
        let key = self.backend.load_key(pem)?;
        self.state.begin();
        self.algorithm = Some(algorithm);
        self.key = Some(key);
        Ok(())
    }
}

impl SignatureVerifier for PublicKeyVerifier {
    fn init(&mut self, algorithm: &str, archive_path: &Path) -> Result<()> {
        let key_path = public_key_path(archive_path);
        let pem = std::fs::read_to_string(&key_path).map_err(|e| {
            PharError::SignatureConfiguration(format!(
                "cannot read public key {}: {e}",
                key_path.display()
            ))
        })?;
        self.init_with_key(algorithm, &pem)
    }

    fn update(&mut self, data: &[u8]) {
        self.state.feed();
        self.buffer.extend_from_slice(data);
    }

    fn verify(&mut self, signature_hex: &str) -> bool {
        self.state.expect_ready();
        let verified = match (&self.key, self.algorithm, decode_signature(signature_hex)) {
            (Some(key), Some(algorithm), Some(signature)) => {
                key.verify(algorithm, &self.buffer, &signature)
            }
            _ => false,
        };
        self.buffer = Vec::new();
        self.state.finish(verified)
    }

    fn state(&self) -> VerifierState {
        self.state
    }
}
