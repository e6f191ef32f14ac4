//! Trailing signature block of a PHAR archive.
//!
//! Layout, read backwards from the end of the file:
//!
//! ```text
//! ... signed bytes ... | signature | [u32 len, asymmetric only] | u32 flags | "GBMB"
//! ```

/// Magic bytes closing every signature block.
pub const SIGNATURE_MAGIC: &[u8; 4] = b"GBMB";

/// Signature algorithm of an archive.
///
/// Hash algorithms sign the archive with a plain digest; the OpenSSL
/// variants are RSA PKCS#1 v1.5 signatures verified against a `.pubkey`
/// sidecar file.
///
/// # Examples
///
/// ```
/// use pharscope_core::SignatureAlgorithm;
///
/// let algo = SignatureAlgorithm::from_label("SHA-256").unwrap();
/// assert_eq!(algo.code(), 0x03);
/// assert!(!algo.is_asymmetric());
/// assert!(SignatureAlgorithm::OpenSsl.is_asymmetric());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// MD5 digest.
    Md5,
    /// SHA-1 digest.
    Sha1,
    /// SHA-256 digest.
    Sha256,
    /// SHA-512 digest.
    Sha512,
    /// RSA signature over SHA-1.
    OpenSsl,
    /// RSA signature over SHA-256.
    OpenSslSha256,
    /// RSA signature over SHA-512.
    OpenSslSha512,
}

impl SignatureAlgorithm {
    /// All algorithms.
    pub const ALL: [Self; 7] = [
        Self::Md5,
        Self::Sha1,
        Self::Sha256,
        Self::Sha512,
        Self::OpenSsl,
        Self::OpenSslSha256,
        Self::OpenSslSha512,
    ];

    /// Native flag value stored in the signature block.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Md5 => 0x01,
            Self::Sha1 => 0x02,
            Self::Sha256 => 0x03,
            Self::Sha512 => 0x04,
            Self::OpenSsl => 0x10,
            Self::OpenSslSha256 => 0x11,
            Self::OpenSslSha512 => 0x12,
        }
    }

    /// Decodes a native flag value.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0x01 => Some(Self::Md5),
            0x02 => Some(Self::Sha1),
            0x03 => Some(Self::Sha256),
            0x04 => Some(Self::Sha512),
            0x10 => Some(Self::OpenSsl),
            0x11 => Some(Self::OpenSslSha256),
            0x12 => Some(Self::OpenSslSha512),
            _ => None,
        }
    }

    /// Label reported as the signature `hash_type`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha512 => "SHA-512",
            Self::OpenSsl => "OpenSSL",
            Self::OpenSslSha256 => "OpenSSL_SHA256",
            Self::OpenSslSha512 => "OpenSSL_SHA512",
        }
    }

    /// Parses a label, case-insensitively, also accepting dashless spellings
    /// such as `SHA256`.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|algo| normalize_label(algo.label()) == wanted)
    }

    /// Returns `true` for public-key algorithms.
    #[must_use]
    pub const fn is_asymmetric(self) -> bool {
        matches!(self, Self::OpenSsl | Self::OpenSslSha256 | Self::OpenSslSha512)
    }

    /// Digest length in bytes for hash algorithms.
    #[must_use]
    pub const fn digest_len(self) -> Option<usize> {
        match self {
            Self::Md5 => Some(16),
            Self::Sha1 => Some(20),
            Self::Sha256 => Some(32),
            Self::Sha512 => Some(64),
            Self::OpenSsl | Self::OpenSslSha256 | Self::OpenSslSha512 => None,
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// A located signature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureBlock {
    /// Algorithm that produced the signature.
    pub algorithm: SignatureAlgorithm,
    /// Raw signature (digest or RSA signature) bytes.
    pub signature: Vec<u8>,
    /// Length of the signed prefix; the block starts here.
    pub signed_len: usize,
}

impl SignatureBlock {
    /// Signature rendered the way archive tooling reports it: upper-case hex.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode_upper(&self.signature)
    }

    /// Locates the signature block at the end of `data`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the trailer is missing,
    /// names an unknown algorithm, or does not fit in `data`.
    pub fn locate(data: &[u8]) -> std::result::Result<Self, String> {
        let len = data.len();
        if len < 8 || &data[len - 4..] != SIGNATURE_MAGIC {
            return Err("signature trailer missing".to_string());
        }

        let code = read_u32(data, len - 8);
        let algorithm = SignatureAlgorithm::from_code(code)
            .ok_or_else(|| format!("unknown signature algorithm {code:#x}"))?;

        let (start, end) = if let Some(digest_len) = algorithm.digest_len() {
            let end = len - 8;
            let start = end
                .checked_sub(digest_len)
                .ok_or_else(|| "signature digest truncated".to_string())?;
            (start, end)
        } else {
            if len < 12 {
                return Err("signature length truncated".to_string());
            }
            let sig_len = read_u32(data, len - 12) as usize;
            let end = len - 12;
            let start = end
                .checked_sub(sig_len)
                .ok_or_else(|| "signature truncated".to_string())?;
            (start, end)
        };

        Ok(Self {
            algorithm,
            signature: data[start..end].to_vec(),
            signed_len: start,
        })
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    let mut buf = [0_u8; 4];
    buf.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(buf)
}
