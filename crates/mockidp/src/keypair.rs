//! Signing-key custody and JWT operations.
//!
//! The [`Keypair`] owns one RSA key pair for the lifetime of a server
//! instance and performs every cryptographic operation: signing claim sets
//! into compact JWTs, verifying presented tokens, and exporting the public
//! half as a JWKS document.
//!
//! Verification is deliberately stateless: only the signature and `exp` are
//! checked here. Session association is re-derived from the decoded claims
//! by the token validator, never by the key layer.

use std::fmt;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during key and token operations.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    /// Failed to encode a token.
    #[error("failed to encode token: {message}")]
    Encoding {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode a token (malformed structure or claims).
    #[error("failed to decode token: {message}")]
    Decoding {
        /// Description of the decoding error.
        message: String,
    },

    /// The token has expired.
    #[error("token expired")]
    Expired,

    /// The token signature does not verify against the public key.
    #[error("invalid signature")]
    InvalidSignature,

    /// Failed to generate a cryptographic key.
    #[error("key generation error: {message}")]
    KeyGeneration {
        /// Description of the key generation error.
        message: String,
    },

    /// Invalid key format or data.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is invalid.
        message: String,
    },
}

impl KeyError {
    /// Creates a new `Encoding` error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates a new `Decoding` error.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Creates a new `KeyGeneration` error.
    #[must_use]
    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::KeyGeneration {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Returns `true` if this failure concerns a presented token rather
    /// than the key material itself.
    #[must_use]
    pub fn is_verification_error(&self) -> bool {
        matches!(
            self,
            Self::Expired | Self::InvalidSignature | Self::Decoding { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for KeyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                Self::invalid_key(err.to_string())
            }
            _ => Self::decoding(err.to_string()),
        }
    }
}

// ============================================================================
// Signing Algorithm
// ============================================================================

/// Supported signing algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SigningAlgorithm {
    /// RSA with SHA-256. The emulated provider's default.
    #[default]
    RS256,
    /// RSA with SHA-384.
    RS384,
}

impl SigningAlgorithm {
    /// Converts to the `jsonwebtoken` Algorithm type.
    #[must_use]
    pub fn to_jwt_algorithm(self) -> Algorithm {
        match self {
            Self::RS256 => Algorithm::RS256,
            Self::RS384 => Algorithm::RS384,
        }
    }

    /// Returns the algorithm name as used in JWK/JWT headers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// JWKS Types
// ============================================================================

/// JSON Web Key Set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwks {
    /// The keys in this set.
    pub keys: Vec<Jwk>,
}

/// JSON Web Key (RSA public key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always "RSA".
    pub kty: String,

    /// Key ID.
    pub kid: String,

    /// Key use ("sig" for signing).
    #[serde(rename = "use")]
    pub use_: String,

    /// Algorithm.
    pub alg: String,

    /// RSA modulus (base64url encoded).
    pub n: String,

    /// RSA exponent (base64url encoded).
    pub e: String,
}

// ============================================================================
// Keypair
// ============================================================================

/// An RSA signing key pair with a stable key identifier.
///
/// Immutable after generation and safe for unlimited concurrent signing and
/// verification calls; a server instance shares one behind an `Arc`.
pub struct Keypair {
    /// Key ID carried in every signed token's header.
    pub kid: String,

    /// Signing algorithm.
    pub algorithm: SigningAlgorithm,

    /// Encoding key (private key) for signing.
    encoding_key: EncodingKey,

    /// Decoding key (public key) for verification.
    decoding_key: DecodingKey,

    /// RSA public modulus, big-endian, for JWKS export.
    n: Vec<u8>,

    /// RSA public exponent, big-endian, for JWKS export.
    e: Vec<u8>,
}

impl Keypair {
    /// Generates a new 2048-bit RSA key pair.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn generate(algorithm: SigningAlgorithm) -> Result<Self, KeyError> {
        let bits = 2048;
        let private_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| KeyError::key_generation(e.to_string()))?;

        let public_key = private_key.to_public_key();
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyError::key_generation(e.to_string()))?;

        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| KeyError::key_generation(e.to_string()))?;

        let public_pem = public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| KeyError::key_generation(e.to_string()))?;

        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| KeyError::key_generation(e.to_string()))?;

        Ok(Self {
            kid: uuid::Uuid::new_v4().to_string(),
            algorithm,
            encoding_key,
            decoding_key,
            n,
            e,
        })
    }

    /// Loads a key pair from PEM strings, for reproducible fixtures.
    ///
    /// # Errors
    /// Returns an error if the PEM data is invalid.
    pub fn from_pem(
        kid: impl Into<String>,
        algorithm: SigningAlgorithm,
        private_pem: &str,
        public_pem: &str,
    ) -> Result<Self, KeyError> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| KeyError::invalid_key(e.to_string()))?;
        let decoding_key = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| KeyError::invalid_key(e.to_string()))?;

        // Parse the public key to extract n and e for JWKS export.
        let public_key = RsaPublicKey::from_public_key_pem(public_pem)
            .map_err(|e| KeyError::invalid_key(e.to_string()))?;
        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        Ok(Self {
            kid: kid.into(),
            algorithm,
            encoding_key,
            decoding_key,
            n,
            e,
        })
    }

    /// Signs a claim set into a compact JWT carrying this key's `kid`.
    ///
    /// # Errors
    /// Returns an error if serialization or signing fails.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, KeyError> {
        let mut header = Header::new(self.algorithm.to_jwt_algorithm());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key).map_err(|e| KeyError::encoding(e.to_string()))
    }

    /// Verifies a token's signature and expiry, returning the decoded claims.
    ///
    /// Expiry is checked against the real clock at call time. No session
    /// state is consulted.
    ///
    /// # Errors
    /// Returns an error if the structure is malformed, the signature does
    /// not verify, or `exp` has passed.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<T, KeyError> {
        let mut validation = Validation::new(self.algorithm.to_jwt_algorithm());
        validation.validate_exp = true;
        validation.validate_aud = false; // audience is validated at the grant layer

        decode::<T>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(KeyError::from)
    }

    /// Exports the public key as a JWK.
    #[must_use]
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            kid: self.kid.clone(),
            use_: "sig".to_string(),
            alg: self.algorithm.as_str().to_string(),
            n: URL_SAFE_NO_PAD.encode(&self.n),
            e: URL_SAFE_NO_PAD.encode(&self.e),
        }
    }

    /// Returns the published key set consumed by the key-discovery endpoint.
    #[must_use]
    pub fn jwks(&self) -> Jwks {
        Jwks {
            keys: vec![self.to_jwk()],
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
