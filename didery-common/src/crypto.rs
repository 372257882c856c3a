//! Signature schemes used to authorize key events.
//!
//! All key and signature material travels as base64url text. Encoding always
//! pads; decoding accepts padded and unpadded input.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use ed25519_dalek::{Signer, Verifier};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use sha3::{Digest, Sha3_256};

use crate::error::{Result, ValidationError};

const B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    B64.encode(bytes)
}

pub fn decode(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    B64.decode(text)
}

/// Closed set of verification strategies, picked from a signature set's
/// `name` tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SignatureScheme {
    /// Ed25519 over the raw message. 32-byte keys, 64-byte signatures.
    #[default]
    Ed25519,
    /// ECDSA over secp256k1 with a SHA3-256 prehash. 64-byte `x||y` keys,
    /// 64-byte `r||s` signatures.
    EcdsaSecp256k1,
}

impl SignatureScheme {
    /// `ECDSA` or `secp256k1` (any case) select the alternate scheme;
    /// everything else, including no name at all, is Ed25519.
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(n) if n.eq_ignore_ascii_case("ecdsa") || n.eq_ignore_ascii_case("secp256k1") => {
                Self::EcdsaSecp256k1
            }
            _ => Self::Ed25519,
        }
    }

    /// Raw verification key length.
    pub fn key_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::EcdsaSecp256k1 => 64,
        }
    }

    /// Verify a base64url `signature` over `message` with base64url `verkey`.
    /// Any decoding problem counts as a failed verification.
    pub fn verify(self, signature: &str, message: &[u8], verkey: &str) -> bool {
        let (Ok(sig), Ok(key)) = (decode(signature), decode(verkey)) else {
            return false;
        };
        match self {
            Self::Ed25519 => verify_ed25519(&sig, message, &key),
            Self::EcdsaSecp256k1 => verify_secp256k1(&sig, message, &key),
        }
    }

    /// Sign `message` with the base64url private key `sigkey`, returning a
    /// base64url signature.
    ///
    /// Ed25519 accepts the 32-byte seed or the 64-byte `seed||public` form.
    /// ECDSA expects the 32-byte secret scalar.
    pub fn sign(self, message: &[u8], sigkey: &str) -> Result<String> {
        let secret = decode(sigkey).map_err(|_| invalid_key())?;
        match self {
            Self::Ed25519 => {
                let signing = ed25519_signing_key(&secret)?;
                Ok(encode(signing.sign(message).to_bytes()))
            }
            Self::EcdsaSecp256k1 => {
                let signing =
                    k256::ecdsa::SigningKey::from_slice(&secret).map_err(|_| invalid_key())?;
                let digest = Sha3_256::digest(message);
                let sig: k256::ecdsa::Signature =
                    signing.sign_prehash(&digest).map_err(|_| invalid_key())?;
                Ok(encode(sig.to_bytes()))
            }
        }
    }

    /// Derive the base64url verification key for a base64url private key.
    pub fn public_key(self, sigkey: &str) -> Result<String> {
        let secret = decode(sigkey).map_err(|_| invalid_key())?;
        match self {
            Self::Ed25519 => Ok(encode(ed25519_signing_key(&secret)?.verifying_key().to_bytes())),
            Self::EcdsaSecp256k1 => {
                let signing =
                    k256::ecdsa::SigningKey::from_slice(&secret).map_err(|_| invalid_key())?;
                let point = signing.verifying_key().to_encoded_point(false);
                // Drop the SEC1 0x04 tag.
                Ok(encode(&point.as_bytes()[1..]))
            }
        }
    }

    /// Verify a signed JSON body and hand back the parsed payload.
    ///
    /// Fails with `MalformedPayload` when the body is not JSON, `InvalidKey`
    /// when `verkey` does not decode to this scheme's key length and
    /// `UnverifiableSignature(tag)` when the signature does not check out.
    pub fn verify_signed_resource(
        self,
        tag: &str,
        signature: &str,
        raw: &[u8],
        verkey: &str,
    ) -> Result<serde_json::Value> {
        let parsed: serde_json::Value = serde_json::from_slice(raw).map_err(|_| {
            ValidationError::MalformedPayload(
                "Could not decode the request body. The JSON was incorrect.".into(),
            )
        })?;

        match decode(verkey) {
            Ok(key) if key.len() == self.key_len() => {}
            _ => return Err(invalid_key()),
        }

        if !self.verify(signature, raw, verkey) {
            return Err(ValidationError::UnverifiableSignature(tag.to_string()));
        }
        Ok(parsed)
    }
}

fn invalid_key() -> ValidationError {
    ValidationError::InvalidKey("Invalid key.".into())
}

fn ed25519_signing_key(secret: &[u8]) -> Result<ed25519_dalek::SigningKey> {
    let seed: [u8; 32] = secret
        .get(..32)
        .filter(|_| secret.len() == 32 || secret.len() == 64)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(invalid_key)?;
    Ok(ed25519_dalek::SigningKey::from_bytes(&seed))
}

fn verify_ed25519(sig: &[u8], message: &[u8], key: &[u8]) -> bool {
    let Ok(key) = <[u8; 32]>::try_from(key) else {
        return false;
    };
    let Ok(verifying) = ed25519_dalek::VerifyingKey::from_bytes(&key) else {
        return false;
    };
    let Ok(sig) = ed25519_dalek::Signature::from_slice(sig) else {
        return false;
    };
    verifying.verify(message, &sig).is_ok()
}

fn verify_secp256k1(sig: &[u8], message: &[u8], key: &[u8]) -> bool {
    if key.len() != 64 {
        return false;
    }
    let mut sec1 = Vec::with_capacity(65);
    sec1.push(0x04);
    sec1.extend_from_slice(key);
    let Ok(verifying) = k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1) else {
        return false;
    };
    let Ok(sig) = k256::ecdsa::Signature::from_slice(sig) else {
        return false;
    };
    let sig = sig.normalize_s().unwrap_or(sig);
    verifying
        .verify_prehash(&Sha3_256::digest(message), &sig)
        .is_ok()
}
