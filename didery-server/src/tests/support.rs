//! Key and request builders shared by the unit and API tests.

use didery_common::SignatureScheme;
use didery_common::crypto;
use serde_json::json;

pub struct TestKey {
    sk: String,
    pub vk: String,
}

impl TestKey {
    /// Deterministic Ed25519 key from a repeated seed byte.
    pub fn from_seed(seed: u8) -> Self {
        Self::from_secret(&[seed; 32])
    }

    pub fn random() -> Self {
        let mut secret = [0u8; 32];
        rand::fill(&mut secret);
        Self::from_secret(&secret)
    }

    fn from_secret(secret: &[u8; 32]) -> Self {
        let sk = crypto::encode(secret);
        let vk = SignatureScheme::Ed25519.public_key(&sk).unwrap();
        Self { sk, vk }
    }

    pub fn sign(&self, message: &[u8]) -> String {
        SignatureScheme::Ed25519.sign(message, &self.sk).unwrap()
    }

    /// Self-certifying DID derived from this key.
    pub fn did(&self) -> String {
        format!("did:dad:{}", self.vk)
    }
}

/// Serialized rotation event body, `None` entries becoming `null`.
pub fn event_body(
    did: &str,
    changed: &str,
    signer: u64,
    signers: &[Option<&TestKey>],
) -> Vec<u8> {
    let signers: Vec<Option<&str>> = signers
        .iter()
        .map(|k| k.map(|k| k.vk.as_str()))
        .collect();
    serde_json::to_vec(&json!({
        "id": did,
        "changed": changed,
        "signer": signer,
        "signers": signers,
    }))
    .unwrap()
}

/// Render a `Signature` header from tag/value pairs.
pub fn header(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(tag, value)| format!("{tag}=\"{value}\""))
        .collect::<Vec<_>>()
        .join("; ")
}
