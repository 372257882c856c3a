use serde::{Deserialize, Serialize};

use crate::signature::SignatureSet;

/// Encrypted one-time-pad blob owned by a DID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpBlob {
    pub id: String,
    pub blob: String,
    pub changed: String,
}

/// A stored blob and the signatures that authorized its last write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobRecord {
    pub otp_data: OtpBlob,
    pub signatures: SignatureSet,
}
