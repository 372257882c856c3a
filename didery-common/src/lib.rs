pub mod blob;
pub mod crypto;
pub mod did;
mod error;
pub mod event;
mod projection;
pub mod signature;

pub use blob::{BlobRecord, OtpBlob};
pub use crypto::SignatureScheme;
pub use did::{DEFAULT_METHOD, Did};
pub use error::{Result, ValidationError};
pub use event::{CurrentState, EventChain, EventLog, KeyEvent, Record};
pub use signature::SignatureSet;
