use crate::transaction::TransactionResult;
use ark_serialize::SerializationError;
use ecash_schnorr::SchnorrError;
use groth_sahai::GrothSahaiError;
use std::time::Duration;

/// Protocol calls that were made in a state or to a peer where they cannot succeed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MisuseKind {
    /// The bank answered a signature request with its zero sentinel: no randomness was committed
    /// for the requester's key
    NoPendingRandomness,
    /// A transaction arrived from a sender that never asked this participant for randomization elements
    NoRandomnessForSender,
    NotABank,
    NotATtp,
    SelfAddressed,
    BankNotRegistered,
    /// The participant has not fetched the CRS yet
    NotSetUp,
    /// The peer answered with a message of the wrong kind
    UnexpectedReply,
}

#[derive(Debug)]
pub enum OfflineEuroError {
    Deserialization(SerializationError),
    MalformedPayload(&'static str),
    /// No reply within the budget. The participant stays usable and the call can be retried.
    Timeout {
        peer: String,
        waited: Duration,
    },
    /// The peer received the message but could not handle it
    PeerFailed {
        peer: String,
        reason: String,
    },
    UnknownIdentity(String),
    ProtocolMisuse(MisuseKind),
    Validation(TransactionResult),
    NothingToSpend,
    InvalidAmount,
    Config(String),
    Schnorr(SchnorrError),
    GrothSahai(GrothSahaiError),
}

impl From<SerializationError> for OfflineEuroError {
    fn from(e: SerializationError) -> Self {
        Self::Deserialization(e)
    }
}

impl From<SchnorrError> for OfflineEuroError {
    fn from(e: SchnorrError) -> Self {
        Self::Schnorr(e)
    }
}

impl From<GrothSahaiError> for OfflineEuroError {
    fn from(e: GrothSahaiError) -> Self {
        Self::GrothSahai(e)
    }
}

impl From<MisuseKind> for OfflineEuroError {
    fn from(kind: MisuseKind) -> Self {
        Self::ProtocolMisuse(kind)
    }
}

impl From<toml::de::Error> for OfflineEuroError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_string())
    }
}
