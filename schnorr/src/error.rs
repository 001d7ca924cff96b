use ark_serialize::SerializationError;
use ark_std::fmt::Debug;

#[derive(Debug)]
pub enum SchnorrError {
    InvalidSignature,
    /// The signer answered a blinded challenge with zero, which it does when it holds no
    /// committed randomness for the requester.
    ZeroBlindSignature,
    Serialization(SerializationError),
}

impl From<SerializationError> for SchnorrError {
    fn from(e: SerializationError) -> Self {
        Self::Serialization(e)
    }
}
