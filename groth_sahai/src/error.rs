use ark_serialize::SerializationError;

#[derive(Debug)]
pub enum GrothSahaiError {
    /// Sender's secret key is 0 and cannot be inverted
    ZeroSecretKey,
    /// The proof's target is not `e(-prior_theta, h)`, i.e. the proof continues another coin state
    TargetMismatch,
    /// One of the four pairing product equations does not hold. Contains the index of the equation.
    PairingEquationFailed(usize),
    /// The auxiliary commitments do not open `d2`
    InvalidAuxiliaryCommitments,
    Serialization(SerializationError),
}

impl From<SerializationError> for GrothSahaiError {
    fn from(e: SerializationError) -> Self {
        Self::Serialization(e)
    }
}
