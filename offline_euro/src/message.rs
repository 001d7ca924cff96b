//! Protocol messages and their byte layouts. Every message starts with a one byte tag followed by
//! its fields as written by [`WireWriter`].

use crate::{
    codec::{WireFormat, WireReader, WireWriter},
    error::OfflineEuroError,
    transaction::TransactionDetails,
    Signature,
};
use ark_ec::{pairing::Pairing, AffineRepr};
use ark_ff::Zero;
use ecash_crypto_utils::BilinearGroup;
use ecash_schnorr::SchnorrSignature;
use groth_sahai::{Crs, GrothSahaiProof, RandomizationElements};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Bank,
    User,
    Ttp,
}

impl Role {
    fn tag(self) -> u8 {
        match self {
            Role::Bank => 0,
            Role::User => 1,
            Role::Ttp => 2,
        }
    }

    fn from_tag(tag: u8) -> Result<Self, OfflineEuroError> {
        match tag {
            0 => Ok(Role::Bank),
            1 => Ok(Role::User),
            2 => Ok(Role::Ttp),
            _ => Err(OfflineEuroError::MalformedPayload("unknown role")),
        }
    }
}

/// The bank's answer to a blind signature request.
///
/// Layout: `[len|signature][8B timestamp][len|hashSignature][len|bankKeySignature][len|bankPublicKey][len|amountSignature]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlindSignatureResponse<E: Pairing> {
    /// Blind signature `k + c * sk`, zero if the bank had no randomness for the requester
    pub signature: E::ScalarField,
    pub timestamp: u64,
    /// Signature over `H(serial | amount | timestamp)`
    pub timestamp_signature: Signature<E>,
    pub bank_key_signature: Signature<E>,
    pub bank_public_key: E::G1Affine,
    pub amount_signature: Signature<E>,
}

impl<E: Pairing> BlindSignatureResponse<E> {
    /// What the bank answers when it has no pending randomness for the requester
    pub fn sentinel() -> Self {
        let empty = || SchnorrSignature {
            challenge: E::ScalarField::zero(),
            response: E::ScalarField::zero(),
            signed_message: vec![],
        };
        Self {
            signature: E::ScalarField::zero(),
            timestamp: 0,
            timestamp_signature: empty(),
            bank_key_signature: empty(),
            bank_public_key: E::G1Affine::zero(),
            amount_signature: empty(),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.signature.is_zero()
    }
}

impl<E: Pairing> WireFormat for BlindSignatureResponse<E> {
    fn write_to(&self, writer: &mut WireWriter) -> Result<(), OfflineEuroError> {
        writer.put_element(&self.signature)?;
        writer.put_u64(self.timestamp);
        writer.put_element(&self.timestamp_signature)?;
        writer.put_element(&self.bank_key_signature)?;
        writer.put_element(&self.bank_public_key)?;
        writer.put_element(&self.amount_signature)
    }

    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, OfflineEuroError> {
        Ok(Self {
            signature: reader.get_element()?,
            timestamp: reader.get_u64()?,
            timestamp_signature: reader.get_element()?,
            bank_key_signature: reader.get_element()?,
            bank_public_key: reader.get_element()?,
            amount_signature: reader.get_element()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message<E: Pairing> {
    GroupDescriptionCrsRequest,
    GroupDescriptionCrsReply {
        group: BilinearGroup<E>,
        crs: Crs<E>,
    },
    AddressRequest {
        name: String,
    },
    AddressReply {
        name: String,
        role: Role,
        public_key: E::G1Affine,
    },
    AddressNotFound {
        name: String,
    },
    RegistrationRequest {
        name: String,
        role: Role,
        public_key: E::G1Affine,
    },
    /// TTP's signature on the bank's public key
    BankRegistrationReply {
        signature: Signature<E>,
    },
    /// A user's registration waits for identity verification at `challenge_uri`
    RegistrationPending {
        transaction_id: String,
        challenge_uri: String,
    },
    /// The user went through the verification. Not answered.
    VerificationSubmitted {
        transaction_id: String,
    },
    /// Outcome of a user's registration. Not answered.
    RegistrationCompleted {
        success: bool,
    },
    BlindSignatureRandomnessRequest {
        public_key: E::G1Affine,
    },
    /// The bank's commitment `g * k`
    BlindSignatureRandomnessReply {
        randomness: E::G1Affine,
    },
    BlindSignatureRequest {
        challenge: E::ScalarField,
        public_key: E::G1Affine,
        amount: u64,
        serial_number: String,
    },
    BlindSignatureReply(BlindSignatureResponse<E>),
    TransactionRandomnessRequest {
        public_key: E::G1Affine,
    },
    TransactionRandomnessReply {
        elements: RandomizationElements<E>,
    },
    Transaction {
        details: Box<TransactionDetails<E>>,
    },
    TransactionResultReply {
        result: String,
    },
    FraudControlRequest {
        first_proof: GrothSahaiProof<E>,
        second_proof: GrothSahaiProof<E>,
    },
    FraudControlReply {
        result: String,
    },
}

impl<E: Pairing> Message<E> {
    fn tag(&self) -> u8 {
        match self {
            Message::GroupDescriptionCrsRequest => 1,
            Message::GroupDescriptionCrsReply { .. } => 2,
            Message::AddressRequest { .. } => 3,
            Message::AddressReply { .. } => 4,
            Message::AddressNotFound { .. } => 5,
            Message::RegistrationRequest { .. } => 6,
            Message::BankRegistrationReply { .. } => 7,
            Message::RegistrationPending { .. } => 8,
            Message::VerificationSubmitted { .. } => 9,
            Message::RegistrationCompleted { .. } => 10,
            Message::BlindSignatureRandomnessRequest { .. } => 11,
            Message::BlindSignatureRandomnessReply { .. } => 12,
            Message::BlindSignatureRequest { .. } => 13,
            Message::BlindSignatureReply(_) => 14,
            Message::TransactionRandomnessRequest { .. } => 15,
            Message::TransactionRandomnessReply { .. } => 16,
            Message::Transaction { .. } => 17,
            Message::TransactionResultReply { .. } => 18,
            Message::FraudControlRequest { .. } => 19,
            Message::FraudControlReply { .. } => 20,
        }
    }

    /// For logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::GroupDescriptionCrsRequest => "group description and crs request",
            Message::GroupDescriptionCrsReply { .. } => "group description and crs reply",
            Message::AddressRequest { .. } => "address request",
            Message::AddressReply { .. } => "address reply",
            Message::AddressNotFound { .. } => "address not found",
            Message::RegistrationRequest { .. } => "registration request",
            Message::BankRegistrationReply { .. } => "bank registration reply",
            Message::RegistrationPending { .. } => "registration pending",
            Message::VerificationSubmitted { .. } => "verification submitted",
            Message::RegistrationCompleted { .. } => "registration completed",
            Message::BlindSignatureRandomnessRequest { .. } => "blind signature randomness request",
            Message::BlindSignatureRandomnessReply { .. } => "blind signature randomness reply",
            Message::BlindSignatureRequest { .. } => "blind signature request",
            Message::BlindSignatureReply(_) => "blind signature reply",
            Message::TransactionRandomnessRequest { .. } => "transaction randomness request",
            Message::TransactionRandomnessReply { .. } => "transaction randomness reply",
            Message::Transaction { .. } => "transaction",
            Message::TransactionResultReply { .. } => "transaction result",
            Message::FraudControlRequest { .. } => "fraud control request",
            Message::FraudControlReply { .. } => "fraud control reply",
        }
    }

    /// Messages the receiver never answers
    pub fn is_one_way(&self) -> bool {
        matches!(
            self,
            Message::VerificationSubmitted { .. } | Message::RegistrationCompleted { .. }
        )
    }
}

impl<E: Pairing> WireFormat for Message<E> {
    fn write_to(&self, w: &mut WireWriter) -> Result<(), OfflineEuroError> {
        w.put_u8(self.tag());
        match self {
            Message::GroupDescriptionCrsRequest => Ok(()),
            Message::GroupDescriptionCrsReply { group, crs } => {
                w.put_element(group)?;
                w.put_element(crs)
            }
            Message::AddressRequest { name } | Message::AddressNotFound { name } => w.put_str(name),
            Message::AddressReply {
                name,
                role,
                public_key,
            }
            | Message::RegistrationRequest {
                name,
                role,
                public_key,
            } => {
                w.put_str(name)?;
                w.put_u8(role.tag());
                w.put_element(public_key)
            }
            Message::BankRegistrationReply { signature } => w.put_element(signature),
            Message::RegistrationPending {
                transaction_id,
                challenge_uri,
            } => {
                w.put_str(transaction_id)?;
                w.put_str(challenge_uri)
            }
            Message::VerificationSubmitted { transaction_id } => w.put_str(transaction_id),
            Message::RegistrationCompleted { success } => {
                w.put_u8(u8::from(*success));
                Ok(())
            }
            Message::BlindSignatureRandomnessRequest { public_key }
            | Message::TransactionRandomnessRequest { public_key } => w.put_element(public_key),
            Message::BlindSignatureRandomnessReply { randomness } => w.put_element(randomness),
            Message::BlindSignatureRequest {
                challenge,
                public_key,
                amount,
                serial_number,
            } => {
                w.put_element(challenge)?;
                w.put_element(public_key)?;
                w.put_u64(*amount);
                w.put_str(serial_number)
            }
            Message::BlindSignatureReply(response) => response.write_to(w),
            Message::TransactionRandomnessReply { elements } => w.put_element(elements),
            Message::Transaction { details } => details.write_to(w),
            Message::TransactionResultReply { result } | Message::FraudControlReply { result } => {
                w.put_str(result)
            }
            Message::FraudControlRequest {
                first_proof,
                second_proof,
            } => {
                w.put_element(first_proof)?;
                w.put_element(second_proof)
            }
        }
    }

    fn read_from(r: &mut WireReader<'_>) -> Result<Self, OfflineEuroError> {
        let message = match r.get_u8()? {
            1 => Message::GroupDescriptionCrsRequest,
            2 => Message::GroupDescriptionCrsReply {
                group: r.get_element()?,
                crs: r.get_element()?,
            },
            3 => Message::AddressRequest {
                name: r.get_string()?,
            },
            4 => Message::AddressReply {
                name: r.get_string()?,
                role: Role::from_tag(r.get_u8()?)?,
                public_key: r.get_element()?,
            },
            5 => Message::AddressNotFound {
                name: r.get_string()?,
            },
            6 => Message::RegistrationRequest {
                name: r.get_string()?,
                role: Role::from_tag(r.get_u8()?)?,
                public_key: r.get_element()?,
            },
            7 => Message::BankRegistrationReply {
                signature: r.get_element()?,
            },
            8 => Message::RegistrationPending {
                transaction_id: r.get_string()?,
                challenge_uri: r.get_string()?,
            },
            9 => Message::VerificationSubmitted {
                transaction_id: r.get_string()?,
            },
            10 => Message::RegistrationCompleted {
                success: match r.get_u8()? {
                    0 => false,
                    1 => true,
                    _ => return Err(OfflineEuroError::MalformedPayload("invalid boolean")),
                },
            },
            11 => Message::BlindSignatureRandomnessRequest {
                public_key: r.get_element()?,
            },
            12 => Message::BlindSignatureRandomnessReply {
                randomness: r.get_element()?,
            },
            13 => Message::BlindSignatureRequest {
                challenge: r.get_element()?,
                public_key: r.get_element()?,
                amount: r.get_u64()?,
                serial_number: r.get_string()?,
            },
            14 => Message::BlindSignatureReply(BlindSignatureResponse::read_from(r)?),
            15 => Message::TransactionRandomnessRequest {
                public_key: r.get_element()?,
            },
            16 => Message::TransactionRandomnessReply {
                elements: r.get_element()?,
            },
            17 => Message::Transaction {
                details: Box::new(TransactionDetails::read_from(r)?),
            },
            18 => Message::TransactionResultReply {
                result: r.get_string()?,
            },
            19 => Message::FraudControlRequest {
                first_proof: r.get_element()?,
                second_proof: r.get_element()?,
            },
            20 => Message::FraudControlReply {
                result: r.get_string()?,
            },
            _ => return Err(OfflineEuroError::MalformedPayload("unknown message tag")),
        };
        Ok(message)
    }
}
