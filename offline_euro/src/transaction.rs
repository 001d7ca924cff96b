//! Transfer of a coin from one holder to the next and its validation.
//!
//! A transfer appends a Groth-Sahai proof that moves the coin state from the sender's
//! `theta = g * -t_p` to the receiver's `g * -t` and signs the new state with the secret `-t_p` of
//! the old one. [`validate`] checks the bank's attestations, the whole proof chain and the chain of
//! these state signatures, in that order, and reports the first failure.

use crate::{
    codec::{WireFormat, WireReader, WireWriter},
    digital_euro::DigitalEuro,
    error::OfflineEuroError,
    keys::KeyPair,
    wallet::WalletEntry,
    ChallengeHasher, Signature,
};
use ark_ec::pairing::Pairing;
use ark_std::{iter, rand::RngCore, vec::Vec};
use ecash_crypto_utils::{
    serde_utils::{to_compressed_bytes, ArkObjectBytes},
    BilinearGroup,
};
use groth_sahai::{Crs, RandomizationElements, TransactionProof};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// What a sender hands to the receiver. `digital_euro` does not contain the new proof yet.
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct TransactionDetails<E: Pairing> {
    pub digital_euro: DigitalEuro<E>,
    pub current_transaction_proof: TransactionProof<E>,
    /// Signature the sender received along with the coin, absent for a coin fresh from the bank
    pub previous_theta_signature: Option<Signature<E>>,
    /// Signature over the new coin state by the secret of the current one
    pub theta1_signature: Signature<E>,
    #[serde_as(as = "ArkObjectBytes")]
    pub spender_public_key: E::G1Affine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionResult {
    ValidTransaction,
    ValidDeposit,
    InvalidBankSignature,
    InvalidBankKeySignature,
    InvalidAmount,
    InvalidTimestamp,
    InvalidProofInChain { index: usize },
    InvalidTsRelationBankSignature,
    /// The new coin state is not the one derived from the receiver's randomness
    RandomizationMismatch,
}

impl TransactionResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::ValidTransaction | Self::ValidDeposit)
    }

    pub fn description(&self) -> String {
        match self {
            Self::ValidTransaction => "Valid transaction".into(),
            Self::ValidDeposit => "Valid deposit".into(),
            Self::InvalidBankSignature => "Invalid bank signature".into(),
            Self::InvalidBankKeySignature => "Invalid bank key signature".into(),
            Self::InvalidAmount => "Invalid amount".into(),
            Self::InvalidTimestamp => "Invalid timestamp".into(),
            Self::InvalidProofInChain { index } => format!("Invalid proof in chain at index {}", index),
            Self::InvalidTsRelationBankSignature => {
                "Invalid theta signature relation".into()
            }
            Self::RandomizationMismatch => "New coin state does not match the randomness".into(),
        }
    }
}

/// Build the transfer of `entry` to the owner of `randomization_elements`. The coin is forwarded
/// as it is in `entry`, so any fee has to be applied to its amount before.
pub fn create_transaction<E: Pairing, R: RngCore>(
    rng: &mut R,
    sender: &KeyPair<E>,
    entry: &WalletEntry<E>,
    randomization_elements: &RandomizationElements<E>,
    group: &BilinearGroup<E>,
    crs: &Crs<E>,
) -> Result<TransactionDetails<E>, OfflineEuroError> {
    let proof = TransactionProof::new(
        rng,
        sender.secret_key(),
        &entry.t,
        randomization_elements,
        crs,
    )?;
    let theta1_signature = Signature::<E>::new::<_, ChallengeHasher>(
        rng,
        &to_compressed_bytes(&proof.proof.theta1)?,
        &-entry.t,
        &group.g,
    )?;
    Ok(TransactionDetails {
        digital_euro: entry.digital_euro.clone(),
        current_transaction_proof: proof,
        previous_theta_signature: entry.transaction_signature.clone(),
        theta1_signature,
        spender_public_key: sender.public_key,
    })
}

/// Check `details` for a coin issued by `bank_public_key`. Only reads its inputs, so validating the
/// same details twice gives the same result.
pub fn validate<E: Pairing>(
    details: &TransactionDetails<E>,
    bank_public_key: &E::G1Affine,
    group: &BilinearGroup<E>,
    crs: &Crs<E>,
    is_deposit: bool,
) -> TransactionResult {
    let euro = &details.digital_euro;
    let g = &group.g;

    let bank_signed = DigitalEuro::<E>::bank_signed_message(&euro.serial_number, &euro.first_theta1);
    let bank_signature_ok = bank_signed.map_or(false, |m| {
        euro.signature
            .verify_message::<ChallengeHasher>(&m, bank_public_key, g)
            .is_ok()
    });
    if !bank_signature_ok {
        return TransactionResult::InvalidBankSignature;
    }

    let bank_key_ok = euro.bank_public_key == *bank_public_key
        && to_compressed_bytes(bank_public_key).map_or(false, |key| {
            euro.bank_key_signature
                .verify_message::<ChallengeHasher>(&key, &crs.ttp_public_key, g)
                .is_ok()
        });
    if !bank_key_ok {
        return TransactionResult::InvalidBankKeySignature;
    }

    let original_amount = match euro.original_amount() {
        Some(a)
            if a >= euro.amount
                && euro
                    .amount_signature
                    .verify::<ChallengeHasher>(bank_public_key, g)
                    .is_ok() =>
        {
            a
        }
        _ => return TransactionResult::InvalidAmount,
    };
    let timestamp_message = DigitalEuro::<E>::timestamp_message(
        &euro.serial_number,
        original_amount,
        euro.withdrawal_timestamp,
    );
    if euro
        .timestamp_signature
        .verify_message::<ChallengeHasher>(&timestamp_message, bank_public_key, g)
        .is_err()
    {
        return TransactionResult::InvalidTimestamp;
    }

    // Proof `i` moves the coin from `states[i]` to `states[i + 1]`
    let states = iter::once(euro.first_theta1)
        .chain(euro.proofs.iter().map(|p| p.next_theta()))
        .collect::<Vec<_>>();
    if let Some(index) = first_failure(euro.proofs.len(), |i| {
        euro.proofs[i].verify(crs, &states[i]).is_ok()
    }) {
        return TransactionResult::InvalidProofInChain { index };
    }
    let current_theta = states[euro.proofs.len()];

    let new_theta = details.current_transaction_proof.proof.theta1;
    let previous_ok = match (euro.previous_theta(), &details.previous_theta_signature) {
        (None, None) => true,
        (Some(previous), Some(sig)) => signs_theta::<E>(sig, &current_theta, &previous, g),
        _ => false,
    };
    if !previous_ok || !signs_theta::<E>(&details.theta1_signature, &new_theta, &current_theta, g) {
        return TransactionResult::InvalidTsRelationBankSignature;
    }

    if details
        .current_transaction_proof
        .verify(crs, &current_theta)
        .is_err()
    {
        return TransactionResult::InvalidProofInChain {
            index: euro.proofs.len(),
        };
    }

    if is_deposit {
        TransactionResult::ValidDeposit
    } else {
        TransactionResult::ValidTransaction
    }
}

/// Lowest `i < len` for which `is_valid(i)` fails. No index after a found failure is checked, in
/// parallel only the ones already started are finished.
fn first_failure<F>(len: usize, is_valid: F) -> Option<usize>
where
    F: Fn(usize) -> bool + Send + Sync,
{
    #[cfg(feature = "parallel")]
    let index = (0..len).into_par_iter().position_first(|i| !is_valid(i));
    #[cfg(not(feature = "parallel"))]
    let index = (0..len).position(|i| !is_valid(i));
    index
}

/// Whether `signature` is over `theta` by the secret of the coin state `signer`
fn signs_theta<E: Pairing>(
    signature: &Signature<E>,
    theta: &E::G1Affine,
    signer: &E::G1Affine,
    g: &E::G1Affine,
) -> bool {
    to_compressed_bytes(theta).map_or(false, |m| {
        signature
            .verify_message::<ChallengeHasher>(&m, signer, g)
            .is_ok()
    })
}

impl<E: Pairing> WireFormat for TransactionDetails<E> {
    fn write_to(&self, writer: &mut WireWriter) -> Result<(), OfflineEuroError> {
        self.digital_euro.write_to(writer)?;
        writer.put_element(&self.current_transaction_proof)?;
        writer.put_option(self.previous_theta_signature.as_ref(), |w, s| w.put_element(s))?;
        writer.put_element(&self.theta1_signature)?;
        writer.put_element(&self.spender_public_key)
    }

    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, OfflineEuroError> {
        Ok(Self {
            digital_euro: DigitalEuro::read_from(reader)?,
            current_transaction_proof: reader.get_element()?,
            previous_theta_signature: reader.get_option(|r| r.get_element())?,
            theta1_signature: reader.get_element()?,
            spender_public_key: reader.get_element()?,
        })
    }
}
