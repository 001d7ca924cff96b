//! Offline e-cash with a bank, users and a trusted third party (TTP).
//!
//! ## Flow
//!
//! 1. The TTP generates the bilinear group and the Groth-Sahai CRS, keeping the trapdoor. Banks and
//! users fetch both from it and register; a bank gets the TTP's signature on its key, a user goes
//! through an identity verification that completes later.
//! 2. Withdrawal. A user picks `t0`, sets the coin state `firstTheta1 = g * -t0` and gets the bank's
//! blind Schnorr signature on `serial || firstTheta1`, plus signatures on amount and withdrawal time.
//! 3. Transfer. The receiver hands out [`groth_sahai::RandomizationElements`] for a fresh `t`, the
//! sender proves the re-randomization of the coin state towards them and signs the new state with
//! the old one. The receiver validates the whole chain, see [`transaction::validate`].
//! 4. Deposit is a transfer to the bank. A coin deposited twice has two chains diverging at the
//! transfer made twice; the TTP extracts the spender's key from both proofs there.
//!
//! ## Modules
//!
//! - coins and their transfer: [`digital_euro`], [`transaction`], [`wallet`], [`fee`]
//! - roles: [`bank`], [`user`], [`ttp`], dispatched through [`participant::Participant`]
//! - transport: [`message`], [`codec`], [`communication`]
//! - storage and collaborators: [`repository`], [`identity`], [`config`]

pub mod bank;
pub mod codec;
pub mod communication;
pub mod config;
pub mod digital_euro;
pub mod error;
pub mod fee;
pub mod identity;
pub mod keys;
pub mod message;
pub mod participant;
pub mod repository;
pub mod transaction;
pub mod ttp;
pub mod user;
pub mod wallet;

#[cfg(test)]
mod testing;

use ark_ec::pairing::Pairing;

/// Hash used for every Schnorr challenge and the timestamp digest
pub type ChallengeHasher = blake2::Blake2b512;

pub type Signature<E> = ecash_schnorr::SchnorrSignature<<E as Pairing>::G1Affine>;

pub mod prelude {
    pub use crate::{
        bank::{Bank, DepositOutcome},
        communication::{CommunicationChannel, LocalNetwork},
        config::ProtocolConfig,
        digital_euro::DigitalEuro,
        error::{MisuseKind, OfflineEuroError},
        identity::{IdentityVerification, InMemoryIdentityVerification, RegistrationState},
        message::{Message, Role},
        participant::{Participant, ParticipantCore},
        transaction::{TransactionDetails, TransactionResult},
        ttp::{FraudVerdict, Ttp},
        user::User,
        wallet::{Wallet, WalletEntry},
        ChallengeHasher, Signature,
    };
}
