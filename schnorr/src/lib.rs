#![cfg_attr(not(feature = "std"), no_std)]

//! Schnorr signatures over the first source group of a pairing-friendly curve and the blind
//! variant used at withdrawal. Signature is `(challenge, response, signed_message)` where
//! `challenge = H(g * r || message)` and `response = r + challenge * secret_key`.
//!
//! For blind issuance the signer commits to `R = g * k`, the requester derives a blinded challenge
//! from it with [`blind::create_blinded_challenge`], the signer answers with
//! [`blind::sign_blinded_challenge`] and the requester recovers an ordinary [`SchnorrSignature`]
//! with [`blind::unblind_signature`]. The signer must never answer two challenges with the same `k`.

extern crate alloc;

pub mod blind;
pub mod error;
pub mod signature;

pub use blind::{create_blinded_challenge, sign_blinded_challenge, unblind_signature, BlindedChallenge};
pub use error::SchnorrError;
pub use signature::SchnorrSignature;
