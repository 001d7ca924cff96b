use crate::{error::SchnorrError, signature::SchnorrSignature};
use alloc::vec::Vec;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Zero;
use ark_std::{rand::RngCore, UniformRand};
use digest::Digest;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Requester-side state of a blind signing session. `alpha` and `beta` hide the message and the
/// final signature from the signer and are needed once more to unblind the signer's answer.
#[derive(Clone, Debug, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct BlindedChallenge<G: AffineRepr> {
    /// Sent to the signer
    pub blinded_challenge: G::ScalarField,
    /// Challenge of the unblinded signature, `H(R' || message)`
    pub challenge: G::ScalarField,
    pub message: Vec<u8>,
    alpha: G::ScalarField,
    beta: G::ScalarField,
}

/// `R' = R + g * alpha + pk * beta`, `c' = H(R' || message)` and the blinded challenge is `c' + beta`.
pub fn create_blinded_challenge<R: RngCore, G: AffineRepr, D: Digest>(
    rng: &mut R,
    signer_commitment: &G,
    message: &[u8],
    signer_public_key: &G,
    gen: &G,
) -> Result<BlindedChallenge<G>, SchnorrError> {
    let alpha = G::ScalarField::rand(rng);
    let beta = G::ScalarField::rand(rng);
    let r_prime = (*signer_commitment + *gen * alpha + *signer_public_key * beta).into_affine();
    let challenge = SchnorrSignature::<G>::compute_challenge::<D>(&r_prime, message)?;
    Ok(BlindedChallenge {
        blinded_challenge: challenge + beta,
        challenge,
        message: message.to_vec(),
        alpha,
        beta,
    })
}

/// Signer's answer `k + blinded_challenge * secret_key`. `randomness` is the `k` committed to for this
/// requester and must not be used again.
pub fn sign_blinded_challenge<G: AffineRepr>(
    randomness: &G::ScalarField,
    blinded_challenge: &G::ScalarField,
    secret_key: &G::ScalarField,
) -> G::ScalarField {
    *randomness + *blinded_challenge * secret_key
}

pub fn unblind_signature<G: AffineRepr>(
    blinded_challenge: &BlindedChallenge<G>,
    blind_signature: &G::ScalarField,
) -> Result<SchnorrSignature<G>, SchnorrError> {
    if blind_signature.is_zero() {
        return Err(SchnorrError::ZeroBlindSignature);
    }
    Ok(SchnorrSignature {
        challenge: blinded_challenge.challenge,
        response: *blind_signature + blinded_challenge.alpha,
        signed_message: blinded_challenge.message.clone(),
    })
}
