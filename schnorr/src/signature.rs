use crate::error::SchnorrError;
use alloc::vec::Vec;
use ark_ec::{AffineRepr, CurveGroup};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{rand::RngCore, UniformRand};
use digest::Digest;
use ecash_crypto_utils::{
    hashing_utils::field_elem_from_try_and_incr,
    serde_utils::{to_compressed_bytes, ArkObjectBytes},
};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct SchnorrSignature<G: AffineRepr> {
    #[serde_as(as = "ArkObjectBytes")]
    pub challenge: G::ScalarField,
    #[serde_as(as = "ArkObjectBytes")]
    pub response: G::ScalarField,
    pub signed_message: Vec<u8>,
}

impl<G: AffineRepr> SchnorrSignature<G> {
    pub fn new<R: RngCore, D: Digest>(
        rng: &mut R,
        message: &[u8],
        secret_key: &G::ScalarField,
        gen: &G,
    ) -> Result<Self, SchnorrError> {
        let r = G::ScalarField::rand(rng);
        let t = (*gen * r).into_affine();
        let challenge = Self::compute_challenge::<D>(&t, message)?;
        let response = r + challenge * secret_key;
        Ok(Self {
            challenge,
            response,
            signed_message: message.to_vec(),
        })
    }

    /// Verify the signature over its own `signed_message`
    pub fn verify<D: Digest>(&self, public_key: &G, gen: &G) -> Result<(), SchnorrError> {
        let t = (*gen * self.response - *public_key * self.challenge).into_affine();
        let challenge = Self::compute_challenge::<D>(&t, &self.signed_message)?;
        if challenge != self.challenge {
            return Err(SchnorrError::InvalidSignature);
        }
        Ok(())
    }

    /// Like `verify` but also checks that the signature is over `message`.
    pub fn verify_message<D: Digest>(
        &self,
        message: &[u8],
        public_key: &G,
        gen: &G,
    ) -> Result<(), SchnorrError> {
        if self.signed_message != message {
            return Err(SchnorrError::InvalidSignature);
        }
        self.verify::<D>(public_key, gen)
    }

    pub fn compute_challenge<D: Digest>(
        t: &G,
        message: &[u8],
    ) -> Result<G::ScalarField, SchnorrError> {
        let mut challenge_bytes = to_compressed_bytes(t)?;
        challenge_bytes.extend_from_slice(message);
        Ok(field_elem_from_try_and_incr::<G::ScalarField, D>(
            &challenge_bytes,
        ))
    }
}
