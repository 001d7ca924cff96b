use ark_ec::{pairing::Pairing, CurveGroup};
use ark_ff::Zero;
use ark_std::{rand::RngCore, UniformRand};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// `pk = g * sk`
#[derive(Clone, Debug, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair<E: Pairing> {
    secret_key: E::ScalarField,
    #[zeroize(skip)]
    pub public_key: E::G1Affine,
}

impl<E: Pairing> KeyPair<E> {
    pub fn generate<R: RngCore>(rng: &mut R, g: &E::G1Affine) -> Self {
        let mut secret_key = E::ScalarField::rand(rng);
        while secret_key.is_zero() {
            secret_key = E::ScalarField::rand(rng);
        }
        Self {
            secret_key,
            public_key: (*g * secret_key).into_affine(),
        }
    }

    pub fn secret_key(&self) -> &E::ScalarField {
        &self.secret_key
    }
}
