use ark_ec::{pairing::Pairing, AffineRepr};
use ark_ff::{PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{end_timer, rand::RngCore, start_timer, UniformRand};
use ecash_crypto_utils::{serde_utils::ArkObjectBytes, BilinearGroup};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Public parameters. `g` and `h` are the generators of the bilinear group, `u = g * alpha` and
/// `v = h * beta`. The TTP's public key is distributed along with them.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct Crs<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub g: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub u: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub v: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub ttp_public_key: E::G1Affine,
}

/// Discrete logs of `u` and `v`. Only the TTP holds this, it is never sent anywhere.
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Zeroize, ZeroizeOnDrop,
)]
pub struct CrsTrapdoor<F: PrimeField> {
    pub alpha: F,
    pub beta: F,
}

impl<E: Pairing> Crs<E> {
    pub fn generate<R: RngCore>(
        rng: &mut R,
        group: &BilinearGroup<E>,
        ttp_public_key: E::G1Affine,
    ) -> (Self, CrsTrapdoor<E::ScalarField>) {
        let setup_time = start_timer!(|| "Crs::generate");
        let mut alpha = E::ScalarField::rand(rng);
        while alpha.is_zero() {
            alpha = E::ScalarField::rand(rng);
        }
        let mut beta = E::ScalarField::rand(rng);
        while beta.is_zero() {
            beta = E::ScalarField::rand(rng);
        }
        let crs = Self {
            g: group.g,
            u: group.g_mul(&alpha),
            h: group.h,
            v: group.h_mul(&beta),
            ttp_public_key,
        };
        end_timer!(setup_time);
        (crs, CrsTrapdoor { alpha, beta })
    }

    /// A CRS received from the network must use the agreed generators and non-trivial `u` and `v`
    pub fn is_valid(&self, group: &BilinearGroup<E>) -> bool {
        self.g == group.g
            && self.h == group.h
            && !self.u.is_zero()
            && !self.v.is_zero()
            && !self.ttp_public_key.is_zero()
    }
}

impl<F: PrimeField> CrsTrapdoor<F> {
    /// Checks that this is the trapdoor of `crs`
    pub fn opens<E: Pairing<ScalarField = F>>(&self, crs: &Crs<E>) -> bool {
        crs.g * self.alpha == crs.u.into_group() && crs.h * self.beta == crs.v.into_group()
    }
}
