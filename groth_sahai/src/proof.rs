use crate::{error::GrothSahaiError, randomization::RandomizationElements, setup::Crs};
use ark_ec::{
    pairing::{Pairing, PairingOutput},
    AffineRepr, CurveGroup,
};
use ark_ff::Field;
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_std::{end_timer, rand::RngCore, start_timer, UniformRand};
use ecash_crypto_utils::{pairing_product_is_one, serde_utils::ArkObjectBytes};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Proof that `theta1` is a correct re-randomization of the coin state the proof's `target` was
/// computed from. `(c1, c2)` commits to the sender's public key, `(d1, d2)` to `Y`. `(theta1, theta2)`
/// and `(pi1, pi2)` are the proof elements of the SXDH equations.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct GrothSahaiProof<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub c1: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub c2: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub d1: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub d2: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub theta1: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub theta2: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub pi1: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub pi2: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub target: PairingOutput<E>,
}

/// A proof as handed to the receiver of a transfer. `used_y` and `used_vs` open `d2` and are not
/// kept in the coin's proof chain.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
#[serde(bound = "")]
pub struct TransactionProof<E: Pairing> {
    pub proof: GrothSahaiProof<E>,
    #[serde_as(as = "ArkObjectBytes")]
    pub used_y: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub used_vs: E::G2Affine,
}

impl<E: Pairing> GrothSahaiProof<E> {
    /// Check the proof against the coin state it claims to continue, `prior_theta`.
    pub fn verify(
        &self,
        crs: &Crs<E>,
        prior_theta: &E::G1Affine,
    ) -> Result<(), GrothSahaiError> {
        let verify_time = start_timer!(|| "GrothSahaiProof::verify");
        let result = self.check_equations(crs, prior_theta);
        end_timer!(verify_time);
        result
    }

    fn check_equations(
        &self,
        crs: &Crs<E>,
        prior_theta: &E::G1Affine,
    ) -> Result<(), GrothSahaiError> {
        if self.target != E::pairing(-prior_theta.into_group(), crs.h) {
            return Err(GrothSahaiError::TargetMismatch);
        }
        let neg_g = -crs.g.into_group();
        let neg_u = -crs.u.into_group();
        let neg_theta1 = -self.theta1.into_group();
        let neg_theta2 = -self.theta2.into_group();

        // e(c1, d1) = e(g, pi1) * e(theta1, h)
        if !pairing_product_is_one!(using E: self.c1, self.d1; neg_g, self.pi1; neg_theta1, crs.h) {
            return Err(GrothSahaiError::PairingEquationFailed(0));
        }
        // e(c1, d2) = e(g, pi2) * e(theta1, v)
        if !pairing_product_is_one!(using E: self.c1, self.d2; neg_g, self.pi2; neg_theta1, crs.v) {
            return Err(GrothSahaiError::PairingEquationFailed(1));
        }
        // e(c2, d1) = e(u, pi1) * e(theta2, h)
        if !pairing_product_is_one!(using E: self.c2, self.d1; neg_u, self.pi1; neg_theta2, crs.h) {
            return Err(GrothSahaiError::PairingEquationFailed(2));
        }
        // e(c2, d2) = target * e(u, pi2) * e(theta2, v)
        let rhs = E::multi_pairing(
            [
                E::G1Prepared::from(self.c2),
                E::G1Prepared::from(neg_u),
                E::G1Prepared::from(neg_theta2),
            ],
            [
                E::G2Prepared::from(self.d2),
                E::G2Prepared::from(self.pi2),
                E::G2Prepared::from(crs.v),
            ],
        );
        if rhs != self.target {
            return Err(GrothSahaiError::PairingEquationFailed(3));
        }
        Ok(())
    }

    /// The coin state that a verified proof hands over
    pub fn next_theta(&self) -> E::G1Affine {
        self.theta1
    }
}

impl<E: Pairing> TransactionProof<E> {
    /// Create the proof for handing over the coin state `g * -prior_t` to the owner of
    /// `randomization_elements`, as the sender with secret key `sender_secret_key`.
    pub fn new<R: RngCore>(
        rng: &mut R,
        sender_secret_key: &E::ScalarField,
        prior_t: &E::ScalarField,
        randomization_elements: &RandomizationElements<E>,
        crs: &Crs<E>,
    ) -> Result<Self, GrothSahaiError> {
        let sk_inv = sender_secret_key
            .inverse()
            .ok_or(GrothSahaiError::ZeroSecretKey)?;
        let prove_time = start_timer!(|| "TransactionProof::new");
        let x = crs.g * sender_secret_key;
        let y = crs.h * (*prior_t * sk_inv);

        let r = E::ScalarField::rand(rng);
        let s = E::ScalarField::rand(rng);

        let c1 = crs.g * r;
        let c2 = x + crs.u * r;
        let d1 = crs.h * s;
        let vs = crs.v * s;
        let d2 = y + vs;

        let theta2 = x * s + randomization_elements.u_t_inv;
        let pi1 = d1 * r + randomization_elements.h_t;
        let pi2 = d2 * r + randomization_elements.v_t;

        let target = E::pairing(x, y);

        let g1 = E::G1::normalize_batch(&[c1, c2, theta2]);
        let g2 = E::G2::normalize_batch(&[d1, d2, pi1, pi2, y, vs]);

        let proof = GrothSahaiProof {
            c1: g1[0],
            c2: g1[1],
            d1: g2[0],
            d2: g2[1],
            theta1: randomization_elements.g_t_inv,
            theta2: g1[2],
            pi1: g2[2],
            pi2: g2[3],
            target,
        };
        end_timer!(prove_time);
        Ok(Self {
            proof,
            used_y: g2[4],
            used_vs: g2[5],
        })
    }

    /// Verify the proof and that the auxiliary commitments open `d2`
    pub fn verify(
        &self,
        crs: &Crs<E>,
        prior_theta: &E::G1Affine,
    ) -> Result<(), GrothSahaiError> {
        self.proof.verify(crs, prior_theta)?;
        if (self.used_y + self.used_vs).into_affine() != self.proof.d2 {
            return Err(GrothSahaiError::InvalidAuxiliaryCommitments);
        }
        Ok(())
    }
}
