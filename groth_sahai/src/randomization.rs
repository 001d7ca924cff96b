use crate::setup::Crs;
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ecash_crypto_utils::serde_utils::ArkObjectBytes;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// What a receiver publishes for its secret `t` before a transfer so that the sender cannot choose
/// the next coin state: `{h * t, v * t, g * -t, u * -t}`. `g_t_inv` is the coin state the receiver
/// will own.
#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct RandomizationElements<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub h_t: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub v_t: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub g_t_inv: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub u_t_inv: E::G1Affine,
}

impl<E: Pairing> RandomizationElements<E> {
    pub fn derive(t: &E::ScalarField, crs: &Crs<E>) -> Self {
        let t_inv = -*t;
        let g1 = E::G1::normalize_batch(&[crs.g * t_inv, crs.u * t_inv]);
        let g2 = E::G2::normalize_batch(&[crs.h * t, crs.v * t]);
        Self {
            h_t: g2[0],
            v_t: g2[1],
            g_t_inv: g1[0],
            u_t_inv: g1[1],
        }
    }

    /// Whether these are the elements of `t`. Lets a receiver check the new coin state it is handed.
    pub fn is_for(&self, t: &E::ScalarField, crs: &Crs<E>) -> bool {
        self.g_t_inv == (crs.g * -*t).into_affine()
    }

    /// Elements must all be non-trivial
    pub fn is_valid(&self) -> bool {
        !(self.h_t.is_zero() || self.v_t.is_zero() || self.g_t_inv.is_zero() || self.u_t_inv.is_zero())
    }
}
