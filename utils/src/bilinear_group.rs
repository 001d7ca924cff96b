//! The bilinear group `(G1, G2, GT, e)` with fixed generators `g`, `h` and `gt = e(g, h)`. Once the
//! TTP has published it, every participant works with the same immutable copy.

use crate::{
    concat_slices, hashing_utils::affine_group_elem_from_try_and_incr,
    serde_utils::{from_compressed_bytes, ArkObjectBytes},
};
use ark_ec::{
    pairing::{Pairing, PairingOutput},
    AffineRepr, CurveGroup,
};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize, SerializationError};
use ark_std::{rand::RngCore, UniformRand};
use digest::Digest;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

#[serde_as]
#[derive(
    Clone, PartialEq, Eq, Debug, CanonicalSerialize, CanonicalDeserialize, Serialize, Deserialize,
)]
pub struct BilinearGroup<E: Pairing> {
    #[serde_as(as = "ArkObjectBytes")]
    pub g: E::G1Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub h: E::G2Affine,
    #[serde_as(as = "ArkObjectBytes")]
    pub gt: PairingOutput<E>,
}

impl<E: Pairing> BilinearGroup<E> {
    /// Generators are derived by hashing the label so anyone can recompute them.
    pub fn new<D: Digest>(label: &[u8]) -> Self {
        let g = affine_group_elem_from_try_and_incr::<E::G1Affine, D>(&concat_slices![
            label, b" : g"
        ]);
        let h = affine_group_elem_from_try_and_incr::<E::G2Affine, D>(&concat_slices![
            label, b" : h"
        ]);
        Self::from_generators(g, h)
    }

    pub fn generate_using_rng<R: RngCore>(rng: &mut R) -> Self {
        let g = E::G1::rand(rng).into_affine();
        let h = E::G2::rand(rng).into_affine();
        Self::from_generators(g, h)
    }

    pub fn from_generators(g: E::G1Affine, h: E::G2Affine) -> Self {
        let gt = E::pairing(g, h);
        Self { g, h, gt }
    }

    pub fn random_zr<R: RngCore>(rng: &mut R) -> E::ScalarField {
        E::ScalarField::rand(rng)
    }

    /// A uniformly random element of G1 expressed in the base `g`
    pub fn random_g1<R: RngCore>(&self, rng: &mut R) -> E::G1Affine {
        self.g_mul(&E::ScalarField::rand(rng))
    }

    pub fn random_g2<R: RngCore>(&self, rng: &mut R) -> E::G2Affine {
        self.h_mul(&E::ScalarField::rand(rng))
    }

    pub fn random_gt<R: RngCore>(&self, rng: &mut R) -> PairingOutput<E> {
        self.gt * E::ScalarField::rand(rng)
    }

    /// `g * exponent`
    pub fn g_mul(&self, exponent: &E::ScalarField) -> E::G1Affine {
        (self.g * exponent).into_affine()
    }

    /// `h * exponent`
    pub fn h_mul(&self, exponent: &E::ScalarField) -> E::G2Affine {
        (self.h * exponent).into_affine()
    }

    pub fn pairing(
        &self,
        a: impl Into<E::G1Prepared>,
        b: impl Into<E::G2Prepared>,
    ) -> PairingOutput<E> {
        E::pairing(a, b)
    }

    pub fn g1_from_bytes(&self, bytes: &[u8]) -> Result<E::G1Affine, SerializationError> {
        from_compressed_bytes(bytes)
    }

    pub fn g2_from_bytes(&self, bytes: &[u8]) -> Result<E::G2Affine, SerializationError> {
        from_compressed_bytes(bytes)
    }

    pub fn gt_from_bytes(&self, bytes: &[u8]) -> Result<PairingOutput<E>, SerializationError> {
        from_compressed_bytes(bytes)
    }

    pub fn zr_from_bytes(&self, bytes: &[u8]) -> Result<E::ScalarField, SerializationError> {
        from_compressed_bytes(bytes)
    }

    /// Generators must be non-trivial and `gt` must be their pairing. A participant checks this
    /// on a group description received from the network before using it.
    pub fn is_valid(&self) -> bool {
        !self.g.is_zero() && !self.h.is_zero() && self.gt == E::pairing(self.g, self.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serde_utils::to_compressed_bytes;
    use ark_bls12_381::{Bls12_381, Fr};
    use ark_std::{
        rand::{rngs::StdRng, SeedableRng},
        Zero,
    };
    use blake2::Blake2b512;

    type Group = BilinearGroup<Bls12_381>;

    #[test]
    fn group_from_label() {
        let group = Group::new::<Blake2b512>(b"test");
        assert!(group.is_valid());
        assert_eq!(group, Group::new::<Blake2b512>(b"test"));
        assert_ne!(group, Group::new::<Blake2b512>(b"another test"));

        let mut rng = StdRng::seed_from_u64(0u64);
        let random = Group::generate_using_rng(&mut rng);
        assert!(random.is_valid());

        let mut tampered = random.clone();
        tampered.gt = group.gt;
        assert!(!tampered.is_valid());
    }

    #[test]
    fn bilinearity() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let group = Group::generate_using_rng(&mut rng);
        let a = Group::random_zr(&mut rng);
        let b = Group::random_zr(&mut rng);

        let lhs = group.pairing(group.g_mul(&a), group.h_mul(&b));
        assert_eq!(lhs, group.gt * (a * b));
        assert_eq!(lhs, group.pairing(group.g_mul(&(a * b)), group.h));

        let minus = group.pairing(group.g_mul(&-a), group.h_mul(&b));
        assert!((lhs + minus).is_zero());

        assert!(!group.random_gt(&mut rng).is_zero());
        assert_ne!(group.random_g1(&mut rng), group.random_g1(&mut rng));
        assert_ne!(group.random_g2(&mut rng), group.random_g2(&mut rng));
    }

    #[test]
    fn element_bytes() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let group = Group::generate_using_rng(&mut rng);

        let x = Fr::from(42u64);
        let g1 = group.g_mul(&x);
        let g2 = group.h_mul(&x);
        let gt = group.gt * x;

        assert_eq!(
            group.g1_from_bytes(&to_compressed_bytes(&g1).unwrap()).unwrap(),
            g1
        );
        assert_eq!(
            group.g2_from_bytes(&to_compressed_bytes(&g2).unwrap()).unwrap(),
            g2
        );
        assert_eq!(
            group.gt_from_bytes(&to_compressed_bytes(&gt).unwrap()).unwrap(),
            gt
        );
        assert_eq!(
            group.zr_from_bytes(&to_compressed_bytes(&x).unwrap()).unwrap(),
            x
        );

        let g1_bytes = to_compressed_bytes(&g1).unwrap();
        assert!(group.g1_from_bytes(&g1_bytes[1..]).is_err());
        assert!(group.g2_from_bytes(&g1_bytes).is_err());

        let group_bytes = to_compressed_bytes(&group).unwrap();
        assert_eq!(from_compressed_bytes::<Group>(&group_bytes).unwrap(), group);
    }
}
