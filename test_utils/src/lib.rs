use ark_bls12_381::Bls12_381;
use ark_ec::pairing::Pairing;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use blake2::Blake2b512;
use ecash_crypto_utils::BilinearGroup;

pub type Fr = <Bls12_381 as Pairing>::ScalarField;
pub type G1 = <Bls12_381 as Pairing>::G1Affine;
pub type G2 = <Bls12_381 as Pairing>::G2Affine;

#[macro_use]
pub mod serialization;

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// The group every test agrees on, derived from a fixed label.
pub fn test_group() -> BilinearGroup<Bls12_381> {
    BilinearGroup::new::<Blake2b512>(b"offline-euro-test-group")
}
