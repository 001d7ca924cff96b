use ark_bls12_381::{Bls12_381, Fr, G1Affine};
use ark_std::{rand::RngCore, UniformRand};
use groth_sahai::{Crs, CrsTrapdoor, RandomizationElements, TransactionProof};
use test_utils::test_group;

pub fn crs<R: RngCore>(rng: &mut R) -> (Crs<Bls12_381>, CrsTrapdoor<Fr>) {
    let group = test_group();
    let ttp_public_key = group.random_g1(rng);
    Crs::generate(rng, &group, ttp_public_key)
}

/// A coin passed through `hops` holders: the proof of every hop with the coin state it starts from
pub fn transfer_chain<R: RngCore>(
    rng: &mut R,
    crs: &Crs<Bls12_381>,
    hops: usize,
) -> Vec<(TransactionProof<Bls12_381>, G1Affine)> {
    let mut t = Fr::rand(rng);
    let mut chain = Vec::with_capacity(hops);
    for _ in 0..hops {
        let prior_theta: G1Affine = (crs.g * -t).into();
        let next_t = Fr::rand(rng);
        let elements = RandomizationElements::derive(&next_t, crs);
        let sender_secret_key = Fr::rand(rng);
        let proof = TransactionProof::new(rng, &sender_secret_key, &t, &elements, crs).unwrap();
        chain.push((proof, prior_theta));
        t = next_t;
    }
    chain
}
