use ark_bls12_381::{Bls12_381, G1Affine};
use ark_ec::pairing::Pairing;
use ark_std::{
    rand::{rngs::StdRng, SeedableRng},
    UniformRand,
};
use blake2::Blake2b512;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ecash_schnorr::{
    create_blinded_challenge, sign_blinded_challenge, unblind_signature, SchnorrSignature,
};
use test_utils::test_group;

type Fr = <Bls12_381 as Pairing>::ScalarField;

fn plain_signature(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let group = test_group();
    let sk = Fr::rand(&mut rng);
    let pk = group.g_mul(&sk);
    let message = b"serial-number-and-coin-state".to_vec();

    c.bench_function("Schnorr sign", |b| {
        b.iter(|| {
            SchnorrSignature::<G1Affine>::new::<_, Blake2b512>(
                &mut rng,
                black_box(&message),
                black_box(&sk),
                &group.g,
            )
            .unwrap()
        })
    });

    let signature =
        SchnorrSignature::<G1Affine>::new::<_, Blake2b512>(&mut rng, &message, &sk, &group.g)
            .unwrap();
    c.bench_function("Schnorr verify", |b| {
        b.iter(|| {
            signature
                .verify::<Blake2b512>(black_box(&pk), &group.g)
                .unwrap()
        })
    });
}

fn blind_issuance(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let group = test_group();
    let sk = Fr::rand(&mut rng);
    let pk = group.g_mul(&sk);
    let message = b"serial-number-and-coin-state".to_vec();

    // Commitment, blinding, answer and unblinding of one withdrawal
    c.bench_function("Blind Schnorr issuance", |b| {
        b.iter(|| {
            let k = Fr::rand(&mut rng);
            let commitment = group.g_mul(&k);
            let blinded = create_blinded_challenge::<_, G1Affine, Blake2b512>(
                &mut rng,
                &commitment,
                black_box(&message),
                &pk,
                &group.g,
            )
            .unwrap();
            let answer = sign_blinded_challenge::<G1Affine>(&k, &blinded.blinded_challenge, &sk);
            unblind_signature(&blinded, &answer).unwrap()
        })
    });
}

criterion_group!(benches, plain_signature, blind_issuance);
criterion_main!(benches);
