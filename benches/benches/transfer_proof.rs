use ark_bls12_381::{Bls12_381, Fr, G1Affine};
use ark_std::{
    rand::{rngs::StdRng, SeedableRng},
    UniformRand,
};
use benches::{crs, transfer_chain};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use groth_sahai::{extract_identity, RandomizationElements, TransactionProof};

fn single_transfer(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (crs, trapdoor) = crs(&mut rng);
    let sender_secret_key = Fr::rand(&mut rng);
    let prior_t = Fr::rand(&mut rng);
    let prior_theta: G1Affine = (crs.g * -prior_t).into();
    let elements = RandomizationElements::<Bls12_381>::derive(&Fr::rand(&mut rng), &crs);

    c.bench_function("Create transfer proof", |b| {
        b.iter(|| {
            TransactionProof::new(
                &mut rng,
                black_box(&sender_secret_key),
                black_box(&prior_t),
                &elements,
                &crs,
            )
            .unwrap()
        })
    });

    let proof =
        TransactionProof::new(&mut rng, &sender_secret_key, &prior_t, &elements, &crs).unwrap();
    c.bench_function("Verify transfer proof", |b| {
        b.iter(|| proof.verify(&crs, black_box(&prior_theta)).unwrap())
    });

    c.bench_function("Extract spender", |b| {
        b.iter(|| extract_identity(black_box(&proof.proof), &trapdoor))
    });
}

fn chain_verification(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(0u64);
    let (crs, _) = crs(&mut rng);
    let hops = [1, 2, 4, 8, 16];
    let chains = hops
        .iter()
        .map(|h| transfer_chain(&mut rng, &crs, *h))
        .collect::<Vec<_>>();

    let mut group = c.benchmark_group("Verify transfer chain");
    for (i, count) in hops.iter().enumerate() {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{} transfers", count)),
            count,
            |b, &_count| {
                b.iter(|| {
                    for (proof, prior_theta) in &chains[i] {
                        proof.verify(&crs, black_box(prior_theta)).unwrap();
                    }
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, single_transfer, chain_verification);
criterion_main!(benches);
