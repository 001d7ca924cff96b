//! Coins and proofs made without going through the participants

use crate::{
    digital_euro::DigitalEuro, keys::KeyPair, wallet::WalletEntry, ChallengeHasher, Signature,
};
use ark_bls12_381::{Bls12_381, Fr, G1Affine};
use ark_std::{
    rand::{rngs::StdRng, RngCore},
    UniformRand,
};
use ecash_crypto_utils::{serde_utils::to_compressed_bytes, BilinearGroup};
use ecash_schnorr::{create_blinded_challenge, sign_blinded_challenge, unblind_signature};
use groth_sahai::{Crs, CrsTrapdoor, GrothSahaiProof, RandomizationElements, TransactionProof};
use test_utils::test_group;

pub struct Fixture {
    pub group: BilinearGroup<Bls12_381>,
    pub crs: Crs<Bls12_381>,
    pub trapdoor: CrsTrapdoor<Fr>,
    pub ttp: KeyPair<Bls12_381>,
    pub bank: KeyPair<Bls12_381>,
    pub bank_key_signature: Signature<Bls12_381>,
}

impl Fixture {
    pub fn new(rng: &mut StdRng) -> Self {
        let group = test_group();
        let ttp = KeyPair::generate(rng, &group.g);
        let (crs, trapdoor) = Crs::generate(rng, &group, ttp.public_key);
        let bank = KeyPair::generate(rng, &group.g);
        let bank_key_signature = Signature::<Bls12_381>::new::<_, ChallengeHasher>(
            rng,
            &to_compressed_bytes(&bank.public_key).unwrap(),
            ttp.secret_key(),
            &group.g,
        )
        .unwrap();
        Self {
            group,
            crs,
            trapdoor,
            ttp,
            bank,
            bank_key_signature,
        }
    }

    /// A freshly withdrawn coin and its secret `t0`
    pub fn withdraw(&self, rng: &mut StdRng, amount: u64) -> (DigitalEuro<Bls12_381>, Fr) {
        let g = self.group.g;
        let serial_number = format!("serial-{}", rng.next_u64());
        let t0 = Fr::rand(rng);
        let first_theta1 = self.group.g_mul(&-t0);

        let k = Fr::rand(rng);
        let commitment = self.group.g_mul(&k);
        let message =
            DigitalEuro::<Bls12_381>::bank_signed_message(&serial_number, &first_theta1).unwrap();
        let blinded = create_blinded_challenge::<_, G1Affine, ChallengeHasher>(
            rng,
            &commitment,
            &message,
            &self.bank.public_key,
            &g,
        )
        .unwrap();
        let answer = sign_blinded_challenge::<G1Affine>(
            &k,
            &blinded.blinded_challenge,
            self.bank.secret_key(),
        );
        let signature = unblind_signature(&blinded, &answer).unwrap();

        let timestamp = 1_700_000_000_000;
        let sign = |rng: &mut StdRng, m: &[u8]| {
            Signature::<Bls12_381>::new::<_, ChallengeHasher>(rng, m, self.bank.secret_key(), &g)
                .unwrap()
        };
        let euro = DigitalEuro {
            timestamp_signature: sign(
                rng,
                &DigitalEuro::<Bls12_381>::timestamp_message(&serial_number, amount, timestamp),
            ),
            amount_signature: sign(rng, &DigitalEuro::<Bls12_381>::amount_message(amount)),
            serial_number,
            amount,
            first_theta1,
            signature,
            proofs: vec![],
            withdrawal_timestamp: timestamp,
            bank_public_key: self.bank.public_key,
            bank_key_signature: self.bank_key_signature.clone(),
        };
        (euro, t0)
    }

    pub fn withdrawn_entry(&self, rng: &mut StdRng, amount: u64) -> WalletEntry<Bls12_381> {
        let (euro, t0) = self.withdraw(rng, amount);
        WalletEntry::withdrawn(euro, t0, 0)
    }

    pub fn user(&self, rng: &mut StdRng) -> KeyPair<Bls12_381> {
        KeyPair::generate(rng, &self.group.g)
    }

    /// A fresh receiver secret and its randomization elements
    pub fn receiver_randomness(&self, rng: &mut StdRng) -> (Fr, RandomizationElements<Bls12_381>) {
        let t = Fr::rand(rng);
        (t, RandomizationElements::derive(&t, &self.crs))
    }
}

/// A valid proof continuing some unrelated coin state
pub fn random_proof(rng: &mut StdRng, fixture: &Fixture) -> GrothSahaiProof<Bls12_381> {
    let sender = fixture.user(rng);
    let (_, elements) = fixture.receiver_randomness(rng);
    let prior_t = Fr::rand(rng);
    TransactionProof::new(rng, sender.secret_key(), &prior_t, &elements, &fixture.crs)
        .unwrap()
        .proof
}
