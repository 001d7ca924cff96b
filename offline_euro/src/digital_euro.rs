use crate::{
    codec::{WireFormat, WireReader, WireWriter},
    error::OfflineEuroError,
    repository::Record,
    Signature,
};
use ark_ec::pairing::Pairing;
use blake2::{Blake2b512, Digest};
use ecash_crypto_utils::{concat_slices, serde_utils::{to_compressed_bytes, ArkObjectBytes}};
use groth_sahai::GrothSahaiProof;
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// A coin. Everything except `amount` and `proofs` is fixed at withdrawal. `proofs` holds one
/// proof per transfer and only ever grows, see [`DigitalEuro::with_proof`].
#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct DigitalEuro<E: Pairing> {
    pub serial_number: String,
    /// Value after the fees deducted by previous holders
    pub amount: u64,
    #[serde_as(as = "ArkObjectBytes")]
    pub first_theta1: E::G1Affine,
    /// Bank's (unblinded) signature over `serial_number || first_theta1`
    pub signature: Signature<E>,
    pub proofs: Vec<GrothSahaiProof<E>>,
    pub withdrawal_timestamp: u64,
    /// Bank's signature over [`DigitalEuro::timestamp_message`]
    pub timestamp_signature: Signature<E>,
    #[serde_as(as = "ArkObjectBytes")]
    pub bank_public_key: E::G1Affine,
    /// TTP's signature over the bank's public key
    pub bank_key_signature: Signature<E>,
    /// Bank's signature over the withdrawn amount
    pub amount_signature: Signature<E>,
}

/// What identifies a coin independent of the transfers it went through. Two deposits with the
/// same descriptor are the same coin spent twice.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EuroDescriptor<E: Pairing> {
    pub serial_number: String,
    pub first_theta1: E::G1Affine,
    pub signature: Signature<E>,
}

impl<E: Pairing> DigitalEuro<E> {
    pub fn descriptor(&self) -> EuroDescriptor<E> {
        EuroDescriptor {
            serial_number: self.serial_number.clone(),
            first_theta1: self.first_theta1,
            signature: self.signature.clone(),
        }
    }

    pub fn descriptor_equals(&self, other: &Self) -> bool {
        self.serial_number == other.serial_number
            && self.first_theta1 == other.first_theta1
            && self.signature == other.signature
    }

    /// The coin after one more transfer. `self` is left as it was.
    pub fn with_proof(&self, proof: GrothSahaiProof<E>) -> Self {
        let mut euro = self.clone();
        euro.proofs.push(proof);
        euro
    }

    pub fn with_amount(&self, amount: u64) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    pub fn transfer_count(&self) -> usize {
        self.proofs.len()
    }

    /// The state the next proof has to continue: `theta1` of the last proof or `first_theta1`
    pub fn current_theta(&self) -> E::G1Affine {
        self.proofs
            .last()
            .map(|p| p.theta1)
            .unwrap_or(self.first_theta1)
    }

    /// The state before the current one, `None` for a coin that was never transferred
    pub fn previous_theta(&self) -> Option<E::G1Affine> {
        match self.proofs.len() {
            0 => None,
            1 => Some(self.first_theta1),
            n => Some(self.proofs[n - 2].theta1),
        }
    }

    /// Amount the bank signed at withdrawal, `None` if the signed message is not an amount
    pub fn original_amount(&self) -> Option<u64> {
        core::str::from_utf8(&self.amount_signature.signed_message)
            .ok()?
            .parse()
            .ok()
    }

    /// Index of the first proof on which the chains of two copies of a coin differ. `None` if one
    /// chain is a prefix of the other.
    pub fn first_divergence(&self, other: &Self) -> Option<usize> {
        self.proofs
            .iter()
            .zip(other.proofs.iter())
            .position(|(a, b)| a != b)
    }

    /// Message the bank blindly signs at withdrawal
    pub fn bank_signed_message(
        serial_number: &str,
        first_theta1: &E::G1Affine,
    ) -> Result<Vec<u8>, OfflineEuroError> {
        let theta_bytes = to_compressed_bytes(first_theta1)?;
        Ok(concat_slices![serial_number.as_bytes(), theta_bytes])
    }

    pub fn amount_message(amount: u64) -> Vec<u8> {
        amount.to_string().into_bytes()
    }

    /// `H(serial_number | amount | timestamp)`
    pub fn timestamp_message(serial_number: &str, amount: u64, timestamp: u64) -> Vec<u8> {
        Blake2b512::digest(format!("{} | {} | {}", serial_number, amount, timestamp).as_bytes())
            .to_vec()
    }
}

impl<E: Pairing> Record for DigitalEuro<E> {
    type Descriptor = EuroDescriptor<E>;

    fn descriptor(&self) -> Self::Descriptor {
        DigitalEuro::descriptor(self)
    }
}

impl<E: Pairing> WireFormat for DigitalEuro<E> {
    fn write_to(&self, writer: &mut WireWriter) -> Result<(), OfflineEuroError> {
        writer.put_str(&self.serial_number)?;
        writer.put_u64(self.amount);
        writer.put_element(&self.first_theta1)?;
        writer.put_element(&self.signature)?;
        writer.put_u64(self.proofs.len() as u64);
        for proof in &self.proofs {
            writer.put_element(proof)?;
        }
        writer.put_u64(self.withdrawal_timestamp);
        writer.put_element(&self.timestamp_signature)?;
        writer.put_element(&self.bank_public_key)?;
        writer.put_element(&self.bank_key_signature)?;
        writer.put_element(&self.amount_signature)
    }

    fn read_from(reader: &mut WireReader<'_>) -> Result<Self, OfflineEuroError> {
        let serial_number = reader.get_string()?;
        let amount = reader.get_u64()?;
        let first_theta1 = reader.get_element()?;
        let signature = reader.get_element()?;
        let proof_count = reader.get_u64()?;
        // every proof takes more than a byte so this bounds the allocation
        if proof_count > reader.remaining() as u64 {
            return Err(OfflineEuroError::MalformedPayload("proof count exceeds payload"));
        }
        let mut proofs = Vec::with_capacity(proof_count as usize);
        for _ in 0..proof_count {
            proofs.push(reader.get_element()?);
        }
        Ok(Self {
            serial_number,
            amount,
            first_theta1,
            signature,
            proofs,
            withdrawal_timestamp: reader.get_u64()?,
            timestamp_signature: reader.get_element()?,
            bank_public_key: reader.get_element()?,
            bank_key_signature: reader.get_element()?,
            amount_signature: reader.get_element()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{random_proof, Fixture};
    use ark_bls12_381::Bls12_381;
    use ark_std::rand::{rngs::StdRng, SeedableRng};
    use test_utils::test_serde_round_trip;

    #[test]
    fn descriptor_ignores_transfers() {
        let mut rng = StdRng::seed_from_u64(0u64);
        let fixture = Fixture::new(&mut rng);
        let (euro, _) = fixture.withdraw(&mut rng, 200);
        assert_eq!(euro.transfer_count(), 0);
        assert_eq!(euro.current_theta(), euro.first_theta1);
        assert_eq!(euro.previous_theta(), None);
        assert_eq!(euro.original_amount(), Some(200));

        let proof = random_proof(&mut rng, &fixture);
        let transferred = euro.with_proof(proof.clone());
        // the original value is untouched
        assert_eq!(euro.transfer_count(), 0);
        assert_eq!(transferred.transfer_count(), 1);
        assert_eq!(transferred.current_theta(), proof.theta1);
        assert_eq!(transferred.previous_theta(), Some(euro.first_theta1));

        assert!(euro.descriptor_equals(&transferred));
        assert_eq!(euro.descriptor(), transferred.descriptor());
        assert_ne!(euro, transferred);

        let cheaper = transferred.with_amount(150);
        assert_eq!(cheaper.amount, 150);
        assert_eq!(cheaper.original_amount(), Some(200));
        assert!(cheaper.descriptor_equals(&euro));

        let (other, _) = fixture.withdraw(&mut rng, 200);
        assert!(!other.descriptor_equals(&euro));
    }

    #[test]
    fn divergence() {
        let mut rng = StdRng::seed_from_u64(1u64);
        let fixture = Fixture::new(&mut rng);
        let (euro, _) = fixture.withdraw(&mut rng, 100);
        let p0 = random_proof(&mut rng, &fixture);
        let p1 = random_proof(&mut rng, &fixture);
        let p2 = random_proof(&mut rng, &fixture);

        let a = euro.with_proof(p0.clone()).with_proof(p1.clone());
        let b = euro.with_proof(p0.clone()).with_proof(p2.clone());
        assert_eq!(a.first_divergence(&b), Some(1));
        assert_eq!(a.previous_theta(), Some(p0.theta1));

        let c = euro.with_proof(p2).with_proof(p1);
        assert_eq!(a.first_divergence(&c), Some(0));

        let prefix = euro.with_proof(p0);
        assert_eq!(a.first_divergence(&prefix), None);
        assert_eq!(euro.first_divergence(&a), None);
    }

    #[test]
    fn encodings() {
        let mut rng = StdRng::seed_from_u64(2u64);
        let fixture = Fixture::new(&mut rng);
        let (euro, _) = fixture.withdraw(&mut rng, 200);
        let euro = euro
            .with_proof(random_proof(&mut rng, &fixture))
            .with_proof(random_proof(&mut rng, &fixture));

        let bytes = euro.to_wire_bytes().unwrap();
        assert_eq!(DigitalEuro::<Bls12_381>::from_wire_bytes(&bytes).unwrap(), euro);

        assert!(DigitalEuro::<Bls12_381>::from_wire_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut longer = bytes.clone();
        longer.push(0);
        assert!(DigitalEuro::<Bls12_381>::from_wire_bytes(&longer).is_err());

        test_serde_round_trip!(DigitalEuro<Bls12_381>, euro);
    }

    #[test]
    fn signed_messages() {
        let m1 = DigitalEuro::<Bls12_381>::timestamp_message("serial", 200, 1000);
        assert_eq!(m1.len(), 64);
        assert_eq!(m1, DigitalEuro::<Bls12_381>::timestamp_message("serial", 200, 1000));
        assert_ne!(m1, DigitalEuro::<Bls12_381>::timestamp_message("serial", 201, 1000));
        assert_ne!(m1, DigitalEuro::<Bls12_381>::timestamp_message("serial", 200, 1001));
        assert_eq!(DigitalEuro::<Bls12_381>::amount_message(200), b"200".to_vec());
    }
}
