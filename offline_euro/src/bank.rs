//! The bank issues coins under blind signatures and takes them back as deposits. A coin deposited
//! twice is evidence of double spending and is handed to the TTP for tracing.

use crate::{
    digital_euro::DigitalEuro,
    error::{MisuseKind, OfflineEuroError},
    fee::now_millis,
    message::{BlindSignatureResponse, Message, Role},
    participant::ParticipantCore,
    repository::Repository,
    ChallengeHasher, Signature,
};
use ark_ec::pairing::Pairing;
use ark_std::UniformRand;
use ecash_crypto_utils::serde_utils::to_compressed_bytes;
use ecash_schnorr::sign_blinded_challenge;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DepositOutcome {
    Accepted,
    /// The coin was deposited before. Holds the TTP's verdict on the diverging proofs.
    DoubleSpendTraced(String),
    /// The coin was deposited before but the TTP did not answer
    TtpUnreachable,
    /// The coin was deposited before with no diverging transfer to trace
    DoubleSpendUnattributed,
}

impl DepositOutcome {
    pub fn description(&self) -> String {
        match self {
            DepositOutcome::Accepted => "Deposit was successful!".into(),
            DepositOutcome::DoubleSpendTraced(verdict) => verdict.clone(),
            DepositOutcome::TtpUnreachable => {
                "Found double spending proofs, but TTP is unreachable".into()
            }
            DepositOutcome::DoubleSpendUnattributed => {
                "Detected double spending but could not blame anyone".into()
            }
        }
    }

    pub fn is_suspected(&self) -> bool {
        !matches!(self, DepositOutcome::Accepted)
    }
}

/// One line of the deposit log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositLogEntry {
    pub serial_number: String,
    pub double_spending_suspected: bool,
}

/// What a user needs to check the coin it is about to withdraw
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawalMetadata<E: Pairing> {
    pub bank_public_key: E::G1Affine,
    pub bank_key_signature: Signature<E>,
}

pub struct Bank<E: Pairing> {
    core: ParticipantCore<E>,
    /// TTP's signature on this bank's key, known after registration
    ttp_signature: RwLock<Option<Signature<E>>>,
    /// `k` committed to per requesting user, consumed by the signature
    withdraw_randomness: Mutex<HashMap<E::G1Affine, E::ScalarField>>,
    deposits: Arc<dyn Repository<DigitalEuro<E>>>,
    deposit_log: Mutex<Vec<DepositLogEntry>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E: Pairing> Bank<E> {
    pub fn new(core: ParticipantCore<E>, deposits: Arc<dyn Repository<DigitalEuro<E>>>) -> Self {
        Self {
            core,
            ttp_signature: RwLock::new(None),
            withdraw_randomness: Mutex::new(HashMap::new()),
            deposits,
            deposit_log: Mutex::new(Vec::new()),
        }
    }

    pub fn core(&self) -> &ParticipantCore<E> {
        &self.core
    }

    /// Fetch public parameters and have the TTP sign the bank's key
    pub fn set_up(&self) -> Result<(), OfflineEuroError> {
        let session = self.core.fetch_public_parameters()?;
        if self.is_registered() {
            return Ok(());
        }
        let ttp = self.core.config.ttp_name.clone();
        let reply = self.core.request(
            &ttp,
            Message::RegistrationRequest {
                name: self.core.name().to_string(),
                role: Role::Bank,
                public_key: session.keys.public_key,
            },
        )?;
        let signature = match reply {
            Message::BankRegistrationReply { signature } => signature,
            _ => return Err(MisuseKind::UnexpectedReply.into()),
        };
        signature.verify_message::<ChallengeHasher>(
            &to_compressed_bytes(&session.keys.public_key)?,
            &session.crs.ttp_public_key,
            &session.group.g,
        )?;
        info!(name = %self.core.name(), "registered at TTP");
        *self
            .ttp_signature
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(signature);
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.ttp_signature
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn withdrawal_metadata(&self) -> Result<WithdrawalMetadata<E>, OfflineEuroError> {
        let session = self.core.session()?;
        let bank_key_signature = self
            .ttp_signature
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(OfflineEuroError::ProtocolMisuse(MisuseKind::BankNotRegistered))?;
        Ok(WithdrawalMetadata {
            bank_public_key: session.keys.public_key,
            bank_key_signature,
        })
    }

    /// Commitment `g * k` to the randomness for `user`'s next withdrawal. Asking again before the
    /// withdrawal gives the same commitment.
    pub fn get_blind_signature_randomness(
        &self,
        user: E::G1Affine,
    ) -> Result<E::G1Affine, OfflineEuroError> {
        let session = self.core.session()?;
        let k = *lock(&self.withdraw_randomness)
            .entry(user)
            .or_insert_with(|| self.core.with_rng(|rng| E::ScalarField::rand(rng)));
        Ok(session.group.g_mul(&k))
    }

    /// Answer a blinded challenge with the randomness committed to for `user`, which is used up by
    /// this. Without committed randomness the answer is [`BlindSignatureResponse::sentinel`].
    pub fn create_blind_signature(
        &self,
        challenge: &E::ScalarField,
        user: &E::G1Affine,
        amount: u64,
        serial_number: &str,
    ) -> Result<BlindSignatureResponse<E>, OfflineEuroError> {
        let session = self.core.session()?;
        let metadata = self.withdrawal_metadata()?;
        let k = match lock(&self.withdraw_randomness).remove(user) {
            Some(k) => k,
            None => {
                warn!(name = %self.core.name(), "blind signature requested without randomness");
                return Ok(BlindSignatureResponse::sentinel());
            }
        };
        let sk = session.keys.secret_key();
        let signature = sign_blinded_challenge::<E::G1Affine>(&k, challenge, sk);

        let timestamp = now_millis();
        let g = &session.group.g;
        let (timestamp_signature, amount_signature) =
            self.core.with_rng(|rng| -> Result<_, OfflineEuroError> {
                let timestamp_message =
                    DigitalEuro::<E>::timestamp_message(serial_number, amount, timestamp);
                let ts = Signature::<E>::new::<_, ChallengeHasher>(rng, &timestamp_message, sk, g)?;
                let amount_message = DigitalEuro::<E>::amount_message(amount);
                let am = Signature::<E>::new::<_, ChallengeHasher>(rng, &amount_message, sk, g)?;
                Ok((ts, am))
            })?;
        info!(name = %self.core.name(), serial = serial_number, amount, "issued blind signature");
        Ok(BlindSignatureResponse {
            signature,
            timestamp,
            timestamp_signature,
            bank_key_signature: metadata.bank_key_signature,
            bank_public_key: metadata.bank_public_key,
            amount_signature,
        })
    }

    /// Store a deposited coin. If the same coin was deposited before, the first proofs on which the
    /// two transfer chains differ go to the TTP. The deposit is stored in every case, together with
    /// the lookup of earlier copies so that of two concurrent deposits of a coin one sees the other.
    pub fn deposit_euro(&self, euro: DigitalEuro<E>) -> DepositOutcome {
        let duplicates = self.deposits.insert_returning_matches(euro.clone());
        let outcome = if duplicates.is_empty() {
            DepositOutcome::Accepted
        } else {
            let diverging = duplicates
                .iter()
                .filter_map(|d| euro.first_divergence(d).map(|i| (i, d)))
                .max_by_key(|(i, _)| *i);
            match diverging {
                Some((index, duplicate)) => self.request_fraud_control(&euro, duplicate, index),
                None => DepositOutcome::DoubleSpendUnattributed,
            }
        };

        let suspected = outcome.is_suspected();
        if suspected {
            warn!(name = %self.core.name(), serial = %euro.serial_number, outcome = %outcome.description(), "double deposit");
        } else {
            info!(name = %self.core.name(), serial = %euro.serial_number, amount = euro.amount, "deposit accepted");
        }
        lock(&self.deposit_log).push(DepositLogEntry {
            serial_number: euro.serial_number.clone(),
            double_spending_suspected: suspected,
        });
        outcome
    }

    fn request_fraud_control(
        &self,
        euro: &DigitalEuro<E>,
        duplicate: &DigitalEuro<E>,
        index: usize,
    ) -> DepositOutcome {
        debug!(serial = %euro.serial_number, index, "chains diverge");
        let ttp = self.core.config.ttp_name.clone();
        let reply = self.core.request(
            &ttp,
            Message::FraudControlRequest {
                first_proof: euro.proofs[index].clone(),
                second_proof: duplicate.proofs[index].clone(),
            },
        );
        match reply {
            Ok(Message::FraudControlReply { result }) if !result.is_empty() => {
                DepositOutcome::DoubleSpendTraced(result)
            }
            Ok(_) => DepositOutcome::DoubleSpendUnattributed,
            Err(e) => {
                warn!(error = ?e, "fraud control failed");
                DepositOutcome::TtpUnreachable
            }
        }
    }

    pub fn deposited_euros(&self) -> Vec<DigitalEuro<E>> {
        self.deposits.all()
    }

    pub fn deposit_log(&self) -> Vec<DepositLogEntry> {
        lock(&self.deposit_log).clone()
    }

    pub(crate) fn handle_message(
        &self,
        message: Message<E>,
    ) -> Result<Option<Message<E>>, OfflineEuroError> {
        let reply = match message {
            Message::BlindSignatureRandomnessRequest { public_key } => {
                Some(Message::BlindSignatureRandomnessReply {
                    randomness: self.get_blind_signature_randomness(public_key)?,
                })
            }
            Message::BlindSignatureRequest {
                challenge,
                public_key,
                amount,
                serial_number,
            } => Some(Message::BlindSignatureReply(self.create_blind_signature(
                &challenge,
                &public_key,
                amount,
                &serial_number,
            )?)),
            other => {
                warn!(name = %self.core.name(), kind = other.kind(), "unexpected message");
                None
            }
        };
        Ok(reply)
    }

    pub fn reset(&self) {
        self.core.reset();
        lock(&self.withdraw_randomness).clear();
        lock(&self.deposit_log).clear();
        self.deposits.clear();
    }
}
