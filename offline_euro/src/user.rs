use crate::{
    digital_euro::DigitalEuro,
    error::{MisuseKind, OfflineEuroError},
    fee::now_millis,
    identity::RegistrationState,
    message::{Message, Role},
    participant::{Address, ParticipantCore, Session},
    transaction::{TransactionDetails, TransactionResult},
    wallet::{SpendContext, Wallet},
    ChallengeHasher,
};
use ark_ec::pairing::Pairing;
use ark_std::{rand::rngs::StdRng, UniformRand};
use ecash_crypto_utils::serde_utils::to_compressed_bytes;
use ecash_schnorr::{create_blinded_challenge, unblind_signature};
use groth_sahai::RandomizationElements;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
struct Registration {
    transaction_id: Option<String>,
    challenge_uri: Option<String>,
    state: Option<RegistrationState>,
}

pub struct User<E: Pairing> {
    core: ParticipantCore<E>,
    wallet: Wallet<E>,
    registration: Mutex<Registration>,
}

impl<E: Pairing> User<E> {
    pub fn new(core: ParticipantCore<E>, wallet: Wallet<E>) -> Self {
        Self {
            core,
            wallet,
            registration: Mutex::new(Registration::default()),
        }
    }

    pub fn core(&self) -> &ParticipantCore<E> {
        &self.core
    }

    pub fn wallet(&self) -> &Wallet<E> {
        &self.wallet
    }

    fn registration(&self) -> MutexGuard<'_, Registration> {
        self.registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch public parameters and start the registration at the TTP. The registration completes
    /// once the identity verification is done, see [`User::submit_verification`].
    pub fn set_up(&self) -> Result<(), OfflineEuroError> {
        let session = self.core.fetch_public_parameters()?;
        if self.registration_state().is_some() {
            return Ok(());
        }
        let ttp = self.core.config.ttp_name.clone();
        let reply = self.core.request(
            &ttp,
            Message::RegistrationRequest {
                name: self.core.name().to_string(),
                role: Role::User,
                public_key: session.keys.public_key,
            },
        )?;
        match reply {
            Message::RegistrationPending {
                transaction_id,
                challenge_uri,
            } => {
                info!(name = %self.core.name(), %challenge_uri, "registration pending verification");
                let mut registration = self.registration();
                registration.transaction_id = Some(transaction_id);
                registration.challenge_uri = Some(challenge_uri);
                registration.state = Some(RegistrationState::PendingVerification);
                Ok(())
            }
            _ => Err(MisuseKind::UnexpectedReply.into()),
        }
    }

    pub fn registration_state(&self) -> Option<RegistrationState> {
        self.registration().state
    }

    pub fn verification_challenge(&self) -> Option<String> {
        self.registration().challenge_uri.clone()
    }

    /// Tell the TTP that the identity verification was done. The outcome arrives later as a
    /// separate message.
    pub fn submit_verification(&self) -> Result<(), OfflineEuroError> {
        let transaction_id = self
            .registration()
            .transaction_id
            .clone()
            .ok_or(OfflineEuroError::ProtocolMisuse(MisuseKind::NotSetUp))?;
        let ttp = self.core.config.ttp_name.clone();
        self.core
            .notify(&ttp, Message::VerificationSubmitted { transaction_id })
    }

    /// Withdraw a coin of `amount` from `bank`. The bank signs it blindly so it cannot link the coin
    /// to this withdrawal.
    pub fn withdraw_digital_euro(
        &self,
        bank: &str,
        amount: u64,
    ) -> Result<DigitalEuro<E>, OfflineEuroError> {
        if amount == 0 {
            return Err(OfflineEuroError::InvalidAmount);
        }
        let session = self.core.session()?;
        let bank = self.core.lookup_address(bank)?;
        if bank.role != Role::Bank {
            return Err(MisuseKind::NotABank.into());
        }
        let g = session.group.g;
        let public_key = session.keys.public_key;

        let serial_number = Uuid::new_v4().to_string();
        let t0 = self.core.with_rng(|rng| E::ScalarField::rand(rng));
        let first_theta1 = session.group.g_mul(&-t0);

        let commitment = match self
            .core
            .request(&bank.name, Message::BlindSignatureRandomnessRequest { public_key })?
        {
            Message::BlindSignatureRandomnessReply { randomness } => randomness,
            _ => return Err(MisuseKind::UnexpectedReply.into()),
        };
        let message = DigitalEuro::<E>::bank_signed_message(&serial_number, &first_theta1)?;
        let blinded = self.core.with_rng(|rng| {
            create_blinded_challenge::<_, E::G1Affine, ChallengeHasher>(
                rng,
                &commitment,
                &message,
                &bank.public_key,
                &g,
            )
        })?;

        let response = match self.core.request(
            &bank.name,
            Message::BlindSignatureRequest {
                challenge: blinded.blinded_challenge,
                public_key,
                amount,
                serial_number: serial_number.clone(),
            },
        )? {
            Message::BlindSignatureReply(response) => response,
            _ => return Err(MisuseKind::UnexpectedReply.into()),
        };
        if response.is_sentinel() {
            return Err(MisuseKind::NoPendingRandomness.into());
        }
        let signature = unblind_signature(&blinded, &response.signature)?;
        signature.verify::<ChallengeHasher>(&bank.public_key, &g)?;

        let euro = DigitalEuro {
            serial_number,
            amount,
            first_theta1,
            signature,
            proofs: vec![],
            withdrawal_timestamp: response.timestamp,
            timestamp_signature: response.timestamp_signature,
            bank_public_key: response.bank_public_key,
            bank_key_signature: response.bank_key_signature,
            amount_signature: response.amount_signature,
        };
        self.check_bank_attestations(&euro, &bank, &session)?;
        info!(name = %self.core.name(), bank = %bank.name, serial = %euro.serial_number, amount, "withdrew digital euro");
        self.wallet.add_withdrawn(euro.clone(), t0, now_millis());
        Ok(euro)
    }

    fn check_bank_attestations(
        &self,
        euro: &DigitalEuro<E>,
        bank: &Address<E>,
        session: &Session<E>,
    ) -> Result<(), OfflineEuroError> {
        let g = &session.group.g;
        if euro.bank_public_key != bank.public_key {
            return Err(OfflineEuroError::Validation(TransactionResult::InvalidBankKeySignature));
        }
        euro.bank_key_signature.verify_message::<ChallengeHasher>(
            &to_compressed_bytes(&bank.public_key)?,
            &session.crs.ttp_public_key,
            g,
        )?;
        euro.amount_signature.verify_message::<ChallengeHasher>(
            &DigitalEuro::<E>::amount_message(euro.amount),
            &bank.public_key,
            g,
        )?;
        euro.timestamp_signature.verify_message::<ChallengeHasher>(
            &DigitalEuro::<E>::timestamp_message(
                &euro.serial_number,
                euro.amount,
                euro.withdrawal_timestamp,
            ),
            &bank.public_key,
            g,
        )?;
        Ok(())
    }

    pub fn send_digital_euro_to(&self, receiver: &str) -> Result<String, OfflineEuroError> {
        self.send(receiver, |wallet, rng, ctx| wallet.spend_euro(rng, ctx))
    }

    pub fn send_specific_digital_euro_to(
        &self,
        euro: &DigitalEuro<E>,
        receiver: &str,
    ) -> Result<String, OfflineEuroError> {
        self.send(receiver, |wallet, rng, ctx| {
            wallet.spend_specific_euro(rng, euro, ctx)
        })
    }

    /// Spend a coin that was already spent. Only for exercising fraud detection.
    pub fn double_spend_digital_euro_to(&self, receiver: &str) -> Result<String, OfflineEuroError> {
        self.send(receiver, |wallet, rng, ctx| wallet.double_spend_euro(rng, ctx))
    }

    pub fn double_spend_specific_digital_euro_to(
        &self,
        euro: &DigitalEuro<E>,
        receiver: &str,
    ) -> Result<String, OfflineEuroError> {
        self.send(receiver, |wallet, rng, ctx| {
            wallet.double_spend_specific_euro(rng, euro, ctx)
        })
    }

    /// Get randomization elements from `receiver`, spend a coin towards them and hand over the
    /// transfer. Returns the receiver's verdict.
    fn send<F>(&self, receiver: &str, spend: F) -> Result<String, OfflineEuroError>
    where
        F: FnOnce(
            &Wallet<E>,
            &mut StdRng,
            &SpendContext<'_, E>,
        ) -> Result<TransactionDetails<E>, OfflineEuroError>,
    {
        let session = self.core.session()?;
        let address = self.core.lookup_address(receiver)?;
        let public_key = session.keys.public_key;

        let elements: RandomizationElements<E> = match self
            .core
            .request(&address.name, Message::TransactionRandomnessRequest { public_key })?
        {
            Message::TransactionRandomnessReply { elements } if elements.is_valid() => elements,
            Message::TransactionRandomnessReply { .. } => {
                return Err(OfflineEuroError::MalformedPayload(
                    "trivial randomization elements",
                ))
            }
            _ => return Err(MisuseKind::UnexpectedReply.into()),
        };

        let ctx = SpendContext {
            keys: &session.keys,
            randomization_elements: &elements,
            group: &session.group,
            crs: &session.crs,
            to_bank: address.role == Role::Bank,
            now_ms: now_millis(),
        };
        let details = self
            .core
            .with_rng(|rng| spend(&self.wallet, rng, &ctx))?;
        debug!(
            name = %self.core.name(),
            to = %address.name,
            serial = %details.digital_euro.serial_number,
            "sending transaction"
        );

        match self.core.request(
            &address.name,
            Message::Transaction {
                details: Box::new(details),
            },
        )? {
            Message::TransactionResultReply { result } => {
                info!(name = %self.core.name(), to = %address.name, %result, "transaction answered");
                Ok(result)
            }
            _ => Err(MisuseKind::UnexpectedReply.into()),
        }
    }

    /// Keep a validated incoming coin under the randomness `t` handed to its sender
    pub(crate) fn receive(&self, details: &TransactionDetails<E>, t: E::ScalarField) -> String {
        let entry = self.wallet.add_to_wallet(details, t, now_millis());
        info!(
            name = %self.core.name(),
            serial = %entry.digital_euro.serial_number,
            amount = entry.digital_euro.amount,
            "received digital euro"
        );
        TransactionResult::ValidTransaction.description()
    }

    pub fn balance(&self) -> u64 {
        self.wallet.balance()
    }

    pub(crate) fn handle_message(
        &self,
        message: Message<E>,
    ) -> Result<Option<Message<E>>, OfflineEuroError> {
        match message {
            Message::RegistrationCompleted { success } => {
                let state = if success {
                    RegistrationState::Verified
                } else {
                    RegistrationState::Rejected
                };
                info!(name = %self.core.name(), ?state, "registration completed");
                self.registration().state = Some(state);
            }
            other => warn!(name = %self.core.name(), kind = other.kind(), "unexpected message"),
        }
        Ok(None)
    }

    /// Empty the wallet and forget pending randomness. The registration is kept.
    pub fn reset(&self) {
        self.core.reset();
        self.wallet.clear();
    }
}
