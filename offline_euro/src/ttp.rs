//! The trusted third party. It generates the CRS and alone keeps its trapdoor, keeps the directory
//! of participants, registers banks and users, and names the spender behind two proofs of a coin
//! that was spent twice.

use crate::{
    error::OfflineEuroError,
    identity::{IdentityVerification, RegistrationState, VerificationStatus, LEGAL_NAME_ATTRIBUTE},
    keys::KeyPair,
    message::{Message, Role},
    participant::{Address, ParticipantCore, Session},
    repository::{Record, Repository},
    ChallengeHasher, Signature,
};
use ark_ec::pairing::Pairing;
use ecash_crypto_utils::{serde_utils::to_compressed_bytes, BilinearGroup};
use groth_sahai::{extract_identity, Crs, CrsTrapdoor, GrothSahaiProof};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    thread,
};
use tracing::{debug, info, warn};

/// A user whose identity was verified
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredUser<E: Pairing> {
    pub name: String,
    pub public_key: E::G1Affine,
    pub legal_name: Option<String>,
}

impl<E: Pairing> Record for RegisteredUser<E> {
    type Descriptor = E::G1Affine;

    fn descriptor(&self) -> Self::Descriptor {
        self.public_key
    }
}

/// A user whose identity verification is running
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRegistration<E: Pairing> {
    pub transaction_id: String,
    pub name: String,
    pub public_key: E::G1Affine,
    pub state: RegistrationState,
}

impl<E: Pairing> Record for PendingRegistration<E> {
    type Descriptor = String;

    fn descriptor(&self) -> Self::Descriptor {
        self.transaction_id.clone()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FraudVerdict<E: Pairing> {
    DoubleSpender(RegisteredUser<E>),
    NoDoubleSpending,
}

impl<E: Pairing> FraudVerdict<E> {
    pub fn description(&self) -> String {
        match self {
            FraudVerdict::DoubleSpender(user) => format!(
                "Double spending detected. Double spender is {} with PK: {}",
                user.name,
                to_compressed_bytes(&user.public_key)
                    .map(hex::encode)
                    .unwrap_or_default()
            ),
            FraudVerdict::NoDoubleSpending => "No double spending detected".into(),
        }
    }
}

pub struct Ttp<E: Pairing> {
    core: ParticipantCore<E>,
    trapdoor: CrsTrapdoor<E::ScalarField>,
    directory: Mutex<HashMap<String, Address<E>>>,
    registered_users: Arc<dyn Repository<RegisteredUser<E>>>,
    pending: Arc<dyn Repository<PendingRegistration<E>>>,
    identity: Arc<dyn IdentityVerification>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E: Pairing> Ttp<E> {
    /// Generates the group, the TTP's keys and the CRS
    pub fn new(
        core: ParticipantCore<E>,
        registered_users: Arc<dyn Repository<RegisteredUser<E>>>,
        pending: Arc<dyn Repository<PendingRegistration<E>>>,
        identity: Arc<dyn IdentityVerification>,
    ) -> Self {
        let (group, keys, crs, trapdoor) = core.with_rng(|rng| {
            let group = BilinearGroup::<E>::generate_using_rng(rng);
            let keys = KeyPair::<E>::generate(rng, &group.g);
            let (crs, trapdoor) = Crs::generate(rng, &group, keys.public_key);
            (group, keys, crs, trapdoor)
        });
        let session = core.install_session(Session { group, crs, keys });
        let ttp = Self {
            core,
            trapdoor,
            directory: Mutex::new(HashMap::new()),
            registered_users,
            pending,
            identity,
        };
        ttp.add_to_directory(Address {
            name: ttp.core.name().to_string(),
            role: Role::Ttp,
            public_key: session.keys.public_key,
        });
        ttp
    }

    pub fn core(&self) -> &ParticipantCore<E> {
        &self.core
    }

    fn add_to_directory(&self, address: Address<E>) {
        lock(&self.directory).insert(address.name.clone(), address);
    }

    pub fn directory(&self) -> Vec<Address<E>> {
        lock(&self.directory).values().cloned().collect()
    }

    /// Sign the bank's key so that users can check coins came from a bank the TTP knows
    pub fn register_bank(
        &self,
        name: &str,
        public_key: E::G1Affine,
    ) -> Result<Signature<E>, OfflineEuroError> {
        let session = self.core.session()?;
        let key_bytes = to_compressed_bytes(&public_key)?;
        let signature = self.core.with_rng(|rng| {
            Signature::<E>::new::<_, ChallengeHasher>(
                rng,
                &key_bytes,
                session.keys.secret_key(),
                &session.group.g,
            )
        })?;
        self.add_to_directory(Address {
            name: name.to_string(),
            role: Role::Bank,
            public_key,
        });
        info!(bank = name, "bank registered");
        Ok(signature)
    }

    /// Start the identity verification of a user. The user is reachable by name right away but only
    /// counts as registered once verified.
    pub fn begin_user_registration(
        &self,
        name: &str,
        public_key: E::G1Affine,
    ) -> Result<Message<E>, OfflineEuroError> {
        let session = self.identity.begin_verification(name)?;
        self.add_to_directory(Address {
            name: name.to_string(),
            role: Role::User,
            public_key,
        });
        self.pending.insert(PendingRegistration {
            transaction_id: session.transaction_id.clone(),
            name: name.to_string(),
            public_key,
            state: RegistrationState::PendingVerification,
        });
        info!(user = name, transaction_id = %session.transaction_id, "user registration pending");
        Ok(Message::RegistrationPending {
            transaction_id: session.transaction_id,
            challenge_uri: session.challenge_uri,
        })
    }

    /// Ask once for the outcome of one pending registration. The user is told the outcome once
    /// there is one.
    pub fn poll_registration(
        &self,
        transaction_id: &str,
    ) -> Result<RegistrationState, OfflineEuroError> {
        let pending = self
            .pending
            .query_by_descriptor(&transaction_id.to_string())
            .into_iter()
            .next()
            .ok_or_else(|| OfflineEuroError::UnknownIdentity(transaction_id.to_string()))?;
        match self.identity.poll_result(transaction_id)? {
            VerificationStatus::Verified(attributes) => {
                let user = RegisteredUser {
                    name: pending.name.clone(),
                    public_key: pending.public_key,
                    legal_name: attributes.get(LEGAL_NAME_ATTRIBUTE).cloned(),
                };
                self.finish_registration(&pending, Some(user));
                Ok(RegistrationState::Verified)
            }
            VerificationStatus::Failed(reason) => {
                warn!(user = %pending.name, %reason, "identity verification failed");
                self.finish_registration(&pending, None);
                Ok(RegistrationState::Rejected)
            }
            VerificationStatus::Pending => {
                debug!(user = %pending.name, "verification pending");
                Ok(RegistrationState::PendingVerification)
            }
        }
    }

    /// Poll all pending registrations, in up to `identity.max_polls` rounds `poll_backoff_ms` apart.
    /// Stops early once none is pending. Returns the last state of every registration polled.
    pub fn poll_pending_registrations(&self) -> Vec<(String, RegistrationState)> {
        let identity_config = self.core.config().identity;
        let mut states = Vec::<(String, String, RegistrationState)>::new();
        for round in 0..identity_config.max_polls {
            let pending = self.pending.all();
            if pending.is_empty() {
                break;
            }
            if round > 0 {
                thread::sleep(self.core.config().poll_backoff());
            }
            for p in pending {
                let state = self
                    .poll_registration(&p.transaction_id)
                    .unwrap_or(RegistrationState::PendingVerification);
                match states.iter_mut().find(|(id, _, _)| *id == p.transaction_id) {
                    Some(entry) => entry.2 = state,
                    None => states.push((p.transaction_id, p.name, state)),
                }
            }
        }
        states
            .into_iter()
            .map(|(_, name, state)| (name, state))
            .collect()
    }

    fn finish_registration(&self, pending: &PendingRegistration<E>, user: Option<RegisteredUser<E>>) {
        self.pending.remove_by_descriptor(&pending.transaction_id);
        let success = user.is_some();
        if let Some(user) = user {
            info!(user = %user.name, "user registered");
            self.registered_users.insert(user);
        }
        let notified = self.core.notify(
            &pending.name,
            Message::RegistrationCompleted { success },
        );
        if let Err(e) = notified {
            warn!(user = %pending.name, error = ?e, "could not notify user of registration");
        }
    }

    pub fn registered_users(&self) -> Vec<RegisteredUser<E>> {
        self.registered_users.all()
    }

    pub fn pending_registrations(&self) -> Vec<PendingRegistration<E>> {
        self.pending.all()
    }

    /// The registered user whose key is committed to in `proof`
    pub fn get_user_from_proof(&self, proof: &GrothSahaiProof<E>) -> Option<RegisteredUser<E>> {
        let public_key = extract_identity(proof, &self.trapdoor);
        self.registered_users
            .query_by_descriptor(&public_key)
            .into_iter()
            .next()
    }

    /// Both proofs were made by the same registered user iff the coin was spent twice by them
    pub fn get_user_from_proofs(
        &self,
        first: &GrothSahaiProof<E>,
        second: &GrothSahaiProof<E>,
    ) -> FraudVerdict<E> {
        let verdict = match (self.get_user_from_proof(first), self.get_user_from_proof(second)) {
            (Some(a), Some(b)) if a == b => FraudVerdict::DoubleSpender(a),
            _ => FraudVerdict::NoDoubleSpending,
        };
        info!(verdict = %verdict.description(), "fraud control");
        verdict
    }

    pub(crate) fn handle_message(
        &self,
        from: &str,
        message: Message<E>,
    ) -> Result<Option<Message<E>>, OfflineEuroError> {
        let reply = match message {
            Message::GroupDescriptionCrsRequest => {
                let session = self.core.session()?;
                Some(Message::GroupDescriptionCrsReply {
                    group: session.group.clone(),
                    crs: session.crs.clone(),
                })
            }
            Message::AddressRequest { name } => Some(match lock(&self.directory).get(&name) {
                Some(address) => Message::AddressReply {
                    name: address.name.clone(),
                    role: address.role,
                    public_key: address.public_key,
                },
                None => Message::AddressNotFound { name },
            }),
            Message::RegistrationRequest {
                name,
                role,
                public_key,
            } => {
                if name != from {
                    warn!(from, %name, "registration for another participant");
                }
                match role {
                    Role::Bank => Some(Message::BankRegistrationReply {
                        signature: self.register_bank(&name, public_key)?,
                    }),
                    Role::User => Some(self.begin_user_registration(&name, public_key)?),
                    Role::Ttp => {
                        warn!(from, "refusing to register another TTP");
                        None
                    }
                }
            }
            // Polled once, a still open verification is left to `poll_pending_registrations`
            Message::VerificationSubmitted { transaction_id } => {
                let state = self.poll_registration(&transaction_id)?;
                debug!(from, ?state, "verification submitted");
                None
            }
            Message::FraudControlRequest {
                first_proof,
                second_proof,
            } => Some(Message::FraudControlReply {
                result: self
                    .get_user_from_proofs(&first_proof, &second_proof)
                    .description(),
            }),
            other => {
                warn!(from, kind = other.kind(), "unexpected message");
                None
            }
        };
        Ok(reply)
    }

    /// Forget all registrations. Group, CRS and keys stay.
    pub fn reset(&self) {
        self.core.reset();
        self.registered_users.clear();
        self.pending.clear();
        let own = lock(&self.directory).remove(self.core.name());
        lock(&self.directory).clear();
        if let Some(own) = own {
            self.add_to_directory(own);
        }
    }
}
