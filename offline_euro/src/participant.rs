//! Protocol participants. [`Participant`] is what the network delivers messages to; it routes each
//! message to the role that handles it. State every role needs lives in [`ParticipantCore`].

use crate::{
    bank::Bank,
    communication::{CommunicationChannel, LocalNetwork},
    config::ProtocolConfig,
    error::{MisuseKind, OfflineEuroError},
    identity::IdentityVerification,
    keys::KeyPair,
    message::{Message, Role},
    repository::InMemoryRepository,
    transaction::{validate, TransactionDetails, TransactionResult},
    ttp::Ttp,
    user::User,
    wallet::Wallet,
};
use ark_ec::pairing::Pairing;
use ark_std::rand::rngs::StdRng;
use ark_std::UniformRand;
use ecash_crypto_utils::BilinearGroup;
use groth_sahai::{Crs, RandomizationElements};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
};
use tracing::{debug, warn};

pub const RANDOMNESS_NOT_FOUND: &str = "Randomness Not found!";

/// Public parameters agreed with the TTP and the participant's key pair
pub struct Session<E: Pairing> {
    pub group: BilinearGroup<E>,
    pub crs: Crs<E>,
    pub keys: KeyPair<E>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address<E: Pairing> {
    pub name: String,
    pub role: Role,
    pub public_key: E::G1Affine,
}

pub struct ParticipantCore<E: Pairing> {
    name: String,
    role: Role,
    session: RwLock<Option<Arc<Session<E>>>>,
    /// Receiver side `t` per sender public key, taken by the sender's transaction
    randomness: Mutex<HashMap<E::G1Affine, E::ScalarField>>,
    address_book: Mutex<HashMap<String, Address<E>>>,
    channel: Arc<dyn CommunicationChannel<E>>,
    pub(crate) config: ProtocolConfig,
    rng: Mutex<StdRng>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<E: Pairing> ParticipantCore<E> {
    pub fn new(
        name: impl Into<String>,
        role: Role,
        channel: Arc<dyn CommunicationChannel<E>>,
        config: ProtocolConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            name: name.into(),
            role,
            session: RwLock::new(None),
            randomness: Mutex::new(HashMap::new()),
            address_book: Mutex::new(HashMap::new()),
            channel,
            config,
            rng: Mutex::new(rng),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Run `f` with the participant's randomness source. Must not be held across a network call.
    pub(crate) fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        f(&mut lock(&self.rng))
    }

    pub fn session(&self) -> Result<Arc<Session<E>>, OfflineEuroError> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(OfflineEuroError::ProtocolMisuse(MisuseKind::NotSetUp))
    }

    pub fn is_set_up(&self) -> bool {
        self.session().is_ok()
    }

    pub fn public_key(&self) -> Option<E::G1Affine> {
        self.session().ok().map(|s| s.keys.public_key)
    }

    /// Adopt `group` and `crs` and generate a key pair for them. A participant that was already set
    /// up keeps its session.
    pub(crate) fn establish_session(
        &self,
        group: BilinearGroup<E>,
        crs: Crs<E>,
    ) -> Arc<Session<E>> {
        let keys = self.with_rng(|rng| KeyPair::generate(rng, &group.g));
        self.install_session(Session { group, crs, keys })
    }

    pub(crate) fn install_session(&self, new: Session<E>) -> Arc<Session<E>> {
        let mut session = self.session.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = session.as_ref() {
            return existing.clone();
        }
        let established = Arc::new(new);
        *session = Some(established.clone());
        established
    }

    /// Send `message` to `to` and wait for the reply
    pub fn request(&self, to: &str, message: Message<E>) -> Result<Message<E>, OfflineEuroError> {
        if to == self.name {
            return Err(MisuseKind::SelfAddressed.into());
        }
        let kind = message.kind();
        let key = self.channel.send(&self.name, to, message)?;
        self.channel
            .await_reply(&key, self.config.reply_timeout())
            .map_err(|e| {
                if let OfflineEuroError::Timeout { waited, .. } = &e {
                    warn!(from = %self.name, to, kind, ?waited, "no reply");
                }
                e
            })
    }

    /// Send a message without waiting for an answer. Any answer is dropped.
    pub fn notify(&self, to: &str, message: Message<E>) -> Result<(), OfflineEuroError> {
        let key = self.channel.send(&self.name, to, message)?;
        self.channel.discard_reply(&key);
        Ok(())
    }

    /// Fetch the group and CRS from the TTP and generate the key pair
    pub fn fetch_public_parameters(&self) -> Result<Arc<Session<E>>, OfflineEuroError> {
        if let Ok(session) = self.session() {
            return Ok(session);
        }
        let ttp = self.config.ttp_name.clone();
        match self.request(&ttp, Message::GroupDescriptionCrsRequest)? {
            Message::GroupDescriptionCrsReply { group, crs } => {
                if !group.is_valid() || !crs.is_valid(&group) {
                    return Err(OfflineEuroError::MalformedPayload(
                        "invalid group description or crs",
                    ));
                }
                debug!(name = %self.name, "received public parameters");
                Ok(self.establish_session(group, crs))
            }
            _ => Err(MisuseKind::UnexpectedReply.into()),
        }
    }

    /// Resolve `name` through the local address book, asking the TTP on a miss
    pub fn lookup_address(&self, name: &str) -> Result<Address<E>, OfflineEuroError> {
        if let Some(address) = lock(&self.address_book).get(name) {
            return Ok(address.clone());
        }
        let ttp = self.config.ttp_name.clone();
        let reply = self.request(
            &ttp,
            Message::AddressRequest {
                name: name.to_string(),
            },
        )?;
        match reply {
            Message::AddressReply {
                name: found,
                role,
                public_key,
            } if found == name => {
                let address = Address {
                    name: found,
                    role,
                    public_key,
                };
                self.remember_address(address.clone());
                Ok(address)
            }
            Message::AddressReply { .. } | Message::AddressNotFound { .. } => {
                Err(OfflineEuroError::UnknownIdentity(name.to_string()))
            }
            _ => Err(MisuseKind::UnexpectedReply.into()),
        }
    }

    pub fn remember_address(&self, address: Address<E>) {
        lock(&self.address_book).insert(address.name.clone(), address);
    }

    /// Pick a fresh `t` for a transfer from `sender` and publish its elements. Replaces any earlier
    /// randomness for the same sender.
    pub fn generate_randomization_elements(
        &self,
        sender: E::G1Affine,
    ) -> Result<RandomizationElements<E>, OfflineEuroError> {
        let session = self.session()?;
        let t = self.with_rng(|rng| E::ScalarField::rand(rng));
        lock(&self.randomness).insert(sender, t);
        Ok(RandomizationElements::derive(&t, &session.crs))
    }

    /// Take the randomness handed out to `sender`. At most once per generated randomness.
    pub fn take_randomness(&self, sender: &E::G1Affine) -> Option<E::ScalarField> {
        lock(&self.randomness).remove(sender)
    }

    pub fn reset(&self) {
        lock(&self.randomness).clear();
        lock(&self.address_book).clear();
    }
}

/// A participant of any role. The network delivers to this and it dispatches on the role.
pub enum Participant<E: Pairing> {
    Bank(Bank<E>),
    User(User<E>),
    Ttp(Ttp<E>),
}

impl<E: Pairing> Participant<E> {
    /// A TTP with in-memory stores, joined to `network`. It is set up on creation.
    pub fn new_ttp(
        name: impl Into<String>,
        network: &Arc<LocalNetwork<E>>,
        config: ProtocolConfig,
        identity: Arc<dyn IdentityVerification>,
        rng: StdRng,
    ) -> Arc<Self> {
        let core = ParticipantCore::new(name, Role::Ttp, network.clone(), config, rng);
        let ttp = Ttp::new(
            core,
            Arc::new(InMemoryRepository::new()),
            Arc::new(InMemoryRepository::new()),
            identity,
        );
        Self::join(network, Participant::Ttp(ttp))
    }

    /// A bank with an in-memory deposit store, joined to `network`
    pub fn new_bank(
        name: impl Into<String>,
        network: &Arc<LocalNetwork<E>>,
        config: ProtocolConfig,
        rng: StdRng,
    ) -> Arc<Self> {
        let core = ParticipantCore::new(name, Role::Bank, network.clone(), config, rng);
        let bank = Bank::new(core, Arc::new(InMemoryRepository::new()));
        Self::join(network, Participant::Bank(bank))
    }

    /// A user with an in-memory wallet, joined to `network`
    pub fn new_user(
        name: impl Into<String>,
        network: &Arc<LocalNetwork<E>>,
        config: ProtocolConfig,
        rng: StdRng,
    ) -> Arc<Self> {
        let fees = config.fees;
        let core = ParticipantCore::new(name, Role::User, network.clone(), config, rng);
        let wallet = Wallet::new(Arc::new(InMemoryRepository::new()), fees);
        Self::join(network, Participant::User(User::new(core, wallet)))
    }

    fn join(network: &LocalNetwork<E>, participant: Self) -> Arc<Self> {
        let participant = Arc::new(participant);
        network.join(&participant);
        participant
    }

    pub fn core(&self) -> &ParticipantCore<E> {
        match self {
            Participant::Bank(bank) => bank.core(),
            Participant::User(user) => user.core(),
            Participant::Ttp(ttp) => ttp.core(),
        }
    }

    pub fn name(&self) -> &str {
        self.core().name()
    }

    pub fn role(&self) -> Role {
        self.core().role()
    }

    pub fn public_key(&self) -> Option<E::G1Affine> {
        self.core().public_key()
    }

    pub fn as_bank(&self) -> Option<&Bank<E>> {
        match self {
            Participant::Bank(bank) => Some(bank),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User<E>> {
        match self {
            Participant::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn as_ttp(&self) -> Option<&Ttp<E>> {
        match self {
            Participant::Ttp(ttp) => Some(ttp),
            _ => None,
        }
    }

    /// Fetch public parameters and register at the TTP. Nothing to do for the TTP.
    pub fn set_up(&self) -> Result<(), OfflineEuroError> {
        match self {
            Participant::Bank(bank) => bank.set_up(),
            Participant::User(user) => user.set_up(),
            Participant::Ttp(_) => Ok(()),
        }
    }

    /// Answer `message` from `from`. `None` for messages without a reply.
    pub fn handle_message(
        &self,
        from: &str,
        message: Message<E>,
    ) -> Result<Option<Message<E>>, OfflineEuroError> {
        debug!(to = %self.name(), from, kind = message.kind(), "handling message");
        let reply = match (self, message) {
            (_, Message::TransactionRandomnessRequest { public_key }) => {
                let elements = self.core().generate_randomization_elements(public_key)?;
                Some(Message::TransactionRandomnessReply { elements })
            }
            (_, Message::Transaction { details }) => Some(Message::TransactionResultReply {
                result: self.on_received_transaction(&details)?,
            }),
            (Participant::Bank(bank), message) => bank.handle_message(message)?,
            (Participant::User(user), message) => user.handle_message(message)?,
            (Participant::Ttp(ttp), message) => ttp.handle_message(from, message)?,
        };
        Ok(reply)
    }

    /// Check an incoming transfer against the randomness handed to its sender and let the role
    /// take the coin. Returns the description sent back to the sender.
    pub fn on_received_transaction(
        &self,
        details: &TransactionDetails<E>,
    ) -> Result<String, OfflineEuroError> {
        let core = self.core();
        let session = core.session()?;
        let t = match core.take_randomness(&details.spender_public_key) {
            Some(t) => t,
            None => {
                warn!(name = %core.name(), "transaction without randomness for its sender");
                return Ok(RANDOMNESS_NOT_FOUND.to_string());
            }
        };

        let (bank_public_key, is_deposit) = match self {
            Participant::Bank(_) => (session.keys.public_key, true),
            _ => (details.digital_euro.bank_public_key, false),
        };
        let mut result = validate(
            details,
            &bank_public_key,
            &session.group,
            &session.crs,
            is_deposit,
        );
        if result.is_valid() && details.current_transaction_proof.proof.theta1 != session.group.g_mul(&-t) {
            result = TransactionResult::RandomizationMismatch;
        }
        if !result.is_valid() {
            warn!(name = %core.name(), serial = %details.digital_euro.serial_number, ?result, "rejected transaction");
            return Ok(result.description());
        }

        match self {
            Participant::Bank(bank) => Ok(bank
                .deposit_euro(
                    details
                        .digital_euro
                        .with_proof(details.current_transaction_proof.proof.clone()),
                )
                .description()),
            Participant::User(user) => Ok(user.receive(details, t)),
            Participant::Ttp(_) => Ok(format!(
                "{} does not accept digital euros",
                core.name()
            )),
        }
    }

    /// Clear the participant's stores. Keys and public parameters are kept.
    pub fn reset(&self) {
        match self {
            Participant::Bank(bank) => bank.reset(),
            Participant::User(user) => user.reset(),
            Participant::Ttp(ttp) => ttp.reset(),
        }
    }
}
