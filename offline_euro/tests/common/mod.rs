#![allow(dead_code)]

use ark_bls12_381::Bls12_381;
use offline_euro::prelude::*;
use std::sync::{Arc, Once};
use test_utils::seeded_rng;

pub type P = Participant<Bls12_381>;

pub const TTP: &str = "TTP";
pub const BANK: &str = "Bank";

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Short timeouts and polling so failing paths finish quickly
pub fn test_config() -> ProtocolConfig {
    ProtocolConfig::from_toml_str(
        r#"
        ttp_name = "TTP"

        [network]
        reply_timeout_ms = 200

        [identity]
        max_polls = 3
        poll_backoff_ms = 5
        "#,
    )
    .unwrap()
}

pub struct World {
    pub network: Arc<LocalNetwork<Bls12_381>>,
    pub identity: Arc<InMemoryIdentityVerification>,
    pub ttp: Arc<P>,
    pub bank: Arc<P>,
    next_seed: u64,
}

impl World {
    /// TTP and a registered bank
    pub fn new(auto_approve: bool) -> Self {
        Self::with_ttp_config(auto_approve, test_config())
    }

    pub fn with_ttp_config(auto_approve: bool, ttp_config: ProtocolConfig) -> Self {
        init_tracing();
        let network = Arc::new(LocalNetwork::new());
        let identity = Arc::new(InMemoryIdentityVerification::new(auto_approve));
        let ttp = P::new_ttp(TTP, &network, ttp_config, identity.clone(), seeded_rng(0));
        let bank = P::new_bank(BANK, &network, test_config(), seeded_rng(1));
        bank.set_up().unwrap();
        Self {
            network,
            identity,
            ttp,
            bank,
            next_seed: 2,
        }
    }

    /// A user that fetched the parameters but whose registration is still pending
    pub fn pending_user(&mut self, name: &str) -> Arc<P> {
        let user = P::new_user(name, &self.network, test_config(), seeded_rng(self.next_seed));
        self.next_seed += 1;
        user.set_up().unwrap();
        user
    }

    /// A set up user whose identity was verified
    pub fn user(&mut self, name: &str) -> Arc<P> {
        let user = self.pending_user(name);
        user.as_user().unwrap().submit_verification().unwrap();
        assert_eq!(
            user.as_user().unwrap().registration_state(),
            Some(RegistrationState::Verified)
        );
        user
    }

    pub fn ttp(&self) -> &Ttp<Bls12_381> {
        self.ttp.as_ttp().unwrap()
    }

    pub fn bank(&self) -> &Bank<Bls12_381> {
        self.bank.as_bank().unwrap()
    }
}
