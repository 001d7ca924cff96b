//! Identity verification of users registering at the TTP. The verification runs outside the
//! protocol: the TTP starts a session, hands the challenge to the user and later learns the outcome
//! by polling. Registration therefore moves through [`RegistrationState`] in two steps.

use crate::error::OfflineEuroError;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};
use uuid::Uuid;

/// Attribute holding the verified legal name
pub const LEGAL_NAME_ATTRIBUTE: &str = "family_name";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    PendingVerification,
    Verified,
    Rejected,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationSession {
    /// Where the subject proves its identity
    pub challenge_uri: String,
    pub transaction_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified(BTreeMap<String, String>),
    Pending,
    Failed(String),
}

pub trait IdentityVerification: Send + Sync {
    fn begin_verification(&self, subject: &str) -> Result<VerificationSession, OfflineEuroError>;

    fn poll_result(&self, transaction_id: &str) -> Result<VerificationStatus, OfflineEuroError>;
}

/// Verification decided in-process. With `auto_approve` every session is verified as soon as it
/// starts, otherwise it stays pending until [`InMemoryIdentityVerification::approve`] or
/// [`InMemoryIdentityVerification::reject`] is called.
#[derive(Debug, Default)]
pub struct InMemoryIdentityVerification {
    auto_approve: bool,
    sessions: Mutex<HashMap<String, (String, VerificationStatus)>>,
}

impl InMemoryIdentityVerification {
    pub fn new(auto_approve: bool) -> Self {
        Self {
            auto_approve,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, (String, VerificationStatus)>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn verified(subject: &str) -> VerificationStatus {
        let mut attributes = BTreeMap::new();
        attributes.insert(LEGAL_NAME_ATTRIBUTE.to_string(), subject.to_string());
        VerificationStatus::Verified(attributes)
    }

    /// Returns false for an unknown session
    pub fn approve(&self, transaction_id: &str) -> bool {
        match self.sessions().get_mut(transaction_id) {
            Some((subject, status)) => {
                *status = Self::verified(subject);
                true
            }
            None => false,
        }
    }

    pub fn reject(&self, transaction_id: &str, reason: &str) -> bool {
        match self.sessions().get_mut(transaction_id) {
            Some((_, status)) => {
                *status = VerificationStatus::Failed(reason.to_string());
                true
            }
            None => false,
        }
    }
}

impl IdentityVerification for InMemoryIdentityVerification {
    fn begin_verification(&self, subject: &str) -> Result<VerificationSession, OfflineEuroError> {
        let transaction_id = Uuid::new_v4().to_string();
        let status = if self.auto_approve {
            Self::verified(subject)
        } else {
            VerificationStatus::Pending
        };
        self.sessions()
            .insert(transaction_id.clone(), (subject.to_string(), status));
        Ok(VerificationSession {
            challenge_uri: format!("offline-euro://verify/{}", transaction_id),
            transaction_id,
        })
    }

    fn poll_result(&self, transaction_id: &str) -> Result<VerificationStatus, OfflineEuroError> {
        self.sessions()
            .get(transaction_id)
            .map(|(_, status)| status.clone())
            .ok_or_else(|| OfflineEuroError::UnknownIdentity(transaction_id.to_string()))
    }
}
