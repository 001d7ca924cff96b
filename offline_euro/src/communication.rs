//! Message transport between participants.
//!
//! [`LocalNetwork`] connects participants living in one process. Every message is encoded and
//! decoded on the way so participants only ever see what could have crossed a real wire, and is
//! handled synchronously by the receiver. A reply, or the receiver's failure to produce one, is
//! parked under the correlation key of the request until the sender collects or discards it.

use crate::{
    codec::WireFormat,
    error::OfflineEuroError,
    message::Message,
    participant::Participant,
};
use ark_ec::pairing::Pairing;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock, Weak,
    },
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Identifies the reply to one sent message
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CorrelationKey {
    pub id: u64,
    pub peer: String,
}

pub trait CommunicationChannel<E: Pairing>: Send + Sync {
    /// Deliver `message` from `from` to the participant named `to`. Fails with
    /// [`OfflineEuroError::UnknownIdentity`] if nobody by that name is known.
    fn send(
        &self,
        from: &str,
        to: &str,
        message: Message<E>,
    ) -> Result<CorrelationKey, OfflineEuroError>;

    /// Wait at most `timeout` for the reply to the message identified by `key`. Fails with
    /// [`OfflineEuroError::PeerFailed`] if the receiver could not handle the message.
    fn await_reply(
        &self,
        key: &CorrelationKey,
        timeout: Duration,
    ) -> Result<Message<E>, OfflineEuroError>;

    /// Drop whatever arrives for `key`, for messages nobody waits on
    fn discard_reply(&self, key: &CorrelationKey);
}

enum Delivery {
    Reply(Vec<u8>),
    Failed(String),
}

struct Peer<E: Pairing> {
    participant: Weak<Participant<E>>,
    /// Messages to a detached peer are lost
    detached: bool,
}

pub struct LocalNetwork<E: Pairing> {
    peers: RwLock<HashMap<String, Peer<E>>>,
    replies: Mutex<HashMap<u64, Delivery>>,
    reply_ready: Condvar,
    next_id: AtomicU64,
}

impl<E: Pairing> Default for LocalNetwork<E> {
    fn default() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            replies: Mutex::new(HashMap::new()),
            reply_ready: Condvar::new(),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<E: Pairing> LocalNetwork<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `participant` reachable under its name. The network does not keep it alive.
    pub fn join(&self, participant: &Arc<Participant<E>>) {
        let name = participant.name().to_string();
        debug!(%name, role = ?participant.role(), "joined network");
        self.peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name,
                Peer {
                    participant: Arc::downgrade(participant),
                    detached: false,
                },
            );
    }

    /// Keep the name known but drop everything sent to it, as for a peer that went offline
    pub fn detach(&self, name: &str) -> bool {
        self.set_detached(name, true)
    }

    pub fn reattach(&self, name: &str) -> bool {
        self.set_detached(name, false)
    }

    fn set_detached(&self, name: &str, detached: bool) -> bool {
        match self
            .peers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(name)
        {
            Some(peer) => {
                peer.detached = detached;
                true
            }
            None => false,
        }
    }

    fn replies(&self) -> MutexGuard<'_, HashMap<u64, Delivery>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn deliver(&self, key: &CorrelationKey, delivery: Delivery) {
        self.replies().insert(key.id, delivery);
        self.reply_ready.notify_all();
    }

    /// Replies and failures not yet collected
    pub fn pending_replies(&self) -> usize {
        self.replies().len()
    }
}

impl<E: Pairing> CommunicationChannel<E> for LocalNetwork<E> {
    fn send(
        &self,
        from: &str,
        to: &str,
        message: Message<E>,
    ) -> Result<CorrelationKey, OfflineEuroError> {
        let (participant, detached) = {
            let peers = self.peers.read().unwrap_or_else(PoisonError::into_inner);
            let peer = peers
                .get(to)
                .ok_or_else(|| OfflineEuroError::UnknownIdentity(to.to_string()))?;
            (peer.participant.upgrade(), peer.detached)
        };
        let key = CorrelationKey {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            peer: to.to_string(),
        };
        let bytes = message.to_wire_bytes()?;
        let participant = match participant {
            Some(p) if !detached => p,
            _ => {
                debug!(from, to, kind = message.kind(), "peer unreachable, message dropped");
                return Ok(key);
            }
        };

        let received = Message::from_wire_bytes(&bytes)?;
        // No lock is held here, handlers may send messages themselves
        match participant.handle_message(from, received) {
            Ok(Some(reply)) => self.deliver(&key, Delivery::Reply(reply.to_wire_bytes()?)),
            Ok(None) => {}
            Err(e) => {
                warn!(from, to, kind = message.kind(), error = ?e, "message handling failed");
                self.deliver(&key, Delivery::Failed(format!("{:?}", e)));
            }
        }
        Ok(key)
    }

    fn await_reply(
        &self,
        key: &CorrelationKey,
        timeout: Duration,
    ) -> Result<Message<E>, OfflineEuroError> {
        let start = Instant::now();
        let mut replies = self.replies();
        loop {
            match replies.remove(&key.id) {
                Some(Delivery::Reply(bytes)) => {
                    drop(replies);
                    return Message::from_wire_bytes(&bytes);
                }
                Some(Delivery::Failed(reason)) => {
                    return Err(OfflineEuroError::PeerFailed {
                        peer: key.peer.clone(),
                        reason,
                    })
                }
                None => {}
            }
            let waited = start.elapsed();
            if waited >= timeout {
                return Err(OfflineEuroError::Timeout {
                    peer: key.peer.clone(),
                    waited,
                });
            }
            replies = self
                .reply_ready
                .wait_timeout(replies, timeout - waited)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    // Handling is done by the time `send` returns, so there is nothing still to arrive
    fn discard_reply(&self, key: &CorrelationKey) {
        self.replies().remove(&key.id);
    }
}
