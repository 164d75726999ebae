//! Mock transport for testing.
//!
//! Allows queueing responses per peer and capturing sent profiles for
//! verification.

use super::{Transport, TransportError};
use async_trait::async_trait;
use beampair_types::{PeerIdentity, UserProfile};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Mock transport for testing.
///
/// Clones share state, so a test can keep one handle while the session
/// owns another.
#[derive(Debug, Default, Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
    arrived: Arc<Notify>,
}

#[derive(Debug, Default)]
struct MockTransportInner {
    sent: Vec<(PeerIdentity, UserProfile)>,
    receive_requests: Vec<PeerIdentity>,
    responses: HashMap<String, VecDeque<UserProfile>>,
    hold_receives: bool,
    fail_next_send: Option<String>,
    fail_next_recv: Option<String>,
}

impl MockTransport {
    /// Create a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a profile to be returned by the next `receive()` from `from`.
    pub fn queue_response(&self, from: &PeerIdentity, profile: UserProfile) {
        self.inner()
            .responses
            .entry(from.name.clone())
            .or_default()
            .push_back(profile);
        self.arrived.notify_waiters();
    }

    /// Make `receive()` wait for a queued response instead of returning
    /// `ConnectionClosed` when nothing is queued.
    pub fn hold_receives(&self) {
        self.inner().hold_receives = true;
    }

    /// Get all profiles that were sent, with their recipients.
    pub fn sent(&self) -> Vec<(PeerIdentity, UserProfile)> {
        self.inner().sent.clone()
    }

    /// Peers that `receive()` was called for, in call order.
    pub fn receive_requests(&self) -> Vec<PeerIdentity> {
        self.inner().receive_requests.clone()
    }

    /// Cause the next send() to fail with the given error.
    pub fn fail_next_send(&self, error: &str) {
        self.inner().fail_next_send = Some(error.to_string());
    }

    /// Cause the next receive() to fail with the given error.
    pub fn fail_next_recv(&self, error: &str) {
        self.inner().fail_next_recv = Some(error.to_string());
        self.arrived.notify_waiters();
    }

    /// Clear all state (sent log, queues, forced failures).
    pub fn reset(&self) {
        *self.inner() = MockTransportInner::default();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, profile: &UserProfile, to: &PeerIdentity) -> Result<(), TransportError> {
        let mut inner = self.inner();

        // Check for forced failure
        if let Some(error) = inner.fail_next_send.take() {
            return Err(TransportError::SendFailed(error));
        }

        inner.sent.push((to.clone(), profile.clone()));
        Ok(())
    }

    async fn receive(&self, from: &PeerIdentity) -> Result<UserProfile, TransportError> {
        self.inner().receive_requests.push(from.clone());

        loop {
            let arrived = self.arrived.notified();
            {
                let mut inner = self.inner();

                // Check for forced failure
                if let Some(error) = inner.fail_next_recv.take() {
                    return Err(TransportError::ReceiveFailed(error));
                }

                if let Some(profile) = inner
                    .responses
                    .get_mut(&from.name)
                    .and_then(VecDeque::pop_front)
                {
                    return Ok(profile);
                }

                if !inner.hold_receives {
                    return Err(TransportError::ConnectionClosed);
                }
            }
            arrived.await;
        }
    }
}
