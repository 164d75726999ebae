//! Bidirectional profile exchange.
//!
//! One exchange is one concurrent send and receive with a single peer. Both
//! halves must succeed. Whichever fails first cancels the other and becomes
//! the reported cause.

use std::sync::Arc;
use std::time::Duration;

use beampair_types::{ExchangeError, PeerIdentity, UserProfile};
use tracing::{info, warn};

use crate::transport::{Transport, TransportError};

/// Runs profile exchanges over a [`Transport`].
#[derive(Clone)]
pub struct ExchangeCoordinator {
    transport: Arc<dyn Transport>,
    timeout: Option<Duration>,
}

impl ExchangeCoordinator {
    /// Create a coordinator with no timeout.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            timeout: None,
        }
    }

    /// Bound the whole exchange by `timeout`. `None` waits forever.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `local` to `peer` and receive theirs, concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::Transport`] carrying the first failure, or a
    /// timeout if the configured bound elapses. There are no retries.
    pub async fn exchange(
        &self,
        local: &UserProfile,
        peer: &PeerIdentity,
    ) -> Result<UserProfile, ExchangeError> {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.send_and_receive(local, peer))
                .await
                .unwrap_or(Err(TransportError::Timeout)),
            None => self.send_and_receive(local, peer).await,
        };

        match result {
            Ok(profile) => {
                info!("Exchanged profiles with {}", peer);
                Ok(profile)
            }
            Err(e) => {
                warn!("Exchange with {} failed: {}", peer, e);
                Err(ExchangeError::Transport(e.to_string()))
            }
        }
    }

    async fn send_and_receive(
        &self,
        local: &UserProfile,
        peer: &PeerIdentity,
    ) -> Result<UserProfile, TransportError> {
        let send = self.transport.send(local, peer);
        let receive = self.transport.receive(peer);
        let ((), profile) = tokio::try_join!(send, receive)?;
        Ok(profile)
    }
}

impl std::fmt::Debug for ExchangeCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeCoordinator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
