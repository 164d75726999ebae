//! Scriptable feeds and sensors for testing.
//!
//! Each mock hands out streams backed by unbounded channels. The test keeps a
//! clone of the mock and pushes items into whichever stream was started most
//! recently.

use super::{
    BeaconStream, Environment, EnvironmentError, FeedError, PeerFeed, PeerStream, ProximityFeed,
};
use async_trait::async_trait;
use beampair_types::{BeaconId, BeaconObservation, PeerIdentity};
use futures_util::stream::{self, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Notify};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn channel_stream<T: Send + 'static>(
    rx: mpsc::UnboundedReceiver<Result<T, FeedError>>,
) -> futures_util::stream::BoxStream<'static, Result<T, FeedError>> {
    stream::unfold(rx, |mut rx| async move {
        let item = rx.recv().await?;
        Some((item, rx))
    })
    .boxed()
}

// ===========================================
// Proximity feed
// ===========================================

/// Mock beacon feed.
#[derive(Debug, Default, Clone)]
pub struct MockProximityFeed {
    inner: Arc<Mutex<ProximityInner>>,
}

#[derive(Debug, Default)]
struct ProximityInner {
    starts: Vec<BeaconId>,
    live: Option<mpsc::UnboundedSender<Result<Vec<BeaconObservation>, FeedError>>>,
}

impl MockProximityFeed {
    /// Create a new mock feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a snapshot on the current stream. Returns false if no stream is live.
    pub fn emit(&self, beacons: Vec<BeaconObservation>) -> bool {
        let inner = lock(&self.inner);
        inner
            .live
            .as_ref()
            .is_some_and(|tx| tx.send(Ok(beacons)).is_ok())
    }

    /// Emit an error on the current stream.
    pub fn fail(&self, error: FeedError) -> bool {
        let inner = lock(&self.inner);
        inner
            .live
            .as_ref()
            .is_some_and(|tx| tx.send(Err(error)).is_ok())
    }

    /// End the current stream.
    pub fn finish(&self) {
        lock(&self.inner).live = None;
    }

    /// Beacons passed to each `start()`, in call order.
    pub fn starts(&self) -> Vec<BeaconId> {
        lock(&self.inner).starts.clone()
    }
}

impl ProximityFeed for MockProximityFeed {
    fn start(&self, beacon: BeaconId) -> BeaconStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = lock(&self.inner);
        inner.starts.push(beacon);
        inner.live = Some(tx);
        channel_stream(rx)
    }
}

// ===========================================
// Peer feed
// ===========================================

/// Mock peer discovery feed.
#[derive(Debug, Default, Clone)]
pub struct MockPeerFeed {
    inner: Arc<Mutex<PeerInner>>,
}

#[derive(Debug, Default)]
struct PeerInner {
    starts: Vec<String>,
    live: Option<mpsc::UnboundedSender<Result<PeerIdentity, FeedError>>>,
}

impl MockPeerFeed {
    /// Create a new mock feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a discovered peer on the current stream.
    pub fn discover(&self, peer: PeerIdentity) -> bool {
        let inner = lock(&self.inner);
        inner
            .live
            .as_ref()
            .is_some_and(|tx| tx.send(Ok(peer)).is_ok())
    }

    /// Emit an error on the current stream.
    pub fn fail(&self, error: FeedError) -> bool {
        let inner = lock(&self.inner);
        inner
            .live
            .as_ref()
            .is_some_and(|tx| tx.send(Err(error)).is_ok())
    }

    /// End the current stream.
    pub fn finish(&self) {
        lock(&self.inner).live = None;
    }

    /// Local identifiers passed to each `start()`, in call order.
    pub fn starts(&self) -> Vec<String> {
        lock(&self.inner).starts.clone()
    }
}

impl PeerFeed for MockPeerFeed {
    fn start(&self, local_identifier: &str) -> PeerStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = lock(&self.inner);
        inner.starts.push(local_identifier.to_string());
        inner.live = Some(tx);
        channel_stream(rx)
    }
}

// ===========================================
// Environment
// ===========================================

/// Mock posture sensors. Both read `Ok(false)` until configured.
#[derive(Debug, Clone)]
pub struct MockEnvironment {
    inner: Arc<Mutex<EnvironmentInner>>,
    released: Arc<Notify>,
}

#[derive(Debug)]
struct EnvironmentInner {
    horizontal: Result<bool, EnvironmentError>,
    proximity: Result<bool, EnvironmentError>,
    reads: usize,
    held: bool,
}

impl Default for MockEnvironment {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(EnvironmentInner {
                horizontal: Ok(false),
                proximity: Ok(false),
                reads: 0,
                held: false,
            })),
            released: Arc::new(Notify::new()),
        }
    }
}

impl MockEnvironment {
    /// Create a new mock with both sensors reading false.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the orientation reading.
    pub fn set_horizontal(&self, value: Result<bool, EnvironmentError>) {
        lock(&self.inner).horizontal = value;
    }

    /// Set the proximity sensor reading.
    pub fn set_sensed_proximity(&self, value: Result<bool, EnvironmentError>) {
        lock(&self.inner).proximity = value;
    }

    /// Total sensor reads so far, both sensors counted.
    pub fn reads(&self) -> usize {
        lock(&self.inner).reads
    }

    /// Make reads wait for [`release_reads`](Self::release_reads) before
    /// returning. The value is still taken when the read starts.
    pub fn hold_reads(&self) {
        lock(&self.inner).held = true;
    }

    /// Let held and future reads return.
    pub fn release_reads(&self) {
        lock(&self.inner).held = false;
        self.released.notify_waiters();
    }

    async fn sample(
        &self,
        pick: fn(&EnvironmentInner) -> Result<bool, EnvironmentError>,
    ) -> Result<bool, EnvironmentError> {
        let value = {
            let mut inner = lock(&self.inner);
            inner.reads += 1;
            pick(&inner)
        };
        loop {
            let released = self.released.notified();
            let held = lock(&self.inner).held;
            if !held {
                return value;
            }
            released.await;
        }
    }
}

#[async_trait]
impl Environment for MockEnvironment {
    async fn is_horizontal(&self) -> Result<bool, EnvironmentError> {
        self.sample(|inner| inner.horizontal.clone()).await
    }

    async fn sensed_proximity(&self) -> Result<bool, EnvironmentError> {
        self.sample(|inner| inner.proximity.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beampair_types::Proximity;

    #[tokio::test]
    async fn proximity_emissions_reach_latest_stream() {
        let feed = MockProximityFeed::new();
        assert!(!feed.emit(vec![]));

        let mut stream = feed.start(BeaconId::new(1, 1));
        let beacon = BeaconObservation::new(BeaconId::new(0, 0), Proximity::Near, 1.0, -50);
        assert!(feed.emit(vec![beacon.clone()]));

        assert_eq!(stream.next().await, Some(Ok(vec![beacon])));
        assert_eq!(feed.starts(), vec![BeaconId::new(1, 1)]);
    }

    #[tokio::test]
    async fn finish_ends_the_stream() {
        let feed = MockPeerFeed::new();
        let mut stream = feed.start("me");
        feed.discover(PeerIdentity::new("a"));
        feed.finish();

        assert_eq!(stream.next().await, Some(Ok(PeerIdentity::new("a"))));
        assert_eq!(stream.next().await, None);
        assert_eq!(feed.starts(), vec!["me".to_string()]);
    }

    #[tokio::test]
    async fn feed_errors_are_delivered() {
        let feed = MockPeerFeed::new();
        let mut stream = feed.start("me");
        feed.fail(FeedError::Unavailable("wifi off".into()));

        assert_eq!(
            stream.next().await,
            Some(Err(FeedError::Unavailable("wifi off".into())))
        );
    }

    #[tokio::test]
    async fn environment_readings_are_configurable() {
        let env = MockEnvironment::new();
        assert_eq!(env.is_horizontal().await, Ok(false));

        env.set_horizontal(Ok(true));
        env.set_sensed_proximity(Err(EnvironmentError("no sensor".into())));

        assert_eq!(env.is_horizontal().await, Ok(true));
        assert!(env.sensed_proximity().await.is_err());
        assert_eq!(env.reads(), 3);
    }

    #[tokio::test]
    async fn held_reads_return_the_value_taken_at_start() {
        let env = MockEnvironment::new();
        env.hold_reads();

        let read = tokio::spawn({
            let env = env.clone();
            async move { env.is_horizontal().await }
        });
        while env.reads() == 0 {
            tokio::task::yield_now().await;
        }
        env.set_horizontal(Ok(true));
        assert!(!read.is_finished());

        env.release_reads();
        assert_eq!(read.await.unwrap(), Ok(false));
    }
}
