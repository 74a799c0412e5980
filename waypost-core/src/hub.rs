use chrono::Utc;
use log::{debug, warn};
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    interval::UpdateInterval,
    location::{Fix, LocationSnapshot, Placemark, UtcDT},
    provider::{Geocoder, LocationProvider},
    registry::{
        GuardKind, IntervalGuard, IntervalTable, ListenerGuard, ListenerTable, Revocation,
        RevocationRx, RevocationTx, UpdateListener,
    },
};

type RevocationQueue = (RevocationTx, Mutex<RevocationRx>);

struct HubState {
    listeners: ListenerTable,
    intervals: IntervalTable,
    snapshot: Option<LocationSnapshot>,
}

/// Facade over a platform location service and its geocoding companion.
///
/// The hub multiplexes any number of consumers over one underlying service:
/// it fans location updates out to named listeners, arbitrates the shared
/// distance filter across competing requesters (most precise request wins),
/// and caches the latest fix together with its reverse geocode for cheap
/// reads.
///
/// Construct one with [LocationHub::new] and spawn [LocationHub::main_loop]
/// to receive automatic updates; on-demand use via
/// [LocationHub::request_update] works without the loop.
pub struct LocationHub<P: LocationProvider, G: Geocoder> {
    inner: RwLock<HubState>,
    provider: P,
    geocoder: G,
    revocations: RevocationQueue,
    cancel: CancellationToken,
}

impl<P: LocationProvider, G: Geocoder> LocationHub<P, G> {
    pub fn new(provider: P, geocoder: G) -> Self {
        let (revoke_tx, revoke_rx) = mpsc::unbounded_channel();
        Self {
            inner: RwLock::new(HubState {
                listeners: ListenerTable::new(),
                intervals: IntervalTable::new(),
                snapshot: None,
            }),
            provider,
            geocoder,
            revocations: (revoke_tx, Mutex::new(revoke_rx)),
            cancel: CancellationToken::new(),
        }
    }

    // == Listener registration ==

    /// Register `listener` under `id`, replacing whatever callback was
    /// previously registered with that identifier. Reverse DNS notation such
    /// as "com.foo.bar" keeps identifiers from colliding between consumers.
    ///
    /// Each registered listener is invoked exactly once per update cycle, in
    /// no particular order, on whatever task drove the update. Dropping the
    /// returned guard deregisters; [ListenerGuard::detach] opts out of that
    /// for callers that prefer to [LocationHub::unregister] themselves.
    pub async fn register(
        &self,
        id: &str,
        listener: impl UpdateListener + 'static,
    ) -> ListenerGuard {
        self.drain_revocations().await;
        let generation = {
            let mut inner = self.inner.write().await;
            inner.listeners.insert(id, Box::new(listener))
        };
        ListenerGuard::new(id.to_owned(), generation, self.revocations.0.clone())
    }

    /// Remove the callback registered under `id`. Unknown identifiers are a
    /// silent no-op.
    pub async fn unregister(&self, id: &str) {
        self.drain_revocations().await;
        self.inner.write().await.listeners.remove(id);
    }

    // == Interval arbitration ==

    /// Record that `requester` wants location data refreshed at `interval`,
    /// replacing any interval it requested before. The filter actually applied
    /// to the platform is the most precise interval across all current
    /// requesters, so a coarser request here never slows anyone else down.
    ///
    /// Dropping the returned guard withdraws the request;
    /// [IntervalGuard::detach] opts out for callers that prefer to call
    /// [LocationHub::remove_interval_requester] themselves.
    pub async fn set_update_interval(
        &self,
        requester: &str,
        interval: UpdateInterval,
    ) -> IntervalGuard {
        self.drain_revocations().await;
        let (generation, before, after) = {
            let mut inner = self.inner.write().await;
            let before = inner.intervals.effective();
            let generation = inner.intervals.set(requester, interval);
            (generation, before, inner.intervals.effective())
        };
        self.refresh_distance_filter(before, after).await;
        IntervalGuard::new(requester.to_owned(), generation, self.revocations.0.clone())
    }

    /// Withdraw `requester`'s interval request, possibly relaxing the filter
    /// applied to the platform. Unknown requesters are a silent no-op.
    pub async fn remove_interval_requester(&self, requester: &str) {
        self.drain_revocations().await;
        let (before, after) = {
            let mut inner = self.inner.write().await;
            let before = inner.intervals.effective();
            inner.intervals.remove(requester);
            (before, inner.intervals.effective())
        };
        self.refresh_distance_filter(before, after).await;
    }

    // == Updates ==

    /// Ask the platform for an immediate one-shot fix. Does nothing when
    /// location services are disabled or the platform produces no fix, and in
    /// those cases no listener is notified.
    pub async fn request_update(&self) {
        self.drain_revocations().await;
        if !self.provider.services_enabled() {
            debug!("Location services disabled, ignoring update request");
            return;
        }
        if let Some(fix) = self.provider.request_fix().await {
            self.apply_fix(fix).await;
        }
    }

    /// Whether the user has location services enabled
    pub fn is_services_enabled(&self) -> bool {
        self.provider.services_enabled()
    }

    // == Cached data ==

    /// The latest fix and geocode, or None before the first successful update
    pub async fn snapshot(&self) -> Option<LocationSnapshot> {
        self.inner.read().await.snapshot.clone()
    }

    pub async fn current_latitude(&self) -> Option<f64> {
        self.inner.read().await.snapshot.as_ref().map(|s| s.fix.lat)
    }

    pub async fn current_longitude(&self) -> Option<f64> {
        self.inner.read().await.snapshot.as_ref().map(|s| s.fix.long)
    }

    /// When the cached fix was recorded, for consumers that care how stale
    /// their data is
    pub async fn last_fix_time(&self) -> Option<UtcDT> {
        self.inner.read().await.snapshot.as_ref().map(|s| s.recorded_at)
    }

    /// Address components for the cached fix. Empty when reverse geocoding
    /// failed for the latest update
    pub async fn placemark(&self) -> Option<Placemark> {
        self.inner
            .read()
            .await
            .snapshot
            .as_ref()
            .map(|s| s.placemark.clone())
    }

    pub async fn city(&self) -> Option<String> {
        self.placemark_field(|p| &p.city).await
    }

    pub async fn neighbourhood(&self) -> Option<String> {
        self.placemark_field(|p| &p.neighbourhood).await
    }

    pub async fn state(&self) -> Option<String> {
        self.placemark_field(|p| &p.state).await
    }

    pub async fn county(&self) -> Option<String> {
        self.placemark_field(|p| &p.county).await
    }

    pub async fn country(&self) -> Option<String> {
        self.placemark_field(|p| &p.country).await
    }

    pub async fn iso_country_code(&self) -> Option<String> {
        self.placemark_field(|p| &p.iso_country_code).await
    }

    pub async fn post_code(&self) -> Option<String> {
        self.placemark_field(|p| &p.post_code).await
    }

    pub async fn street(&self) -> Option<String> {
        self.placemark_field(|p| &p.street).await
    }

    pub async fn house_number(&self) -> Option<String> {
        self.placemark_field(|p| &p.house_number).await
    }

    async fn placemark_field(
        &self,
        field: impl FnOnce(&Placemark) -> &Option<String>,
    ) -> Option<String> {
        let inner = self.inner.read().await;
        inner
            .snapshot
            .as_ref()
            .and_then(|s| field(&s.placemark).clone())
    }

    // == Main loop ==

    /// Main loop of the hub, consumes automatic fixes pushed by the provider
    /// and guard revocations. Runs until [LocationHub::shutdown] is called or
    /// the provider closes its fix stream.
    pub async fn main_loop(&self) {
        let mut revocations = self.revocations.1.lock().await;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    break;
                }

                Some(revocation) = revocations.recv() => {
                    self.apply_revocation(revocation).await;
                }

                fix = self.provider.next_fix() => {
                    match fix {
                        Some(fix) => self.apply_fix(fix).await,
                        // Provider shut down, no more automatic fixes will come
                        None => break,
                    }
                }
            }
        }

        // Nobody is consuming updates anymore, keep the platform from
        // producing them
        if let Err(why) = self.provider.set_distance_filter(None).await {
            warn!("Failed to disable the distance filter on shutdown: {why:?}");
        }
    }

    /// Stop [LocationHub::main_loop]
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    // == Internals ==

    async fn apply_fix(&self, fix: Fix) {
        let placemark = self.geocoder.reverse(fix).await.unwrap_or_default();
        let snapshot = LocationSnapshot {
            fix,
            recorded_at: Utc::now(),
            placemark,
        };

        // Swap first, notify second: a listener reading the hub from its
        // callback must see the snapshot that triggered it
        {
            let mut inner = self.inner.write().await;
            inner.snapshot = Some(snapshot);
        }

        let inner = self.inner.read().await;
        inner.listeners.notify_all();
    }

    async fn apply_revocation(&self, revocation: Revocation) {
        match revocation.kind {
            GuardKind::Listener => {
                let mut inner = self.inner.write().await;
                inner
                    .listeners
                    .remove_generation(&revocation.id, revocation.generation);
            }
            GuardKind::Interval => {
                let (before, after) = {
                    let mut inner = self.inner.write().await;
                    let before = inner.intervals.effective();
                    inner
                        .intervals
                        .remove_generation(&revocation.id, revocation.generation);
                    (before, inner.intervals.effective())
                };
                self.refresh_distance_filter(before, after).await;
            }
        }
    }

    /// Drain queued guard revocations when the main loop isn't around to do
    /// it. The loop holds the receiver lock for its entire life, so contention
    /// here means the queue is already being consumed.
    async fn drain_revocations(&self) {
        let Ok(mut revocations) = self.revocations.1.try_lock() else {
            return;
        };
        while let Ok(revocation) = revocations.try_recv() {
            self.apply_revocation(revocation).await;
        }
    }

    async fn refresh_distance_filter(&self, before: UpdateInterval, after: UpdateInterval) {
        if before == after {
            return;
        }
        debug!("Effective update interval changed from {before:?} to {after:?}");
        if let Err(why) = self.provider.set_distance_filter(after.distance_meters()).await {
            warn!("Failed to apply distance filter for {after:?}: {why:?}");
        }
    }
}
