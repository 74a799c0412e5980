use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tokio::{
    sync::{Mutex, mpsc},
    task::yield_now,
};

use crate::{
    location::{Fix, Placemark},
    prelude::*,
    provider::{Geocoder, LocationProvider},
    registry::UpdateListener,
};

pub const FIX_LONDON: Fix = Fix { lat: 51.5, long: -0.12 };

/// Deterministic placemark derived from the fix itself, so tests can check
/// every accessor against the fix that produced it
pub fn placemark_for(fix: Fix) -> Placemark {
    let tag = format!("{:.3},{:.3}", fix.lat, fix.long);
    Placemark {
        city: Some(format!("city {tag}")),
        neighbourhood: Some(format!("neighbourhood {tag}")),
        state: Some(format!("state {tag}")),
        county: Some(format!("county {tag}")),
        country: Some(format!("country {tag}")),
        iso_country_code: Some(format!("iso {tag}")),
        post_code: Some(format!("post {tag}")),
        street: Some(format!("street {tag}")),
        house_number: Some(format!("house {tag}")),
    }
}

pub struct MockProvider {
    enabled: AtomicBool,
    on_demand: Mutex<Option<Fix>>,
    feed_tx: Mutex<Option<mpsc::Sender<Fix>>>,
    feed_rx: Mutex<mpsc::Receiver<Fix>>,
    filters: Mutex<Vec<Option<f64>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(8);
        Self {
            enabled: AtomicBool::new(true),
            on_demand: Mutex::new(None),
            feed_tx: Mutex::new(Some(tx)),
            feed_rx: Mutex::new(rx),
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// What the next one-shot request will produce
    pub async fn set_next_fix(&self, fix: Option<Fix>) {
        *self.on_demand.lock().await = fix;
    }

    /// Push an automatic fix, as if the device moved past the distance filter
    pub async fn push_fix(&self, fix: Fix) {
        let tx = self.feed_tx.lock().await;
        tx.as_ref()
            .expect("Feed already closed")
            .send(fix)
            .await
            .expect("Failed to push fix");
    }

    /// Close the automatic feed, ending any consuming loop
    pub async fn close_feed(&self) {
        self.feed_tx.lock().await.take();
    }

    pub async fn wait_for_feed_drained(&self) {
        loop {
            let drained = {
                let tx = self.feed_tx.lock().await;
                match tx.as_ref() {
                    Some(tx) => tx.capacity() == tx.max_capacity(),
                    None => true,
                }
            };
            if drained {
                break;
            }
            yield_now().await;
        }
    }

    /// Every distance filter applied so far, most recent last
    pub async fn recorded_filters(&self) -> Vec<Option<f64>> {
        self.filters.lock().await.clone()
    }

    pub async fn last_filter(&self) -> Option<Option<f64>> {
        self.filters.lock().await.last().copied()
    }
}

impl LocationProvider for MockProvider {
    fn services_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    async fn request_fix(&self) -> Option<Fix> {
        *self.on_demand.lock().await
    }

    async fn next_fix(&self) -> Option<Fix> {
        let mut rx = self.feed_rx.lock().await;
        rx.recv().await
    }

    async fn set_distance_filter(&self, meters: Option<f64>) -> Result {
        self.filters.lock().await.push(meters);
        Ok(())
    }
}

#[derive(Default)]
pub struct MockGeocoder {
    fail: AtomicBool,
}

impl MockGeocoder {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl Geocoder for MockGeocoder {
    async fn reverse(&self, fix: Fix) -> Option<Placemark> {
        if self.fail.load(Ordering::SeqCst) {
            None
        } else {
            Some(placemark_for(fix))
        }
    }
}

#[derive(Clone, Default)]
pub struct CountingListener(Arc<AtomicUsize>);

impl CountingListener {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl UpdateListener for CountingListener {
    fn location_updated(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}
