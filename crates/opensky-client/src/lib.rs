// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Client library for OpenSky-style aircraft state feeds.
//!
//! This library polls a feed of aircraft state vectors and keeps a set of
//! map markers in step with it, showing only the aircraft inside the current
//! viewport. Its layers can be used independently or composed together:
//!
//! - **Protocol layer**: decoding of positional state arrays into named records
//! - **Tracker layer**: marker reconciliation and viewport visibility
//! - **Poller**: fixed-interval fetching with stale-result protection
//! - **Presentation**: unit conversion for a selected aircraft and search
//!
//! # Quick Start
//!
//! Use [`LiveMap`] together with a [`Poller`] for full-stack operation:
//!
//! ```no_run
//! use opensky_client::{HttpStateSource, LiveMap, PollConfig, Poller, DEFAULT_FEED_URL};
//! use opensky_client::tracker::{Marker, MarkerId, RenderLayer};
//! use opensky_client::viewport::{Coordinate, GeoBounds};
//! use std::time::Duration;
//!
//! struct PrintLayer;
//!
//! impl RenderLayer for PrintLayer {
//!     fn attach(&mut self, _id: MarkerId, marker: &Marker) {
//!         println!("+ {} at {:?}", marker.label, marker.position);
//!     }
//!     fn detach(&mut self, _id: MarkerId, marker: &Marker) {
//!         println!("- {}", marker.label);
//!     }
//!     fn move_to(&mut self, _id: MarkerId, _position: Coordinate) {}
//!     fn rotate(&mut self, _id: MarkerId, _heading: f64) {}
//!     fn relabel(&mut self, _id: MarkerId, label: &str) {
//!         println!("~ {label}");
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let source = HttpStateSource::new(DEFAULT_FEED_URL, Duration::from_secs(10)).unwrap();
//!     let mut poller = Poller::spawn(source, PollConfig::default());
//!
//!     let europe = GeoBounds::new(Coordinate::new(35.0, -10.0), Coordinate::new(60.0, 30.0));
//!     let mut map = LiveMap::new(PrintLayer, Some(europe));
//!
//!     while let Some(event) = poller.recv().await {
//!         map.handle_event(event);
//!         println!("{} aircraft in view", map.markers().attached_count());
//!     }
//! }
//! ```
//!
//! # Using Individual Layers
//!
//! ## Protocol Layer Only
//!
//! ```
//! use opensky_client::protocol::{Protocol, StatesParser};
//!
//! let mut parser = StatesParser::new();
//! let doc = br#"{"time": 1700000000, "states": [
//!     ["abc123", "WS100   ", "Canada", null, 1700000000, -114.01, 51.13,
//!      10668.0, false, 230.5, 87.3, 0.0]
//! ]}"#;
//! if let Ok(Some(snapshot)) = parser.parse(doc) {
//!     println!("Got {} aircraft", snapshot.len());
//! }
//! ```
//!
//! ## Presentation Only
//!
//! ```
//! use opensky_client::{present, StateVector};
//!
//! let mut state = StateVector::new("abc123");
//! state.baro_altitude = Some(1000.0);
//! assert_eq!(present(&state).altitude_ft, Some(3281));
//! ```

pub mod debounce;
pub mod poller;
pub mod present;
pub mod protocol;
pub mod search;
pub mod tracker;
pub mod viewport;

use log::{debug, warn};

pub use debounce::Debounce;
pub use poller::{
    FeedError, HttpStateSource, PollConfig, PollEvent, PollSequence, Poller, StateSource,
    DEFAULT_FEED_URL,
};
pub use present::{present, DisplayRecord};
pub use protocol::{ParseError, Protocol, Snapshot, StateVector, StatesParser};
pub use search::{find, SearchError};
pub use tracker::{MarkerSet, ReconcileReport, RenderLayer, VisibilityReport};
pub use viewport::{Coordinate, GeoBounds};

/// Message shown while the most recent poll has failed.
pub const FEED_ERROR_MESSAGE: &str = "Error loading flight data. Please try again later.";

/// Default zoom level used when focusing on a search result.
pub const DEFAULT_FOCUS_ZOOM: u8 = 8;

/// Result of focusing the map on a searched aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub icao24: String,
    /// Position the map was centered on, if the aircraft had one.
    pub position: Option<Coordinate>,
    pub record: DisplayRecord,
    /// Whether the aircraft's marker is on screen after re-centering.
    pub marker_attached: bool,
}

/// Live map state: the latest snapshot, the markers and the render layer.
///
/// All mutation happens through `&mut self` on a single task; no locking
/// is involved.
pub struct LiveMap<R> {
    markers: MarkerSet,
    layer: R,
    viewport: GeoBounds,
    viewport_aware: bool,
    screen: (u32, u32),
    snapshot: Snapshot,
    last_error: Option<String>,
    discarded_polls: u64,
}

impl<R> std::fmt::Debug for LiveMap<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveMap")
            .field("markers", &self.markers.len())
            .field("viewport", &self.viewport)
            .field("viewport_aware", &self.viewport_aware)
            .field("snapshot_len", &self.snapshot.len())
            .finish_non_exhaustive()
    }
}

impl<R: RenderLayer> LiveMap<R> {
    /// Create a live map. With `viewport = None` every aircraft is shown.
    #[must_use]
    pub fn new(layer: R, viewport: Option<GeoBounds>) -> Self {
        Self {
            markers: MarkerSet::new(),
            layer,
            viewport_aware: viewport.is_some(),
            viewport: viewport.unwrap_or_else(GeoBounds::world),
            screen: (1280, 720),
            snapshot: Snapshot::default(),
            last_error: None,
            discarded_polls: 0,
        }
    }

    /// Apply one poller event. Returns the reconcile report for snapshots.
    pub fn handle_event(&mut self, event: PollEvent) -> Option<ReconcileReport> {
        match event {
            PollEvent::Snapshot { snapshot, .. } => Some(self.apply_snapshot(snapshot)),
            PollEvent::NoData { seq } => {
                debug!("Poll #{} returned no states, keeping current markers", seq);
                None
            }
            PollEvent::Failed { error, .. } => {
                self.record_failure(error);
                None
            }
            PollEvent::Discarded { .. } => {
                self.discarded_polls += 1;
                None
            }
        }
    }

    /// Replace the snapshot wholesale and reconcile markers against it.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> ReconcileReport {
        self.snapshot = snapshot;
        self.last_error = None;
        let viewport = self.viewport_aware.then_some(&self.viewport);
        self.markers
            .reconcile(&self.snapshot.states, viewport, &mut self.layer)
    }

    /// Record a failed poll. The previous snapshot and markers stay.
    pub fn record_failure(&mut self, error: String) {
        warn!("Feed unavailable: {}", error);
        self.last_error = Some(error);
    }

    /// Move the viewport and re-check marker visibility immediately.
    pub fn set_viewport(&mut self, viewport: GeoBounds) -> VisibilityReport {
        self.viewport = viewport;
        if self.viewport_aware {
            self.markers.rescan_visibility(&self.viewport, &mut self.layer)
        } else {
            VisibilityReport::default()
        }
    }

    /// Switch viewport culling on or off.
    pub fn set_viewport_aware(&mut self, aware: bool) -> VisibilityReport {
        self.viewport_aware = aware;
        if aware {
            self.markers.rescan_visibility(&self.viewport, &mut self.layer)
        } else {
            self.markers.attach_all(&mut self.layer)
        }
    }

    /// Screen size in pixels used to size the viewport on [`LiveMap::focus`].
    pub fn set_screen_size(&mut self, width_px: u32, height_px: u32) {
        self.screen = (width_px, height_px);
    }

    /// Search the latest snapshot by callsign or ICAO24.
    pub fn find(&self, term: &str) -> Result<&StateVector, SearchError> {
        search::find(&self.snapshot.states, term)
    }

    /// Details of an aircraft in the latest snapshot.
    #[must_use]
    pub fn select(&self, icao24: &str) -> Option<DisplayRecord> {
        self.snapshot
            .states
            .iter()
            .find(|s| s.icao24.eq_ignore_ascii_case(icao24))
            .map(present)
    }

    /// Search for an aircraft and center the map on it at `zoom`.
    pub fn focus(&mut self, term: &str, zoom: u8) -> Result<Focus, SearchError> {
        let state = self.find(term)?.clone();
        let position = state.position();

        if let Some(center) = position {
            let (width, height) = self.screen;
            self.set_viewport(GeoBounds::for_zoom(center, zoom, width, height));
        }

        let marker_attached = self
            .markers
            .get(&state.icao24)
            .is_some_and(tracker::Marker::is_attached);

        Ok(Focus {
            record: present(&state),
            icao24: state.icao24,
            position,
            marker_attached,
        })
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    #[must_use]
    pub fn layer(&self) -> &R {
        &self.layer
    }

    pub fn layer_mut(&mut self) -> &mut R {
        &mut self.layer
    }

    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Feed timestamp of the latest snapshot.
    #[must_use]
    pub fn snapshot_time(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.snapshot.time
    }

    #[must_use]
    pub fn viewport(&self) -> &GeoBounds {
        &self.viewport
    }

    #[must_use]
    pub fn is_viewport_aware(&self) -> bool {
        self.viewport_aware
    }

    /// Error of the most recent poll, cleared by the next good snapshot.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// User-facing message while the feed is failing.
    #[must_use]
    pub fn status_message(&self) -> Option<&'static str> {
        self.last_error.as_ref().map(|_| FEED_ERROR_MESSAGE)
    }

    /// Number of poll results dropped because a newer one had arrived.
    #[must_use]
    pub fn discarded_polls(&self) -> u64 {
        self.discarded_polls
    }
}
