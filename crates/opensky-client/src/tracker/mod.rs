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

//! Marker reconciliation and viewport visibility.
//!
//! [`MarkerSet`] keeps exactly one marker per known aircraft and aligns a
//! [`RenderLayer`] with each new snapshot:
//!
//! - a new aircraft inside the viewport gets a marker, attached to the layer
//! - a known aircraft is moved and rotated; it is attached while inside the
//!   viewport and detached (but kept) while outside
//! - an aircraft missing from the snapshot loses its marker
//!
//! [`MarkerSet::rescan_visibility`] re-applies only the viewport test after
//! a pan or zoom, without waiting for the next snapshot.
//!
//! Known limitation: a state vector without a usable position is skipped and
//! does not count as a sighting, so a single bad reading destroys the
//! aircraft's marker and the next good one re-creates it.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::protocol::StateVector;
use crate::viewport::{Coordinate, GeoBounds};

/// Placeholder shown for aircraft without a callsign.
pub const NO_LABEL: &str = "N/A";

/// Stable handle of a marker slot. Slots are reused after destruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerId(usize);

impl MarkerId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Whether a marker is currently shown by the render layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    Attached,
    Detached,
}

/// Render state of one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub icao24: String,
    pub label: String,
    /// Last known position, updated even while detached.
    pub position: Coordinate,
    /// Rotation in degrees clockwise from north.
    pub heading: f64,
    pub attachment: Attachment,
}

impl Marker {
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attachment == Attachment::Attached
    }
}

/// Rendering backend driven by the reconciler.
///
/// The reconciler only issues these calls; it never owns the rendering
/// technology. `move_to`, `rotate` and `relabel` are only issued for
/// attached markers.
pub trait RenderLayer {
    /// Show a marker at its current position and heading.
    fn attach(&mut self, id: MarkerId, marker: &Marker);
    /// Hide a marker. The marker may be attached again later.
    fn detach(&mut self, id: MarkerId, marker: &Marker);
    fn move_to(&mut self, id: MarkerId, position: Coordinate);
    fn rotate(&mut self, id: MarkerId, heading: f64);
    /// The aircraft reported a new callsign.
    fn relabel(&mut self, id: MarkerId, label: &str);
}

/// Outcome of one [`MarkerSet::reconcile`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub attached: usize,
    pub detached: usize,
    pub destroyed: usize,
    /// State vectors skipped for lack of a usable position.
    pub skipped: usize,
}

/// Outcome of one [`MarkerSet::rescan_visibility`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub attached: usize,
    pub detached: usize,
}

/// Arena of markers keyed by aircraft identifier.
#[derive(Debug, Default)]
pub struct MarkerSet {
    slots: Vec<Option<Marker>>,
    index: HashMap<String, MarkerId>,
    free: Vec<MarkerId>,
}

impl MarkerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of known aircraft (attached or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn id_of(&self, icao24: &str) -> Option<MarkerId> {
        self.index.get(icao24).copied()
    }

    #[must_use]
    pub fn get(&self, icao24: &str) -> Option<&Marker> {
        self.id_of(icao24).and_then(|id| self.by_id(id))
    }

    #[must_use]
    pub fn by_id(&self, id: MarkerId) -> Option<&Marker> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (MarkerId, &Marker)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|m| (MarkerId(i), m)))
    }

    /// Number of markers currently attached to the render layer.
    #[must_use]
    pub fn attached_count(&self) -> usize {
        self.iter().filter(|(_, m)| m.is_attached()).count()
    }

    /// Identifiers of all attached markers.
    #[must_use]
    pub fn attached_keys(&self) -> HashSet<&str> {
        self.iter()
            .filter(|(_, m)| m.is_attached())
            .map(|(_, m)| m.icao24.as_str())
            .collect()
    }

    /// Align markers and render layer with a new snapshot.
    ///
    /// With `viewport = None` every aircraft with a usable position is
    /// visible.
    pub fn reconcile<L: RenderLayer>(
        &mut self,
        snapshot: &[StateVector],
        viewport: Option<&GeoBounds>,
        layer: &mut L,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(snapshot.len());

        for state in snapshot {
            let Some(position) = state.position() else {
                report.skipped += 1;
                continue;
            };

            let visible = viewport.map_or(true, |bounds| bounds.contains(position));
            let heading = state.heading();

            match self.id_of(&state.icao24) {
                Some(id) => {
                    let Some(marker) = self.slots[id.0].as_mut() else {
                        continue;
                    };
                    marker.position = position;
                    marker.heading = heading;
                    let relabeled = match state.label() {
                        Some(label) if marker.label != label => {
                            marker.label = label.to_string();
                            true
                        }
                        _ => false,
                    };
                    report.updated += 1;

                    match (visible, marker.attachment) {
                        (true, Attachment::Attached) => {
                            layer.move_to(id, position);
                            layer.rotate(id, heading);
                            if relabeled {
                                layer.relabel(id, &marker.label);
                            }
                        }
                        (true, Attachment::Detached) => {
                            marker.attachment = Attachment::Attached;
                            layer.attach(id, marker);
                            report.attached += 1;
                        }
                        (false, Attachment::Attached) => {
                            marker.attachment = Attachment::Detached;
                            layer.detach(id, marker);
                            report.detached += 1;
                        }
                        (false, Attachment::Detached) => {}
                    }
                }
                None if visible => {
                    let marker = Marker {
                        icao24: state.icao24.clone(),
                        label: state.label().unwrap_or(NO_LABEL).to_string(),
                        position,
                        heading,
                        attachment: Attachment::Attached,
                    };
                    let id = self.insert(marker);
                    if let Some(marker) = self.by_id(id) {
                        layer.attach(id, marker);
                    }
                    report.created += 1;
                    report.attached += 1;
                }
                None => {}
            }

            seen.insert(state.icao24.as_str());
        }

        let gone: Vec<String> = self
            .index
            .keys()
            .filter(|key| !seen.contains(key.as_str()))
            .cloned()
            .collect();

        for icao24 in gone {
            if self.remove(&icao24, layer) {
                report.destroyed += 1;
            }
        }

        debug!(
            "Reconciled {} states: {} created, {} updated, {} attached, {} detached, {} destroyed, {} skipped",
            snapshot.len(),
            report.created,
            report.updated,
            report.attached,
            report.detached,
            report.destroyed,
            report.skipped
        );

        report
    }

    /// Re-apply the viewport test to every marker at its last known
    /// position. Never creates or destroys markers.
    pub fn rescan_visibility<L: RenderLayer>(
        &mut self,
        viewport: &GeoBounds,
        layer: &mut L,
    ) -> VisibilityReport {
        let mut report = VisibilityReport::default();

        for (i, slot) in self.slots.iter_mut().enumerate() {
            let Some(marker) = slot.as_mut() else {
                continue;
            };
            let id = MarkerId(i);
            let visible = viewport.contains(marker.position);

            match (visible, marker.attachment) {
                (true, Attachment::Detached) => {
                    marker.attachment = Attachment::Attached;
                    layer.attach(id, marker);
                    report.attached += 1;
                }
                (false, Attachment::Attached) => {
                    marker.attachment = Attachment::Detached;
                    layer.detach(id, marker);
                    report.detached += 1;
                }
                _ => {}
            }
        }

        debug!(
            "Visibility rescan: {} attached, {} detached",
            report.attached, report.detached
        );

        report
    }

    /// Attach every detached marker (viewport culling switched off).
    pub fn attach_all<L: RenderLayer>(&mut self, layer: &mut L) -> VisibilityReport {
        self.rescan_visibility(&GeoBounds::new(
            Coordinate::new(-90.0, -180.0),
            Coordinate::new(90.0, 180.0),
        ), layer)
    }

    fn insert(&mut self, marker: Marker) -> MarkerId {
        let key = marker.icao24.clone();
        let id = if let Some(id) = self.free.pop() {
            self.slots[id.0] = Some(marker);
            id
        } else {
            self.slots.push(Some(marker));
            MarkerId(self.slots.len() - 1)
        };
        self.index.insert(key, id);
        id
    }

    fn remove<L: RenderLayer>(&mut self, icao24: &str, layer: &mut L) -> bool {
        let Some(id) = self.index.remove(icao24) else {
            return false;
        };
        let Some(marker) = self.slots[id.0].take() else {
            return false;
        };
        if marker.is_attached() {
            layer.detach(id, &marker);
        }
        self.free.push(id);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Render layer that records what is on screen.
    #[derive(Debug, Default)]
    struct RecordingLayer {
        shown: HashMap<MarkerId, (Coordinate, f64)>,
        labels: HashMap<MarkerId, String>,
        attach_calls: usize,
        detach_calls: usize,
    }

    impl RenderLayer for RecordingLayer {
        fn attach(&mut self, id: MarkerId, marker: &Marker) {
            assert!(!self.shown.contains_key(&id), "double attach of {id:?}");
            self.shown.insert(id, (marker.position, marker.heading));
            self.labels.insert(id, marker.label.clone());
            self.attach_calls += 1;
        }

        fn detach(&mut self, id: MarkerId, _marker: &Marker) {
            assert!(self.shown.remove(&id).is_some(), "detach of hidden {id:?}");
            self.labels.remove(&id);
            self.detach_calls += 1;
        }

        fn move_to(&mut self, id: MarkerId, position: Coordinate) {
            self.shown.get_mut(&id).expect("move of hidden marker").0 = position;
        }

        fn rotate(&mut self, id: MarkerId, heading: f64) {
            self.shown.get_mut(&id).expect("rotate of hidden marker").1 = heading;
        }

        fn relabel(&mut self, id: MarkerId, label: &str) {
            assert!(self.shown.contains_key(&id), "relabel of hidden {id:?}");
            self.labels.insert(id, label.to_string());
        }
    }

    fn state(icao: &str, lat: f64, lon: f64) -> StateVector {
        let mut v = StateVector::new(icao);
        v.latitude = Some(lat);
        v.longitude = Some(lon);
        v.true_track = Some(90.0);
        v
    }

    fn europe() -> GeoBounds {
        GeoBounds::new(Coordinate::new(35.0, -10.0), Coordinate::new(60.0, 30.0))
    }

    fn assert_attached_subset(markers: &MarkerSet, snapshot: &[StateVector], viewport: &GeoBounds) {
        let allowed: HashSet<&str> = snapshot
            .iter()
            .filter(|s| s.position().is_some_and(|p| viewport.contains(p)))
            .map(|s| s.icao24.as_str())
            .collect();
        for key in markers.attached_keys() {
            assert!(allowed.contains(key), "{key} attached but not visible");
        }
    }

    #[test]
    fn test_creates_only_visible_markers() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        let snapshot = vec![state("aaa001", 51.0, 0.5), state("bbb002", 40.0, -100.0)];

        let report = markers.reconcile(&snapshot, Some(&europe()), &mut layer);

        assert_eq!(report.created, 1);
        assert_eq!(markers.len(), 1);
        assert!(markers.get("aaa001").unwrap().is_attached());
        assert!(markers.get("bbb002").is_none());
        assert_eq!(layer.shown.len(), 1);
        assert_attached_subset(&markers, &snapshot, &europe());
    }

    #[test]
    fn test_without_viewport_everything_is_visible() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        let snapshot = vec![state("aaa001", 51.0, 0.5), state("bbb002", 40.0, -100.0)];

        let report = markers.reconcile(&snapshot, None, &mut layer);

        assert_eq!(report.created, 2);
        assert_eq!(markers.attached_count(), 2);
    }

    #[test]
    fn test_update_moves_and_rotates() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);

        let mut moved = state("aaa001", 52.0, 1.0);
        moved.true_track = Some(180.0);
        let report = markers.reconcile(&[moved], Some(&europe()), &mut layer);

        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 1);
        let id = markers.id_of("aaa001").unwrap();
        assert_eq!(layer.shown[&id], (Coordinate::new(52.0, 1.0), 180.0));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        let snapshot = vec![
            state("aaa001", 51.0, 0.5),
            state("bbb002", 48.8, 2.3),
            state("ccc003", 10.0, 10.0),
        ];

        markers.reconcile(&snapshot, Some(&europe()), &mut layer);
        let first: Vec<Marker> = markers.iter().map(|(_, m)| m.clone()).collect();
        let attach_calls = layer.attach_calls;

        let report = markers.reconcile(&snapshot, Some(&europe()), &mut layer);
        let second: Vec<Marker> = markers.iter().map(|(_, m)| m.clone()).collect();

        assert_eq!(first, second);
        assert_eq!(report.created, 0);
        assert_eq!(report.destroyed, 0);
        assert_eq!(layer.attach_calls, attach_calls);
        assert_eq!(layer.shown.len(), 2);
    }

    #[test]
    fn test_absent_aircraft_is_destroyed() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(
            &[state("aaa001", 51.0, 0.5), state("bbb002", 48.8, 2.3)],
            Some(&europe()),
            &mut layer,
        );

        let report = markers.reconcile(&[state("bbb002", 48.9, 2.4)], Some(&europe()), &mut layer);

        assert_eq!(report.destroyed, 1);
        assert!(markers.get("aaa001").is_none());
        assert_eq!(markers.len(), 1);
        assert_eq!(layer.shown.len(), 1);
    }

    #[test]
    fn test_leaving_viewport_detaches_but_keeps_marker() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);

        let report = markers.reconcile(&[state("aaa001", 51.0, -20.0)], Some(&europe()), &mut layer);

        assert_eq!(report.detached, 1);
        let marker = markers.get("aaa001").unwrap();
        assert!(!marker.is_attached());
        assert_eq!(marker.position, Coordinate::new(51.0, -20.0));
        assert!(layer.shown.is_empty());
    }

    #[test]
    fn test_invalid_position_is_skipped_and_not_seen() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);

        let mut lost = StateVector::new("aaa001");
        lost.latitude = Some(51.0);
        let report = markers.reconcile(&[lost], Some(&europe()), &mut layer);

        assert_eq!(report.skipped, 1);
        assert_eq!(report.destroyed, 1);
        assert!(markers.is_empty());
    }

    #[test]
    fn test_duplicate_identifiers_share_one_marker() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        let snapshot = vec![state("aaa001", 51.0, 0.5), state("aaa001", 51.1, 0.6)];

        markers.reconcile(&snapshot, Some(&europe()), &mut layer);

        assert_eq!(markers.len(), 1);
        assert_eq!(layer.shown.len(), 1);
        assert_eq!(markers.get("aaa001").unwrap().position, Coordinate::new(51.1, 0.6));
    }

    #[test]
    fn test_pan_out_and_back_keeps_marker_identity() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);
        let id = markers.id_of("aaa001").unwrap();

        let atlantic = europe().pan(0.0, -60.0);
        let report = markers.rescan_visibility(&atlantic, &mut layer);
        assert_eq!(report.detached, 1);
        assert_eq!(markers.len(), 1);
        assert!(!markers.get("aaa001").unwrap().is_attached());
        assert!(layer.shown.is_empty());

        let report = markers.rescan_visibility(&europe(), &mut layer);
        assert_eq!(report.attached, 1);
        assert_eq!(markers.id_of("aaa001"), Some(id));
        assert_eq!(layer.shown[&id].0, Coordinate::new(51.0, 0.5));
        assert_eq!(layer.attach_calls, 2);
    }

    #[test]
    fn test_rescan_never_creates_or_destroys() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);

        markers.rescan_visibility(&GeoBounds::world(), &mut layer);
        markers.rescan_visibility(&europe().pan(80.0, 0.0), &mut layer);
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_attach_all_shows_detached_markers() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        let snapshot = vec![state("aaa001", 51.0, 0.5)];
        markers.reconcile(&snapshot, Some(&europe()), &mut layer);
        markers.rescan_visibility(&europe().pan(0.0, 100.0), &mut layer);

        let report = markers.attach_all(&mut layer);
        assert_eq!(report.attached, 1);
        assert_eq!(markers.attached_count(), 1);
    }

    #[test]
    fn test_slots_are_reused() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], None, &mut layer);
        let first = markers.id_of("aaa001").unwrap();

        markers.reconcile(&[], None, &mut layer);
        assert!(markers.is_empty());

        markers.reconcile(&[state("bbb002", 48.0, 2.0)], None, &mut layer);
        assert_eq!(markers.id_of("bbb002"), Some(first));
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_late_callsign_reaches_layer() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);
        let id = markers.id_of("aaa001").unwrap();
        assert_eq!(layer.labels[&id], NO_LABEL);

        let mut named = state("aaa001", 51.1, 0.6);
        named.callsign = Some("WS100 ".to_string());
        markers.reconcile(&[named], Some(&europe()), &mut layer);

        assert_eq!(markers.get("aaa001").unwrap().label, "WS100");
        assert_eq!(layer.labels[&id], "WS100");
        assert_eq!(layer.attach_calls, 1);
    }

    #[test]
    fn test_callsign_change_while_hidden_shows_on_attach() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], Some(&europe()), &mut layer);
        let id = markers.id_of("aaa001").unwrap();

        let mut away = state("aaa001", 51.0, -20.0);
        away.callsign = Some("WS200".to_string());
        markers.reconcile(&[away], Some(&europe()), &mut layer);
        assert!(!layer.labels.contains_key(&id));

        markers.rescan_visibility(&GeoBounds::world(), &mut layer);
        assert_eq!(layer.labels[&id], "WS200");
    }

    #[test]
    fn test_missing_callsign_uses_placeholder() {
        let mut markers = MarkerSet::new();
        let mut layer = RecordingLayer::default();
        markers.reconcile(&[state("aaa001", 51.0, 0.5)], None, &mut layer);
        assert_eq!(markers.get("aaa001").unwrap().label, NO_LABEL);
    }
}
