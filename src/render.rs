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

//! Text rendering of the markers currently on the map.

use std::collections::HashMap;
use std::fmt::Write;

use log::debug;
use opensky_client::tracker::{Marker, MarkerId, RenderLayer};
use opensky_client::Coordinate;

/// A marker as drawn on the console map
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnMarker {
    pub icao24: String,
    pub label: String,
    pub position: Coordinate,
    pub heading: f64,
}

/// Render layer that keeps the attached markers for printing
#[derive(Debug, Default)]
pub struct ConsoleLayer {
    drawn: HashMap<MarkerId, DrawnMarker>,
}

impl ConsoleLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.drawn.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawn.is_empty()
    }

    /// Visible aircraft sorted by label, at most `limit` rows
    pub fn render_table(&self, limit: usize) -> String {
        let mut rows: Vec<&DrawnMarker> = self.drawn.values().collect();
        rows.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.icao24.cmp(&b.icao24)));

        let mut out = format!(
            "{:<10} {:<8} {:>9} {:>10} {:>5}\n",
            "CALLSIGN", "ICAO24", "LAT", "LON", "HDG"
        );
        for marker in rows.iter().take(limit) {
            let _ = writeln!(
                out,
                "{:<10} {:<8} {:>9.4} {:>10.4} {:>5.0}",
                marker.label, marker.icao24, marker.position.lat, marker.position.lon, marker.heading
            );
        }
        if rows.len() > limit {
            let _ = writeln!(out, "... {} more", rows.len() - limit);
        }
        out
    }
}

impl RenderLayer for ConsoleLayer {
    fn attach(&mut self, id: MarkerId, marker: &Marker) {
        debug!("Marker {} ({}) attached", marker.label, marker.icao24);
        self.drawn.insert(
            id,
            DrawnMarker {
                icao24: marker.icao24.clone(),
                label: marker.label.clone(),
                position: marker.position,
                heading: marker.heading,
            },
        );
    }

    fn detach(&mut self, id: MarkerId, marker: &Marker) {
        debug!("Marker {} ({}) detached", marker.label, marker.icao24);
        self.drawn.remove(&id);
    }

    fn move_to(&mut self, id: MarkerId, position: Coordinate) {
        if let Some(drawn) = self.drawn.get_mut(&id) {
            drawn.position = position;
        }
    }

    fn rotate(&mut self, id: MarkerId, heading: f64) {
        if let Some(drawn) = self.drawn.get_mut(&id) {
            drawn.heading = heading;
        }
    }

    fn relabel(&mut self, id: MarkerId, label: &str) {
        if let Some(drawn) = self.drawn.get_mut(&id) {
            debug!("Marker {} is now {}", drawn.icao24, label);
            drawn.label = label.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opensky_client::{GeoBounds, MarkerSet, StateVector};

    fn state(icao: &str, callsign: &str, lat: f64, lon: f64) -> StateVector {
        let mut v = StateVector::new(icao);
        v.callsign = Some(callsign.to_string());
        v.latitude = Some(lat);
        v.longitude = Some(lon);
        v.true_track = Some(90.0);
        v
    }

    #[test]
    fn test_layer_follows_reconcile() {
        let mut layer = ConsoleLayer::new();
        let mut markers = MarkerSet::new();
        let bounds = GeoBounds::new(Coordinate::new(40.0, -10.0), Coordinate::new(60.0, 10.0));

        markers.reconcile(
            &[state("aaa001", "BAW1", 51.0, 0.5), state("bbb002", "AFR2", 48.8, 2.3)],
            Some(&bounds),
            &mut layer,
        );
        assert_eq!(layer.len(), 2);

        markers.reconcile(&[state("aaa001", "BAW1", 52.0, 0.5)], Some(&bounds), &mut layer);
        assert_eq!(layer.len(), 1);
        let drawn = layer.drawn.values().next().unwrap();
        assert!((drawn.position.lat - 52.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_table_is_sorted_and_limited() {
        let mut layer = ConsoleLayer::new();
        let mut markers = MarkerSet::new();
        markers.reconcile(
            &[
                state("ccc003", "ZZZ9", 10.0, 10.0),
                state("aaa001", "AAA1", 11.0, 11.0),
                state("bbb002", "MMM5", 12.0, 12.0),
            ],
            None,
            &mut layer,
        );

        let table = layer.render_table(2);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("CALLSIGN"));
        assert!(lines[1].starts_with("AAA1"));
        assert!(lines[2].starts_with("MMM5"));
        assert_eq!(lines[3], "... 1 more");
    }

    #[test]
    fn test_late_callsign_shows_in_table() {
        let mut layer = ConsoleLayer::new();
        let mut markers = MarkerSet::new();
        let mut unnamed = StateVector::new("aaa001");
        unnamed.latitude = Some(51.0);
        unnamed.longitude = Some(0.5);
        markers.reconcile(&[unnamed], None, &mut layer);
        assert!(layer.render_table(10).lines().nth(1).unwrap().starts_with("N/A"));

        markers.reconcile(&[state("aaa001", "WS100", 51.1, 0.6)], None, &mut layer);
        let table = layer.render_table(10);
        let row = table.lines().nth(1).unwrap();
        assert!(row.starts_with("WS100"));
        assert_eq!(markers.get("aaa001").unwrap().label, "WS100");
    }
}
