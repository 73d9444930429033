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

//! Protocol layer for aircraft state feeds.
//!
//! Feeds deliver state vectors as fixed-position JSON arrays. This module
//! decodes them into named [`StateVector`] records at the boundary so the
//! rest of the crate never touches positional data.

mod states;

pub use states::StatesParser;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::viewport::Coordinate;

/// Errors that can occur while decoding a feed document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid document: {0}")]
    InvalidFormat(String),

    #[error("state row has {0} fields, expected at least 12")]
    TooShort(usize),

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

/// One aircraft state as reported by the feed.
///
/// Units follow the feed: meters, meters per second and degrees.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateVector {
    /// ICAO 24-bit transponder address (hex string, e.g. "abc123").
    pub icao24: String,
    /// Callsign, usually padded with trailing spaces.
    pub callsign: Option<String>,
    /// Country inferred from the ICAO address.
    pub origin_country: Option<String>,
    /// Unix time of the last position update.
    pub time_position: Option<i64>,
    /// Unix time of the last message of any kind.
    pub last_contact: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Barometric altitude in meters.
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    /// Ground speed in meters per second.
    pub velocity: Option<f64>,
    /// Track angle in degrees clockwise from north.
    pub true_track: Option<f64>,
    /// Vertical rate in meters per second (positive = climb).
    pub vertical_rate: Option<f64>,
    /// Geometric altitude in meters.
    pub geo_altitude: Option<f64>,
    pub squawk: Option<String>,
    /// Special purpose indicator.
    pub spi: bool,
    /// 0 = ADS-B, 1 = ASTERIX, 2 = MLAT, 3 = FLARM.
    pub position_source: Option<u8>,
}

impl StateVector {
    /// Create a state vector with only the identifier set.
    #[must_use]
    pub fn new(icao24: impl Into<String>) -> Self {
        Self {
            icao24: icao24.into(),
            callsign: None,
            origin_country: None,
            time_position: None,
            last_contact: None,
            longitude: None,
            latitude: None,
            baro_altitude: None,
            on_ground: false,
            velocity: None,
            true_track: None,
            vertical_rate: None,
            geo_altitude: None,
            squawk: None,
            spi: false,
            position_source: None,
        }
    }

    /// The usable position of this aircraft.
    ///
    /// Returns `None` when either axis is missing, zero or not finite.
    /// Zero is rejected because feeds use it as a placeholder for "no fix".
    #[must_use]
    pub fn position(&self) -> Option<Coordinate> {
        let lat = self.latitude.filter(|v| v.is_finite() && *v != 0.0)?;
        let lon = self.longitude.filter(|v| v.is_finite() && *v != 0.0)?;
        Some(Coordinate::new(lat, lon))
    }

    /// Callsign with padding removed, if any is left.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.callsign
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Heading used for marker rotation (0 when unknown).
    #[must_use]
    pub fn heading(&self) -> f64 {
        self.true_track.filter(|h| h.is_finite()).unwrap_or(0.0)
    }
}

/// One complete poll result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Feed timestamp of this snapshot.
    pub time: Option<DateTime<Utc>>,
    pub states: Vec<StateVector>,
}

impl Snapshot {
    #[must_use]
    pub fn new(time: Option<DateTime<Utc>>, states: Vec<StateVector>) -> Self {
        Self { time, states }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// Trait for feed document parsers.
///
/// Implement this trait to add support for new feed formats.
pub trait Protocol {
    /// The message type produced by this parser.
    type Message;
    /// The error type for parsing failures.
    type Error;

    /// Parse input bytes into a message.
    ///
    /// Returns `Ok(Some(message))` if parsing succeeded,
    /// `Ok(None)` if the input is valid but doesn't produce a message,
    /// or `Err(error)` if parsing failed.
    fn parse(&mut self, input: &[u8]) -> Result<Option<Self::Message>, Self::Error>;
}
