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

//! OpenSky `/states/all` document parser.
//!
//! Document format:
//! ```text
//! {"time": <unix>, "states": [[<icao24>, <callsign>, <country>, <time_position>,
//!   <last_contact>, <lon>, <lat>, <baro_alt>, <on_ground>, <velocity>,
//!   <true_track>, <vertical_rate>, <sensors>, <geo_alt>, <squawk>, <spi>,
//!   <position_source>], ...]}
//! ```
//!
//! `states` is `null` when the feed has nothing to report.

use chrono::DateTime;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use super::{ParseError, Protocol, Snapshot, StateVector};

const MIN_ROW_FIELDS: usize = 12;

const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_TIME_POSITION: usize = 3;
const IDX_LAST_CONTACT: usize = 4;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_ON_GROUND: usize = 8;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_VERTICAL_RATE: usize = 11;
const IDX_GEO_ALTITUDE: usize = 13;
const IDX_SQUAWK: usize = 14;
const IDX_SPI: usize = 15;
const IDX_POSITION_SOURCE: usize = 16;

#[derive(Debug, Deserialize)]
struct StatesDocument {
    time: Option<i64>,
    states: Option<Vec<Vec<Value>>>,
}

/// Parser for OpenSky-style state documents.
#[derive(Debug, Default)]
pub struct StatesParser {
    rejected_rows: usize,
}

impl StatesParser {
    /// Create a new states parser.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows skipped while parsing the last document.
    #[must_use]
    pub fn rejected_rows(&self) -> usize {
        self.rejected_rows
    }
}

impl Protocol for StatesParser {
    type Message = Snapshot;
    type Error = ParseError;

    fn parse(&mut self, input: &[u8]) -> Result<Option<Snapshot>, ParseError> {
        self.rejected_rows = 0;

        let doc: StatesDocument = serde_json::from_slice(input)
            .map_err(|e| ParseError::InvalidFormat(e.to_string()))?;

        let Some(rows) = doc.states else {
            return Ok(None);
        };

        let mut states = Vec::with_capacity(rows.len());
        for row in &rows {
            match decode_row(row) {
                Ok(state) => states.push(state),
                Err(e) => {
                    debug!("Skipping state row: {}", e);
                    self.rejected_rows += 1;
                }
            }
        }

        if self.rejected_rows > 0 {
            warn!(
                "Skipped {} of {} state rows that could not be decoded",
                self.rejected_rows,
                rows.len()
            );
        }

        let time = doc.time.and_then(|secs| DateTime::from_timestamp(secs, 0));
        Ok(Some(Snapshot::new(time, states)))
    }
}

/// Decode one positional row into a named record.
fn decode_row(row: &[Value]) -> Result<StateVector, ParseError> {
    if row.len() < MIN_ROW_FIELDS {
        return Err(ParseError::TooShort(row.len()));
    }

    let icao24 = row[IDX_ICAO24]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingField("icao24"))?;

    Ok(StateVector {
        icao24: icao24.to_string(),
        callsign: string_at(row, IDX_CALLSIGN),
        origin_country: string_at(row, IDX_ORIGIN_COUNTRY),
        time_position: int_at(row, IDX_TIME_POSITION),
        last_contact: int_at(row, IDX_LAST_CONTACT),
        longitude: float_at(row, IDX_LONGITUDE),
        latitude: float_at(row, IDX_LATITUDE),
        baro_altitude: float_at(row, IDX_BARO_ALTITUDE),
        on_ground: bool_at(row, IDX_ON_GROUND),
        velocity: float_at(row, IDX_VELOCITY),
        true_track: float_at(row, IDX_TRUE_TRACK),
        vertical_rate: float_at(row, IDX_VERTICAL_RATE),
        geo_altitude: float_at(row, IDX_GEO_ALTITUDE),
        squawk: string_at(row, IDX_SQUAWK),
        spi: bool_at(row, IDX_SPI),
        position_source: int_at(row, IDX_POSITION_SOURCE).and_then(|v| u8::try_from(v).ok()),
    })
}

fn string_at(row: &[Value], idx: usize) -> Option<String> {
    row.get(idx).and_then(Value::as_str).map(ToString::to_string)
}

fn float_at(row: &[Value], idx: usize) -> Option<f64> {
    row.get(idx).and_then(Value::as_f64)
}

fn int_at(row: &[Value], idx: usize) -> Option<i64> {
    row.get(idx).and_then(Value::as_i64)
}

fn bool_at(row: &[Value], idx: usize) -> bool {
    row.get(idx).and_then(Value::as_bool).unwrap_or(false)
}
