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

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use log::debug;
use sha2::{Digest, Sha256};

use super::{AirportTime, FlightRecord, FlightStatus, FlightStatusSource, LookupError, AIRLINE_PREFIX};

const DEFAULT_ORIGIN: &str = "YYC";
const DEFAULT_DESTINATION: &str = "YYZ";
const UNKNOWN_AIRPORT: &str = "Unknown Airport";
const AIRLINE: &str = "WestJet";

/// Statuses the mock hands out
const MOCK_STATUSES: [FlightStatus; 5] = [
    FlightStatus::OnTime,
    FlightStatus::Delayed,
    FlightStatus::Boarding,
    FlightStatus::Departed,
    FlightStatus::Arrived,
];

lazy_static! {
    static ref AIRPORTS: HashMap<&'static str, &'static str> = HashMap::from([
        ("YYC", "Calgary International Airport"),
        ("YYZ", "Toronto Pearson International Airport"),
        ("YVR", "Vancouver International Airport"),
        ("YEG", "Edmonton International Airport"),
        ("YOW", "Ottawa Macdonald-Cartier International Airport"),
    ]);
}

pub fn airport_name(code: &str) -> &'static str {
    AIRPORTS.get(code).copied().unwrap_or(UNKNOWN_AIRPORT)
}

/// Pseudo-random values derived from a SHA-256 digest
struct Seed([u8; 32]);

impl Seed {
    fn new(parts: &[&str], nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_bytes());
            hasher.update([0]);
        }
        hasher.update(nonce.to_le_bytes());
        Self(hasher.finalize().into())
    }

    /// The `slot`th 64-bit word reduced into `0..bound`
    fn pick(&self, slot: usize, bound: u64) -> u64 {
        let start = (slot % 4) * 8;
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[start..start + 8]);
        u64::from_le_bytes(word) % bound
    }
}

fn seconds(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(secs).unwrap_or(0))
}

/// Flight status source that invents schedules after a simulated delay
#[derive(Debug)]
pub struct MockFlightSource {
    latency: Duration,
    requests: AtomicU64,
}

impl MockFlightSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            requests: AtomicU64::new(0),
        }
    }

    /// Build a record for the given request. Equal inputs give equal output.
    pub fn generate(
        flight_number: &str,
        origin: &str,
        destination: &str,
        now: DateTime<Utc>,
        nonce: u64,
    ) -> FlightRecord {
        let seed = Seed::new(&[flight_number, origin, destination], nonce);

        let departure = now + seconds(seed.pick(0, 24 * 3600));
        let arrival = departure + chrono::Duration::hours(2) + seconds(seed.pick(1, 3 * 3600));
        let status = MOCK_STATUSES[usize::try_from(seed.pick(2, 5)).unwrap_or(0)];
        let gate = seed.pick(3, 50) + 1;

        FlightRecord {
            flight_number: flight_number.to_string(),
            airline: AIRLINE.to_string(),
            origin: AirportTime {
                code: origin.to_string(),
                name: airport_name(origin).to_string(),
                time: departure.format("%H:%M").to_string(),
            },
            destination: AirportTime {
                code: destination.to_string(),
                name: airport_name(destination).to_string(),
                time: arrival.format("%H:%M").to_string(),
            },
            status,
            departure_time: departure,
            arrival_time: arrival,
            gate: format!("Gate {gate}"),
        }
    }

    /// Invented flight number for a route search, `WS0` to `WS999`
    pub fn route_flight_number(origin: &str, destination: &str, nonce: u64) -> String {
        let seed = Seed::new(&["route", origin, destination], nonce);
        format!("{AIRLINE_PREFIX}{}", seed.pick(0, 1000))
    }

    async fn respond(&self, flight_number: &str, origin: &str, destination: &str) -> FlightRecord {
        let nonce = self.requests.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.latency).await;
        debug!("Mock lookup #{} for {} {}-{}", nonce, flight_number, origin, destination);
        Self::generate(flight_number, origin, destination, Utc::now(), nonce)
    }
}

impl FlightStatusSource for MockFlightSource {
    async fn by_flight_number(&self, flight_number: &str) -> Result<Option<FlightRecord>, LookupError> {
        Ok(Some(
            self.respond(flight_number, DEFAULT_ORIGIN, DEFAULT_DESTINATION)
                .await,
        ))
    }

    async fn by_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<FlightRecord>, LookupError> {
        let nonce = self.requests.load(Ordering::Relaxed);
        let flight_number = Self::route_flight_number(origin, destination, nonce);
        Ok(Some(self.respond(&flight_number, origin, destination).await))
    }

    async fn refresh(&self, current: &FlightRecord) -> Result<Option<FlightRecord>, LookupError> {
        Ok(Some(
            self.respond(
                &current.flight_number,
                &current.origin.code,
                &current.destination.code,
            )
            .await,
        ))
    }
}
