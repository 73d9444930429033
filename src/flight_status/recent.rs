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

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::FlightRecord;

/// Number of searches kept
pub const MAX_RECENT: usize = 5;

/// Most-recent-first list of searched flights, persisted as JSON
#[derive(Debug, Default)]
pub struct RecentFlights {
    path: Option<PathBuf>,
    flights: Vec<FlightRecord>,
}

impl RecentFlights {
    /// In-memory list that is never written to disk
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Default location: `<data_dir>/flightwatch/recent_flights.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join("flightwatch").join("recent_flights.json"))
    }

    /// Load from `path`. A missing or unreadable file gives an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let flights = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<FlightRecord>>(&bytes) {
                Ok(mut flights) => {
                    flights.truncate(MAX_RECENT);
                    flights
                }
                Err(e) => {
                    warn!("Ignoring corrupt recent searches at {}: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("Failed to read recent searches from {}: {}", path.display(), e);
                Vec::new()
            }
        };

        Self {
            path: Some(path),
            flights,
        }
    }

    /// Put `record` first, replacing any older entry with the same number
    pub fn add(&mut self, record: FlightRecord) {
        self.flights
            .retain(|f| f.flight_number != record.flight_number);
        self.flights.insert(0, record);
        self.flights.truncate(MAX_RECENT);
    }

    pub fn get(&self, flight_number: &str) -> Option<&FlightRecord> {
        self.flights.iter().find(|f| f.flight_number == flight_number)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlightRecord> {
        self.flights.iter()
    }

    pub fn len(&self) -> usize {
        self.flights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flights.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the list to its file, creating parent directories
    pub fn save(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&self.flights)?;
        fs::write(path, json)?;
        info!("Saved {} recent searches to {}", self.flights.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight_status::MockFlightSource;
    use chrono::Utc;

    fn record(number: &str) -> FlightRecord {
        MockFlightSource::generate(number, "YYC", "YYZ", Utc::now(), 0)
    }

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("flightwatch-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_most_recent_first_without_duplicates() {
        let mut recent = RecentFlights::in_memory();
        recent.add(record("WS1"));
        recent.add(record("WS2"));
        recent.add(record("WS1"));

        let numbers: Vec<&str> = recent.iter().map(|f| f.flight_number.as_str()).collect();
        assert_eq!(numbers, vec!["WS1", "WS2"]);
    }

    #[test]
    fn test_capacity() {
        let mut recent = RecentFlights::in_memory();
        for i in 0..8 {
            recent.add(record(&format!("WS{i}")));
        }
        assert_eq!(recent.len(), MAX_RECENT);
        assert_eq!(recent.iter().next().unwrap().flight_number, "WS7");
        assert!(recent.get("WS2").is_none());
        assert!(recent.get("WS3").is_some());
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_file("recent.json");
        let mut recent = RecentFlights::load(&path);
        assert!(recent.is_empty());

        recent.add(record("WS10"));
        recent.add(record("WS20"));
        recent.save().unwrap();

        let reloaded = RecentFlights::load(&path);
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.iter().next(), recent.iter().next());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let path = temp_file("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{ not json").unwrap();

        assert!(RecentFlights::load(&path).is_empty());
        let _ = fs::remove_file(&path);
    }
}
