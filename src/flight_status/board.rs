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

use log::{info, warn};
use thiserror::Error;

use super::{FlightQuery, FlightRecord, FlightStatusSource, LookupError, QueryError, RecentFlights};

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("No flights found matching your criteria")]
    NotFound,

    #[error("No flight to refresh. Please search for a flight first.")]
    NothingToRefresh,
}

/// Search front end: current flight plus recent searches
#[derive(Debug)]
pub struct StatusBoard<S> {
    source: S,
    recent: RecentFlights,
    current: Option<FlightRecord>,
}

impl<S: FlightStatusSource> StatusBoard<S> {
    pub fn new(source: S, recent: RecentFlights) -> Self {
        Self {
            source,
            recent,
            current: None,
        }
    }

    pub async fn search(&mut self, query: &FlightQuery) -> Result<&FlightRecord, BoardError> {
        let result = match query {
            FlightQuery::ByNumber(number) => self.source.by_flight_number(number).await?,
            FlightQuery::ByRoute { origin, destination } => {
                self.source.by_route(origin, destination).await?
            }
        };
        let record = result.ok_or(BoardError::NotFound)?;
        info!("Found {} {}: {}", record.flight_number, record.route(), record.status);
        Ok(self.show(record))
    }

    /// Look up the current flight again and replace it
    pub async fn refresh_current(&mut self) -> Result<&FlightRecord, BoardError> {
        let current = self.current.as_ref().ok_or(BoardError::NothingToRefresh)?;
        let record = self
            .source
            .refresh(current)
            .await?
            .ok_or(BoardError::NotFound)?;
        Ok(self.show(record))
    }

    /// Make a stored recent search the current flight, without a lookup
    pub fn load_from_recent(&mut self, flight_number: &str) -> Option<&FlightRecord> {
        let record = self.recent.get(flight_number)?.clone();
        Some(self.current.insert(record))
    }

    #[allow(dead_code, reason = "the CLI prints results as they arrive")]
    pub fn current(&self) -> Option<&FlightRecord> {
        self.current.as_ref()
    }

    pub fn recent(&self) -> &RecentFlights {
        &self.recent
    }

    fn show(&mut self, record: FlightRecord) -> &FlightRecord {
        self.recent.add(record.clone());
        if let Err(e) = self.recent.save() {
            warn!("Failed to save recent searches: {}", e);
        }
        self.current.insert(record)
    }
}
