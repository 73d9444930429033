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

//! Scheduled flight status lookup by flight number or route.
//!
//! Lookups go through a [`FlightStatusSource`]. The only source shipped is
//! [`MockFlightSource`], which invents plausible schedules until a real
//! flight status API is wired in.

mod board;
mod recent;
mod source;

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use board::StatusBoard;
pub use recent::RecentFlights;
pub use source::MockFlightSource;

/// Airline code prepended to bare flight numbers
pub const AIRLINE_PREFIX: &str = "WS";

/// Status of a scheduled flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlightStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Delayed,
    Boarding,
    Departed,
    Arrived,
    Cancelled,
}

impl FlightStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::OnTime => "On Time",
            Self::Delayed => "Delayed",
            Self::Boarding => "Boarding",
            Self::Departed => "Departed",
            Self::Arrived => "Arrived",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Class of the status dot; `None` leaves it neutral
    pub fn indicator_class(self) -> Option<&'static str> {
        match self {
            Self::OnTime | Self::Arrived => Some("on-time"),
            Self::Delayed => Some("delayed"),
            Self::Cancelled => Some("cancelled"),
            Self::Boarding => Some("boarding"),
            Self::Departed => None,
        }
    }

    /// Class of the badge in the recent searches list
    pub fn badge_class(self) -> &'static str {
        match self {
            Self::Delayed => "delayed",
            Self::Cancelled => "cancelled",
            Self::OnTime | Self::Arrived | Self::Boarding | Self::Departed => "on-time",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One end of a flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportTime {
    pub code: String,
    pub name: String,
    /// Local display time, `HH:MM`
    pub time: String,
}

/// Scheduled flight with its current status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    pub flight_number: String,
    pub airline: String,
    pub origin: AirportTime,
    pub destination: AirportTime,
    pub status: FlightStatus,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub gate: String,
}

impl FlightRecord {
    /// `YYC → YYZ`
    pub fn route(&self) -> String {
        format!("{} → {}", self.origin.code, self.destination.code)
    }
}

impl fmt::Display for FlightRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})  [{}]", self.flight_number, self.airline, self.status)?;
        writeln!(
            f,
            "  From: {} {:<45} {}",
            self.origin.code, self.origin.name, self.origin.time
        )?;
        writeln!(
            f,
            "  To:   {} {:<45} {}",
            self.destination.code, self.destination.name, self.destination.time
        )?;
        writeln!(f, "  Departure: {}", self.departure_time.format("%Y-%m-%d %H:%M UTC"))?;
        writeln!(f, "  Arrival:   {}", self.arrival_time.format("%Y-%m-%d %H:%M UTC"))?;
        write!(f, "  {}", self.gate)
    }
}

/// Invalid search input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Please enter at least one search criteria")]
    EmptyQuery,

    #[error("Please enter either a flight number or both origin and destination")]
    IncompleteRoute,
}

/// Validated flight search
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlightQuery {
    ByNumber(String),
    ByRoute { origin: String, destination: String },
}

impl FlightQuery {
    /// Build a query from raw form input. A flight number wins over a route.
    pub fn from_input(
        flight_number: &str,
        origin: &str,
        destination: &str,
    ) -> Result<Self, QueryError> {
        let flight_number = flight_number.trim();
        let origin = origin.trim();
        let destination = destination.trim();

        if flight_number.is_empty() && origin.is_empty() && destination.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        if !flight_number.is_empty() {
            return Ok(Self::ByNumber(normalize_flight_number(flight_number)));
        }
        if origin.is_empty() || destination.is_empty() {
            return Err(QueryError::IncompleteRoute);
        }
        Ok(Self::ByRoute {
            origin: normalize_airport_code(origin),
            destination: normalize_airport_code(destination),
        })
    }
}

/// Upper-case and add the airline prefix when missing
pub fn normalize_flight_number(input: &str) -> String {
    let value = input.trim().to_uppercase();
    if value.is_empty() || value.starts_with(AIRLINE_PREFIX) {
        value
    } else {
        format!("{AIRLINE_PREFIX}{value}")
    }
}

pub fn normalize_airport_code(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Lookup failure in a flight status source
#[derive(Debug, Error)]
pub enum LookupError {
    #[allow(dead_code, reason = "only network-backed sources fail")]
    #[error("An error occurred while searching for flights. Please try again.")]
    Unavailable(String),
}

/// Backend answering flight status queries
pub trait FlightStatusSource: Send + Sync {
    fn by_flight_number(
        &self,
        flight_number: &str,
    ) -> impl Future<Output = Result<Option<FlightRecord>, LookupError>> + Send;

    fn by_route(
        &self,
        origin: &str,
        destination: &str,
    ) -> impl Future<Output = Result<Option<FlightRecord>, LookupError>> + Send;

    /// Fetch a fresh copy of an earlier result
    fn refresh(
        &self,
        current: &FlightRecord,
    ) -> impl Future<Output = Result<Option<FlightRecord>, LookupError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flight_number_gets_prefix() {
        assert_eq!(normalize_flight_number("123"), "WS123");
        assert_eq!(normalize_flight_number(" ws456 "), "WS456");
        assert_eq!(normalize_flight_number("WS789"), "WS789");
    }

    #[test]
    fn test_flight_number_wins_over_route() {
        let query = FlightQuery::from_input("100", "yyc", "").unwrap();
        assert_eq!(query, FlightQuery::ByNumber("WS100".to_string()));
    }

    #[test]
    fn test_route_query() {
        let query = FlightQuery::from_input("", " yyc", "yvr ").unwrap();
        assert_eq!(
            query,
            FlightQuery::ByRoute {
                origin: "YYC".to_string(),
                destination: "YVR".to_string()
            }
        );
    }

    #[test]
    fn test_invalid_queries() {
        assert_eq!(FlightQuery::from_input(" ", "", ""), Err(QueryError::EmptyQuery));
        assert_eq!(
            FlightQuery::from_input("", "YYC", ""),
            Err(QueryError::IncompleteRoute)
        );
    }

    #[test]
    fn test_status_classes() {
        assert_eq!(FlightStatus::Arrived.indicator_class(), Some("on-time"));
        assert_eq!(FlightStatus::Boarding.indicator_class(), Some("boarding"));
        assert_eq!(FlightStatus::Departed.indicator_class(), None);
        assert_eq!(FlightStatus::Boarding.badge_class(), "on-time");
        assert_eq!(FlightStatus::Cancelled.badge_class(), "cancelled");
    }

    #[test]
    fn test_status_serializes_as_label() {
        let json = serde_json::to_string(&FlightStatus::OnTime).unwrap();
        assert_eq!(json, "\"On Time\"");
    }
}
