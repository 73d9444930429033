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

//! Display formatting for a selected aircraft.

use std::fmt;

use serde::Serialize;

use crate::protocol::StateVector;
use crate::tracker::NO_LABEL;

const FEET_PER_METER: f64 = 3.28084;
const KNOTS_PER_MPS: f64 = 1.94384;
const FPM_PER_MPS: f64 = 196.85;

/// Aircraft attributes converted to display units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRecord {
    pub callsign: String,
    pub icao24: String,
    pub origin_country: String,
    pub altitude_ft: Option<i64>,
    pub speed_kt: Option<i64>,
    pub heading_deg: Option<i64>,
    pub vertical_rate_fpm: Option<i64>,
    pub on_ground: bool,
}

/// Format one state vector for display.
#[must_use]
pub fn present(state: &StateVector) -> DisplayRecord {
    DisplayRecord {
        callsign: state.label().unwrap_or(NO_LABEL).to_string(),
        icao24: state.icao24.clone(),
        origin_country: state
            .origin_country
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(NO_LABEL)
            .to_string(),
        altitude_ft: state.baro_altitude.and_then(|m| round(m * FEET_PER_METER)),
        speed_kt: state.velocity.and_then(|v| round(v * KNOTS_PER_MPS)),
        heading_deg: state.true_track.and_then(round),
        vertical_rate_fpm: state.vertical_rate.and_then(|v| round(v * FPM_PER_MPS)),
        on_ground: state.on_ground,
    }
}

/// Round to the nearest integer, halves toward positive infinity.
#[allow(clippy::cast_possible_truncation, reason = "display values are far below i64 range")]
fn round(value: f64) -> Option<i64> {
    value.is_finite().then(|| (value + 0.5).floor() as i64)
}

struct Value<'a>(Option<i64>, &'a str);

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}{}", v, self.1),
            None => f.write_str(NO_LABEL),
        }
    }
}

impl DisplayRecord {
    /// Short popup text shown next to a marker.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} ({}) {} {} {}",
            self.callsign,
            self.icao24,
            Value(self.altitude_ft, " ft"),
            Value(self.speed_kt, " kt"),
            Value(self.heading_deg, "°"),
        )
    }
}

impl fmt::Display for DisplayRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.callsign)?;
        writeln!(f, "  ICAO24:        {}", self.icao24)?;
        writeln!(f, "  Country:       {}", self.origin_country)?;
        writeln!(f, "  Altitude:      {}", Value(self.altitude_ft, " ft"))?;
        writeln!(f, "  Speed:         {}", Value(self.speed_kt, " kt"))?;
        writeln!(f, "  Heading:       {}", Value(self.heading_deg, "°"))?;
        writeln!(f, "  Vertical Rate: {}", Value(self.vertical_rate_fpm, " ft/min"))?;
        write!(f, "  On Ground:     {}", if self.on_ground { "Yes" } else { "No" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StateVector {
        let mut v = StateVector::new("abc123");
        v.callsign = Some("WS100 ".to_string());
        v.origin_country = Some("Canada".to_string());
        v.baro_altitude = Some(1000.0);
        v.velocity = Some(100.0);
        v.vertical_rate = Some(5.0);
        v.true_track = Some(87.5);
        v
    }

    #[test]
    fn test_unit_conversions() {
        let record = present(&sample());
        assert_eq!(record.altitude_ft, Some(3281));
        assert_eq!(record.speed_kt, Some(194));
        assert_eq!(record.vertical_rate_fpm, Some(984));
        assert_eq!(record.heading_deg, Some(88));
    }

    #[test]
    fn test_negative_halves_round_up() {
        assert_eq!(round(-2.5), Some(-2));
        assert_eq!(round(2.5), Some(3));
        assert_eq!(round(f64::NAN), None);
    }

    #[test]
    fn test_missing_values_use_placeholder() {
        let record = present(&StateVector::new("def456"));
        assert_eq!(record.callsign, "N/A");
        assert_eq!(record.origin_country, "N/A");
        assert_eq!(record.altitude_ft, None);

        let text = record.to_string();
        assert!(text.contains("Altitude:      N/A"));
        assert!(text.contains("On Ground:     No"));
    }

    #[test]
    fn test_summary() {
        let record = present(&sample());
        assert_eq!(record.summary(), "WS100 (abc123) 3281 ft 194 kt 88°");
    }
}
