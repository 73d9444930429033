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

//! Lookup of an aircraft in the latest snapshot by callsign or ICAO24.

use thiserror::Error;

use crate::protocol::StateVector;

/// Search failures. Neither is fatal; callers surface them to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("enter a callsign or ICAO24 code")]
    EmptyTerm,

    #[error("Flight not found. Try a different callsign or ICAO24 code.")]
    NoMatch,
}

/// Find the first state vector whose trimmed callsign or ICAO24 equals
/// `term`, ignoring case and surrounding whitespace.
pub fn find<'a>(snapshot: &'a [StateVector], term: &str) -> Result<&'a StateVector, SearchError> {
    let term = term.trim().to_uppercase();
    if term.is_empty() {
        return Err(SearchError::EmptyTerm);
    }

    snapshot
        .iter()
        .find(|state| {
            state
                .callsign
                .as_deref()
                .is_some_and(|c| c.trim().to_uppercase() == term)
                || state.icao24.to_uppercase() == term
        })
        .ok_or(SearchError::NoMatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Vec<StateVector> {
        let mut first = StateVector::new("ABC123");
        first.callsign = Some("WS100 ".to_string());
        let mut second = StateVector::new("def456");
        second.callsign = Some("ACA850".to_string());
        let mut dup = StateVector::new("fff999");
        dup.callsign = Some("WS100".to_string());
        vec![first, second, dup]
    }

    #[test]
    fn test_find_by_label_ignores_case_and_padding() {
        let snapshot = snapshot();
        let found = find(&snapshot, "ws100").unwrap();
        assert_eq!(found.icao24, "ABC123");
    }

    #[test]
    fn test_find_by_identifier() {
        let snapshot = snapshot();
        assert_eq!(find(&snapshot, "  DEF456 ").unwrap().icao24, "def456");
    }

    #[test]
    fn test_first_match_wins() {
        let snapshot = snapshot();
        assert_eq!(find(&snapshot, "WS100").unwrap().icao24, "ABC123");
    }

    #[test]
    fn test_not_found() {
        let snapshot = snapshot();
        assert_eq!(find(&snapshot, "ZZZZZZ"), Err(SearchError::NoMatch));
    }

    #[test]
    fn test_empty_term() {
        let snapshot = snapshot();
        assert_eq!(find(&snapshot, "   "), Err(SearchError::EmptyTerm));
    }
}
