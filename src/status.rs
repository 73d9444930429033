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

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use opensky_client::{PollEvent, ReconcileReport};

const MAX_DIAGNOSTICS: usize = 50;

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
        })
    }
}

/// Feed health, poll counters and recent diagnostics
#[derive(Debug)]
pub struct FeedStatus {
    pub feed_url: String,

    // Poll statistics
    pub polls_started: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
    pub polls_discarded: u64,
    pub last_error: Option<String>,
    pub last_success: Option<DateTime<Utc>>,

    // Aircraft statistics
    pub aircraft_known: usize,
    pub aircraft_visible: usize,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,
}

impl FeedStatus {
    pub fn new(feed_url: impl Into<String>) -> Self {
        Self {
            feed_url: feed_url.into(),
            polls_started: 0,
            polls_succeeded: 0,
            polls_failed: 0,
            polls_discarded: 0,
            last_error: None,
            last_success: None,
            aircraft_known: 0,
            aircraft_visible: 0,
            diagnostics: VecDeque::with_capacity(MAX_DIAGNOSTICS),
        }
    }

    /// Count a poller event. Call before handing the event to the map.
    pub fn record_event(&mut self, event: &PollEvent) {
        self.polls_started = self.polls_started.max(event.seq());

        match event {
            PollEvent::Snapshot { snapshot, .. } => {
                self.polls_succeeded += 1;
                self.last_success = Some(Utc::now());
                if self.last_error.take().is_some() {
                    self.add_diagnostic(DiagnosticLevel::Info, "Feed recovered".to_string());
                }
                self.aircraft_known = snapshot.len();
            }
            PollEvent::NoData { .. } => {
                self.polls_succeeded += 1;
                self.last_success = Some(Utc::now());
            }
            PollEvent::Failed { error, .. } => {
                self.polls_failed += 1;
                self.last_error = Some(error.clone());
                self.add_diagnostic(DiagnosticLevel::Error, format!("Poll failed: {error}"));
            }
            PollEvent::Discarded { seq } => {
                self.polls_discarded += 1;
                self.add_diagnostic(
                    DiagnosticLevel::Warning,
                    format!("Dropped late result of poll #{seq}"),
                );
            }
        }
    }

    /// Update aircraft statistics after reconciling
    pub fn update_aircraft_stats(&mut self, report: &ReconcileReport, visible: usize) {
        self.aircraft_visible = visible;
        if report.skipped > 0 {
            self.add_diagnostic(
                DiagnosticLevel::Info,
                format!("{} aircraft without a usable position", report.skipped),
            );
        }
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        self.diagnostics.push_back(DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message,
        });

        while self.diagnostics.len() > MAX_DIAGNOSTICS {
            self.diagnostics.pop_front();
        }
    }
}

impl fmt::Display for FeedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feed:      {}", self.feed_url)?;
        writeln!(
            f,
            "Polls:     {} started, {} ok, {} failed, {} discarded",
            self.polls_started, self.polls_succeeded, self.polls_failed, self.polls_discarded
        )?;
        match self.last_success {
            Some(at) => writeln!(f, "Last ok:   {}", at.format("%H:%M:%S UTC"))?,
            None => writeln!(f, "Last ok:   never")?,
        }
        if let Some(error) = &self.last_error {
            writeln!(f, "Error:     {error}")?;
        }
        write!(
            f,
            "Aircraft:  {} in feed, {} on screen",
            self.aircraft_known, self.aircraft_visible
        )
    }
}
