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

//! Interactive live map session.
//!
//! Poll events, debounced viewport changes and stdin commands are all
//! handled on one task, so the map state needs no locking.

use std::error::Error;
use std::time::Duration;

use log::{info, warn};
use opensky_client::{
    Coordinate, Debounce, GeoBounds, HttpStateSource, LiveMap, PollConfig, PollEvent, Poller,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::AppConfig;
use crate::render::ConsoleLayer;
use crate::status::FeedStatus;

const DEFAULT_LIST_ROWS: usize = 20;

/// Options for a live session, after CLI overrides
#[derive(Debug, Clone)]
pub struct LiveOptions {
    pub feed_url: String,
    pub interval: Duration,
    pub bounds: Option<GeoBounds>,
    pub viewport_aware: bool,
    pub once: bool,
}

/// A line typed at the live prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Pan(GeoBounds),
    Zoom { center: Coordinate, zoom: u8 },
    Find(String),
    Show(String),
    List(usize),
    Status,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Err("empty command".to_string());
        };
        let rest: Vec<&str> = words.collect();

        match (verb.to_lowercase().as_str(), rest.as_slice()) {
            ("pan", [s, w, n, e]) => Ok(Self::Pan(GeoBounds::new(
                Coordinate::new(number(s)?, number(w)?),
                Coordinate::new(number(n)?, number(e)?),
            ))),
            ("zoom", [lat, lon, zoom]) => Ok(Self::Zoom {
                center: Coordinate::new(number(lat)?, number(lon)?),
                zoom: zoom.parse().map_err(|e| format!("bad zoom level {zoom}: {e}"))?,
            }),
            ("find", [_, ..]) => Ok(Self::Find(rest.join(" "))),
            ("show", [icao24]) => Ok(Self::Show((*icao24).to_string())),
            ("list", []) => Ok(Self::List(DEFAULT_LIST_ROWS)),
            ("list", [rows]) => Ok(Self::List(
                rows.parse().map_err(|e| format!("bad row count {rows}: {e}"))?,
            )),
            ("status", []) => Ok(Self::Status),
            ("quit" | "exit", []) => Ok(Self::Quit),
            _ => Err(format!("unknown command: {line}")),
        }
    }
}

fn number(text: &str) -> Result<f64, String> {
    text.parse()
        .map_err(|e| format!("bad coordinate {text}: {e}"))
}

/// Parse `S,W,N,E` into bounds
pub fn parse_bounds(text: &str) -> Result<GeoBounds, String> {
    let parts = text
        .split(',')
        .map(|p| number(p.trim()))
        .collect::<Result<Vec<f64>, String>>()?;
    match parts.as_slice() {
        [s, w, n, e] => Ok(GeoBounds::new(Coordinate::new(*s, *w), Coordinate::new(*n, *e))),
        _ => Err(format!("expected S,W,N,E but got {text}")),
    }
}

const HELP: &str = "commands: pan S W N E | zoom LAT LON Z | find TERM | show ICAO24 | list [N] | status | quit";

/// Run the live map until `quit`, end of feed or Ctrl-C
pub async fn run(config: &AppConfig, options: LiveOptions) -> Result<(), Box<dyn Error>> {
    let source = HttpStateSource::new(options.feed_url.clone(), config.request_timeout())?;
    let mut poller = Poller::spawn(
        source,
        PollConfig {
            interval: options.interval,
            ..PollConfig::default()
        },
    );

    let viewport = options.bounds.unwrap_or_else(|| {
        GeoBounds::for_zoom(
            config.initial_center(),
            config.initial_zoom,
            config.screen_width_px,
            config.screen_height_px,
        )
    });
    let mut map = LiveMap::new(ConsoleLayer::new(), options.viewport_aware.then_some(viewport));
    map.set_screen_size(config.screen_width_px, config.screen_height_px);

    let mut status = FeedStatus::new(options.feed_url.clone());
    let mut pending_viewport: Debounce<GeoBounds> = Debounce::new(config.viewport_debounce());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = !options.once;

    info!(
        "Polling {} every {:?} ({})",
        options.feed_url,
        options.interval,
        if options.viewport_aware { "viewport only" } else { "all aircraft" }
    );
    if stdin_open {
        println!("{HELP}");
    }

    loop {
        tokio::select! {
            event = poller.recv() => {
                let Some(event) = event else {
                    warn!("Poller stopped");
                    break;
                };
                status.record_event(&event);
                let failed = matches!(event, PollEvent::Failed { .. });

                if let Some(report) = map.handle_event(event) {
                    let visible = map.layer().len();
                    status.update_aircraft_stats(&report, visible);
                    info!(
                        "{} aircraft in feed, {} on screen ({} new, {} gone)",
                        map.snapshot().len(),
                        visible,
                        report.created,
                        report.destroyed
                    );
                    if options.once {
                        print!("{}", map.layer().render_table(usize::MAX));
                        break;
                    }
                } else if failed {
                    if let Some(message) = map.status_message() {
                        println!("{message}");
                    }
                    if options.once {
                        break;
                    }
                }
            }
            bounds = pending_viewport.ready() => {
                let report = map.set_viewport(bounds);
                status.aircraft_visible = map.markers().attached_count();
                info!(
                    "Viewport moved: {} shown, {} hidden, {} on screen",
                    report.attached, report.detached, status.aircraft_visible
                );
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match Command::parse(&line) {
                        Ok(Command::Quit) => break,
                        Ok(command) => {
                            execute(command, &mut map, &mut pending_viewport, &mut status, config);
                        }
                        Err(e) => println!("{e}\n{HELP}"),
                    },
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    poller.shutdown();
    Ok(())
}

fn execute(
    command: Command,
    map: &mut LiveMap<ConsoleLayer>,
    pending_viewport: &mut Debounce<GeoBounds>,
    status: &mut FeedStatus,
    config: &AppConfig,
) {
    match command {
        Command::Pan(bounds) => pending_viewport.push(bounds),
        Command::Zoom { center, zoom } => pending_viewport.push(GeoBounds::for_zoom(
            center,
            zoom,
            config.screen_width_px,
            config.screen_height_px,
        )),
        Command::Find(term) => {
            // A queued pan would undo the jump
            pending_viewport.cancel();
            let focused = map.focus(&term, config.search_zoom);
            status.aircraft_visible = map.markers().attached_count();
            match focused {
                Ok(focus) => {
                    println!("{}", focus.record);
                    if focus.marker_attached {
                        println!("[{}]", focus.record.summary());
                    }
                }
                Err(e) => println!("{e}"),
            }
        }
        Command::Show(icao24) => match map.select(&icao24) {
            Some(record) => println!("{record}"),
            None => println!("{icao24} is not in the latest snapshot"),
        },
        Command::List(rows) => {
            if map.layer().is_empty() {
                println!("No aircraft on screen");
            } else {
                print!("{}", map.layer().render_table(rows));
            }
        }
        Command::Status => {
            println!("{status}");
            for diagnostic in status.diagnostics.iter().rev().take(5) {
                println!(
                    "  {} [{}] {}",
                    diagnostic.timestamp.format("%H:%M:%S"),
                    diagnostic.level,
                    diagnostic.message
                );
            }
            println!("Discarded late polls: {}", map.discarded_polls());
            if let Some(message) = map.status_message() {
                println!("{message}");
            }
        }
        Command::Quit => {}
    }
}
