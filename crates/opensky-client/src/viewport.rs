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

//! Geographic viewport bounds and containment.
//!
//! Bounds never cross the antimeridian: `west <= east` always holds.

use serde::{Deserialize, Serialize};

const TILE_SIZE: f64 = 256.0;
/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Rectangular geographic bounds, inclusive on every edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Build bounds from two opposite corners given in any order.
    #[must_use]
    pub fn new(a: Coordinate, b: Coordinate) -> Self {
        Self {
            south: a.lat.min(b.lat),
            west: a.lon.min(b.lon),
            north: a.lat.max(b.lat),
            east: a.lon.max(b.lon),
        }
    }

    /// Bounds covering the whole projected world.
    #[must_use]
    pub fn world() -> Self {
        Self {
            south: -MAX_MERCATOR_LATITUDE,
            west: -180.0,
            north: MAX_MERCATOR_LATITUDE,
            east: 180.0,
        }
    }

    /// Visible bounds of a slippy-map view of `width_px` x `height_px`
    /// centered on `center` at `zoom`.
    #[must_use]
    pub fn for_zoom(center: Coordinate, zoom: u8, width_px: u32, height_px: u32) -> Self {
        let lat = center.lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE);
        let cx = WebMercator::lon_to_x(center.lon, zoom);
        let cy = WebMercator::lat_to_y(lat, zoom);

        let half_w = f64::from(width_px) / TILE_SIZE / 2.0;
        let half_h = f64::from(height_px) / TILE_SIZE / 2.0;

        Self {
            south: WebMercator::tile_to_lat(cy + half_h, zoom).max(-MAX_MERCATOR_LATITUDE),
            west: WebMercator::tile_to_lon(cx - half_w, zoom).max(-180.0),
            north: WebMercator::tile_to_lat(cy - half_h, zoom).min(MAX_MERCATOR_LATITUDE),
            east: WebMercator::tile_to_lon(cx + half_w, zoom).min(180.0),
        }
    }

    /// Inclusive membership test. A coordinate exactly on an edge is inside.
    #[must_use]
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.south
            && coord.lat <= self.north
            && coord.lon >= self.west
            && coord.lon <= self.east
    }

    #[must_use]
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Shift the bounds by the given offsets in degrees.
    #[must_use]
    pub fn pan(&self, d_lat: f64, d_lon: f64) -> Self {
        Self {
            south: self.south + d_lat,
            west: self.west + d_lon,
            north: self.north + d_lat,
            east: self.east + d_lon,
        }
    }
}

/// Web Mercator projection utilities
#[derive(Debug)]
pub struct WebMercator;

impl WebMercator {
    /// Convert latitude to Web Mercator tile Y coordinate
    #[must_use]
    pub fn lat_to_y(lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.to_radians();
        let n = 2_f64.powi(i32::from(zoom));
        let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0;
        y * n
    }

    /// Convert longitude to Web Mercator tile X coordinate
    #[must_use]
    pub fn lon_to_x(lon: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        ((lon + 180.0) / 360.0) * n
    }

    /// Convert tile coordinates back to latitude
    #[must_use]
    pub fn tile_to_lat(y: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        let lat_rad = (std::f64::consts::PI * (1.0 - 2.0 * y / n)).sinh().atan();
        lat_rad.to_degrees()
    }

    /// Convert tile coordinates back to longitude
    #[must_use]
    pub fn tile_to_lon(x: f64, zoom: u8) -> f64 {
        let n = 2_f64.powi(i32::from(zoom));
        x / n * 360.0 - 180.0
    }
}
