//! Flat-plane geometry for ranch-scale coordinates.
//!
//! Latitude and longitude are treated as plain Cartesian coordinates
//! measured in degrees. Distances are Euclidean `sqrt(dlat² + dlon²)`,
//! not geodesic. The radius and threshold defaults in
//! [`HerdConfig`](crate::HerdConfig) are calibrated against this
//! approximation.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Approximate metres per degree, used only for reporting spreads.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Fallback ranch centre when neither the backend nor a fence supplies one.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 35.0,
    lon: -106.0,
};

/// A point in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Euclidean distance in degrees
    #[inline]
    pub fn distance(&self, other: &GeoPoint) -> f64 {
        let dlat = other.lat - self.lat;
        let dlon = other.lon - self.lon;
        (dlat * dlat + dlon * dlon).sqrt()
    }

    /// Euclidean distance converted to metres
    pub fn distance_meters(&self, other: &GeoPoint) -> f64 {
        self.distance(other) * METERS_PER_DEGREE
    }

    pub fn offset(&self, delta: Vector) -> GeoPoint {
        GeoPoint::new(self.lat + delta.dlat, self.lon + delta.dlon)
    }

    /// Vector pointing from `self` to `target`
    pub fn toward(&self, target: &GeoPoint) -> Vector {
        Vector::new(target.lat - self.lat, target.lon - self.lon)
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Mean of a set of points, `None` when empty
    pub fn centroid<'a, I>(points: I) -> Option<GeoPoint>
    where
        I: IntoIterator<Item = &'a GeoPoint>,
    {
        let mut count = 0usize;
        let mut lat = 0.0;
        let mut lon = 0.0;
        for point in points {
            lat += point.lat;
            lon += point.lon;
            count += 1;
        }
        if count == 0 {
            None
        } else {
            Some(GeoPoint::new(lat / count as f64, lon / count as f64))
        }
    }

    /// Uniform sample inside the disk of `radius` around this point
    pub fn random_within<R: Rng + ?Sized>(&self, radius: f64, rng: &mut R) -> GeoPoint {
        if radius <= 0.0 {
            return *self;
        }
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        // sqrt keeps the density uniform over the area
        let r = radius * rng.gen::<f64>().sqrt();
        GeoPoint::new(self.lat + r * angle.sin(), self.lon + r * angle.cos())
    }
}

/// Displacement in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector {
    pub dlat: f64,
    pub dlon: f64,
}

impl Vector {
    pub const ZERO: Vector = Vector { dlat: 0.0, dlon: 0.0 };

    pub const fn new(dlat: f64, dlon: f64) -> Self {
        Self { dlat, dlon }
    }

    pub fn from_heading(heading: f64, magnitude: f64) -> Self {
        Self::new(magnitude * heading.sin(), magnitude * heading.cos())
    }

    #[inline]
    pub fn length(&self) -> f64 {
        (self.dlat * self.dlat + self.dlon * self.dlon).sqrt()
    }

    pub fn scale(&self, factor: f64) -> Vector {
        Vector::new(self.dlat * factor, self.dlon * factor)
    }

    pub fn add(&self, other: Vector) -> Vector {
        Vector::new(self.dlat + other.dlat, self.dlon + other.dlon)
    }

    pub fn is_finite(&self) -> bool {
        self.dlat.is_finite() && self.dlon.is_finite()
    }

    /// Shrink the vector so its length is at most `max`
    pub fn clamp_length(&self, max: f64) -> Vector {
        let length = self.length();
        if length <= max {
            *self
        } else if max <= 0.0 {
            Vector::ZERO
        } else {
            self.scale(max / length)
        }
    }
}

/// Axis-aligned extent of a fence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

/// Ranch boundary polygon.
///
/// Vertices are held in wire order, `[lon, lat]`.
#[derive(Debug, Clone, PartialEq)]
pub struct FencePolygon {
    vertices: Vec<[f64; 2]>,
    bounds: Bounds,
}

impl FencePolygon {
    /// Build a fence from `[lon, lat]` pairs. Returns `None` for fewer
    /// than three vertices or any non-finite coordinate.
    pub fn from_coordinates(coordinates: Vec<[f64; 2]>) -> Option<Self> {
        if coordinates.len() < 3 {
            return None;
        }
        if coordinates.iter().any(|[lon, lat]| !lon.is_finite() || !lat.is_finite()) {
            return None;
        }

        let mut bounds = Bounds {
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
        };
        for &[lon, lat] in &coordinates {
            bounds.min_lat = bounds.min_lat.min(lat);
            bounds.max_lat = bounds.max_lat.max(lat);
            bounds.min_lon = bounds.min_lon.min(lon);
            bounds.max_lon = bounds.max_lon.max(lon);
        }

        Some(Self {
            vertices: coordinates,
            bounds,
        })
    }

    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Ray-casting point-in-polygon test
    pub fn contains(&self, point: &GeoPoint) -> bool {
        let mut inside = false;
        let n = self.vertices.len();
        let mut j = n - 1;
        for i in 0..n {
            let [xi, yi] = self.vertices[i];
            let [xj, yj] = self.vertices[j];
            if (yi > point.lat) != (yj > point.lat)
                && point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    /// Shortest distance from the point to any fence edge, in degrees
    pub fn distance_to_edge(&self, point: &GeoPoint) -> f64 {
        let n = self.vertices.len();
        let mut min = f64::INFINITY;
        for i in 0..n {
            let [x1, y1] = self.vertices[i];
            let [x2, y2] = self.vertices[(i + 1) % n];
            let dx = x2 - x1;
            let dy = y2 - y1;
            let length_sq = dx * dx + dy * dy;

            let nearest = if length_sq == 0.0 {
                GeoPoint::new(y1, x1)
            } else {
                let t = (((point.lon - x1) * dx + (point.lat - y1) * dy) / length_sq).clamp(0.0, 1.0);
                GeoPoint::new(y1 + t * dy, x1 + t * dx)
            };
            min = min.min(point.distance(&nearest));
        }
        min
    }
}
