use serde::{Deserialize, Serialize};

/// A projected map coordinate (Web Mercator metres for the KGIS layers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box used for spatial-intersection queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Bit-exact key for an envelope, usable in hash maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvelopeKey([u64; 4]);

impl Envelope {
    /// Bounding box of `points`, grown by `margin` on every side.
    /// Returns `None` for an empty slice.
    pub fn around(points: &[Coordinate], margin: f64) -> Option<Self> {
        let first = points.first()?;
        let mut env = Self {
            xmin: first.x,
            ymin: first.y,
            xmax: first.x,
            ymax: first.y,
        };
        for p in &points[1..] {
            env.xmin = env.xmin.min(p.x);
            env.ymin = env.ymin.min(p.y);
            env.xmax = env.xmax.max(p.x);
            env.ymax = env.ymax.max(p.y);
        }
        Some(env.expand(margin))
    }

    pub fn expand(self, margin: f64) -> Self {
        Self {
            xmin: self.xmin - margin,
            ymin: self.ymin - margin,
            xmax: self.xmax + margin,
            ymax: self.ymax + margin,
        }
    }

    pub fn key(&self) -> EnvelopeKey {
        EnvelopeKey([
            self.xmin.to_bits(),
            self.ymin.to_bits(),
            self.xmax.to_bits(),
            self.ymax.to_bits(),
        ])
    }

    /// ArcGIS envelope geometry JSON with the given spatial reference.
    pub fn to_arcgis_json(&self, wkid: u32) -> String {
        serde_json::json!({
            "xmin": self.xmin,
            "ymin": self.ymin,
            "xmax": self.xmax,
            "ymax": self.ymax,
            "spatialReference": { "wkid": wkid },
        })
        .to_string()
    }
}
