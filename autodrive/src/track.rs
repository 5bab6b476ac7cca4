use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use drive_protocol::BoundaryGeometry;

/// An obstacle segment in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec2,
    pub end: Vec2,
}

/// Boundary geometry in the simulation's native vector form: the drivable
/// region between `outer` and `inner`, plus free-standing obstacle segments.
/// Immutable for the lifetime of a driving session.
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    pub outer: Vec<Vec2>,
    pub inner: Vec<Vec2>,
    pub obstacles: Vec<Segment>,
}

impl Boundary {
    pub fn from_wire(geometry: &BoundaryGeometry) -> Self {
        Self {
            outer: geometry
                .outer_polygon
                .iter()
                .map(|p| Vec2::new(p.x, p.y))
                .collect(),
            inner: geometry
                .inner_polygon
                .iter()
                .map(|p| Vec2::new(p.x, p.y))
                .collect(),
            obstacles: geometry
                .obstacles
                .iter()
                .map(|o| Segment {
                    start: Vec2::new(o.start.x, o.start.y),
                    end: Vec2::new(o.end.x, o.end.y),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize track: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// On-disk track file: metadata plus the boundary geometry payload exactly
/// as the authoring tool exports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFile {
    #[serde(default = "default_name")]
    pub name: String,
    /// Car start point.
    pub start: [f32; 2],
    #[serde(flatten)]
    pub geometry: BoundaryGeometry,
}

fn default_name() -> String {
    "Untitled".to_string()
}

impl TrackFile {
    /// Load a track from a JSON file.
    pub fn load(path: &Path) -> Result<Self, TrackError> {
        let text = std::fs::read_to_string(path).map_err(|source| TrackError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| TrackError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Save this track to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), TrackError> {
        let text = serde_json::to_string_pretty(self).map_err(TrackError::Serialize)?;
        std::fs::write(path, text).map_err(|source| TrackError::Write {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn into_track(self) -> Track {
        Track {
            boundary: Boundary::from_wire(&self.geometry),
            start: Vec2::new(self.start[0], self.start[1]),
            name: self.name,
        }
    }
}

/// A loaded track, ready to drive on.
#[derive(Debug, Clone)]
pub struct Track {
    pub name: String,
    pub start: Vec2,
    pub boundary: Boundary,
}
