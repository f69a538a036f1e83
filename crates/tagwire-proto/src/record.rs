use serde::{Deserialize, Serialize};

/// Status string acknowledging a Post request.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Point location of a find.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    /// Geometry type, e.g. `Point`.
    pub kind: String,
    /// Longitude/latitude pair for points.
    pub coordinates: Vec<f64>,
}

/// One meteorite landing record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeteoriteLanding {
    pub id: u32,
    pub name: String,
    /// `Valid` or `Relict`.
    pub name_type: String,
    /// Meteorite classification, e.g. `L5`.
    pub rec_class: String,
    /// Mass in grams.
    pub mass: f64,
    /// `Fell` or `Found`.
    pub fall: String,
    pub year: i32,
    pub rec_lat: f64,
    pub rec_long: f64,
    pub geo_location: Option<GeoLocation>,
}

/// Bulk container: every record in one blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeteoriteLandingList {
    pub meteorite_landings: Vec<MeteoriteLanding>,
}

impl From<Vec<MeteoriteLanding>> for MeteoriteLandingList {
    fn from(meteorite_landings: Vec<MeteoriteLanding>) -> Self {
        Self { meteorite_landings }
    }
}

/// Acknowledgment payload of Post requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    /// The `SUCCESS` acknowledgment.
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
        }
    }
}
