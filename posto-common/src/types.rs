use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic position of a station
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// A registered fuel station
///
/// Field names on the wire keep the layout already present in user data
/// (`nome`, `precoGasolina`, `precoAlcool`, `coordenadas`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Unique id, minted once at creation
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    /// Gasoline-type price (fuel B)
    #[serde(rename = "precoGasolina")]
    pub price_fuel_b: f64,

    /// Ethanol-type price (fuel A)
    #[serde(rename = "precoAlcool")]
    pub price_fuel_a: f64,

    #[serde(rename = "coordenadas")]
    pub coordinates: Coordinates,
}

impl Station {
    /// Create a new station with a freshly generated id
    pub fn new(
        name: impl Into<String>,
        price_fuel_a: f64,
        price_fuel_b: f64,
        coordinates: Coordinates,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            price_fuel_b,
            price_fuel_a,
            coordinates,
        }
    }

    /// Copy of this station with new prices, same id and location
    pub fn with_prices(&self, price_fuel_a: f64, price_fuel_b: f64) -> Self {
        Self {
            price_fuel_a,
            price_fuel_b,
            ..self.clone()
        }
    }

    /// Name of the first price or coordinate that is NaN or infinite
    ///
    /// JSON has no encoding for those values, so such a station cannot be
    /// persisted.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("precoAlcool", self.price_fuel_a),
            ("precoGasolina", self.price_fuel_b),
            ("latitude", self.coordinates.latitude),
            ("longitude", self.coordinates.longitude),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(field, _)| field)
    }

    /// Copy of this station under a different name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// User input for a station that does not exist yet
#[derive(Debug, Clone, PartialEq)]
pub struct StationDraft {
    pub name: String,
    pub price_fuel_a: f64,
    pub price_fuel_b: f64,
}

impl StationDraft {
    pub fn new(name: impl Into<String>, price_fuel_a: f64, price_fuel_b: f64) -> Self {
        Self {
            name: name.into(),
            price_fuel_a,
            price_fuel_b,
        }
    }

    /// Turn the draft into a station located at `coordinates`
    pub fn into_station(self, coordinates: Coordinates) -> Station {
        Station::new(self.name, self.price_fuel_a, self.price_fuel_b, coordinates)
    }
}

/// Decode a persisted station collection
///
/// Any shape mismatch (wrong type, missing field, not an array) is an error;
/// classifying it is left to the caller.
pub fn decode_collection(raw: &str) -> serde_json::Result<Vec<Station>> {
    serde_json::from_str(raw)
}

/// Encode a station collection for persistence
pub fn encode_collection(stations: &[Station]) -> serde_json::Result<String> {
    serde_json::to_string(stations)
}
