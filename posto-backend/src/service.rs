use posto_common::{
    recommend, recommend_for, Coordinates, Recommendation, Station, StationDraft,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::registry::StationRegistry;
use crate::store::{BoxKeyValueStore, KeyValueStore};

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Input of a price comparison
#[derive(Debug, Clone, PartialEq)]
pub struct CalculateRequest {
    pub price_fuel_a: f64,
    pub price_fuel_b: f64,
    /// When set (and not blank) the prices are saved under this station name
    pub station_name: Option<String>,
    /// Location used if the prices end up in a new station
    pub location: Option<Coordinates>,
}

/// Outcome of a price comparison
#[derive(Debug, Clone, PartialEq)]
pub struct Calculation {
    pub recommendation: Recommendation,
    /// Station the prices were saved to, if any
    pub saved: Option<Station>,
}

fn check_name(name: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidName);
    }
    Ok(name.to_string())
}

fn check_price(field: &'static str, value: f64) -> ServiceResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ServiceError::InvalidPrice { field, value })
    }
}

/// Station workflows on top of the registry and the decision engine
pub struct FuelService<S = BoxKeyValueStore> {
    registry: Arc<StationRegistry<S>>,
}

impl<S: KeyValueStore> FuelService<S> {
    pub fn new(registry: Arc<StationRegistry<S>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &StationRegistry<S> {
        &self.registry
    }

    /// Register a new station at `location` and select it
    pub fn add_station(
        &self,
        draft: StationDraft,
        location: Option<Coordinates>,
    ) -> ServiceResult<Station> {
        let name = check_name(&draft.name)?;
        let price_fuel_a = check_price("ethanol", draft.price_fuel_a)?;
        let price_fuel_b = check_price("gasoline", draft.price_fuel_b)?;
        let coordinates = location.ok_or(ServiceError::LocationUnavailable)?;

        let station = StationDraft::new(name, price_fuel_a, price_fuel_b).into_station(coordinates);
        self.registry.save_station(station.clone())?;
        self.registry.set_selected_id(Some(&station.id))?;

        info!("Registered and selected station {} ({})", station.name, station.id);
        Ok(station)
    }

    /// Change name and/or prices of an existing station
    ///
    /// Id and coordinates are kept; the selection is left alone.
    pub fn edit_station(
        &self,
        id: &str,
        name: Option<&str>,
        price_fuel_a: Option<f64>,
        price_fuel_b: Option<f64>,
    ) -> ServiceResult<Station> {
        let current = self
            .registry
            .get_station(id)?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        let name = match name {
            Some(name) => check_name(name)?,
            None => current.name.clone(),
        };
        let price_fuel_a = check_price("ethanol", price_fuel_a.unwrap_or(current.price_fuel_a))?;
        let price_fuel_b = check_price("gasoline", price_fuel_b.unwrap_or(current.price_fuel_b))?;

        let updated = current
            .with_prices(price_fuel_a, price_fuel_b)
            .renamed(name);
        if !self.registry.update_station(updated.clone())? {
            // Deleted between the lookup and the update
            return Err(ServiceError::NotFound(id.to_string()));
        }

        info!("Updated station {}", id);
        Ok(updated)
    }

    /// Select a station by id
    ///
    /// The selection is stored even for unknown ids; the return value says
    /// whether it currently resolves to a station.
    pub fn select_station(&self, id: &str) -> ServiceResult<bool> {
        self.registry.set_selected_id(Some(id))?;
        let exists = self.registry.get_station(id)?.is_some();
        if !exists {
            warn!("Selected id {} does not match any station", id);
        }
        Ok(exists)
    }

    /// Selected station together with its recommendation
    pub fn selected_recommendation(&self) -> ServiceResult<Option<(Station, Recommendation)>> {
        let Some(station) = self.registry.selected_station()? else {
            return Ok(None);
        };
        let profile = self.registry.efficiency_profile()?;
        let recommendation = recommend_for(&station, profile)?;
        Ok(Some((station, recommendation)))
    }

    /// Compare prices with the stored efficiency profile
    ///
    /// With a station name, the prices are written to the selected station
    /// (or to a new one when a location is given and nothing is selected),
    /// which then becomes the selection.
    pub fn calculate(&self, request: CalculateRequest) -> ServiceResult<Calculation> {
        let profile = self.registry.efficiency_profile()?;
        let recommendation = recommend(request.price_fuel_a, request.price_fuel_b, profile)?;

        let name = match request.station_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Ok(Calculation {
                    recommendation,
                    saved: None,
                });
            }
        };

        let station = match (self.registry.selected_station()?, request.location) {
            (Some(selected), location) => Station {
                coordinates: location.unwrap_or(selected.coordinates),
                ..selected
                    .with_prices(request.price_fuel_a, request.price_fuel_b)
                    .renamed(name)
            },
            (None, Some(location)) => {
                StationDraft::new(name, request.price_fuel_a, request.price_fuel_b)
                    .into_station(location)
            }
            (None, None) => {
                warn!("No selected station and no location, prices not saved");
                return Ok(Calculation {
                    recommendation,
                    saved: None,
                });
            }
        };

        self.registry.save_station(station.clone())?;
        self.registry.set_selected_id(Some(&station.id))?;

        Ok(Calculation {
            recommendation,
            saved: Some(station),
        })
    }
}
