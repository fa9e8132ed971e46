//! Fuel-economy decision
//!
//! Decides whether ethanol (fuel A) or gasoline (fuel B) is the better buy
//! from the ratio of their prices. Pure, no storage involved.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Station;

/// Ratio threshold for high-efficiency engines
pub const HIGH_EFFICIENCY_THRESHOLD: f64 = 0.75;

/// Ratio threshold for standard engines
pub const STANDARD_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    /// Fuel A
    #[serde(rename = "ethanol")]
    Ethanol,
    /// Fuel B
    #[serde(rename = "gasoline")]
    Gasoline,
}

impl FuelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FuelType::Ethanol => "ethanol",
            FuelType::Gasoline => "gasoline",
        }
    }
}

impl std::fmt::Display for FuelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which threshold the decision uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfficiencyProfile {
    pub high_efficiency: bool,
}

impl EfficiencyProfile {
    pub const HIGH: Self = Self { high_efficiency: true };
    pub const STANDARD: Self = Self { high_efficiency: false };

    pub fn threshold(&self) -> f64 {
        if self.high_efficiency {
            HIGH_EFFICIENCY_THRESHOLD
        } else {
            STANDARD_THRESHOLD
        }
    }
}

impl Default for EfficiencyProfile {
    fn default() -> Self {
        Self::HIGH
    }
}

impl From<bool> for EfficiencyProfile {
    fn from(high_efficiency: bool) -> Self {
        Self { high_efficiency }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecisionError {
    #[error("insufficient input: {fuel} price must be a positive number, got {value}")]
    InvalidInput { fuel: FuelType, value: f64 },
}

/// Outcome of a decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recommendation {
    pub advantage: FuelType,
    /// Unrounded price ratio (fuel A / fuel B)
    pub ratio: f64,
    pub threshold: f64,
}

impl Recommendation {
    /// Ratio rounded to two decimals, for display only
    pub fn display_ratio(&self) -> f64 {
        (self.ratio * 100.0).round() / 100.0
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.advantage {
            FuelType::Ethanol => "Ethanol",
            FuelType::Gasoline => "Gasoline",
        };
        write!(
            f,
            "{} is the better buy (ratio {:.2}, threshold {:.2})",
            label,
            self.display_ratio(),
            self.threshold
        )
    }
}

fn check_price(fuel: FuelType, value: f64) -> Result<(), DecisionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DecisionError::InvalidInput { fuel, value })
    }
}

/// Recommend a fuel from the two prices
///
/// The threshold comparison always uses the unrounded ratio.
pub fn recommend(
    price_fuel_a: f64,
    price_fuel_b: f64,
    profile: EfficiencyProfile,
) -> Result<Recommendation, DecisionError> {
    check_price(FuelType::Ethanol, price_fuel_a)?;
    check_price(FuelType::Gasoline, price_fuel_b)?;

    let ratio = price_fuel_a / price_fuel_b;
    let threshold = profile.threshold();
    let advantage = if ratio <= threshold {
        FuelType::Ethanol
    } else {
        FuelType::Gasoline
    };

    Ok(Recommendation {
        advantage,
        ratio,
        threshold,
    })
}

/// Recommend a fuel from a station's current prices
pub fn recommend_for(
    station: &Station,
    profile: EfficiencyProfile,
) -> Result<Recommendation, DecisionError> {
    recommend(station.price_fuel_a, station.price_fuel_b, profile)
}
