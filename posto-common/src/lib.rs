pub mod decision;
pub mod types;

pub use decision::{
    recommend, recommend_for, DecisionError, EfficiencyProfile, FuelType, Recommendation,
};
pub use types::{decode_collection, encode_collection, Coordinates, Station, StationDraft};
