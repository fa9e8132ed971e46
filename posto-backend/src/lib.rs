pub mod cli;
pub mod config;
pub mod error;
pub mod input;
pub mod logging;
pub mod registry;
pub mod service;
pub mod store;

pub use error::{RegistryError, ServiceError};
pub use registry::{StationListExport, StationListing, StationRegistry};
pub use service::{CalculateRequest, Calculation, FuelService};
