//! Command-line front end
//!
//! Parses arguments, turns raw text into typed values and renders results.
//! All state changes go through [`FuelService`] and
//! [`StationRegistry`](crate::registry::StationRegistry).

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use posto_common::{Coordinates, Station, StationDraft};
use std::io::Write;
use std::path::PathBuf;

use crate::input::parse_price;
use crate::service::{CalculateRequest, FuelService};
use crate::store::KeyValueStore;

/// Posto: fuel station registry and ethanol-or-gasoline calculator
#[derive(Debug, Parser)]
#[command(name = "posto", version, about)]
pub struct Cli {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(long, global = true, default_value = "posto.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List registered stations
    List,
    /// Register a new station and select it
    Add {
        #[arg(long)]
        name: String,
        /// Ethanol price (comma or dot decimals)
        #[arg(long)]
        ethanol: String,
        /// Gasoline price (comma or dot decimals)
        #[arg(long)]
        gasoline: String,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Change name or prices of a station
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        ethanol: Option<String>,
        #[arg(long)]
        gasoline: Option<String>,
    },
    /// Delete a station
    Delete { id: String },
    /// Select a station
    Select { id: String },
    /// Clear the selection
    Unselect,
    /// Show the selected station and its recommendation
    Show,
    /// Compare prices (defaults to the selected station's prices)
    Calc {
        #[arg(long)]
        ethanol: Option<String>,
        #[arg(long)]
        gasoline: Option<String>,
        /// Save the prices under this station name
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Show or change the high-efficiency (75%) threshold setting
    Efficiency {
        #[arg(value_enum, default_value = "status")]
        mode: EfficiencyMode,
    },
    /// Export all stations as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Location as reported by the caller
#[derive(Debug, Clone, Args)]
pub struct LocationArgs {
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

impl LocationArgs {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(Coordinates::new(lat, lon))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EfficiencyMode {
    On,
    Off,
    Status,
}

fn price_arg(label: &str, text: &str) -> Result<f64> {
    parse_price(text).ok_or_else(|| anyhow!("invalid {} price: '{}'", label, text))
}

fn optional_price_arg(label: &str, text: Option<&str>) -> Result<Option<f64>> {
    text.map(|t| price_arg(label, t)).transpose()
}

fn format_station(station: &Station, selected: bool) -> String {
    format!(
        "{} {}  {}\n    ethanol {:.2}  gasoline {:.2}  at {}",
        if selected { "*" } else { " " },
        station.id,
        station.name,
        station.price_fuel_a,
        station.price_fuel_b,
        station.coordinates
    )
}

/// Run one command, writing user-facing output to `out`
pub fn run<S, W>(service: &FuelService<S>, command: Command, out: &mut W) -> Result<()>
where
    S: KeyValueStore,
    W: Write,
{
    let registry = service.registry();

    match command {
        Command::List => {
            let listing = registry.inspect_stations()?;
            if let Some(err) = &listing.malformed {
                writeln!(out, "warning: {} (stored stations were discarded)", err)?;
            }
            if listing.stations.is_empty() {
                writeln!(out, "No stations registered.")?;
            }
            let selected = registry.selected_id()?;
            for station in &listing.stations {
                let is_selected = selected.as_deref() == Some(station.id.as_str());
                writeln!(out, "{}", format_station(station, is_selected))?;
            }
        }
        Command::Add {
            name,
            ethanol,
            gasoline,
            location,
        } => {
            let draft = StationDraft::new(
                name,
                price_arg("ethanol", &ethanol)?,
                price_arg("gasoline", &gasoline)?,
            );
            let station = service.add_station(draft, location.coordinates())?;
            writeln!(out, "Added and selected {} ({})", station.name, station.id)?;
        }
        Command::Edit {
            id,
            name,
            ethanol,
            gasoline,
        } => {
            let station = service.edit_station(
                &id,
                name.as_deref(),
                optional_price_arg("ethanol", ethanol.as_deref())?,
                optional_price_arg("gasoline", gasoline.as_deref())?,
            )?;
            let is_selected = registry.selected_id()?.as_deref() == Some(id.as_str());
            writeln!(out, "{}", format_station(&station, is_selected))?;
        }
        Command::Delete { id } => {
            if registry.delete_station(&id)? {
                writeln!(out, "Deleted {}", id)?;
            } else {
                writeln!(out, "No station with id {}", id)?;
            }
        }
        Command::Select { id } => {
            if service.select_station(&id)? {
                writeln!(out, "Selected {}", id)?;
            } else {
                writeln!(out, "Selected {} (no such station yet)", id)?;
            }
        }
        Command::Unselect => {
            registry.set_selected_id(None)?;
            writeln!(out, "Selection cleared")?;
        }
        Command::Show => match service.selected_recommendation()? {
            Some((station, recommendation)) => {
                writeln!(out, "{}", format_station(&station, true))?;
                writeln!(out, "{}", recommendation)?;
            }
            None => writeln!(out, "No station selected.")?,
        },
        Command::Calc {
            ethanol,
            gasoline,
            name,
            location,
        } => {
            let selected = registry.selected_station()?;
            let price_fuel_a = match optional_price_arg("ethanol", ethanol.as_deref())? {
                Some(price) => price,
                None => selected
                    .as_ref()
                    .map(|s| s.price_fuel_a)
                    .context("no ethanol price given and no station selected")?,
            };
            let price_fuel_b = match optional_price_arg("gasoline", gasoline.as_deref())? {
                Some(price) => price,
                None => selected
                    .as_ref()
                    .map(|s| s.price_fuel_b)
                    .context("no gasoline price given and no station selected")?,
            };

            let calculation = service.calculate(CalculateRequest {
                price_fuel_a,
                price_fuel_b,
                station_name: name,
                location: location.coordinates(),
            })?;
            writeln!(out, "{}", calculation.recommendation)?;
            if let Some(station) = calculation.saved {
                writeln!(out, "Saved prices to {} ({})", station.name, station.id)?;
            }
        }
        Command::Efficiency { mode } => {
            match mode {
                EfficiencyMode::On => registry.set_preference_flag(true)?,
                EfficiencyMode::Off => registry.set_preference_flag(false)?,
                EfficiencyMode::Status => {}
            }
            let profile = registry.efficiency_profile()?;
            writeln!(
                out,
                "High efficiency: {} (threshold {:.2})",
                if profile.high_efficiency { "on" } else { "off" },
                profile.threshold()
            )?;
        }
        Command::Export { output } => {
            let export = registry.export_snapshot()?;
            let json = serde_json::to_string_pretty(&export)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write export to {:?}", path))?;
                    writeln!(out, "Exported {} stations to {:?}", export.total_count, path)?;
                }
                None => writeln!(out, "{}", json)?,
            }
        }
    }

    Ok(())
}

/// Reject argument combinations clap cannot express
pub fn validate(command: &Command) -> Result<()> {
    if let Command::Edit {
        name: None,
        ethanol: None,
        gasoline: None,
        ..
    } = command
    {
        bail!("nothing to edit: pass --name, --ethanol or --gasoline");
    }
    Ok(())
}
