//! Station registry
//!
//! Owns all durable state: the station collection, the selected station id
//! and the efficiency preference flag. Each lives under its own key in a
//! [`KeyValueStore`]; the collection is one JSON array rewritten as a whole.

use chrono::{DateTime, Utc};
use posto_common::{decode_collection, encode_collection, EfficiencyProfile, Station};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::error::{RegistryError, Result};
use crate::store::{BoxKeyValueStore, KeyValueStore};

/// Store key of the station collection
pub const GAS_STATIONS_KEY: &str = "gas_stations";
/// Store key of the selected station id
pub const SELECTED_STATION_ID_KEY: &str = "selected_station_id";
/// Store key of the efficiency preference flag
pub const SWITCH_STATE_KEY: &str = "switch_state";

const DEFAULT_PREFERENCE_FLAG: bool = true;

/// Result of reading the station collection with diagnostics
#[derive(Debug)]
pub struct StationListing {
    pub stations: Vec<Station>,
    /// Set when the stored collection could not be decoded and was read as
    /// empty. The next write replaces it, so this is data loss.
    pub malformed: Option<RegistryError>,
}

impl StationListing {
    fn empty() -> Self {
        Self {
            stations: Vec::new(),
            malformed: None,
        }
    }

    pub fn is_intact(&self) -> bool {
        self.malformed.is_none()
    }
}

/// Snapshot of the registry for export to a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationListExport {
    pub exported_at: DateTime<Utc>,
    pub total_count: usize,
    pub selected_station_id: Option<String>,
    pub high_efficiency: bool,
    pub stations: Vec<Station>,
}

/// Persistent station registry
///
/// Build one at startup and share it by reference (or `Arc`). Every
/// read-modify-write sequence runs under an internal lock, so concurrent
/// callers cannot lose each other's updates.
pub struct StationRegistry<S = BoxKeyValueStore> {
    store: S,
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> StationRegistry<S> {
    pub fn new(store: S) -> Self {
        info!("Station registry opened on {} store", store.name());
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        // The guarded data is `()`, nothing can be left inconsistent
        self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn read_collection(&self) -> Result<StationListing> {
        let Some(raw) = self.store.get(GAS_STATIONS_KEY)? else {
            debug!("No station collection stored yet");
            return Ok(StationListing::empty());
        };

        match decode_collection(&raw) {
            Ok(stations) => Ok(StationListing {
                stations,
                malformed: None,
            }),
            Err(e) => {
                warn!(
                    "Stored station collection is malformed ({}), treating it as empty",
                    e
                );
                Ok(StationListing {
                    stations: Vec::new(),
                    malformed: Some(RegistryError::MalformedPersistedData {
                        key: GAS_STATIONS_KEY.to_string(),
                        reason: e.to_string(),
                    }),
                })
            }
        }
    }

    fn check_finite(station: &Station) -> Result<()> {
        match station.non_finite_field() {
            Some(field) => {
                warn!("Refusing to store station {}: {} is not finite", station.id, field);
                Err(RegistryError::NonFiniteValue {
                    id: station.id.clone(),
                    field,
                })
            }
            None => Ok(()),
        }
    }

    fn write_collection(&self, stations: &[Station]) -> Result<()> {
        let raw = encode_collection(stations)?;
        self.store.put(GAS_STATIONS_KEY, &raw)?;
        debug!("Saved {} stations", stations.len());
        Ok(())
    }

    // ============ Stations ============

    /// All known stations, in insertion order
    ///
    /// A missing or malformed collection reads as empty.
    pub fn list_stations(&self) -> Result<Vec<Station>> {
        Ok(self.read_collection()?.stations)
    }

    /// Like [`list_stations`](Self::list_stations), but reports whether the
    /// stored collection had to be discarded.
    pub fn inspect_stations(&self) -> Result<StationListing> {
        self.read_collection()
    }

    pub fn get_station(&self, id: &str) -> Result<Option<Station>> {
        Ok(self
            .list_stations()?
            .into_iter()
            .find(|station| station.id == id))
    }

    /// Insert or replace a station by id
    ///
    /// A replaced station keeps its position in the collection. Stations
    /// with a NaN or infinite price or coordinate are rejected.
    pub fn save_station(&self, station: Station) -> Result<()> {
        Self::check_finite(&station)?;
        let _guard = self.lock();
        let listing = self.read_collection()?;
        if !listing.is_intact() {
            warn!("Overwriting malformed station collection");
        }
        let mut stations = listing.stations;

        match stations.iter().position(|s| s.id == station.id) {
            Some(index) => {
                debug!("Replacing station {}", station.id);
                stations[index] = station;
            }
            None => {
                info!("Adding station {} ({})", station.name, station.id);
                stations.push(station);
            }
        }

        self.write_collection(&stations)
    }

    /// Replace an existing station
    ///
    /// Returns `false` without writing anything when the id is unknown.
    pub fn update_station(&self, station: Station) -> Result<bool> {
        Self::check_finite(&station)?;
        let _guard = self.lock();
        let mut stations = self.read_collection()?.stations;

        let Some(index) = stations.iter().position(|s| s.id == station.id) else {
            warn!("Cannot update unknown station {}", station.id);
            return Ok(false);
        };

        stations[index] = station;
        self.write_collection(&stations)?;
        Ok(true)
    }

    /// Delete a station, clearing the selection if it pointed at it
    ///
    /// Unknown ids are a no-op. Returns whether a station was removed.
    pub fn delete_station(&self, id: &str) -> Result<bool> {
        let _guard = self.lock();
        let mut stations = self.read_collection()?.stations;

        // Selection goes first so a failure in between never leaves it dangling
        if self.selected_id()?.as_deref() == Some(id) {
            self.store.remove(SELECTED_STATION_ID_KEY)?;
            info!("Cleared selection of deleted station {}", id);
        }

        let before = stations.len();
        stations.retain(|s| s.id != id);
        if stations.len() == before {
            debug!("Delete of unknown station {} ignored", id);
            return Ok(false);
        }

        self.write_collection(&stations)?;
        info!("Deleted station {}", id);
        Ok(true)
    }

    // ============ Selection ============

    pub fn selected_id(&self) -> Result<Option<String>> {
        let id = self.store.get(SELECTED_STATION_ID_KEY)?;
        Ok(id.filter(|id| !id.is_empty()))
    }

    /// Set or clear the selection
    ///
    /// The id is not checked against the collection: a caller may select a
    /// station before saving it.
    pub fn set_selected_id(&self, id: Option<&str>) -> Result<()> {
        let _guard = self.lock();
        match id {
            Some(id) => {
                self.store.put(SELECTED_STATION_ID_KEY, id)?;
                debug!("Selected station {}", id);
            }
            None => {
                self.store.remove(SELECTED_STATION_ID_KEY)?;
                debug!("Selection cleared");
            }
        }
        Ok(())
    }

    /// The selected station, if the selection resolves
    ///
    /// A selection pointing at a missing station reads as no selection.
    pub fn selected_station(&self) -> Result<Option<Station>> {
        let Some(id) = self.selected_id()? else {
            return Ok(None);
        };

        let station = self.get_station(&id)?;
        if station.is_none() {
            debug!("Selected station {} does not exist, treating as no selection", id);
        }
        Ok(station)
    }

    // ============ Preference ============

    /// Efficiency preference flag, `true` when never set
    pub fn preference_flag(&self) -> Result<bool> {
        let Some(raw) = self.store.get(SWITCH_STATE_KEY)? else {
            return Ok(DEFAULT_PREFERENCE_FLAG);
        };

        match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => {
                warn!(
                    "Stored {} value '{}' is not a boolean, using default",
                    SWITCH_STATE_KEY, other
                );
                Ok(DEFAULT_PREFERENCE_FLAG)
            }
        }
    }

    pub fn set_preference_flag(&self, value: bool) -> Result<()> {
        let raw = if value { "true" } else { "false" };
        self.store.put(SWITCH_STATE_KEY, raw)?;
        debug!("Preference flag set to {}", value);
        Ok(())
    }

    pub fn efficiency_profile(&self) -> Result<EfficiencyProfile> {
        Ok(EfficiencyProfile::from(self.preference_flag()?))
    }

    pub fn set_efficiency_profile(&self, profile: EfficiencyProfile) -> Result<()> {
        self.set_preference_flag(profile.high_efficiency)
    }

    // ============ Export ============

    pub fn export_snapshot(&self) -> Result<StationListExport> {
        let stations = self.list_stations()?;

        Ok(StationListExport {
            exported_at: Utc::now(),
            total_count: stations.len(),
            selected_station_id: self.selected_id()?,
            high_efficiency: self.preference_flag()?,
            stations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreError};
    use posto_common::Coordinates;
    use std::sync::Arc;
    use std::thread;

    fn registry() -> StationRegistry<MemoryStore> {
        StationRegistry::new(MemoryStore::new())
    }

    fn station(name: &str, a: f64, b: f64) -> Station {
        Station::new(name, a, b, Coordinates::new(-3.73, -38.52))
    }

    /// Store whose every operation fails
    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> std::result::Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk gone".to_string()))
        }

        fn put(&self, _key: &str, _value: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("disk gone".to_string()))
        }

        fn remove(&self, _key: &str) -> std::result::Result<(), StoreError> {
            Err(StoreError::Unavailable("disk gone".to_string()))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn test_empty_registry() {
        let registry = registry();
        assert!(registry.list_stations().unwrap().is_empty());
        assert_eq!(registry.selected_id().unwrap(), None);
        assert_eq!(registry.selected_station().unwrap(), None);
    }

    #[test]
    fn test_save_and_list() {
        let registry = registry();
        let s = station("Posto A", 4.0, 6.0);

        registry.save_station(s.clone()).unwrap();

        assert_eq!(registry.list_stations().unwrap(), vec![s.clone()]);
        assert_eq!(registry.get_station(&s.id).unwrap(), Some(s));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let registry = registry();
        let a = station("A", 4.0, 6.0);
        let b = station("B", 4.1, 6.1);
        let c = station("C", 4.2, 6.2);
        for s in [&a, &b, &c] {
            registry.save_station(s.clone()).unwrap();
        }

        let b2 = b.with_prices(3.9, 5.9);
        registry.save_station(b2.clone()).unwrap();

        let stations = registry.list_stations().unwrap();
        assert_eq!(stations, vec![a, b2, c]);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let registry = registry();
        let s = station("A", 4.0, 6.0);

        registry.save_station(s.clone()).unwrap();
        let first = registry.store().get(GAS_STATIONS_KEY).unwrap();
        registry.save_station(s.clone()).unwrap();
        let second = registry.store().get(GAS_STATIONS_KEY).unwrap();

        assert_eq!(registry.list_stations().unwrap().len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_update_only_touches_known_ids() {
        let registry = registry();
        let s = station("A", 4.0, 6.0);

        assert!(!registry.update_station(s.clone()).unwrap());
        assert!(registry.store().get(GAS_STATIONS_KEY).unwrap().is_none());

        registry.save_station(s.clone()).unwrap();
        assert!(registry.update_station(s.renamed("A2")).unwrap());
        assert_eq!(registry.get_station(&s.id).unwrap().unwrap().name, "A2");
    }

    #[test]
    fn test_delete_clears_selection() {
        let registry = registry();
        let s = station("A", 4.0, 6.0);
        registry.save_station(s.clone()).unwrap();
        registry.set_selected_id(Some(&s.id)).unwrap();

        assert!(registry.delete_station(&s.id).unwrap());

        assert_eq!(registry.selected_id().unwrap(), None);
        assert!(registry.list_stations().unwrap().is_empty());
    }

    #[test]
    fn test_delete_keeps_other_selection() {
        let registry = registry();
        let a = station("A", 4.0, 6.0);
        let b = station("B", 4.0, 6.0);
        registry.save_station(a.clone()).unwrap();
        registry.save_station(b.clone()).unwrap();
        registry.set_selected_id(Some(&a.id)).unwrap();

        registry.delete_station(&b.id).unwrap();

        assert_eq!(registry.selected_id().unwrap(), Some(a.id.clone()));
        assert_eq!(registry.list_stations().unwrap(), vec![a]);
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let registry = registry();
        let s = station("A", 4.0, 6.0);
        registry.save_station(s.clone()).unwrap();
        registry.set_selected_id(Some(&s.id)).unwrap();
        let raw_before = registry.store().get(GAS_STATIONS_KEY).unwrap();

        assert!(!registry.delete_station("nonexistent").unwrap());

        assert_eq!(registry.store().get(GAS_STATIONS_KEY).unwrap(), raw_before);
        assert_eq!(registry.list_stations().unwrap(), vec![s.clone()]);
        assert_eq!(registry.selected_id().unwrap(), Some(s.id));
    }

    #[test]
    fn test_selection_is_not_validated() {
        let registry = registry();

        registry.set_selected_id(Some("not-yet-saved")).unwrap();
        assert_eq!(registry.selected_id().unwrap().as_deref(), Some("not-yet-saved"));

        // Dangling selection resolves to no station
        assert_eq!(registry.selected_station().unwrap(), None);

        let s = Station {
            id: "not-yet-saved".to_string(),
            ..station("Late", 4.0, 6.0)
        };
        registry.save_station(s.clone()).unwrap();
        assert_eq!(registry.selected_station().unwrap(), Some(s));
    }

    #[test]
    fn test_clear_selection() {
        let registry = registry();
        registry.set_selected_id(Some("x")).unwrap();
        registry.set_selected_id(None).unwrap();
        assert_eq!(registry.selected_id().unwrap(), None);
    }

    #[test]
    fn test_preference_flag_defaults_to_true() {
        let registry = registry();
        assert!(registry.preference_flag().unwrap());
        assert_eq!(registry.efficiency_profile().unwrap(), EfficiencyProfile::HIGH);

        registry.set_preference_flag(false).unwrap();
        assert!(!registry.preference_flag().unwrap());
        assert_eq!(registry.efficiency_profile().unwrap(), EfficiencyProfile::STANDARD);

        registry.set_efficiency_profile(EfficiencyProfile::HIGH).unwrap();
        assert!(registry.preference_flag().unwrap());
    }

    #[test]
    fn test_garbage_preference_flag_uses_default() {
        let registry =
            StationRegistry::new(MemoryStore::with_entries([(SWITCH_STATE_KEY, "maybe")]));
        assert!(registry.preference_flag().unwrap());
    }

    #[test]
    fn test_malformed_collection_reads_as_empty() {
        let registry =
            StationRegistry::new(MemoryStore::with_entries([(GAS_STATIONS_KEY, "{not json")]));

        assert!(registry.list_stations().unwrap().is_empty());

        let listing = registry.inspect_stations().unwrap();
        assert!(!listing.is_intact());
        assert!(matches!(
            listing.malformed,
            Some(RegistryError::MalformedPersistedData { ref key, .. }) if key == GAS_STATIONS_KEY
        ));
    }

    #[test]
    fn test_save_over_malformed_collection() {
        let registry = StationRegistry::new(MemoryStore::with_entries([(
            GAS_STATIONS_KEY,
            r#"[{"id":"x","nome":"missing prices"}]"#,
        )]));
        let s = station("A", 4.0, 6.0);

        registry.save_station(s.clone()).unwrap();

        assert_eq!(registry.list_stations().unwrap(), vec![s]);
        assert!(registry.inspect_stations().unwrap().is_intact());
    }

    #[test]
    fn test_storage_failures_propagate() {
        let registry = StationRegistry::new(BrokenStore);

        assert!(matches!(
            registry.list_stations(),
            Err(RegistryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            registry.save_station(station("A", 1.0, 2.0)),
            Err(RegistryError::StorageUnavailable(_))
        ));
        assert!(matches!(
            registry.set_selected_id(Some("x")),
            Err(RegistryError::StorageUnavailable(_))
        ));
        assert!(registry.preference_flag().is_err());
    }

    #[test]
    fn test_non_finite_station_is_rejected_without_writing() {
        let registry = registry();
        let good = station("Good", 4.0, 6.0);
        registry.save_station(good.clone()).unwrap();
        let before = registry.store().get(GAS_STATIONS_KEY).unwrap();

        let err = registry.save_station(station("Bad", f64::NAN, 6.0)).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::NonFiniteValue {
                field: "precoAlcool",
                ..
            }
        ));

        let mut far = good.clone();
        far.coordinates.latitude = f64::INFINITY;
        assert!(matches!(
            registry.update_station(far),
            Err(RegistryError::NonFiniteValue {
                field: "latitude",
                ..
            })
        ));
        assert!(registry.update_station(good.with_prices(4.0, f64::NEG_INFINITY)).is_err());

        assert_eq!(registry.store().get(GAS_STATIONS_KEY).unwrap(), before);
        assert_eq!(registry.list_stations().unwrap(), vec![good]);
        assert!(registry.inspect_stations().unwrap().is_intact());
    }

    #[test]
    fn test_full_precision_values_round_trip() {
        let registry = registry();
        let mut state: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut next = |scale: f64, offset: f64| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 * scale + offset
        };

        let mut saved = vec![Station::new(
            "Fixed",
            4.190000000000001,
            5.989999999999999,
            Coordinates::new(14.659028627386789, -38.52671234567891),
        )];
        for i in 0..200 {
            saved.push(Station::new(
                format!("S{}", i),
                next(10.0, 0.5),
                next(10.0, 0.5),
                Coordinates::new(next(180.0, -90.0), next(360.0, -180.0)),
            ));
        }
        for s in &saved {
            registry.save_station(s.clone()).unwrap();
        }

        for s in &saved {
            assert_eq!(registry.get_station(&s.id).unwrap().as_ref(), Some(s));
        }
        assert_eq!(registry.list_stations().unwrap(), saved);
    }

    #[test]
    fn test_concurrent_upserts_are_not_lost() {
        let registry = Arc::new(registry());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for i in 0..10 {
                        let s = station(&format!("T{}-{}", t, i), 4.0, 6.0);
                        registry.save_station(s).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.list_stations().unwrap().len(), 80);
    }

    #[test]
    fn test_export_snapshot() {
        let registry = registry();
        let s = station("A", 4.0, 6.0);
        registry.save_station(s.clone()).unwrap();
        registry.set_selected_id(Some(&s.id)).unwrap();
        registry.set_preference_flag(false).unwrap();

        let export = registry.export_snapshot().unwrap();

        assert_eq!(export.total_count, 1);
        assert_eq!(export.selected_station_id, Some(s.id.clone()));
        assert!(!export.high_efficiency);
        assert_eq!(export.stations, vec![s]);

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"exported_at\""));
    }
}
