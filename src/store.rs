use crate::cluster::ClusterHistogram;
use crate::error::StoreError;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use vegetation_common::Trajectory;

const TRAJECTORY_PREFIX: &str = "simulation_";
const HISTOGRAM_PREFIX: &str = "cluster_data_";

/// On-disk encoding for stored records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Json,
    Bincode,
    MessagePack,
}

impl StorageFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(StorageFormat::Json),
            "bincode" => Some(StorageFormat::Bincode),
            "messagepack" => Some(StorageFormat::MessagePack),
            _ => None,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            StorageFormat::Json => "json",
            StorageFormat::Bincode => "bin",
            StorageFormat::MessagePack => "msgpack",
        }
    }
}

/// Append-only store of simulation trajectories and their per-step cluster
/// histogram series, one directory per store.
///
/// Identifiers are assigned by a counter owned by the store: it is seeded
/// once from the record files present when the store is opened and advances
/// in memory afterwards, with `store_trajectory` returning the id it
/// assigned. A directory holds records of a single format.
pub struct SimulationStore {
    dir: PathBuf,
    format: StorageFormat,
    next_id: u64,
}

impl SimulationStore {
    /// Opens the store directory, creating it if needed, and seeds the id
    /// counter from the trajectory records already present.
    pub fn open(dir: impl AsRef<Path>, format: StorageFormat) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let suffix = format!(".{}", format.extension());
        let mut next_id = 0u64;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TRAJECTORY_PREFIX) && name.ends_with(&suffix) {
                next_id += 1;
            }
        }

        debug!(
            "Opened simulation store at {} with {} record(s).",
            dir.display(),
            next_id
        );
        Ok(SimulationStore {
            dir,
            format,
            next_id,
        })
    }

    /// Number of stored simulations.
    pub fn len(&self) -> u64 {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Appends a trajectory and returns the identifier assigned to it.
    pub fn store_trajectory(&mut self, trajectory: &Trajectory) -> Result<u64, StoreError> {
        let id = self.next_id;
        self.write_record(&self.trajectory_path(id), trajectory)?;
        self.next_id += 1;
        Ok(id)
    }

    /// Loads the trajectory stored under `id`.
    pub fn load_trajectory(&self, id: u64) -> Result<Trajectory, StoreError> {
        self.check_index(id)?;
        self.read_record(&self.trajectory_path(id))
    }

    /// Persists the per-step histogram series of the simulation `id`.
    pub fn store_histograms(
        &self,
        histograms: &[ClusterHistogram],
        id: u64,
    ) -> Result<(), StoreError> {
        self.check_index(id)?;
        self.write_record(&self.histogram_path(id), &histograms)
    }

    /// Loads the histogram series of the simulation `id`.
    pub fn load_histograms(&self, id: u64) -> Result<Vec<ClusterHistogram>, StoreError> {
        self.check_index(id)?;
        self.read_record(&self.histogram_path(id))
    }

    fn check_index(&self, id: u64) -> Result<(), StoreError> {
        if id >= self.next_id {
            return Err(StoreError::InvalidIndex {
                requested: id,
                available: self.next_id,
            });
        }
        Ok(())
    }

    fn trajectory_path(&self, id: u64) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", TRAJECTORY_PREFIX, id, self.format.extension()))
    }

    fn histogram_path(&self, id: u64) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", HISTOGRAM_PREFIX, id, self.format.extension()))
    }

    fn write_record<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        match self.format {
            StorageFormat::Json => serde_json::to_writer(&mut writer, value)?,
            StorageFormat::Bincode => bincode::serialize_into(&mut writer, value)?,
            StorageFormat::MessagePack => rmp_serde::encode::write(&mut writer, value)?,
        }
        writer.flush()?;
        Ok(())
    }

    fn read_record<T: DeserializeOwned>(&self, path: &Path) -> Result<T, StoreError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        match self.format {
            StorageFormat::Json => Ok(serde_json::from_reader(reader)?),
            StorageFormat::Bincode => Ok(bincode::deserialize_from(reader)?),
            StorageFormat::MessagePack => Ok(rmp_serde::decode::from_read(reader)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::label_clusters;
    use vegetation_common::Lattice;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "vegetation-store-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_trajectory() -> Trajectory {
        let mut trajectory = Trajectory::new(4);
        let mut lattice = Lattice::bare(4);
        lattice.set(0, 0, 1);
        lattice.set(0, 1, 1);
        trajectory.push(lattice.clone());
        lattice.set(3, 3, 1);
        trajectory.push(lattice);
        trajectory
    }

    #[test]
    fn round_trips_every_format() {
        for format in [
            StorageFormat::Json,
            StorageFormat::Bincode,
            StorageFormat::MessagePack,
        ] {
            let dir = scratch_dir(format.extension());
            let trajectory = sample_trajectory();

            let mut store = SimulationStore::open(&dir, format).unwrap();
            let id = store.store_trajectory(&trajectory).unwrap();
            assert_eq!(id, 0);

            let loaded = store.load_trajectory(id).unwrap();
            assert_eq!(loaded, trajectory);

            let histograms: Vec<_> = trajectory
                .snapshots()
                .iter()
                .map(|lattice| label_clusters(lattice, true))
                .collect();
            store.store_histograms(&histograms, id).unwrap();
            assert_eq!(store.load_histograms(id).unwrap(), histograms);

            let _ = fs::remove_dir_all(&dir);
        }
    }

    #[test]
    fn identifiers_are_assigned_monotonically() {
        let dir = scratch_dir("monotonic");
        let trajectory = sample_trajectory();

        let mut store = SimulationStore::open(&dir, StorageFormat::Json).unwrap();
        assert_eq!(store.store_trajectory(&trajectory).unwrap(), 0);
        assert_eq!(store.store_trajectory(&trajectory).unwrap(), 1);
        assert_eq!(store.len(), 2);

        // Reopening seeds the counter from the records on disk.
        let mut reopened = SimulationStore::open(&dir, StorageFormat::Json).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.store_trajectory(&trajectory).unwrap(), 2);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_identifiers_are_rejected() {
        let dir = scratch_dir("missing");
        let store = SimulationStore::open(&dir, StorageFormat::Bincode).unwrap();
        assert!(store.is_empty());
        assert!(matches!(
            store.load_trajectory(0),
            Err(StoreError::InvalidIndex {
                requested: 0,
                available: 0
            })
        ));
        assert!(matches!(
            store.store_histograms(&[], 3),
            Err(StoreError::InvalidIndex { requested: 3, .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
