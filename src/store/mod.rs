//! persisted client state
//!
//! stores are serialized as `{"state": ..., "version": 0}` under a fixed name in a
//! [`StateStorage`] backend. the hydration flag is never persisted and always starts out false
use {
    crate::{bail, error::*, getopt},
    chrono::Utc,
    hashbrown::HashMap,
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    std::{
        fs,
        io::ErrorKind,
        path::PathBuf,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tracing::{debug, warn},
};

pub mod preferences;
pub mod results;

/// a key-value backend for persisted stores
pub trait StateStorage: Send + Sync {
    /// read a stored value
    fn get_item(&self, name: &str) -> Result<Option<String>>;
    /// write a value
    fn set_item(&self, name: &str, value: &str) -> Result<()>;
    /// forget a value
    fn remove_item(&self, name: &str) -> Result<()>;
}

/// what a [`FileStorage`] actually writes to disk
#[derive(Serialize, Deserialize, Debug)]
struct StoredRecord {
    /// unix timestamp (seconds) after which the record is ignored
    expires: i64,
    /// the serialized store
    value: String,
}

/// stores every record as `<dir>/<name>.json`, each with an expiry
#[derive(Clone, Debug)]
pub struct FileStorage {
    /// where records live
    dir: PathBuf,
    /// how long a record stays valid
    expiry: Duration,
}

impl FileStorage {
    /// store records in `dir`, each valid for `expiry` after it's written
    pub fn new(dir: impl Into<PathBuf>, expiry: Duration) -> Self {
        Self {
            dir: dir.into(),
            expiry,
        }
    }

    /// a storage using the configured directory and expiry
    pub fn from_config() -> Result<Self> {
        let dir = match getopt!(raw storage.dir) {
            Some(dir) => PathBuf::from(dir),
            None => match dirs::data_dir() {
                Some(dir) => dir.join("base34"),
                None => bail!("Unable to determine the data directory"),
            },
        };
        let days = getopt!(storage.expiry_days);

        Ok(Self::new(dir, Duration::from_secs(days.saturating_mul(24 * 60 * 60))))
    }

    /// the file a record is kept in
    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }
}

impl StateStorage for FileStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        let path = self.path_for(name);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: StoredRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(name, error = %e, "ignoring unreadable stored record");
                return Ok(None);
            }
        };

        if record.expires <= Utc::now().timestamp() {
            debug!(name, "stored record expired");
            self.remove_item(name)?;
            return Ok(None);
        }

        Ok(Some(record.value))
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let record = StoredRecord {
            expires: Utc::now()
                .timestamp()
                .saturating_add(i64::try_from(self.expiry.as_secs()).unwrap_or(i64::MAX)),
            value: value.to_string(),
        };

        fs::write(self.path_for(name), serde_json::to_string(&record)?)?;
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_for(name)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// keeps everything in memory, for tests and throwaway sessions
#[derive(Default, Debug)]
pub struct MemoryStorage {
    /// the records
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// lock the records
    fn items(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.items
            .lock()
            .map_err(|e| B34Error::from(format!("storage lock poisoned: {}", e)))
    }
}

impl StateStorage for MemoryStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>> {
        Ok(self.items()?.get(name).cloned())
    }

    fn set_item(&self, name: &str, value: &str) -> Result<()> {
        self.items()?.insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, name: &str) -> Result<()> {
        self.items()?.remove(name);
        Ok(())
    }
}

/// the persisted shape of a store
#[derive(Serialize, Deserialize, Debug)]
struct Envelope<T> {
    /// the store's state
    state: T,
    /// the format version it was written with
    #[serde(default)]
    version: u32,
}

/// a piece of state that survives restarts
pub struct PersistedStore<T> {
    /// the key the store is saved under
    name: &'static str,
    /// where it is saved
    storage: Arc<dyn StateStorage>,
    /// the in-memory state
    state: T,
    /// set once persisted state has been loaded
    has_hydrated: bool,
}

impl<T> PersistedStore<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    /// the persisted format version
    pub const VERSION: u32 = 0;

    /// a store holding defaults, not yet hydrated
    pub fn new(name: &'static str, storage: Arc<dyn StateStorage>) -> Self {
        Self {
            name,
            storage,
            state: T::default(),
            has_hydrated: false,
        }
    }

    /// a store that has already been loaded from storage
    pub fn load(name: &'static str, storage: Arc<dyn StateStorage>) -> Result<Self> {
        let mut store = Self::new(name, storage);
        store.rehydrate()?;
        Ok(store)
    }

    /// replace the in-memory state with whatever is persisted
    ///
    /// a missing or unreadable record leaves the defaults in place. either way the store counts
    /// as hydrated afterwards
    pub fn rehydrate(&mut self) -> Result<()> {
        if let Some(raw) = self.storage.get_item(self.name)? {
            match serde_json::from_str::<Envelope<T>>(&raw) {
                Ok(envelope) => {
                    if envelope.version != Self::VERSION {
                        debug!(
                            name = self.name,
                            version = envelope.version,
                            "loading record from another version"
                        );
                    }
                    self.state = envelope.state;
                }
                Err(e) => warn!(name = self.name, error = %e, "discarding malformed record"),
            }
        }

        self.has_hydrated = true;
        debug!(name = self.name, "store hydrated");
        Ok(())
    }

    /// whether the persisted state has been loaded yet
    pub fn has_hydrated(&self) -> bool {
        self.has_hydrated
    }

    /// the current state
    pub fn state(&self) -> &T {
        &self.state
    }

    /// change the state and persist it
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        f(&mut self.state);
        self.persist()
    }

    /// write the current state to storage
    pub fn persist(&self) -> Result<()> {
        let envelope = Envelope {
            state: &self.state,
            version: Self::VERSION,
        };

        self.storage
            .set_item(self.name, &serde_json::to_string(&envelope)?)
    }

    /// reset to defaults and forget the persisted record
    pub fn clear(&mut self) -> Result<()> {
        self.state = T::default();
        self.storage.remove_item(self.name)
    }
}
