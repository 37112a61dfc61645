use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("failed to access preferences at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("preferences at {path} are not a flat JSON object of strings: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value store for user preferences.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Preferences that live only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(key, value)| (key.into(), value.into()))
                    .collect(),
            ),
        }
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values.lock().insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

/// Preferences persisted as one flat JSON object.
///
/// Every `set` rewrites the whole file through a temporary sibling and a rename, so readers
/// never observe a partially written file.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl JsonFilePreferenceStore {
    /// Open the store, reading existing values. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PreferenceError> {
        let path = path.into();
        let values = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| PreferenceError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.values.lock();
        let previous = values.insert(key.to_owned(), value.to_owned());
        if previous.as_deref() == Some(value) {
            return Ok(());
        }

        let encoded = serde_json::to_vec_pretty(&*values).map_err(|source| PreferenceError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;
        if let Err(source) = atomic_write(&self.path, &encoded) {
            match previous {
                Some(previous) => values.insert(key.to_owned(), previous),
                None => values.remove(key),
            };
            return Err(PreferenceError::Io {
                path: self.path.display().to_string(),
                source,
            });
        }
        tracing::debug!(target: "lingua.config", key, path = %self.path.display(), "preference saved");
        Ok(())
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "preferences".to_owned());
    let tmp_path = parent.join(format!(
        ".{file_name}.{}.{}.tmp",
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&tmp_path, path)
    })();

    if result.is_err() {
        if let Err(remove_err) = fs::remove_file(&tmp_path) {
            if remove_err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target: "lingua.config",
                    path = %tmp_path.display(),
                    error = %remove_err,
                    "failed to remove temporary preferences file"
                );
            }
        }
    }
    result
}
