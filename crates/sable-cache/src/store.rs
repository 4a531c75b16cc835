use crate::error::Result;
use crate::util::{
    atomic_write, bincode_deserialize, bincode_serialize, now_millis, read_file_limited,
    remove_file_best_effort,
};
use sable_core::Fingerprint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const SCHEMA_FILE: &str = "schema.version";
const RECORDS_DIR: &str = "records";
const RECORD_EXTENSION: &str = "rec";

/// How [`CacheStore::open`] found the store on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStatus {
    /// No store existed; an empty one was created.
    Fresh,
    /// The existing store has a matching schema version.
    Reused,
    /// The existing store had another schema version and was wiped.
    Rebuilt { found: Option<u32> },
}

/// Why a lookup did not produce a usable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    /// The record was written for other content.
    FingerprintMismatch,
    /// The record could not be decoded and has been discarded.
    Corrupt,
}

/// A persisted `(path, fingerprint) -> payload` pairing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord<T> {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub saved_at_millis: u64,
    pub payload: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup<T> {
    Hit(CacheRecord<T>),
    Miss(MissReason),
}

impl<T> CacheLookup<T> {
    pub fn hit(self) -> Option<CacheRecord<T>> {
        match self {
            CacheLookup::Hit(record) => Some(record),
            CacheLookup::Miss(_) => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }
}

#[derive(Serialize)]
struct PersistedRecordRef<'a, T> {
    schema_version: u32,
    saved_at_millis: u64,
    path: &'a str,
    fingerprint: &'a Fingerprint,
    payload: &'a T,
}

#[derive(Deserialize)]
struct PersistedRecord<T> {
    schema_version: u32,
    saved_at_millis: u64,
    path: String,
    fingerprint: Fingerprint,
    payload: T,
}

/// Per-project record store.
///
/// Layout:
/// - `<root>/schema.version`: decimal schema version of every record below
/// - `<root>/records/<fingerprint of path>.rec`: one bincode record per path
///
/// Records are self-describing and overwrite-only, so concurrent writers for
/// different paths never coordinate.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    records_dir: PathBuf,
    schema_version: u32,
    status: StoreStatus,
}

impl CacheStore {
    /// Opens (or creates) the store at `root` for `schema_version`.
    ///
    /// A store written with another schema version is wiped completely.
    pub fn open(root: impl AsRef<Path>, schema_version: u32) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let records_dir = root.join(RECORDS_DIR);
        let schema_path = root.join(SCHEMA_FILE);

        let status = match read_schema_version(&schema_path)? {
            Some(found) if found == schema_version => StoreStatus::Reused,
            found => {
                let existed = found.is_some() || records_dir.exists();
                if existed {
                    tracing::warn!(
                        target: "sable.cache",
                        root = %root.display(),
                        expected = schema_version,
                        found = ?found,
                        "cache schema mismatch; discarding the whole store"
                    );
                    remove_dir_best_effort(&records_dir);
                }
                fs::create_dir_all(&root)?;
                atomic_write(&schema_path, schema_version.to_string().as_bytes())?;
                if existed {
                    StoreStatus::Rebuilt { found }
                } else {
                    StoreStatus::Fresh
                }
            }
        };
        fs::create_dir_all(&records_dir)?;

        Ok(Self {
            root,
            records_dir,
            schema_version,
            status,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn status(&self) -> StoreStatus {
        self.status
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn record_path(&self, path: &Path) -> PathBuf {
        let key = Fingerprint::from_bytes(path_key(path).as_bytes());
        self.records_dir
            .join(format!("{}.{RECORD_EXTENSION}", key.as_str()))
    }

    pub fn store<T: Serialize>(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
        payload: &T,
    ) -> Result<()> {
        let key = path_key(path);
        let record = PersistedRecordRef {
            schema_version: self.schema_version,
            saved_at_millis: now_millis(),
            path: &key,
            fingerprint,
            payload,
        };
        let bytes = bincode_serialize(&record)?;
        atomic_write(&self.record_path(path), &bytes)
    }

    /// Loads whatever record exists for `path`, regardless of its fingerprint.
    pub fn load<T: DeserializeOwned>(&self, path: &Path) -> CacheLookup<T> {
        let record_path = self.record_path(path);
        let Some(bytes) = read_file_limited(&record_path) else {
            return CacheLookup::Miss(MissReason::Absent);
        };

        let key = path_key(path);
        match bincode_deserialize::<PersistedRecord<T>>(&bytes) {
            Ok(record) if record.schema_version == self.schema_version && record.path == key => {
                CacheLookup::Hit(CacheRecord {
                    path: path.to_path_buf(),
                    fingerprint: record.fingerprint,
                    saved_at_millis: record.saved_at_millis,
                    payload: record.payload,
                })
            }
            Ok(_) => {
                tracing::debug!(
                    target: "sable.cache",
                    path = %path.display(),
                    "cache record header does not match; discarding"
                );
                remove_file_best_effort(&record_path, "load.header_mismatch");
                CacheLookup::Miss(MissReason::Corrupt)
            }
            Err(err) => {
                tracing::debug!(
                    target: "sable.cache",
                    path = %path.display(),
                    error = %err,
                    "cache record is corrupt; discarding"
                );
                remove_file_best_effort(&record_path, "load.corrupt");
                CacheLookup::Miss(MissReason::Corrupt)
            }
        }
    }

    /// Loads the record for `path` only if it was written for `fingerprint`.
    pub fn load_matching<T: DeserializeOwned>(
        &self,
        path: &Path,
        fingerprint: &Fingerprint,
    ) -> CacheLookup<T> {
        match self.load(path) {
            CacheLookup::Hit(record) if &record.fingerprint == fingerprint => {
                CacheLookup::Hit(record)
            }
            CacheLookup::Hit(_) => CacheLookup::Miss(MissReason::FingerprintMismatch),
            miss => miss,
        }
    }

    pub fn remove(&self, path: &Path) -> bool {
        remove_file_best_effort(&self.record_path(path), "remove")
    }

    /// Drops every record, keeping the schema marker.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_dir_all(&self.records_dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::create_dir_all(&self.records_dir)?;
        Ok(())
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn read_schema_version(path: &Path) -> Result<Option<u32>> {
    match fs::read_to_string(path) {
        // An unparsable marker is treated like a foreign schema.
        Ok(text) => Ok(Some(text.trim().parse().unwrap_or(u32::MAX))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn remove_dir_best_effort(dir: &Path) {
    if let Err(err) = fs::remove_dir_all(dir) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::debug!(
                target: "sable.cache",
                dir = %dir.display(),
                error = %err,
                "failed to remove cache directory"
            );
        }
    }
}
