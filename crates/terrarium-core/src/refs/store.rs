//! Refs persistence.
//!
//! The refs file is a whole-file JSON document, rewritten atomically
//! (tmp + rename) on every save and then fanned out byte-for-byte to any
//! configured copy destinations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::types::{ContractInfo, RefsTable};

/// Refs store shared between the deployer and executor of one process.
pub type SharedRefs = Arc<Mutex<RefsStore>>;

/// Errors raised by the refs store.
#[derive(Debug, Error)]
pub enum RefsError {
    #[error("Network {network} not found in refs")]
    NetworkNotFound { network: String },

    #[error("Contract {contract} not found for network {network}")]
    ContractNotFound { network: String, contract: String },

    #[error("Refs store has no backing file; use save_to() instead")]
    NoBackingPath,

    #[error("Failed to read refs file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse refs file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write refs file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize refs: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A copy destination that could not be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a save: the primary write succeeded, copies may have failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
    pub path: PathBuf,
    pub copied: Vec<PathBuf>,
    pub failed: Vec<CopyFailure>,
}

impl SaveReport {
    /// True when every copy destination was written.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// In-memory refs table with an optional backing file.
#[derive(Debug, Clone, Default)]
pub struct RefsStore {
    table: RefsTable,
    path: Option<PathBuf>,
    copy_to: Vec<PathBuf>,
}

impl RefsStore {
    /// Create a store over an existing table, without a backing file.
    pub fn new(table: RefsTable) -> Self {
        Self {
            table,
            path: None,
            copy_to: Vec::new(),
        }
    }

    /// Load the refs file at `path`, binding it (and `copy_to`) for [`save`].
    ///
    /// A missing file is created immediately with an empty table.
    ///
    /// [`save`]: RefsStore::save
    pub fn load(path: impl Into<PathBuf>, copy_to: Vec<PathBuf>) -> Result<Self, RefsError> {
        let path = path.into();

        if !path.exists() {
            tracing::warn!(path = %path.display(), "Refs file not found, creating new one");
            let store = Self {
                table: RefsTable::new(),
                path: Some(path.clone()),
                copy_to,
            };
            write_atomic(&path, &store.to_bytes()?)?;
            return Ok(store);
        }

        let bytes = fs::read(&path).map_err(|source| RefsError::Read {
            path: path.clone(),
            source,
        })?;
        let table: RefsTable =
            serde_json::from_slice(&bytes).map_err(|source| RefsError::Parse {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            table,
            path: Some(path),
            copy_to,
        })
    }

    /// Wrap the store for sharing between deployer and executor.
    pub fn shared(self) -> SharedRefs {
        Arc::new(Mutex::new(self))
    }

    /// Lock a shared store. A poisoned lock still yields the table: every
    /// mutation is a single overwrite, so no half-applied state exists.
    pub fn lock(shared: &SharedRefs) -> MutexGuard<'_, RefsStore> {
        shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn copy_to(&self) -> &[PathBuf] {
        &self.copy_to
    }

    pub fn table(&self) -> &RefsTable {
        &self.table
    }

    /// All contracts recorded for a network.
    pub fn network(&self, network: &str) -> Result<&BTreeMap<String, ContractInfo>, RefsError> {
        self.table
            .get(network)
            .ok_or_else(|| RefsError::NetworkNotFound {
                network: network.to_string(),
            })
    }

    pub fn get_contract(&self, network: &str, contract: &str) -> Result<&ContractInfo, RefsError> {
        self.network(network)?
            .get(contract)
            .ok_or_else(|| RefsError::ContractNotFound {
                network: network.to_string(),
                contract: contract.to_string(),
            })
    }

    /// Code id of a known contract; `None` if the entry has no code id yet.
    pub fn get_code_id(&self, network: &str, contract: &str) -> Result<Option<&str>, RefsError> {
        Ok(self.get_contract(network, contract)?.code_id.as_deref())
    }

    /// Address of a known contract; `None` if it was never instantiated.
    pub fn get_address(&self, network: &str, contract: &str) -> Result<Option<&str>, RefsError> {
        Ok(self.get_contract(network, contract)?.address.as_deref())
    }

    pub fn set_code_id(
        &mut self,
        network: &str,
        contract: &str,
        code_id: impl Into<String>,
    ) -> &mut Self {
        self.entry(network, contract).code_id = Some(code_id.into());
        self
    }

    pub fn set_address(
        &mut self,
        network: &str,
        contract: &str,
        address: impl Into<String>,
    ) -> &mut Self {
        self.entry(network, contract).address = Some(address.into());
        self
    }

    fn entry(&mut self, network: &str, contract: &str) -> &mut ContractInfo {
        self.table
            .entry(network.to_string())
            .or_default()
            .entry(contract.to_string())
            .or_default()
    }

    /// Flush to the file this store was loaded from.
    pub fn save(&self) -> Result<SaveReport, RefsError> {
        let path = self.path.as_deref().ok_or(RefsError::NoBackingPath)?;
        self.save_to(path, &self.copy_to)
    }

    /// Write the table to `path`, then duplicate the same bytes to `copy_to`.
    ///
    /// Fails only when the primary write fails; copy failures are logged and
    /// returned in the report.
    pub fn save_to(&self, path: &Path, copy_to: &[PathBuf]) -> Result<SaveReport, RefsError> {
        let bytes = self.to_bytes()?;
        write_atomic(path, &bytes)?;

        let mut report = SaveReport {
            path: path.to_path_buf(),
            copied: Vec::new(),
            failed: Vec::new(),
        };
        for dest in copy_to {
            match write_atomic(dest, &bytes) {
                Ok(()) => report.copied.push(dest.clone()),
                Err(err) => {
                    tracing::warn!(dest = %dest.display(), error = %err, "Failed to copy refs");
                    report.failed.push(CopyFailure {
                        path: dest.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    fn to_bytes(&self) -> Result<Vec<u8>, RefsError> {
        Ok(serde_json::to_vec_pretty(&self.table)?)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), RefsError> {
    let write_err = |source| RefsError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "refs.json".to_string());
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    fs::write(&tmp_path, bytes).map_err(write_err)?;

    // Remove target first for replace semantics on Windows
    if cfg!(windows) && path.exists() {
        fs::remove_file(path).map_err(write_err)?;
    }
    fs::rename(&tmp_path, path).map_err(write_err)?;
    Ok(())
}
