//! JSON file persistence for connections.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::endpoint::EndpointDescriptor;
use crate::store::{ConnectionStore, PersistedConnections, StoreError, StoreResult};

/// A store that rewrites a JSON document on every mutation.
///
/// Writes go to a sibling temp file which is then renamed over the target, so a
/// crash mid-write leaves the previous document intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: Mutex<PersistedConnections>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading it if the file exists.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            let state: PersistedConnections = serde_json::from_reader(reader)?;
            tracing::info!(
                path = %path.display(),
                connections = state.connections.len(),
                "Loaded connections from disk"
            );
            state
        } else {
            PersistedConnections::default()
        };

        Ok(Self {
            path,
            inner: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, PersistedConnections>> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Apply `change` and flush. Memory is only updated if the flush succeeds.
    fn update(&self, change: impl FnOnce(&mut PersistedConnections)) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        change(&mut next);
        self.flush(&next)?;
        *guard = next;
        Ok(())
    }

    fn flush(&self, state: &PersistedConnections) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, state)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            connections = state.connections.len(),
            "Saved connections to disk"
        );
        Ok(())
    }
}

impl ConnectionStore for JsonFileStore {
    fn load(&self) -> StoreResult<PersistedConnections> {
        Ok(self.lock()?.clone())
    }

    fn save(&self, endpoint: &EndpointDescriptor) -> StoreResult<()> {
        self.update(|state| state.upsert(endpoint))
    }

    fn delete(&self, uri: &str) -> StoreResult<()> {
        self.update(|state| state.remove(uri))
    }

    fn set_current_uri(&self, uri: Option<&str>) -> StoreResult<()> {
        self.update(|state| state.current_uri = uri.map(str::to_string))
    }

    fn set_auto_switch(&self, auto_switch: bool) -> StoreResult<()> {
        self.update(|state| state.auto_switch = auto_switch)
    }

    fn set_refresh_period(&self, refresh_period_ms: i64) -> StoreResult<()> {
        self.update(|state| state.refresh_period_ms = refresh_period_ms)
    }
}
