use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::{Entity, Error};
use crate::model::RecordStore;

/// Collaborator contract for everything outside the in-memory core: durable
/// storage of the record store and physical realization of host moves.
pub trait ProvisioningBackend {
    /// Load the full record store. Failure here is fatal to startup.
    fn load_store(&self) -> io::Result<RecordStore>;

    /// Durably write the record store.
    fn persist_store(&self, store: &RecordStore) -> io::Result<()>;

    /// Physically move `host` between clouds (network/inventory reconfiguration).
    fn apply_assignment(&self, host: &str, from: &str, to: &str) -> io::Result<()>;
}

/// Select a backend implementation by name. Built-ins: "file" (snapshot file,
/// `path` required) and "memory".
pub fn backend_for(
    kind: &str,
    path: Option<&Path>,
) -> Result<Box<dyn ProvisioningBackend>, Error> {
    match kind {
        "file" => {
            let path = path.ok_or(Error::Validation("file backend needs a path"))?;
            Ok(Box::new(FileBackend::new(path)))
        }
        "memory" => Ok(Box::new(MemoryBackend::new())),
        other => Err(Error::NotFound(Entity::Backend, other.to_string())),
    }
}

// ── File snapshot backend ────────────────────────────────────────

/// Snapshot format: `[u32: len][bincode: RecordStore][u32: crc32]`, one record
/// per file, rewritten whole through a temp file + atomic rename.
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn encode_store(writer: &mut impl Write, store: &RecordStore) -> io::Result<()> {
    let payload =
        bincode::serialize(store).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = payload.len() as u32;
    let crc = crc32fast::hash(&payload);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc.to_le_bytes())?;
    Ok(())
}

impl ProvisioningBackend for FileBackend {
    /// A missing file is a fresh install and loads as an empty store. A
    /// present-but-unreadable snapshot (truncation, checksum mismatch) is an
    /// error — better to stop than to serve a silently emptied pool.
    fn load_store(&self) -> io::Result<RecordStore> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RecordStore::default()),
            Err(e) => return Err(e),
        };
        let mut reader = BufReader::new(file);

        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf)?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);
        if stored_crc != crc32fast::hash(&payload) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "snapshot checksum mismatch",
            ));
        }

        bincode::deserialize(&payload).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn persist_store(&self, store: &RecordStore) -> io::Result<()> {
        let tmp_path = self.path.with_extension("snap.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        encode_store(&mut writer, store)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp_path, &self.path)
    }

    fn apply_assignment(&self, host: &str, from: &str, to: &str) -> io::Result<()> {
        // The physical reconfiguration lives outside this crate; record intent.
        tracing::info!(host, from, to, "assignment handed to provisioning");
        Ok(())
    }
}

// ── In-memory backend ────────────────────────────────────────────

#[derive(Default)]
struct MemoryInner {
    saved: Mutex<Option<RecordStore>>,
    applied: Mutex<Vec<(String, String, String)>>,
    fail_persist: AtomicBool,
}

/// In-memory backend for tests and embedders that manage durability
/// themselves. Clones share state, so a handle kept outside the engine can
/// inspect what the engine persisted and applied.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-load the store that `load_store` hands out.
    pub fn with_store(store: RecordStore) -> Self {
        let backend = Self::default();
        *backend.inner.saved.lock().unwrap() = Some(store);
        backend
    }

    pub fn saved(&self) -> Option<RecordStore> {
        self.inner.saved.lock().unwrap().clone()
    }

    pub fn applied(&self) -> Vec<(String, String, String)> {
        self.inner.applied.lock().unwrap().clone()
    }

    /// Make every subsequent persist fail, to exercise abort paths.
    pub fn fail_persists(&self, fail: bool) {
        self.inner.fail_persist.store(fail, Ordering::SeqCst);
    }
}

impl ProvisioningBackend for MemoryBackend {
    fn load_store(&self) -> io::Result<RecordStore> {
        Ok(self.inner.saved.lock().unwrap().clone().unwrap_or_default())
    }

    fn persist_store(&self, store: &RecordStore) -> io::Result<()> {
        if self.inner.fail_persist.load(Ordering::SeqCst) {
            return Err(io::Error::other("injected persist failure"));
        }
        *self.inner.saved.lock().unwrap() = Some(store.clone());
        Ok(())
    }

    fn apply_assignment(&self, host: &str, from: &str, to: &str) -> io::Result<()> {
        self.inner
            .applied
            .lock()
            .unwrap()
            .push((host.to_string(), from.to_string(), to.to_string()));
        Ok(())
    }
}
