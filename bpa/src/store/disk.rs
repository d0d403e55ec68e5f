use super::*;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// A write-through directory store: one postcard-encoded file per bundle
/// identity, named by the printable id key, with an in-memory index rebuilt
/// by walking the directory on open.
///
/// Files are written alongside their final name with a `.tmp` extension,
/// fsync'd, then renamed, so a crash mid-write leaves either the old record
/// or a removable temporary.
pub struct DiskStore {
    store_root: PathBuf,
    index: Mutex<HashMap<BundleId, BundlePack>>,
}

impl DiskStore {
    pub fn open(store_root: impl Into<PathBuf>) -> Result<Self> {
        let store_root = store_root.into();
        std::fs::create_dir_all(&store_root)?;

        let mut index = HashMap::new();
        for entry in std::fs::read_dir(&store_root)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            // Drop anything left over from an interrupted write
            if path.extension().is_some_and(|e| e == "tmp") {
                warn!("Removing interrupted write {}", path.display());
                std::fs::remove_file(&path)?;
                continue;
            }

            match std::fs::read(&path).map_err(Error::from).and_then(|data| {
                postcard::from_bytes::<BundlePack>(&data).map_err(Into::into)
            }) {
                Ok(pack) => {
                    index.insert(pack.id().clone(), pack);
                }
                Err(e) => {
                    // Junk data cannot be resumed, there is nothing useful to
                    // keep
                    warn!("Removing unreadable record {}: {e}", path.display());
                    std::fs::remove_file(&path)?;
                }
            }
        }

        info!(
            "Bundle store opened at {} with {} records",
            store_root.display(),
            index.len()
        );

        Ok(Self {
            store_root,
            index: Mutex::new(index),
        })
    }

    fn record_path(&self, id: &BundleId) -> PathBuf {
        self.store_root.join(id.to_key())
    }

    fn write_record(path: PathBuf, data: Vec<u8>) -> std::io::Result<()> {
        let tmp_path = path.with_extension("tmp");
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;

        if let Err(e) = file.write_all(&data).and_then(|_| file.sync_all()) {
            _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        drop(file);

        if let Err(e) = std::fs::rename(&tmp_path, &path) {
            _ = std::fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(())
    }
}

#[async_trait]
impl BundleStore for DiskStore {
    async fn push(&self, pack: &BundlePack) -> Result<()> {
        let data = postcard::to_allocvec(pack)?;
        let path = self.record_path(pack.id());

        tokio::task::spawn_blocking(move || Self::write_record(path, data))
            .await
            .trace_expect("Failed to join write task")?;

        self.index
            .lock()
            .trace_expect("Failed to lock mutex")
            .insert(pack.id().clone(), pack.clone());
        Ok(())
    }

    async fn get(&self, id: &BundleId) -> Option<BundlePack> {
        self.index
            .lock()
            .trace_expect("Failed to lock mutex")
            .get(id)
            .cloned()
    }

    async fn knows(&self, id: &BundleId) -> bool {
        self.index
            .lock()
            .trace_expect("Failed to lock mutex")
            .contains_key(id)
    }

    async fn query_status_subject(&self, report: &BundleStatusReport) -> Vec<BundlePack> {
        self.index
            .lock()
            .trace_expect("Failed to lock mutex")
            .get(&report.bundle_id)
            .cloned()
            .into_iter()
            .collect()
    }

    async fn remove(&self, id: &BundleId) -> Result<()> {
        self.index
            .lock()
            .trace_expect("Failed to lock mutex")
            .remove(id);

        match tokio::fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn pending(&self, tx: flume::Sender<BundlePack>) {
        let pending = self
            .index
            .lock()
            .trace_expect("Failed to lock mutex")
            .values()
            .filter(|p| p.has_constraints())
            .cloned()
            .collect::<Vec<_>>();

        for pack in pending {
            if tx.send_async(pack).await.is_err() {
                break;
            }
        }
    }
}
