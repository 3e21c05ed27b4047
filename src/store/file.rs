//! Directory-backed store: one JSON document per order.
//!
//! A save writes a uniquely named temporary file and renames it over the final
//! path, so readers see either the old or the new document, never a partial
//! one. The temporary file is removed on every path that does not reach the
//! rename, including unwinding.
//!
//! File names are the hex-encoded uid. Uids longer than [`MAX_PLAIN_UID_LEN`]
//! bytes would overflow the file-name limit, so they are named by the SHA-256
//! of the uid instead (`sha256-<digest>.json`). The hex alphabet never produces
//! that prefix, so the two schemes cannot collide.

use crate::cache::SCAN_CHECK_INTERVAL;
use crate::context::RequestContext;
use crate::error::{OrderError, Result};
use crate::model::{Order, OrderUid};
use crate::store::{DurableStore, StoreError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

const EXTENSION: &str = "json";

/// Longest uid stored under its hex encoding.
pub const MAX_PLAIN_UID_LEN: usize = 100;

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    tmp_seq: AtomicU64,
}

/// Deletes the temporary file unless the save committed.
struct TempGuard {
    path: PathBuf,
    committed: bool,
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "Failed to remove temp file");
                }
            }
        }
    }
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(StoreError::from)?;
        info!(dir = %dir.display(), "File store opened");
        Ok(Self {
            dir,
            tmp_seq: AtomicU64::new(0),
        })
    }

    fn path_for(&self, id: &OrderUid) -> PathBuf {
        self.dir.join(file_name(id))
    }

    async fn read_order(path: &Path) -> std::result::Result<Order, StoreError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn file_name(id: &OrderUid) -> String {
    let uid = id.as_str();
    if uid.len() <= MAX_PLAIN_UID_LEN {
        format!("{}.{EXTENSION}", hex::encode(uid))
    } else {
        format!("sha256-{}.{EXTENSION}", hex::encode(Sha256::digest(uid.as_bytes())))
    }
}

#[async_trait]
impl DurableStore for FileStore {
    async fn save(&self, ctx: &RequestContext, order: &Order) -> Result<()> {
        ctx.check()?;

        let final_path = self.path_for(&order.order_uid);
        let seq = self.tmp_seq.fetch_add(1, Ordering::Relaxed);
        let mut guard = TempGuard {
            path: final_path.with_extension(format!("{EXTENSION}.tmp{seq}")),
            committed: false,
        };

        let bytes = serde_json::to_vec_pretty(order).map_err(StoreError::from)?;
        tokio::fs::write(&guard.path, &bytes)
            .await
            .map_err(StoreError::from)?;

        // Last chance to back out before the write becomes visible.
        ctx.check()?;
        tokio::fs::rename(&guard.path, &final_path)
            .await
            .map_err(StoreError::from)?;
        guard.committed = true;

        debug!(order_uid = %order.order_uid, path = %final_path.display(), "Stored");
        Ok(())
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: &OrderUid) -> Result<Order> {
        ctx.check()?;
        match Self::read_order(&self.path_for(id)).await {
            Ok(order) => Ok(order),
            Err(StoreError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                Err(OrderError::NotFound(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_all(&self, ctx: &RequestContext) -> Result<Vec<Order>> {
        ctx.check()?;

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(StoreError::from)?;
        let mut orders = Vec::new();
        let mut seen = 0usize;
        while let Some(entry) = entries.next_entry().await.map_err(StoreError::from)? {
            seen += 1;
            if seen % SCAN_CHECK_INTERVAL == 0 {
                ctx.check()?;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            let order = Self::read_order(&path).await.map_err(|e| {
                StoreError::Corrupt(format!("{}: {e}", path.display()))
            })?;
            orders.push(order);
        }
        debug!(count = orders.len(), "Loaded all orders");
        Ok(orders)
    }
}
