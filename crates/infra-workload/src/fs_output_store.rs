// Filesystem output store
// The remote executor writes one JSON document per workload to a shared
// filesystem; this adapter reads them back. A missing document is Ok(None):
// the retriever turns that into a synthesized failure output.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use covalent_core::domain::ConnectorJobOutput;
use covalent_core::port::{OutputStore, OutputStoreError};

/// Reads connector job outputs from `{root}/{workload_id}.json`.
pub struct FsOutputStore {
    root: PathBuf,
}

impl FsOutputStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn document_path(&self, workload_id: &str) -> Result<PathBuf, OutputStoreError> {
        // Workload ids are path components, never paths
        if workload_id.is_empty()
            || workload_id.contains('/')
            || workload_id.contains('\\')
            || workload_id.contains("..")
        {
            return Err(OutputStoreError::Malformed(format!(
                "invalid workload id: {workload_id}"
            )));
        }
        Ok(self.root.join(format!("{workload_id}.json")))
    }

    /// Persist an output document. Used by the executor side of the store
    /// and by tests; the engine itself only reads.
    pub async fn write(
        &self,
        workload_id: &str,
        output: &ConnectorJobOutput,
    ) -> Result<(), OutputStoreError> {
        let path = self.document_path(workload_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OutputStoreError::Unavailable(e.to_string()))?;
        }

        let bytes =
            serde_json::to_vec(output).map_err(|e| OutputStoreError::Malformed(e.to_string()))?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| OutputStoreError::Unavailable(e.to_string()))?;

        debug!(workload_id = %workload_id, path = %path.display(), "Wrote output document");
        Ok(())
    }

    async fn read_document(path: &Path) -> Result<Option<Vec<u8>>, OutputStoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OutputStoreError::Unavailable(e.to_string())),
        }
    }
}

#[async_trait]
impl OutputStore for FsOutputStore {
    async fn read(
        &self,
        workload_id: &str,
    ) -> Result<Option<ConnectorJobOutput>, OutputStoreError> {
        let path = self.document_path(workload_id)?;

        let Some(bytes) = Self::read_document(&path).await? else {
            return Ok(None);
        };

        let output = serde_json::from_slice(&bytes)
            .map_err(|e| OutputStoreError::Malformed(e.to_string()))?;
        Ok(Some(output))
    }
}
