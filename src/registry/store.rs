//! Whole-file JSON persistence for the project registry.
//!
//! Every mutation is a full read-modify-write of one small file. Writes go to
//! a uniquely named sibling `.tmp` file first and are renamed into place, so
//! a reader never observes a half-written registry. In-process writers are
//! serialized by [`super::ProjectRegistry`]; there is no cross-process lock,
//! so two processes racing on the same file can drop each other's changes.

use std::path::{Path, PathBuf};

use tokio::fs;

use super::types::RegisteredProject;
use crate::error::RegistryError;

/// Create the parent directory and an empty `[]` store if none exists.
pub(crate) async fn ensure_store(path: &Path) -> Result<(), RegistryError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| unwritable(path, e))?;
    }

    if !fs::try_exists(path).await.unwrap_or(false) {
        tracing::info!(path = %path.display(), "Creating empty project registry");
        write_store(path, &[]).await?;
    }
    Ok(())
}

/// Read and parse the store.
pub(crate) async fn read_store(path: &Path) -> Result<Vec<RegisteredProject>, RegistryError> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| RegistryError::StoreUnreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    serde_json::from_str(&content).map_err(|e| RegistryError::StoreUnreadable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Atomically replace the store with `projects` (temp file + rename).
pub(crate) async fn write_store(
    path: &Path,
    projects: &[RegisteredProject],
) -> Result<(), RegistryError> {
    let json = serde_json::to_string_pretty(projects).map_err(|e| unwritable(path, e))?;

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| unwritable(path, e))?;
    if let Err(e) = fs::rename(&tmp_path, path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(unwritable(path, e));
    }
    Ok(())
}

/// Unique sibling temp file, so overlapping writers never share one.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4()));
    path.with_file_name(name)
}

fn unwritable(path: &Path, e: impl std::fmt::Display) -> RegistryError {
    RegistryError::StoreUnwritable {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}
