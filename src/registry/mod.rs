//! Durable registry of known project directories.
//!
//! [`ProjectRegistry`] maps case-insensitive project names to directories,
//! tracks when each project was last used, and flags projects eligible for
//! auto-spawn. The backing file is small and human-curated, so each
//! operation loads it whole and each mutation rewrites it whole.

pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

pub use types::{ProjectMetadata, RegisterOptions, RegisteredProject};

use crate::error::RegistryError;

/// Handle to a registry file. Cheap to clone; holds no cached state.
///
/// Clones share one lock, held for each whole read-modify-write cycle, so
/// operations through the same handle never interleave. Separately
/// constructed handles on the same file are not coordinated.
#[derive(Clone, Debug)]
pub struct ProjectRegistry {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl ProjectRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all projects in stored order.
    ///
    /// Creates an empty store on first use. A store that exists but cannot
    /// be parsed is logged and treated as empty; only a failure to create
    /// the initial store is returned as an error.
    pub async fn load(&self) -> Result<Vec<RegisteredProject>, RegistryError> {
        let _guard = self.lock.lock().await;
        self.load_unlocked().await
    }

    /// Overwrite the store with `projects`.
    pub async fn save(&self, projects: &[RegisteredProject]) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().await;
        self.save_unlocked(projects).await
    }

    async fn load_unlocked(&self) -> Result<Vec<RegisteredProject>, RegistryError> {
        store::ensure_store(&self.path).await?;

        match store::read_store(&self.path).await {
            Ok(projects) => Ok(projects),
            Err(e) => {
                tracing::warn!(error = %e, "Error loading project registry, using empty list");
                Ok(Vec::new())
            }
        }
    }

    async fn save_unlocked(&self, projects: &[RegisteredProject]) -> Result<(), RegistryError> {
        store::ensure_store(&self.path).await?;
        store::write_store(&self.path, projects).await
    }

    /// Register a project, or update the existing record with the same
    /// case-insensitive name. The first-seen casing of the name is kept.
    pub async fn register(
        &self,
        name: &str,
        path: impl Into<PathBuf>,
        options: RegisterOptions,
    ) -> Result<RegisteredProject, RegistryError> {
        let path = path.into();
        let _guard = self.lock.lock().await;
        let mut projects = self.load_unlocked().await?;

        if let Some(existing) = projects.iter_mut().find(|p| p.matches(name)) {
            existing.path = path;
            existing.last_accessed = Utc::now();
            existing.apply_options(options);
            let updated = existing.clone();
            self.save_unlocked(&projects).await?;
            tracing::info!(project = %updated.name, path = %updated.path.display(), "Updated project");
            return Ok(updated);
        }

        let metadata = (options.description.is_some() || options.tags.is_some()).then(|| {
            ProjectMetadata {
                description: options.description,
                tags: options.tags,
            }
        });
        let project = RegisteredProject {
            name: name.to_string(),
            path,
            last_accessed: Utc::now(),
            auto_spawn: options.auto_spawn.unwrap_or(false),
            metadata,
        };

        projects.push(project.clone());
        self.save_unlocked(&projects).await?;

        tracing::info!(project = %project.name, path = %project.path.display(), "Registered project");
        Ok(project)
    }

    /// Remove a project. Returns `false` (and writes nothing) if no record
    /// matched.
    pub async fn unregister(&self, name: &str) -> Result<bool, RegistryError> {
        let _guard = self.lock.lock().await;
        let mut projects = self.load_unlocked().await?;
        let before = projects.len();
        projects.retain(|p| !p.matches(name));

        if projects.len() == before {
            return Ok(false);
        }

        self.save_unlocked(&projects).await?;
        tracing::info!(project = %name, "Unregistered project");
        Ok(true)
    }

    /// Look up a project by case-insensitive name.
    pub async fn find_project(&self, name: &str) -> Result<Option<RegisteredProject>, RegistryError> {
        let projects = self.load().await?;
        Ok(projects.into_iter().find(|p| p.matches(name)))
    }

    /// Bump `lastAccessed` to now. Unknown names are ignored.
    pub async fn touch_project(&self, name: &str) -> Result<(), RegistryError> {
        let _guard = self.lock.lock().await;
        let mut projects = self.load_unlocked().await?;

        if let Some(project) = projects.iter_mut().find(|p| p.matches(name)) {
            project.last_accessed = Utc::now();
            self.save_unlocked(&projects).await?;
        }
        Ok(())
    }

    /// Projects flagged for auto-spawn, in stored order.
    pub async fn get_auto_spawn_projects(&self) -> Result<Vec<RegisteredProject>, RegistryError> {
        let projects = self.load().await?;
        Ok(projects.into_iter().filter(|p| p.auto_spawn).collect())
    }

    /// True only if `path` exists and is a directory. Never errors.
    pub async fn validate_project_path(path: impl AsRef<Path>) -> bool {
        match tokio::fs::metadata(path.as_ref()).await {
            Ok(meta) => meta.is_dir(),
            Err(_) => false,
        }
    }
}
