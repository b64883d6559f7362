//! Cache de téléchargement
//!
//! Le cache est consulté et modifié uniquement depuis les actions de la
//! file de jobs. La séquence "vérifier l'état puis réserver" n'est sûre
//! que parce que ces actions s'exécutent une à une.

use crate::db::{FileRecord, FileRegistry, SqliteRegistry};
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, HttpFetcher};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Nom du fichier SQLite créé à la racine du cache par [`DownloadCache::open`]
pub const REGISTRY_FILE: &str = "files.db";

/// État d'un fichier vis-à-vis du cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    /// Aucun enregistrement
    None,
    /// Enregistrement réservé, téléchargement en cours
    Downloading,
    /// Téléchargement terminé
    Downloaded,
}

/// Cache de fichiers téléchargés, borné en nombre d'enregistrements
///
/// Les vues obtenues par [`namespace`](Self::namespace) partagent le
/// registre, le client et la limite : la limite est globale.
#[derive(Clone)]
pub struct DownloadCache {
    root: PathBuf,
    registry: Arc<dyn FileRegistry>,
    fetcher: Arc<dyn Fetcher>,
    max_files: usize,
}

impl DownloadCache {
    /// Crée un cache à partir de ses composants
    ///
    /// Le répertoire racine est créé si besoin et les réservations laissées
    /// par un processus précédent sont supprimées.
    pub fn new(
        root: impl Into<PathBuf>,
        registry: Arc<dyn FileRegistry>,
        fetcher: Arc<dyn Fetcher>,
        max_files: usize,
    ) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        let cache = Self {
            root,
            registry,
            fetcher,
            max_files,
        };
        cache.recover()?;
        Ok(cache)
    }

    /// Ouvre le cache standard : registre SQLite dans `root`, client HTTP
    pub fn open(root: impl Into<PathBuf>, max_files: usize) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let registry = SqliteRegistry::open(&root.join(REGISTRY_FILE))?;
        Self::new(root, Arc::new(registry), Arc::new(HttpFetcher::new()?), max_files)
    }

    /// Vue du cache enracinée dans `<root>/<name>` (un espace par backend)
    pub fn namespace(&self, name: &str) -> Result<Self> {
        let root = self.root.join(name);
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            registry: self.registry.clone(),
            fetcher: self.fetcher.clone(),
            max_files: self.max_files,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn registry(&self) -> Arc<dyn FileRegistry> {
        self.registry.clone()
    }

    /// Chemin local associé à `name`
    pub fn full_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// État du fichier `name`
    pub fn get_state(&self, name: &str) -> Result<DownloadState> {
        self.state_of(&self.full_path(name))
    }

    fn state_of(&self, path: &Path) -> Result<DownloadState> {
        Ok(match self.registry.get(path)? {
            None => DownloadState::None,
            Some(record) if record.is_downloading() => DownloadState::Downloading,
            Some(_) => DownloadState::Downloaded,
        })
    }

    /// Télécharge `url` vers `name` et retourne le chemin local
    ///
    /// - Si le fichier existe déjà et que `overwrite` est faux, il est
    ///   retourné sans toucher au registre.
    /// - Un téléchargement déjà en cours pour ce chemin provoque
    ///   [`Error::AlreadyDownloading`] sans nouvelle requête.
    /// - En cas d'échec, la réservation est supprimée pour permettre un
    ///   nouvel essai. Un enregistrement remplacé par `overwrite` est
    ///   restauré tel quel.
    /// - En cas de succès, la limite du cache est appliquée.
    pub fn download_file(&self, url: &str, name: &str, overwrite: bool) -> Result<PathBuf> {
        let path = self.full_path(name);

        if path.exists() && !overwrite {
            tracing::debug!("File {} already present, not downloading", path.display());
            return Ok(path);
        }

        if self.state_of(&path)? == DownloadState::Downloading {
            tracing::debug!("Download already in progress for {}", path.display());
            return Err(Error::AlreadyDownloading(path));
        }

        let previous = self.registry.get(&path)?;
        self.registry.put(&FileRecord::in_progress(&path))?;
        tracing::info!(url, path = %path.display(), "Download started");

        if let Err(e) = self.fetch_into(url, &path) {
            tracing::warn!(url, path = %path.display(), "Download failed: {}", e);
            let rollback = match &previous {
                Some(record) => self.registry.put(record),
                None => self.registry.delete(&path),
            };
            if let Err(rollback) = rollback {
                tracing::warn!("Error removing reservation for {}: {}", path.display(), rollback);
            }
            return Err(e);
        }

        self.registry.put(&FileRecord::downloaded_now(&path))?;
        tracing::info!(path = %path.display(), "Download complete");

        if let Err(e) = self.enforce_limit() {
            tracing::warn!("Error enforcing cache limit: {}", e);
        }

        Ok(path)
    }

    fn fetch_into(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.fetcher.fetch(url)?;
        if !response.is_success() {
            return Err(Error::DownloadFailed {
                code: response.status,
                url: url.to_string(),
            });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        if let Err(e) = fs::write(path, &response.body) {
            let _ = fs::remove_file(path);
            return Err(e.into());
        }
        Ok(())
    }

    /// Déclare comme téléchargé un fichier produit hors du cache
    pub fn register_file(&self, path: &Path) -> Result<()> {
        self.registry.put(&FileRecord::downloaded_now(path))?;
        tracing::debug!("Registered {}", path.display());
        self.enforce_limit()?;
        Ok(())
    }

    /// Applique la limite du nombre de fichiers
    ///
    /// Tous les enregistrements comptent, mais seuls les fichiers terminés
    /// sont évincés, du plus ancien au plus récent. Les fichiers déjà
    /// absents du disque sont tolérés.
    ///
    /// # Returns
    ///
    /// Le nombre d'enregistrements supprimés
    pub fn enforce_limit(&self) -> Result<usize> {
        let count = self.registry.count()?;
        if count <= self.max_files {
            return Ok(0);
        }

        let excess = count - self.max_files;
        let victims = self.registry.list_ordered_by_completion()?;

        let mut removed = 0;
        for record in victims.into_iter().take(excess) {
            match fs::remove_file(&record.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    tracing::debug!("Evicted file {} was already gone", record.path.display());
                }
                Err(e) => {
                    tracing::warn!("Error deleting evicted file {}: {}", record.path.display(), e);
                }
            }
            self.registry.delete(&record.path)?;
            removed += 1;
        }

        if removed > 0 {
            tracing::info!(
                "Eviction: removed {} old files (cache size: {} -> {})",
                removed,
                count,
                count - removed
            );
        }

        Ok(removed)
    }

    /// Supprime les réservations qui ne peuvent plus aboutir
    ///
    /// Appelé à l'ouverture : un enregistrement encore en cours vient d'un
    /// processus interrompu. Les fichiers partiels éventuels sont supprimés.
    pub fn recover(&self) -> Result<usize> {
        let stale = self.registry.list_in_progress()?;
        for record in &stale {
            tracing::warn!("Dropping interrupted download of {}", record.path.display());
            let _ = fs::remove_file(&record.path);
            self.registry.delete(&record.path)?;
        }
        Ok(stale.len())
    }
}

impl std::fmt::Debug for DownloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCache")
            .field("root", &self.root)
            .field("max_files", &self.max_files)
            .finish()
    }
}
