//! Extension pour construire le cache depuis mmpconfig
//!
//! Le trait `CacheConfigExt` lit les clés `files.directory` et
//! `files.max_files` et ouvre le [`DownloadCache`] correspondant.

use crate::DownloadCache;
use anyhow::Result;
use mmpconfig::Config;
use std::path::PathBuf;

/// Trait d'extension de `mmpconfig::Config`
///
/// # Exemple
///
/// ```rust,ignore
/// use mmpconfig::Config;
/// use mmpcache::CacheConfigExt;
///
/// let cache = Config::load_config("")?.create_download_cache()?;
/// let soma = cache.namespace("soma")?;
/// ```
pub trait CacheConfigExt {
    /// Répertoire racine des fichiers (créé si besoin)
    fn get_download_dir(&self) -> Result<PathBuf>;

    /// Nombre maximal de fichiers conservés
    fn get_download_limit(&self) -> Result<usize>;

    /// Ouvre le cache configuré (registre SQLite + client HTTP)
    fn create_download_cache(&self) -> Result<DownloadCache>;
}

impl CacheConfigExt for Config {
    fn get_download_dir(&self) -> Result<PathBuf> {
        self.get_files_dir()
    }

    fn get_download_limit(&self) -> Result<usize> {
        self.get_max_files()
    }

    fn create_download_cache(&self) -> Result<DownloadCache> {
        let dir = self.get_download_dir()?;
        let limit = self.get_download_limit()?;
        Ok(DownloadCache::open(dir, limit)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_is_built_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        config.set_max_files(3).unwrap();

        let cache = config.create_download_cache().unwrap();
        assert_eq!(cache.max_files(), 3);
        assert!(cache.root().starts_with(dir.path()));
        assert!(cache.root().join(crate::cache::REGISTRY_FILE).exists());
    }
}
