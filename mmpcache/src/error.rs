//! Types d'erreurs pour mmpcache

use std::path::PathBuf;

/// Erreurs du cache de téléchargement
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Un téléchargement vers ce chemin est déjà en cours
    #[error("Already downloading: {}", .0.display())]
    AlreadyDownloading(PathBuf),

    /// Le serveur a répondu avec un statut d'échec
    #[error("Download of {url} failed with status {code}")]
    DownloadFailed { code: u16, url: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Type Result spécialisé pour mmpcache
pub type Result<T> = std::result::Result<T, Error>;
