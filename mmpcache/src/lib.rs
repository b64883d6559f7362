//! # mmpcache - Cache de téléchargement pour MMP
//!
//! Cette crate garde la trace des fichiers téléchargés par les backends :
//! un registre persistant (SQLite) associe chaque chemin local à sa date
//! de fin de téléchargement.
//!
//! ## Vue d'ensemble
//!
//! - Un seul téléchargement à la fois par chemin : une réservation en cours
//!   rejette toute seconde tentative avec [`Error::AlreadyDownloading`]
//! - Le nombre de fichiers est borné : après chaque téléchargement réussi,
//!   les fichiers terminés les plus anciens sont évincés
//! - Un échec libère la réservation, un nouvel essai reste possible
//!
//! ```text
//! mmpcache
//!     ├── db.rs        - Contrat FileRegistry + registre SQLite
//!     ├── fetch.rs     - Contrat Fetcher + client HTTP bloquant
//!     └── cache.rs     - DownloadCache (réservation, rollback, éviction)
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use mmpcache::{DownloadCache, DownloadState};
//!
//! fn main() -> mmpcache::Result<()> {
//!     let cache = DownloadCache::open("./media", 200)?.namespace("soma")?;
//!     let path = cache.download_file("http://example.com/track.mp3", "track.mp3", false)?;
//!     assert_eq!(cache.get_state("track.mp3")?, DownloadState::Downloaded);
//!     println!("Stored at {:?}", path);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod db;
pub mod error;
pub mod fetch;

#[cfg(feature = "mmpconfig")]
pub mod config_ext;

pub use cache::{DownloadCache, DownloadState};
pub use db::{FileRecord, FileRegistry, SqliteRegistry};
pub use error::{Error, Result};
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};

#[cfg(feature = "mmpconfig")]
pub use config_ext::CacheConfigExt;
