//! Registre persistant des fichiers téléchargés
//!
//! Chaque enregistrement associe un chemin local à sa date de fin de
//! téléchargement. Un enregistrement sans date signale un téléchargement
//! en cours : tant qu'il existe, aucun second téléchargement du même
//! chemin ne doit démarrer.

use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Enregistrement d'un fichier dans le registre
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Chemin local du fichier (clé unique)
    pub path: PathBuf,
    /// Date de fin du téléchargement, `None` tant qu'il est en cours
    pub downloaded: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Réservation d'un chemin pour un téléchargement qui commence
    pub fn in_progress(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            downloaded: None,
        }
    }

    /// Fichier complet, daté de maintenant
    pub fn downloaded_now(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            downloaded: Some(Utc::now()),
        }
    }

    pub fn is_downloading(&self) -> bool {
        self.downloaded.is_none()
    }
}

/// Contrat de persistance du registre
///
/// Le stockage réel (table SQLite, mémoire, ...) est un détail
/// d'implémentation derrière ce trait.
pub trait FileRegistry: Send + Sync {
    /// Enregistrement associé à `path`, s'il existe
    fn get(&self, path: &Path) -> Result<Option<FileRecord>>;

    /// Crée ou remplace l'enregistrement de `record.path`
    ///
    /// Un remplacement conserve l'ordre d'insertion d'origine.
    fn put(&self, record: &FileRecord) -> Result<()>;

    /// Supprime l'enregistrement de `path` (sans erreur s'il n'existe pas)
    fn delete(&self, path: &Path) -> Result<()>;

    /// Enregistrements terminés, du plus ancien au plus récent
    ///
    /// À date égale, l'ordre d'insertion départage.
    fn list_ordered_by_completion(&self) -> Result<Vec<FileRecord>>;

    /// Nombre total d'enregistrements, en cours compris
    fn count(&self) -> Result<usize>;

    /// Enregistrements dont le téléchargement n'est pas terminé
    fn list_in_progress(&self) -> Result<Vec<FileRecord>>;
}

/// Registre SQLite
///
/// Table `files` :
/// - `id` : ordre d'insertion
/// - `path` : chemin unique
/// - `downloaded` : date RFC3339 (UTC, microsecondes) ou NULL
#[derive(Debug)]
pub struct SqliteRegistry {
    conn: Mutex<Connection>,
}

impl SqliteRegistry {
    /// Ouvre (ou crée) le registre dans le fichier `path`
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// use mmpcache::db::SqliteRegistry;
    /// use std::path::Path;
    ///
    /// let registry = SqliteRegistry::open(Path::new("files.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Registre volatil, utile pour les tests et les caches éphémères
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS files (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                downloaded TEXT
            )",
            [],
        )?;

        // Index pour la politique d'éviction (list_ordered_by_completion)
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_files_downloaded ON files (downloaded ASC, id ASC)",
            [],
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn query_records(&self, sql: &str) -> Result<Vec<FileRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}

impl FileRegistry for SqliteRegistry {
    fn get(&self, path: &Path) -> Result<Option<FileRecord>> {
        let conn = self.conn.lock().unwrap();
        let record = conn
            .query_row(
                "SELECT path, downloaded FROM files WHERE path = ?1",
                [path_key(path)],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn put(&self, record: &FileRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO files (path, downloaded) VALUES (?1, ?2)
             ON CONFLICT(path) DO UPDATE SET downloaded = excluded.downloaded",
            params![
                path_key(&record.path),
                record.downloaded.as_ref().map(format_timestamp)
            ],
        )?;
        Ok(())
    }

    fn delete(&self, path: &Path) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM files WHERE path = ?1", [path_key(path)])?;
        Ok(())
    }

    fn list_ordered_by_completion(&self) -> Result<Vec<FileRecord>> {
        self.query_records(
            "SELECT path, downloaded FROM files
             WHERE downloaded IS NOT NULL
             ORDER BY downloaded ASC, id ASC",
        )
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn list_in_progress(&self) -> Result<Vec<FileRecord>> {
        self.query_records("SELECT path, downloaded FROM files WHERE downloaded IS NULL ORDER BY id ASC")
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

// Format fixe : l'ordre lexicographique suit l'ordre chronologique
fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    let path: String = row.get(0)?;
    let downloaded: Option<String> = row.get(1)?;
    let downloaded = downloaded
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                })
        })
        .transpose()?;

    Ok(FileRecord {
        path: PathBuf::from(path),
        downloaded,
    })
}
