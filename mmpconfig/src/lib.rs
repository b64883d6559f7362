//! # Configuration de MMP
//!
//! Le document par défaut (`mmp.yaml`, intégré à la bibliothèque) est
//! fusionné avec `<répertoire>/config.yaml`, puis surchargé par les
//! variables d'environnement `MMP_CONFIG__SECTION__CLE`. Le résultat est
//! réécrit sur disque au chargement et à chaque modification.
//!
//! ```no_run
//! use mmpconfig::Config;
//!
//! let config = Config::load_config("")?;
//! let refresh = config.get_refresh_interval()?;
//! config.set_max_files(500)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{anyhow, bail, Result};
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing::{debug, info, warn};

pub mod logging;

const DEFAULT_CONFIG: &str = include_str!("mmp.yaml");
const CONFIG_FILE: &str = "config.yaml";
const CONFIG_DIR_NAME: &str = ".mmp";

const ENV_CONFIG_DIR: &str = "MMP_CONFIG";
const ENV_PREFIX: &str = "MMP_CONFIG__";

const DEFAULT_REFRESH_INTERVAL_MS: u64 = 100;
const DEFAULT_LYRICS_INTERVAL_MS: u64 = 1000;
const DEFAULT_IDLE_POLL_MS: u64 = 10;
const DEFAULT_MAX_FILES: usize = 200;
const DEFAULT_FILES_DIR: &str = "media";
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;
pub const DEFAULT_TRACK_FORMAT: &str = "{artist} - {album} - {number} - {title}";

/// Valeur typée stockée dans l'arbre YAML
trait Setting: Sized {
    fn from_yaml(value: &Value) -> Option<Self>;
    fn into_yaml(self) -> Value;
}

impl Setting for usize {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_u64().map(|n| n as usize)
    }

    fn into_yaml(self) -> Value {
        Value::Number(Number::from(self as u64))
    }
}

impl Setting for bool {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_yaml(self) -> Value {
        Value::Bool(self)
    }
}

impl Setting for String {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_yaml(self) -> Value {
        Value::String(self)
    }
}

// Les durées sont stockées en millisecondes
impl Setting for Duration {
    fn from_yaml(value: &Value) -> Option<Self> {
        value.as_u64().map(Duration::from_millis)
    }

    fn into_yaml(self) -> Value {
        Value::Number(Number::from(self.as_millis() as u64))
    }
}

/// Génère le couple getter/setter d'une clé typée
///
/// Une clé absente ou du mauvais type donne la valeur par défaut.
macro_rules! setting {
    ($getter:ident, $setter:ident, $ty:ty, [$($key:literal),+], $default:expr) => {
        pub fn $getter(&self) -> Result<$ty> {
            Ok(self.read::<$ty>(&[$($key),+]).unwrap_or_else(|| $default))
        }

        pub fn $setter(&self, value: $ty) -> Result<()> {
            self.set_value(&[$($key),+], value.into_yaml())
        }
    };
}

/// Configuration de MMP, partagée par le lecteur et le cache
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    file: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Charge la configuration depuis `directory`
    ///
    /// Si `directory` est vide, le répertoire est cherché dans cet ordre :
    /// la variable `MMP_CONFIG`, `./.mmp`, puis `~/.mmp`. À défaut, `./.mmp`
    /// est créé.
    pub fn load_config(directory: impl AsRef<Path>) -> Result<Self> {
        let dir = locate_dir(directory.as_ref());
        fs::create_dir_all(&dir)?;
        if !dir.is_dir() {
            bail!("{} n'est pas un répertoire", dir.display());
        }
        info!(config_dir = %dir.display(), "Using config directory");

        let file = dir.join(CONFIG_FILE);
        let mut data: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;

        match fs::read_to_string(&file) {
            Ok(text) => {
                let external: Value = serde_yaml::from_str(&text)?;
                merge(&mut data, lowercase_keys(external));
                info!(config_file = %file.display(), "Loaded config file");
            }
            Err(_) => {
                info!(config_file = %file.display(), "Config file not found, using embedded defaults");
            }
        }

        apply_overrides(&mut data, env::vars());

        let config = Config {
            dir,
            file,
            data: Mutex::new(data),
        };
        config.save()?;
        Ok(config)
    }

    /// Réécrit `config.yaml`
    pub fn save(&self) -> Result<()> {
        let yaml = serde_yaml::to_string(&*self.data.lock().unwrap())?;
        fs::write(&self.file, yaml)?;
        Ok(())
    }

    /// Répertoire contenant `config.yaml`
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Valeur brute à `path` (ex: `&["files", "max_files"]`)
    ///
    /// Les clés ne sont pas sensibles à la casse.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data.lock().unwrap();
        lookup(&data, path)
            .cloned()
            .ok_or_else(|| anyhow!("Path {} does not exist", path.join(".")))
    }

    /// Modifie la valeur à `path`, crée les sections manquantes et sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        insert(&mut self.data.lock().unwrap(), path, value)?;
        self.save()
    }

    fn read<T: Setting>(&self, path: &[&str]) -> Option<T> {
        let data = self.data.lock().unwrap();
        lookup(&data, path).and_then(T::from_yaml)
    }

    /// Répertoire racine des fichiers téléchargés (un sous-répertoire par backend)
    ///
    /// Un chemin relatif est résolu par rapport au répertoire de
    /// configuration. Le répertoire est créé s'il n'existe pas.
    pub fn get_files_dir(&self) -> Result<PathBuf> {
        let configured = self
            .read::<String>(&["files", "directory"])
            .filter(|dir| !dir.is_empty());
        let dir = match configured {
            Some(dir) => PathBuf::from(dir),
            None => {
                self.set_files_dir(DEFAULT_FILES_DIR)?;
                PathBuf::from(DEFAULT_FILES_DIR)
            }
        };

        let dir = if dir.is_absolute() { dir } else { self.dir.join(dir) };
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            info!(directory = %dir.display(), "Created files directory");
        }
        Ok(dir)
    }

    pub fn set_files_dir(&self, directory: impl AsRef<Path>) -> Result<()> {
        let directory = directory.as_ref().to_string_lossy().into_owned();
        self.set_value(&["files", "directory"], Value::String(directory))
    }

    setting!(get_max_files, set_max_files, usize, ["files", "max_files"], DEFAULT_MAX_FILES);

    setting!(
        get_refresh_interval,
        set_refresh_interval,
        Duration,
        ["player", "refresh_interval_ms"],
        Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS)
    );

    setting!(
        get_lyrics_interval,
        set_lyrics_interval,
        Duration,
        ["player", "lyrics_interval_ms"],
        Duration::from_millis(DEFAULT_LYRICS_INTERVAL_MS)
    );

    setting!(
        get_idle_poll,
        set_idle_poll,
        Duration,
        ["jobs", "idle_poll_ms"],
        Duration::from_millis(DEFAULT_IDLE_POLL_MS)
    );

    setting!(
        get_log_enable_console,
        set_log_enable_console,
        bool,
        ["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    setting!(
        get_log_min_level,
        set_log_min_level,
        String,
        ["host", "logger", "min_level"],
        DEFAULT_LOG_MIN_LEVEL.to_string()
    );

    setting!(
        get_track_format,
        set_track_format,
        String,
        ["interface", "track_format"],
        DEFAULT_TRACK_FORMAT.to_string()
    );

    setting!(
        get_last_backend,
        set_last_backend,
        String,
        ["interface", "last_backend"],
        String::new()
    );
}

fn locate_dir(directory: &Path) -> PathBuf {
    if !directory.as_os_str().is_empty() {
        return directory.to_path_buf();
    }

    if let Some(dir) = env::var_os(ENV_CONFIG_DIR) {
        debug!(env_var = ENV_CONFIG_DIR, "Config directory taken from environment");
        return PathBuf::from(dir);
    }

    let local = PathBuf::from(CONFIG_DIR_NAME);
    if local.is_dir() {
        return local;
    }

    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .filter(|dir| dir.is_dir())
        .unwrap_or(local)
}

fn lookup<'a>(data: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(data, |node, key| node.get(key.to_lowercase()))
}

fn insert(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *data = value;
        return Ok(());
    };

    let mut node = data;
    for key in parents {
        node = node
            .as_mapping_mut()
            .ok_or_else(|| anyhow!("Section above {} is not a mapping", key))?
            .entry(Value::String(key.to_lowercase()))
            .or_insert(Value::Mapping(Mapping::new()));
    }
    node.as_mapping_mut()
        .ok_or_else(|| anyhow!("Section above {} is not a mapping", last))?
        .insert(Value::String(last.to_lowercase()), value);
    Ok(())
}

/// Applique les variables `MMP_CONFIG__A__B=valeur`
///
/// La valeur est lue comme du YAML (`42` donne un entier, `true` un
/// booléen) et reste une chaîne sinon.
fn apply_overrides(data: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (name, raw) in vars {
        let Some(key) = name.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let path: Vec<&str> = key.split("__").collect();
        let value: Value =
            serde_yaml::from_str(&raw).unwrap_or_else(|_| Value::String(raw.clone()));

        match insert(data, &path, value) {
            Ok(()) => debug!(variable = %name, "Applied environment override"),
            Err(e) => warn!(variable = %name, "Ignoring environment override: {}", e),
        }
    }
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lowercase_keys(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Fusionne `external` dans `default`
///
/// Les sections sont fusionnées clé par clé, les scalaires et séquences
/// sont remplacés. Un document vide ne change rien.
fn merge(default: &mut Value, external: Value) {
    match (default, external) {
        (_, Value::Null) => {}
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(&k) {
                    Some(dv) => merge(dv, v),
                    None => {
                        dmap.insert(k, v);
                    }
                }
            }
        }
        (d, e) => *d = e,
    }
}
