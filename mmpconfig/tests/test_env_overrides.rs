use mmpconfig::Config;
use std::env;
use std::fs;
use std::time::Duration;

const OVERRIDES: [(&str, &str); 3] = [
    ("MMP_CONFIG__FILES__MAX_FILES", "42"),
    ("MMP_CONFIG__Player__Refresh_Interval_MS", "250"),
    ("MMP_CONFIG__INTERFACE__LAST_BACKEND", "soma"),
];

// Seul test de ce binaire : les variables d'environnement sont globales au processus
#[test]
fn test_environment_overrides_win_over_config_file() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.yaml"),
        "files:\n  max_files: 3\ninterface:\n  last_backend: youtube\n",
    )
    .unwrap();

    for (name, value) in OVERRIDES {
        env::set_var(name, value);
    }
    let config = Config::load_config(dir.path());
    for (name, _) in OVERRIDES {
        env::remove_var(name);
    }
    let config = config.unwrap();

    assert_eq!(config.get_max_files().unwrap(), 42);
    assert_eq!(config.get_refresh_interval().unwrap(), Duration::from_millis(250));
    assert_eq!(config.get_last_backend().unwrap(), "soma");
    assert_eq!(config.get_lyrics_interval().unwrap(), Duration::from_millis(1000));

    // La valeur surchargée est sauvegardée, sous une clé en minuscules
    let reloaded = Config::load_config(dir.path()).unwrap();
    assert_eq!(reloaded.get_max_files().unwrap(), 42);
    let saved = fs::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(saved.contains("refresh_interval_ms: 250"));
    assert!(!saved.contains("Refresh_Interval_MS"));
}
