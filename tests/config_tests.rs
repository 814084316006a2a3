// Config loading from TOML files and the environment
use std::io::Write;

use studykit::config::{default_config_path, CONFIG_ENV_VAR};
use studykit::{ConfigError, ExtractionConfig, StudyConfig};

#[test]
fn test_from_file_overrides_only_given_keys() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[analysis]
key_term_limit = 5
stop_words = ["cell"]

[summary]
lede_sentences = 1
"#
    )
    .unwrap();

    let config = StudyConfig::from_file(file.path()).unwrap();
    assert_eq!(config.analysis.key_term_limit, 5);
    assert_eq!(config.analysis.stop_words, vec!["cell".to_string()]);
    assert_eq!(config.summary.lede_sentences, 1);
    assert_eq!(config.summary.closing_sentences, 2);
    assert_eq!(config.extraction, ExtractionConfig::default());
}

#[test]
fn test_missing_file_is_io_error() {
    let err = StudyConfig::from_file("/no/such/studykit.toml").unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_wrong_type_is_toml_error() {
    let err = StudyConfig::from_toml_str("[quiz]\nshuffle_seed = \"seven\"").unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}

#[test]
fn test_empty_file_is_all_defaults() {
    assert_eq!(StudyConfig::from_toml_str("").unwrap(), StudyConfig::default());
}

#[test]
fn test_serialized_defaults_load_back() {
    let text = toml::to_string(&StudyConfig::default()).unwrap();
    assert_eq!(StudyConfig::from_toml_str(&text).unwrap(), StudyConfig::default());
}

#[test]
fn test_env_var_points_at_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[extraction]\nmax_pages = 3").unwrap();

    std::env::set_var(CONFIG_ENV_VAR, file.path());
    let loaded = StudyConfig::load();
    std::env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(loaded.unwrap().extraction.max_pages, 3);
}

#[test]
fn test_default_path_is_under_studykit() {
    if let Some(path) = default_config_path() {
        assert!(path.ends_with("studykit/config.toml"));
    }
}
