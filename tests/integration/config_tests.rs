use figment::providers::Serialized;
use figment::Figment;
use imagedupe::config::{Config, ConfigError};
use imagedupe::scanner::PerceptualAlgorithm;
use std::path::{Path, PathBuf};

#[test]
fn test_config_load_defaults() {
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config.threshold, 80.0);
    assert_eq!(config.algorithm, PerceptualAlgorithm::Phash);
    assert_eq!(config.io_threads, 4);
    assert!(!config.strict);
    assert_eq!(config.cache_path, None);
}

#[test]
fn test_config_round_trips_through_toml_file() {
    figment::Jail::expect_with(|jail| {
        let written = Config {
            threshold: 95.0,
            algorithm: PerceptualAlgorithm::Ahash,
            io_threads: 2,
            strict: true,
            cache_path: Some(PathBuf::from("/var/cache/imagedupe.json")),
        };
        jail.create_file("config.toml", &toml::to_string(&written).unwrap())?;

        let loaded = Config::try_load(Some(Path::new("config.toml"))).unwrap();
        assert_eq!(loaded, written);
        Ok(())
    });
}

#[test]
fn test_env_overrides_toml() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "threshold = 70.0\nalgorithm = \"ahash\"")?;
        jail.set_env("IMAGEDUPE_THRESHOLD", "88.5");
        jail.set_env("IMAGEDUPE_CACHE_PATH", "/tmp/fp.json");

        let config = Config::load(Some(Path::new("config.toml")));
        assert_eq!(config.threshold, 88.5);
        assert_eq!(config.algorithm, PerceptualAlgorithm::Ahash);
        assert_eq!(config.cache_path, Some(PathBuf::from("/tmp/fp.json")));
        Ok(())
    });
}

#[test]
fn test_unknown_algorithm_falls_back_to_defaults() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "algorithm = \"sha256\"")?;

        let err = Config::try_load(Some(Path::new("config.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(Config::load(Some(Path::new("config.toml"))), Config::default());
        Ok(())
    });
}

#[test]
fn test_out_of_range_values_fail_validation() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("config.toml", "threshold = 150.0")?;

        let config = Config::load(Some(Path::new("config.toml")));
        assert_eq!(config.threshold, 150.0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold"));
        Ok(())
    });
}
