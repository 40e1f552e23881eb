use std::path::Path;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "s3-sweeper.toml";

/// Prefix for environment overrides, e.g. `S3_SWEEPER__SCAN__WORKERS=20`
pub const ENV_PREFIX: &str = "S3_SWEEPER__";

/// Object storage connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Provider region used for S3 requests
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack)
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Allow plain HTTP connections to `endpoint`
    #[serde(default)]
    pub allow_http: bool,
    /// Non-S3 backend, `memory://` or `file:///path/to/buckets`
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            region: String::from("us-east-1"),
            endpoint: None,
            allow_http: false,
            url: None,
        }
    }
}

/// Scan pipeline settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Objects older than this many days are stale
    pub days: u64,
    /// Number of parallel classification workers
    pub workers: usize,
    /// Delete stale objects instead of only reporting them. Only the
    /// `--delete` flag sets this; file and env values are ignored.
    #[serde(skip_deserializing)]
    pub delete: bool,
    /// How many listed objects may wait for a worker before listing pauses
    pub queue_capacity: usize,
    /// Listing entries requested per page
    pub page_size: usize,
    /// Log listing progress every N pages
    pub progress_interval_pages: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            days: 30,
            workers: 10,
            delete: false,
            queue_capacity: 100,
            page_size: 1000,
            progress_interval_pages: 10,
        }
    }
}

/// Values given explicitly on the command line. They take precedence over
/// every other configuration source.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub region: Option<String>,
    pub days: Option<u64>,
    pub workers: Option<usize>,
    /// Whether `--delete` was given. Absent means a dry run.
    pub delete: bool,
}

impl ConfigOverrides {
    fn apply(&self, mut figment: Figment) -> Figment {
        if let Some(region) = &self.region {
            figment = figment.merge(Serialized::default("storage.region", region));
        }
        if let Some(days) = self.days {
            figment = figment.merge(Serialized::default("scan.days", days));
        }
        if let Some(workers) = self.workers {
            figment = figment.merge(Serialized::default("scan.workers", workers));
        }
        figment
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Scan pipeline configuration
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Configuration {
    /// Layer defaults, the TOML file, `S3_SWEEPER__*` env vars and CLI overrides.
    pub fn figment(path: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let figment = Figment::from(Serialized::defaults(Configuration::default()));
        let figment = match path {
            Some(path) => figment.merge(Toml::file(path)),
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };
        let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        overrides.apply(figment)
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_with(None, &ConfigOverrides::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        Self::load_with(Some(path), &ConfigOverrides::default())
    }

    pub fn load_with(
        path: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, Box<figment::Error>> {
        let mut config: Self = Self::figment(path, overrides)
            .extract()
            .map_err(Box::new)?;
        config.scan.delete = overrides.delete;

        Ok(config)
    }

    /// Reject settings the scan pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.region.trim().is_empty() {
            anyhow::bail!("storage.region cannot be empty");
        }

        if self.scan.workers == 0 {
            anyhow::bail!("scan.workers must be positive, got {}", self.scan.workers);
        }

        if self.scan.queue_capacity == 0 {
            anyhow::bail!(
                "scan.queue_capacity must be positive, got {}",
                self.scan.queue_capacity
            );
        }

        if self.scan.page_size == 0 {
            anyhow::bail!("scan.page_size must be positive, got {}", self.scan.page_size);
        }

        if self.scan.progress_interval_pages == 0 {
            anyhow::bail!(
                "scan.progress_interval_pages must be positive, got {}",
                self.scan.progress_interval_pages
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.storage.region, "us-east-1");
        assert!(config.storage.endpoint.is_none());
        assert!(config.storage.url.is_none());
        assert_eq!(config.scan.days, 30);
        assert_eq!(config.scan.workers, 10);
        assert!(!config.scan.delete, "Dry run must be the default");
        assert_eq!(config.scan.queue_capacity, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configless_operation() {
        Jail::expect_with(|_jail| {
            let config = Configuration::load().map_err(|e| *e)?;

            assert_eq!(config.scan.workers, 10);
            assert_eq!(config.storage.region, "us-east-1");
            Ok(())
        });
    }

    #[test]
    fn test_toml_file_is_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                DEFAULT_CONFIG_FILE,
                r#"
                [storage]
                region = "eu-central-1"
                endpoint = "http://localhost:9000"
                allow_http = true

                [scan]
                days = 7
                queue_capacity = 500
                "#,
            )?;

            let config = Configuration::load().map_err(|e| *e)?;

            assert_eq!(config.storage.region, "eu-central-1");
            assert_eq!(
                config.storage.endpoint.as_deref(),
                Some("http://localhost:9000")
            );
            assert!(config.storage.allow_http);
            assert_eq!(config.scan.days, 7);
            assert_eq!(config.scan.queue_capacity, 500);
            // Untouched keys keep their defaults
            assert_eq!(config.scan.workers, 10);
            Ok(())
        });
    }

    #[test]
    fn test_env_var_override() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "[scan]\nworkers = 4\n")?;
            jail.set_env("S3_SWEEPER__SCAN__WORKERS", "20");
            jail.set_env("S3_SWEEPER__STORAGE__URL", "memory://");

            let config = Configuration::load().map_err(|e| *e)?;

            assert_eq!(config.scan.workers, 20);
            assert_eq!(config.storage.url.as_deref(), Some("memory://"));
            Ok(())
        });
    }

    #[test]
    fn test_cli_overrides_win() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[scan]\ndays = 90\nworkers = 3\n")?;
            jail.set_env("S3_SWEEPER__SCAN__DAYS", "60");

            let overrides = ConfigOverrides {
                region: Some("ap-south-1".to_string()),
                days: Some(10),
                delete: true,
                ..Default::default()
            };
            let config = Configuration::load_with(Some(Path::new("custom.toml")), &overrides)
                .map_err(|e| *e)?;

            assert_eq!(config.storage.region, "ap-south-1");
            assert_eq!(config.scan.days, 10);
            assert_eq!(config.scan.workers, 3);
            assert!(config.scan.delete);
            Ok(())
        });
    }

    #[test]
    fn test_delete_from_env_or_file_is_ignored() {
        Jail::expect_with(|jail| {
            jail.create_file(DEFAULT_CONFIG_FILE, "[scan]\ndelete = true\ndays = 3\n")?;
            jail.set_env("S3_SWEEPER__SCAN__DELETE", "true");

            let config = Configuration::load().map_err(|e| *e)?;

            assert!(!config.scan.delete, "Without --delete the scan is a dry run");
            assert_eq!(config.scan.days, 3);
            Ok(())
        });
    }

    #[test]
    fn test_delete_flag_enables_delete_mode() {
        Jail::expect_with(|jail| {
            jail.set_env("S3_SWEEPER__SCAN__DELETE", "false");

            let overrides = ConfigOverrides {
                delete: true,
                ..Default::default()
            };
            let config = Configuration::load_with(None, &overrides).map_err(|e| *e)?;

            assert!(config.scan.delete);
            Ok(())
        });
    }

    #[test]
    fn test_zero_workers_is_invalid() {
        let mut config = Configuration::default();
        config.scan.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_queue_capacity_is_invalid() {
        let mut config = Configuration::default();
        config.scan.queue_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_region_is_invalid() {
        let mut config = Configuration::default();
        config.storage.region = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
