//! Layered application configuration: a YAML file overlaid with `NUTRIFIT__*`
//! environment variables, optionally reloaded when the file changes.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, mpsc};
use std::thread;
use std::time::Duration;

use config::{Config as RawConfig, Environment, File};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Prefix for environment overrides, e.g. `NUTRIFIT__IDENTITY__SERVICE_ROLE_KEY`.
const ENV_PREFIX: &str = "NUTRIFIT";
const ENV_SEPARATOR: &str = "__";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load or parse configuration")]
    Load(#[from] config::ConfigError),

    #[error("Failed to initialize configuration file watcher")]
    Watch(#[from] notify::Error),

    #[error("Configuration lock was poisoned")]
    LockPoisoned,
}

#[derive(Debug)]
pub struct Config {
    inner: Arc<RwLock<RawConfig>>,
    // Dropping the watcher stops the reload thread.
    _watcher: Option<RecommendedWatcher>,
}

impl Config {
    pub fn builder<P: AsRef<Path>>(path: P) -> ConfigBuilder {
        ConfigBuilder::new(path.as_ref().to_path_buf())
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn builder_test() -> test_utils::TestConfigBuilder {
        test_utils::TestConfigBuilder::new()
    }

    /// Reads a required key.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ConfigError> {
        let guard = self.inner.read().map_err(|_| ConfigError::LockPoisoned)?;
        guard.get(key).map_err(ConfigError::from)
    }

    /// Reads an optional key, falling back to `default` when the key is absent.
    ///
    /// A key that is present but has the wrong type is still an error.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.get::<T>(key) {
            Ok(value) => Ok(value),
            Err(ConfigError::Load(config::ConfigError::NotFound(_))) => Ok(default),
            Err(err) => Err(err),
        }
    }
}

pub struct ConfigBuilder {
    path: PathBuf,
    env_overrides: bool,
    watch: bool,
    watch_interval: Duration,
}

impl ConfigBuilder {
    fn new(path: PathBuf) -> Self {
        Self { path, env_overrides: true, watch: false, watch_interval: Duration::from_secs(2) }
    }

    /// Disables `NUTRIFIT__*` environment overrides.
    pub fn without_env(mut self) -> Self {
        self.env_overrides = false;
        self
    }

    pub fn watch(mut self) -> Self {
        self.watch = true;
        self
    }

    pub fn watch_interval(mut self, interval: Duration) -> Self {
        self.watch_interval = interval;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let raw = Self::load(&self.path, self.env_overrides)?;
        let shared = Arc::new(RwLock::new(raw));

        let watcher = if self.watch { Some(self.spawn_watcher(Arc::clone(&shared))?) } else { None };

        Ok(Config { inner: shared, _watcher: watcher })
    }

    fn spawn_watcher(&self, shared: Arc<RwLock<RawConfig>>) -> Result<RecommendedWatcher, ConfigError> {
        let path = self.path.clone();
        let env_overrides = self.env_overrides;
        let (tx, rx) = mpsc::channel();

        let mut watcher =
            RecommendedWatcher::new(tx, notify::Config::default().with_poll_interval(self.watch_interval))?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        thread::spawn(move || {
            tracing::info!(path = %path.display(), "Watching configuration file for changes");
            while let Ok(event) = rx.recv() {
                match event {
                    Ok(Event { kind: notify::EventKind::Modify(_), .. }) => {
                        Self::reload(&path, env_overrides, &shared);
                    },
                    Err(e) => tracing::error!("Configuration watcher error: {:?}", e),
                    _ => {},
                }
            }
        });

        Ok(watcher)
    }

    fn reload(path: &Path, env_overrides: bool, shared: &RwLock<RawConfig>) {
        let fresh = match Self::load(path, env_overrides) {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!("Failed to reload configuration, keeping previous values: {}", e);
                return;
            },
        };

        match shared.write() {
            Ok(mut guard) => {
                *guard = fresh;
                tracing::info!("Configuration reloaded");
            },
            Err(_) => tracing::error!("Configuration lock poisoned, reload skipped"),
        }
    }

    fn load(path: &Path, env_overrides: bool) -> Result<RawConfig, config::ConfigError> {
        let mut builder = RawConfig::builder().add_source(File::from(path).required(true));
        if env_overrides {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR));
        }
        builder.build()
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod test_utils {
    use std::collections::HashMap;

    use config::Value;

    use super::*;

    /// In-memory configuration for tests.
    #[derive(Default)]
    pub struct TestConfigBuilder {
        values: HashMap<String, Value>,
    }

    impl TestConfigBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
            self.values.insert(key.to_string(), value.into());
            self
        }

        pub fn build(self) -> Config {
            let mut builder = RawConfig::builder();
            for (key, value) in self.values {
                builder = builder.set_override(key, value).expect("invalid test config key");
            }
            let raw = builder.build().expect("Failed to create config from test values");

            Config { inner: Arc::new(RwLock::new(raw)), _watcher: None }
        }
    }
}
