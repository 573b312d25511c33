//! Harness configuration
//!
//! Loaded with figment in priority order: environment (`COURIER_*`, `__`
//! separates nesting levels) > `courier.toml` > defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HarnessError, HarnessResult};
use crate::identity::Identity;
use crate::wait::PollConfig;

/// Complete configuration of a harness run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub appium: AppiumConfig,
    pub timing: TimingConfig,
    pub balance: BalanceConfig,
    /// Named pre-existing accounts, e.g. `A_USER` and `B_USER`
    pub users: BTreeMap<String, Identity>,
    /// Where failure screenshots go; none are taken when unset
    pub artifacts_dir: Option<PathBuf>,
}

/// How to reach the automation server and what to launch on each device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppiumConfig {
    pub server_url: String,
    pub platform_name: String,
    pub platform_version: Option<String>,
    pub device_name: String,
    pub app_package: Option<String>,
    pub app_activity: Option<String>,
    /// Path or URL of the application build to install
    pub app: Option<String>,
    pub automation_name: String,
    pub new_command_timeout_secs: u64,
    pub no_reset: bool,
    /// Passed through verbatim as additional capabilities
    pub extra_capabilities: BTreeMap<String, Value>,
}

impl Default for AppiumConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:4723/wd/hub".to_string(),
            platform_name: "Android".to_string(),
            platform_version: None,
            device_name: "Android Emulator".to_string(),
            app_package: None,
            app_activity: None,
            app: None,
            automation_name: "UiAutomator2".to_string(),
            new_command_timeout_secs: 600,
            no_reset: false,
            extra_capabilities: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub balance_timeout_secs: u64,
    pub balance_poll_interval_secs: u64,
    pub session_startup_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            wait_timeout_ms: 20_000,
            poll_interval_ms: 500,
            balance_timeout_secs: 240,
            balance_poll_interval_secs: 10,
            session_startup_timeout_secs: 120,
        }
    }
}

impl TimingConfig {
    pub fn wait_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_millis(self.wait_timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn balance_config(&self) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(self.balance_timeout_secs),
            Duration::from_secs(self.balance_poll_interval_secs),
        )
    }

    pub fn session_startup_timeout(&self) -> Duration {
        Duration::from_secs(self.session_startup_timeout_secs)
    }

    fn validate(&self) -> HarnessResult<()> {
        let windows = [
            ("wait", self.wait_config()),
            ("balance", self.balance_config()),
        ];
        for (name, window) in windows {
            if window.timeout.is_zero() || window.interval.is_zero() {
                return Err(HarnessError::Config(format!("{} timeout and interval must be greater than 0", name)));
            }
            if window.interval > window.timeout {
                return Err(HarnessError::Config(format!(
                    "{} interval {:?} exceeds its timeout {:?}",
                    name, window.interval, window.timeout
                )));
            }
        }
        if self.session_startup_timeout_secs == 0 {
            return Err(HarnessError::Config("session startup timeout must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Etherscan-compatible balance API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceConfig {
    pub api_url: String,
    pub api_key: Option<String>,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api-ropsten.etherscan.io/api".to_string(),
            api_key: None,
        }
    }
}

impl HarnessConfig {
    /// Load from defaults, `courier.toml` in the working directory and the environment
    pub fn load() -> HarnessResult<Self> {
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Toml::file("courier.toml"))
                .merge(Env::prefixed("COURIER_").split("__")),
        )
    }

    /// Load from defaults, then `path`, then the environment
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> HarnessResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(HarnessError::Config(format!("config file {} does not exist", path.display())));
        }
        Self::extract(
            Figment::new()
                .merge(Serialized::defaults(Self::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed("COURIER_").split("__")),
        )
    }

    fn extract(figment: Figment) -> HarnessResult<Self> {
        let config: HarnessConfig = figment
            .extract()
            .map_err(|e| HarnessError::Config(format!("failed to load configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HarnessResult<()> {
        self.timing.validate()?;
        if self.appium.server_url.is_empty() {
            return Err(HarnessError::Config("appium server url must be set".to_string()));
        }
        for (name, identity) in &self.users {
            identity.validate(name)?;
        }
        Ok(())
    }

    /// Named user, required by the scenario asking for it
    pub fn user(&self, name: &str) -> HarnessResult<&Identity> {
        self.users
            .get(name)
            .ok_or_else(|| HarnessError::Config(format!("user '{}' is not configured", name)))
    }

    /// Commented starting point for `courier.toml`
    pub fn example_config() -> String {
        let mut example = HarnessConfig::default();
        example.users.insert(
            "A_USER".to_string(),
            Identity::new("twelve words of recovery phrase", "password-a", "User A")
                .with_public_key("0x04...")
                .with_address("0x..."),
        );
        example.artifacts_dir = Some(PathBuf::from("artifacts"));

        toml::to_string_pretty(&example).unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}
