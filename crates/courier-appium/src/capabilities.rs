//! Desired capabilities sent when a session is created

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use courier_harness::AppiumConfig;

/// First UiAutomator2 server port; parallel sessions need one port each
const BASE_SYSTEM_PORT: u64 = 8200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppiumCapabilities {
    #[serde(rename = "platformName")]
    pub platform_name: String,
    #[serde(rename = "platformVersion", skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(rename = "deviceName")]
    pub device_name: String,
    #[serde(rename = "appPackage", skip_serializing_if = "Option::is_none")]
    pub app_package: Option<String>,
    #[serde(rename = "appActivity", skip_serializing_if = "Option::is_none")]
    pub app_activity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    #[serde(rename = "automationName")]
    pub automation_name: String,
    #[serde(rename = "newCommandTimeout")]
    pub new_command_timeout: u64,
    #[serde(rename = "noReset")]
    pub no_reset: bool,
    #[serde(flatten)]
    pub additional: BTreeMap<String, Value>,
}

impl AppiumCapabilities {
    /// Capabilities for pool slot `index`
    pub fn for_device(config: &AppiumConfig, index: usize) -> Self {
        let mut additional = config.extra_capabilities.clone();
        if config.automation_name.eq_ignore_ascii_case("UiAutomator2") {
            additional
                .entry("systemPort".to_string())
                .or_insert_with(|| json!(BASE_SYSTEM_PORT + index as u64));
        }

        Self {
            platform_name: config.platform_name.clone(),
            platform_version: config.platform_version.clone(),
            device_name: config.device_name.clone(),
            app_package: config.app_package.clone(),
            app_activity: config.app_activity.clone(),
            app: config.app.clone(),
            automation_name: config.automation_name.clone(),
            new_command_timeout: config.new_command_timeout_secs,
            no_reset: config.no_reset,
            additional,
        }
    }

    /// `POST /session` body
    pub fn session_payload(&self) -> Value {
        json!({
            "capabilities": {
                "alwaysMatch": self,
                "firstMatch": [{}]
            },
            "desiredCapabilities": self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_device_gets_its_own_system_port() {
        let config = AppiumConfig::default();
        let first = AppiumCapabilities::for_device(&config, 0);
        let second = AppiumCapabilities::for_device(&config, 1);
        assert_eq!(first.additional["systemPort"], json!(8200));
        assert_eq!(second.additional["systemPort"], json!(8201));
    }

    #[test]
    fn test_payload_uses_webdriver_names() {
        let mut config = AppiumConfig::default();
        config.app = Some("/builds/app.apk".to_string());
        let payload = AppiumCapabilities::for_device(&config, 0).session_payload();

        let caps = &payload["capabilities"]["alwaysMatch"];
        assert_eq!(caps["platformName"], "Android");
        assert_eq!(caps["automationName"], "UiAutomator2");
        assert_eq!(caps["app"], "/builds/app.apk");
        assert!(caps.get("appPackage").is_none());
    }

    #[test]
    fn test_explicit_system_port_wins() {
        let mut config = AppiumConfig::default();
        config.extra_capabilities.insert("systemPort".to_string(), json!(9000));
        let caps = AppiumCapabilities::for_device(&config, 3);
        assert_eq!(caps.additional["systemPort"], json!(9000));
    }
}
