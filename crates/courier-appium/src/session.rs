//! Appium session over the W3C WebDriver HTTP protocol

use async_trait::async_trait;
use base64::Engine;
use reqwest::{Client, Response};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use courier_harness::{
    AppiumConfig, AutomationSession, ElementHandle, HarnessError, HarnessResult, Locator, SessionFactory,
};

use crate::capabilities::AppiumCapabilities;
use crate::error::{AppiumError, AppiumResult};
use crate::strategy::{scroll_strategy, to_strategy, Strategy};

/// W3C WebDriver element reference key
const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Element id out of a W3C or legacy JSONWP element reference
pub fn element_id(reference: &Value) -> Option<String> {
    reference[W3C_ELEMENT_KEY]
        .as_str()
        .or_else(|| reference["ELEMENT"].as_str())
        .map(str::to_string)
}

/// The `value` member of a successful response
async fn into_value(response: Response) -> AppiumResult<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await?;
        return Err(AppiumError::from_response(status.as_u16(), &body));
    }
    let mut body: Value = response.json().await?;
    Ok(body["value"].take())
}

/// One live Appium session
#[derive(Debug)]
pub struct AppiumSession {
    client: Client,
    server_url: String,
    session_id: String,
}

impl AppiumSession {
    /// Create a session on the server
    pub async fn start(
        client: Client,
        server_url: impl Into<String>,
        capabilities: &AppiumCapabilities,
    ) -> AppiumResult<Self> {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        info!("Starting Appium session for {} on {}", capabilities.device_name, server_url);

        let response = client
            .post(format!("{}/session", server_url))
            .json(&capabilities.session_payload())
            .send()
            .await?;
        let value = into_value(response).await?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or(AppiumError::MissingField("sessionId"))?
            .to_string();

        info!("Started Appium session: {}", session_id);
        Ok(Self {
            client,
            server_url,
            session_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.server_url, self.session_id, path)
    }

    async fn post(&self, path: &str, body: Value) -> AppiumResult<Value> {
        debug!("POST {} {}", path, body);
        let response = self.client.post(self.url(path)).json(&body).send().await?;
        into_value(response).await
    }

    async fn get(&self, path: &str) -> AppiumResult<Value> {
        debug!("GET {}", path);
        let response = self.client.get(self.url(path)).send().await?;
        into_value(response).await
    }

    async fn lookup(&self, path: &str, strategy: &Strategy) -> AppiumResult<Value> {
        self.post(path, json!({ "using": strategy.using, "value": strategy.value }))
            .await
    }

    fn element_path(element: &ElementHandle, action: &str) -> String {
        format!("/element/{}/{}", element.id, action)
    }
}

#[async_trait]
impl AutomationSession for AppiumSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn find_elements(&self, locator: &Locator) -> HarnessResult<Vec<ElementHandle>> {
        let strategy = to_strategy(locator);
        let value = match self.lookup("/elements", &strategy).await {
            Ok(value) => value,
            // some drivers answer an empty lookup with an error instead of []
            Err(e) if e.is_no_such_element() => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let references = value
            .as_array()
            .ok_or_else(|| HarnessError::from(AppiumError::MissingField("element list")))?;
        let elements: Vec<ElementHandle> = references
            .iter()
            .filter_map(element_id)
            .map(ElementHandle::new)
            .collect();
        debug!("{} matched {} element(s)", locator, elements.len());
        Ok(elements)
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        self.post(&Self::element_path(element, "click"), json!({})).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        let payload = json!({
            "text": text,
            "value": text.chars().map(|c| c.to_string()).collect::<Vec<_>>()
        });
        self.post(&Self::element_path(element, "value"), payload).await?;
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.post(&Self::element_path(element, "clear"), json!({})).await?;
        self.send_keys(element, text).await
    }

    async fn element_text(&self, element: &ElementHandle) -> HarnessResult<String> {
        let value = self.get(&Self::element_path(element, "text")).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppiumError::MissingField("element text").into())
    }

    async fn scroll_to(&self, locator: &Locator) -> HarnessResult<ElementHandle> {
        let strategy = scroll_strategy(locator)?;
        let value = self.lookup("/element", &strategy).await.map_err(|e| {
            if e.is_no_such_element() {
                HarnessError::ElementNotFound {
                    locator: locator.to_string(),
                }
            } else {
                e.into()
            }
        })?;
        element_id(&value)
            .map(ElementHandle::new)
            .ok_or_else(|| AppiumError::MissingField("element reference").into())
    }

    async fn press_keycode(&self, keycode: u32) -> HarnessResult<()> {
        self.post("/appium/device/press_keycode", json!({ "keycode": keycode }))
            .await?;
        Ok(())
    }

    async fn back(&self) -> HarnessResult<()> {
        self.post("/back", json!({})).await?;
        Ok(())
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        let value = self.get("/screenshot").await?;
        let encoded = value
            .as_str()
            .ok_or(AppiumError::MissingField("screenshot data"))?;
        let png = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(AppiumError::from)?;
        Ok(png)
    }

    async fn quit(&self) -> HarnessResult<()> {
        info!("Ending Appium session: {}", self.session_id);
        let response = self
            .client
            .delete(format!("{}/session/{}", self.server_url, self.session_id))
            .send()
            .await
            .map_err(AppiumError::from)?;
        if let Err(e) = into_value(response).await {
            warn!("Failed to end Appium session {} cleanly: {}", self.session_id, e);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Starts one Appium session per pool slot
#[derive(Debug, Clone)]
pub struct AppiumSessionFactory {
    client: Client,
    config: AppiumConfig,
}

impl AppiumSessionFactory {
    pub fn new(config: AppiumConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SessionFactory for AppiumSessionFactory {
    async fn start_session(&self, index: usize) -> HarnessResult<Box<dyn AutomationSession>> {
        let capabilities = AppiumCapabilities::for_device(&self.config, index);
        let session = AppiumSession::start(self.client.clone(), self.config.server_url.clone(), &capabilities)
            .await
            .map_err(|e| HarnessError::SessionStartup {
                index,
                reason: e.to_string(),
            })?;
        Ok(Box::new(session))
    }
}
