//! Etherscan-compatible balance API client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::BalanceConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::verification::{Balance, BalanceSource};

/// Queries `?module=account&action=balance` on an Etherscan-style API
#[derive(Debug, Clone)]
pub struct EtherscanClient {
    client: Client,
    api_url: Url,
    api_key: Option<String>,
}

impl EtherscanClient {
    pub fn new(config: &BalanceConfig) -> HarnessResult<Self> {
        let api_url = Url::parse(&config.api_url)
            .map_err(|e| HarnessError::Config(format!("invalid balance api url '{}': {}", config.api_url, e)))?;
        Ok(Self {
            client: Client::new(),
            api_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Request URL for one balance query
    pub fn balance_url(&self, address: &str) -> Url {
        let mut url = self.api_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("module", "account")
                .append_pair("action", "balance")
                .append_pair("address", &normalize_address(address))
                .append_pair("tag", "latest");
            if let Some(key) = &self.api_key {
                query.append_pair("apikey", key);
            }
        }
        url
    }
}

#[async_trait]
impl BalanceSource for EtherscanClient {
    async fn get_balance(&self, address: &str) -> HarnessResult<Balance> {
        let url = self.balance_url(address);
        debug!("Querying balance of {}", address);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarnessError::Verification(format!("balance request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HarnessError::Verification(format!(
                "balance request returned {}",
                response.status()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| HarnessError::Verification(format!("balance response is not json: {}", e)))?;
        parse_balance_response(&body)
    }
}

/// `0x`-prefixed, lowercase address
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    let bare = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", bare.to_lowercase())
}

/// Extract the wei balance from `{"status":"1","message":"OK","result":"<wei>"}`
pub fn parse_balance_response(body: &Value) -> HarnessResult<Balance> {
    if body["status"].as_str() != Some("1") {
        let message = body["message"].as_str().unwrap_or("no message");
        let result = body["result"].as_str().unwrap_or_default();
        return Err(HarnessError::Verification(format!(
            "balance api error: {} {}",
            message, result
        )));
    }

    body["result"]
        .as_str()
        .ok_or_else(|| HarnessError::Verification("no result in balance response".to_string()))?
        .parse()
}
