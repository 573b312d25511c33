//! External verification client
//!
//! Ground truth for side effects that happen outside the UI. Read-only: the
//! only repetition is the polling window of `verify_balance_is_updated`.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HarnessError, HarnessResult};
use crate::wait::{poll_until, PollConfig};

const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Account balance in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Balance(u128);

impl Balance {
    pub const fn from_wei(wei: u128) -> Self {
        Self(wei)
    }

    pub const fn wei(&self) -> u128 {
        self.0
    }
}

impl FromStr for Balance {
    type Err = HarnessError;

    /// Parse a decimal wei amount
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u128>()
            .map(Balance)
            .map_err(|e| HarnessError::Verification(format!("invalid balance '{}': {}", s, e)))
    }
}

impl fmt::Display for Balance {
    /// Whole ETH with the fractional part trimmed of trailing zeros
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / WEI_PER_ETH;
        let fraction = self.0 % WEI_PER_ETH;
        if fraction == 0 {
            return write!(f, "{} ETH", whole);
        }
        let digits = format!("{:018}", fraction);
        write!(f, "{}.{} ETH", whole, digits.trim_end_matches('0'))
    }
}

/// Where balances come from
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn get_balance(&self, address: &str) -> HarnessResult<Balance>;
}

/// Confirms that a transfer landed by watching the recipient's balance
pub struct BalanceVerifier<'a> {
    source: &'a dyn BalanceSource,
    config: PollConfig,
}

impl<'a> BalanceVerifier<'a> {
    pub fn new(source: &'a dyn BalanceSource, config: PollConfig) -> Self {
        Self { source, config }
    }

    pub async fn get_balance(&self, address: &str) -> HarnessResult<Balance> {
        self.source.get_balance(address).await
    }

    /// Poll until the balance of `address` differs from `initial`.
    ///
    /// `initial` must have been read before the transfer was triggered.
    /// Returns the new balance.
    pub async fn verify_balance_is_updated(&self, initial: Balance, address: &str) -> HarnessResult<Balance> {
        let source = self.source;
        let last_seen = &Mutex::new(initial);

        let what = format!("balance change of {}", address);
        let changed = poll_until(self.config, &what, move || {
            let fetch = source.get_balance(address);
            async move {
                let current = fetch.await?;
                *last_seen.lock().unwrap_or_else(|p| p.into_inner()) = current;
                Ok((current != initial).then_some(current))
            }
        })
        .await?;

        match changed {
            Some(updated) => {
                info!("Balance of {} changed: {} -> {}", address, initial, updated);
                Ok(updated)
            }
            None => {
                let actual = *last_seen.lock().unwrap_or_else(|p| p.into_inner());
                Err(HarnessError::VerificationMismatch {
                    address: address.to_string(),
                    expected: format!("balance different from {} within {:?}", initial, self.config.timeout),
                    actual: actual.to_string(),
                })
            }
        }
    }
}
