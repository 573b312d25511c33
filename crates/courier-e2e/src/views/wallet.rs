//! Wallet tab, transaction history and transaction details

use std::time::Duration;

use tracing::info;

use courier_harness::{retry_bounded, ElementKind, HarnessError, HarnessResult, Locator};

use super::{Device, Screen, View};

/// History reloads between scroll attempts
const FIND_TRANSACTION_ATTEMPTS: usize = 5;

const FIND_TRANSACTION_INTERVAL: Duration = Duration::from_secs(3);

fn transactions_button() -> Locator {
    Locator::accessibility_id("transactions-button")
}

fn transaction_hash_text() -> Locator {
    Locator::accessibility_id("transaction-hash")
}

/// Text of a history entry
pub fn transaction_amount_text(amount: &str) -> String {
    format!("{} ETH", amount)
}

pub struct WalletView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for WalletView<'a> {
    const SCREEN: Screen = Screen::Wallet;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> WalletView<'a> {
    pub async fn transactions(self) -> HarnessResult<TransactionsView<'a>> {
        self.device.click(&transactions_button()).await?;
        Ok(self.goto())
    }
}

pub struct TransactionsView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for TransactionsView<'a> {
    const SCREEN: Screen = Screen::Transactions;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> TransactionsView<'a> {
    /// Open the history entry for `amount`.
    ///
    /// The entry must read exactly `<amount> ETH`, so `0.01` never opens a
    /// `0.0123` transfer. A fresh transaction can take a few refreshes to show
    /// up, so the list is scrolled again a bounded number of times.
    pub async fn find_transaction(self, amount: &str) -> HarnessResult<TransactionDetailsView<'a>> {
        let entry = Locator::text_of(ElementKind::Button, transaction_amount_text(amount));
        let session = self.device.session();
        let entry = &entry;
        let element = retry_bounded(
            FIND_TRANSACTION_ATTEMPTS,
            FIND_TRANSACTION_INTERVAL,
            "transaction in history",
            move || async move { session.scroll_to(entry).await },
        )
        .await?;

        info!("{}: found transaction of {} ETH", self.device.actor(), amount);
        session.click(&element).await?;
        Ok(self.goto())
    }
}

pub struct TransactionDetailsView<'a> {
    device: Device<'a>,
}

impl<'a> View<'a> for TransactionDetailsView<'a> {
    const SCREEN: Screen = Screen::TransactionDetails;

    fn on(device: Device<'a>) -> Self {
        Self { device }
    }

    fn device(&self) -> Device<'a> {
        self.device
    }
}

impl<'a> TransactionDetailsView<'a> {
    pub async fn hash(&self) -> HarnessResult<String> {
        let hash = self.device.text_of(&transaction_hash_text()).await?;
        if !hash.starts_with("0x") {
            return Err(HarnessError::action(
                "transaction_hash",
                format!("'{}' is not a transaction hash", hash),
            ));
        }
        Ok(hash)
    }
}
