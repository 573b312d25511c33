//! Scenario actions built on the page objects
//!
//! Each action assumes its actor is on the screen the action starts from and
//! drives the typed views from there.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::info;

use courier_harness::{Action, HarnessError, HarnessResult, StepContext, Target, Text};

use crate::views::{ChatView, ConsoleView, Device, HomeView, SendTransactionView, TransactionsView, View};

fn device<'a>(ctx: &StepContext<'a>) -> Device<'a> {
    Device::of_step(ctx)
}

/// Digits of the current time in milliseconds, used to make names and
/// amounts unique per run
fn clock_digits() -> HarnessResult<u128> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .map_err(|e| HarnessError::action("clock", e))
}

/// Amount of the form `0.0NNNN` with trailing zeros dropped, the way the
/// app displays it
pub fn unique_amount(seed: u128) -> String {
    let digits = format!("0.0{:04}", seed % 9999 + 1);
    digits.trim_end_matches('0').to_string()
}

/// Sign up a fresh account from the console; ends on the home view
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateUser;

#[async_trait]
impl Action for CreateUser {
    fn describe(&self) -> String {
        "create user".to_string()
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        ConsoleView::on(device(ctx)).create_user().await.map(|_| ())
    }
}

/// Click the home tab
#[derive(Debug, Clone, Copy, Default)]
pub struct GoHome;

#[async_trait]
impl Action for GoHome {
    fn describe(&self) -> String {
        "go home".to_string()
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        HomeView::on(device(ctx)).home().await.map(|_| ())
    }
}

/// Store the actor's public key in a variable
#[derive(Debug, Clone)]
pub struct ReadPublicKey {
    pub var: String,
}

impl ReadPublicKey {
    pub fn into_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl Action for ReadPublicKey {
    fn describe(&self) -> String {
        format!("read public key as ${}", self.var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let key = HomeView::on(device(ctx)).public_key().await?;
        ctx.vars.set(self.var.clone(), key);
        Ok(())
    }
}

/// Start a one-to-one chat from the home view
#[derive(Debug, Clone)]
pub struct AddContact {
    pub public_key: Text,
}

impl AddContact {
    pub fn new(public_key: impl Into<Text>) -> Self {
        Self {
            public_key: public_key.into(),
        }
    }
}

#[async_trait]
impl Action for AddContact {
    fn describe(&self) -> String {
        format!("add contact {}", self.public_key)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let key = ctx.resolve(&self.public_key)?;
        HomeView::on(device(ctx)).add_contact(&key).await.map(|_| ())
    }
}

/// Type a message into the open chat and send it
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub text: Text,
}

impl SendMessage {
    pub fn new(text: impl Into<Text>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Action for SendMessage {
    fn describe(&self) -> String {
        format!("send message {}", self.text)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let text = ctx.resolve(&self.text)?;
        ChatView::on(device(ctx)).send_message(&text).await
    }
}

/// How a chat list entry is picked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatEntry {
    Exact,
    Containing,
    /// Scroll the chat list until an entry contains the text
    ScrollTo,
}

/// Open a chat from the home view
#[derive(Debug, Clone)]
pub struct OpenChat {
    pub label: Text,
    pub entry: ChatEntry,
}

impl OpenChat {
    pub fn named(label: impl Into<Text>) -> Self {
        Self {
            label: label.into(),
            entry: ChatEntry::Exact,
        }
    }

    pub fn containing(part: impl Into<Text>) -> Self {
        Self {
            label: part.into(),
            entry: ChatEntry::Containing,
        }
    }

    pub fn scrolling(mut self) -> Self {
        self.entry = ChatEntry::ScrollTo;
        self
    }
}

#[async_trait]
impl Action for OpenChat {
    fn describe(&self) -> String {
        match self.entry {
            ChatEntry::Exact => format!("open chat {}", self.label),
            ChatEntry::Containing => format!("open chat containing {}", self.label),
            ChatEntry::ScrollTo => format!("scroll to chat containing {}", self.label),
        }
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let label = ctx.resolve(&self.label)?;
        let home = HomeView::on(device(ctx));
        let _chat = match self.entry {
            ChatEntry::Exact => home.open_chat(&label).await?,
            ChatEntry::Containing => home.open_chat_containing(&label).await?,
            ChatEntry::ScrollTo => home.scroll_to_chat(&label).await?,
        };
        Ok(())
    }
}

/// Store the open chat's toolbar name in a variable
#[derive(Debug, Clone)]
pub struct CaptureChatName {
    pub var: String,
}

impl CaptureChatName {
    pub fn into_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl Action for CaptureChatName {
    fn describe(&self) -> String {
        format!("capture chat name as ${}", self.var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let name = ChatView::on(device(ctx)).user_name().await?;
        ctx.vars.set(self.var.clone(), name);
        Ok(())
    }
}

/// Create a group from the home view; ends inside the new group
#[derive(Debug, Clone)]
pub struct CreateGroupChat {
    pub members: Vec<Text>,
    pub name: Text,
}

impl CreateGroupChat {
    pub fn new(members: Vec<Text>, name: impl Into<Text>) -> Self {
        Self {
            members,
            name: name.into(),
        }
    }
}

#[async_trait]
impl Action for CreateGroupChat {
    fn describe(&self) -> String {
        let members: Vec<String> = self.members.iter().map(ToString::to_string).collect();
        format!("create group {} with {}", self.name, members.join(", "))
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let members = self
            .members
            .iter()
            .map(|member| ctx.resolve(member))
            .collect::<HarnessResult<Vec<_>>>()?;
        let name = ctx.resolve(&self.name)?;
        HomeView::on(device(ctx))
            .create_group_chat(&members, &name)
            .await
            .map(|_| ())
    }
}

/// Remove the other member from the open group chat
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveMember;

#[async_trait]
impl Action for RemoveMember {
    fn describe(&self) -> String {
        "remove member from group".to_string()
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        ChatView::on(device(ctx)).remove_member().await
    }
}

/// Store `<prefix><clock digits>` in a variable
#[derive(Debug, Clone)]
pub struct UniqueName {
    pub prefix: String,
    pub var: String,
}

impl UniqueName {
    pub fn new(prefix: impl Into<String>, var: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            var: var.into(),
        }
    }
}

#[async_trait]
impl Action for UniqueName {
    fn describe(&self) -> String {
        format!("pick unique name {}* as ${}", self.prefix, self.var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let name = format!("{}{}", self.prefix, clock_digits()?);
        info!("{}: ${} = '{}'", ctx.actor.id(), self.var, name);
        ctx.vars.set(self.var.clone(), name);
        Ok(())
    }
}

/// Store an amount no other run is likely to request in a variable
#[derive(Debug, Clone)]
pub struct PickUniqueAmount {
    pub var: String,
}

impl PickUniqueAmount {
    pub fn into_var(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl Action for PickUniqueAmount {
    fn describe(&self) -> String {
        format!("pick unique amount as ${}", self.var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let amount = unique_amount(clock_digits()?);
        info!("{}: ${} = {} ETH", ctx.actor.id(), self.var, amount);
        ctx.vars.set(self.var.clone(), amount);
        Ok(())
    }
}

/// How the requested amount is typed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountEntry {
    /// Pick the first group member, then key events
    Keypad,
    /// Set the chat input directly
    Input,
}

/// Fill in a `/request` command in the open chat, without sending it
#[derive(Debug, Clone)]
pub struct RequestFunds {
    pub amount: Text,
    pub entry: AmountEntry,
}

impl RequestFunds {
    pub fn new(amount: impl Into<Text>, entry: AmountEntry) -> Self {
        Self {
            amount: amount.into(),
            entry,
        }
    }
}

#[async_trait]
impl Action for RequestFunds {
    fn describe(&self) -> String {
        format!("request {} ETH", self.amount)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let amount = ctx.resolve(&self.amount)?;
        let chat = ChatView::on(device(ctx));
        chat.request_command().await?;
        match self.entry {
            AmountEntry::Keypad => {
                chat.first_recipient().await?;
                chat.enter_amount_keys(&amount).await
            }
            AmountEntry::Input => chat.set_amount(&amount).await,
        }
    }
}

/// Accept an incoming payment request; ends on the signing sheet
#[derive(Debug, Clone)]
pub struct PayRequest {
    pub amount: Text,
}

impl PayRequest {
    pub fn new(amount: impl Into<Text>) -> Self {
        Self { amount: amount.into() }
    }
}

#[async_trait]
impl Action for PayRequest {
    fn describe(&self) -> String {
        format!("pay request of {} ETH", self.amount)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let amount = ctx.resolve(&self.amount)?;
        ChatView::on(device(ctx))
            .open_payment_request(&amount)
            .await
            .map(|_| ())
    }
}

#[derive(Debug, Clone)]
pub struct SignTransaction {
    pub password: Text,
}

impl SignTransaction {
    pub fn new(password: impl Into<Text>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

#[async_trait]
impl Action for SignTransaction {
    fn describe(&self) -> String {
        "sign transaction".to_string()
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let password = ctx.resolve(&self.password)?;
        SendTransactionView::on(device(ctx))
            .sign(&password)
            .await
            .map(|_| ())
    }
}

/// Leave the chat for the wallet's transaction history
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenTransactions;

#[async_trait]
impl Action for OpenTransactions {
    fn describe(&self) -> String {
        "open transaction history".to_string()
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        ChatView::on(device(ctx))
            .back()
            .await?
            .wallet()
            .await?
            .transactions()
            .await
            .map(|_| ())
    }
}

/// Open the history entry for an amount and store its hash in a variable
#[derive(Debug, Clone)]
pub struct FindTransaction {
    pub amount: Text,
    pub hash_var: String,
}

impl FindTransaction {
    pub fn new(amount: impl Into<Text>, hash_var: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            hash_var: hash_var.into(),
        }
    }
}

#[async_trait]
impl Action for FindTransaction {
    fn describe(&self) -> String {
        format!("find transaction of {} ETH as ${}", self.amount, self.hash_var)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        let amount = ctx.resolve(&self.amount)?;
        let details = TransactionsView::on(device(ctx))
            .find_transaction(&amount)
            .await?;
        let hash = details.hash().await?;
        info!("{}: transaction hash {}", ctx.actor.id(), hash);
        ctx.vars.set(self.hash_var.clone(), hash);
        Ok(())
    }
}

/// Wait until the actor's own screen shows something
#[derive(Debug, Clone)]
pub struct WaitFor {
    pub target: Target,
}

impl WaitFor {
    pub fn new(target: impl Into<Target>) -> Self {
        Self { target: target.into() }
    }
}

#[async_trait]
impl Action for WaitFor {
    fn describe(&self) -> String {
        format!("wait for {}", self.target)
    }

    async fn perform(&self, ctx: &mut StepContext<'_>) -> HarnessResult<()> {
        ctx.find(&self.target).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_amount_drops_trailing_zeros() {
        assert_eq!(unique_amount(1233), "0.01234");
        assert_eq!(unique_amount(9), "0.0001");
        assert_eq!(unique_amount(999), "0.01");
        assert_eq!(unique_amount(9998), "0.09999");
        assert_eq!(unique_amount(9999), "0.00001");
    }

    #[test]
    fn test_unique_amount_is_never_zero() {
        for seed in [0u128, 9999, 19998, 1_700_000_000_000] {
            let amount = unique_amount(seed);
            assert!(amount.starts_with("0.0"));
            assert_ne!(amount.trim_end_matches(['0', '.']), "");
        }
    }

    #[test]
    fn test_descriptions_name_the_inputs() {
        let open = OpenChat::containing(Text::template("{sender.username:25}")).scrolling();
        assert_eq!(open.describe(), "scroll to chat containing '{sender.username:25}'");
        let group = CreateGroupChat::new(vec![Text::var("member_name")], "new_chat");
        assert_eq!(group.describe(), "create group 'new_chat' with $member_name");
    }
}
