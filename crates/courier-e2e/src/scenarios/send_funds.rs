//! Funds request scenario
//!
//! The recipient asks the sender for a unique amount in a chat; the sender
//! pays and signs, the recipient's balance must move, and the transfer must
//! show up in the sender's wallet history. Runs once in a group chat and once
//! in a one-to-one chat, with the two configured users swapping roles.

use courier_harness::{
    ActorId, Back, CaptureBalance, Click, ElementKind, HarnessConfig, HarnessError, HarnessResult, Identity,
    Observable, Parametrization, Role, RoleBindings, Scenario, ScenarioBuilder, Target, Text, VerifyBalanceUpdated,
};

use crate::actions::{
    AddContact, AmountEntry, CreateGroupChat, FindTransaction, OpenChat, OpenTransactions, PayRequest,
    PickUniqueAmount, RequestFunds, SignTransaction, UniqueName, WaitFor,
};
use crate::views::send_button;

pub const NAME: &str = "send_funds_via_request";

pub const RECIPIENT: &str = "recipient";
pub const SENDER: &str = "sender";

/// Configured users the cases are bound to
pub const A_USER: &str = "A_USER";
pub const B_USER: &str = "B_USER";

/// Chat list entries are matched on this many leading characters of a username
const NAME_PREFIX: usize = 25;

/// Where the request is made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FundsVariant {
    GroupChat,
    OneToOneChat,
}

impl FundsVariant {
    pub const ALL: [FundsVariant; 2] = [FundsVariant::GroupChat, FundsVariant::OneToOneChat];

    /// Case id
    pub fn id(&self) -> &'static str {
        match self {
            FundsVariant::GroupChat => "group_chat",
            FundsVariant::OneToOneChat => "one_to_one_chat",
        }
    }
}

fn send() -> Click {
    Click::new(send_button())
}

fn from_sender() -> Text {
    Text::template("from  {sender.username}")
}

/// Steps up to an open chat between the two devices
fn open_chat(builder: ScenarioBuilder, variant: FundsVariant) -> ScenarioBuilder {
    let (d1, d2) = (ActorId(0), ActorId(1));
    let builder = builder
        .step(d1, "add sender as contact", AddContact::new(Text::var("sender.public_key")))
        .step(d1, "back to chat list", Back::times(3));

    match variant {
        FundsVariant::GroupChat => builder
            .step(d1, "pick group name", UniqueName::new("gtr_", "group_name"))
            .step(
                d1,
                "create group chat",
                CreateGroupChat::new(vec![Text::var("sender.username")], Text::var("group_name")),
            )
            .step(d2, "open group chat", OpenChat::named(Text::var("group_name"))),
        FundsVariant::OneToOneChat => builder.step(
            d1,
            "open chat with sender",
            OpenChat::containing(Text::template(format!("{{sender.username:{}}}", NAME_PREFIX))).scrolling(),
        ),
    }
}

/// Steps that compose and send the request
fn request(builder: ScenarioBuilder, variant: FundsVariant) -> ScenarioBuilder {
    let (d1, d2) = (ActorId(0), ActorId(1));
    let builder = builder.step(d1, "pick unique amount", PickUniqueAmount::into_var("amount"));

    let builder = match variant {
        FundsVariant::GroupChat => builder.step(
            d1,
            "request funds",
            RequestFunds::new(Text::var("amount"), AmountEntry::Keypad),
        ),
        FundsVariant::OneToOneChat => builder
            .step(
                d1,
                "request funds",
                RequestFunds::new(Text::var("amount"), AmountEntry::Input),
            )
            .step(
                d2,
                "open chat with recipient",
                OpenChat::containing(Text::template(format!("{{recipient.username:{}}}", NAME_PREFIX))),
            ),
    };

    let builder = builder
        .step(d1, "send request", send())
        .step(
            d1,
            "capture recipient balance",
            CaptureBalance::new(Text::var("recipient.address"), "initial_balance"),
        );

    match variant {
        FundsVariant::GroupChat => builder
            .expect(Observable::text_on(d1, from_sender()))
            .step(
                d2,
                "see request from sender",
                WaitFor::new(Target::text(ElementKind::Any, from_sender())),
            ),
        FundsVariant::OneToOneChat => builder,
    }
}

pub fn scenario(variant: FundsVariant) -> HarnessResult<Scenario> {
    let (d1, d2) = (ActorId(0), ActorId(1));

    let builder = Scenario::builder(NAME)
        .description(format!("funds request in a {} between two recovered accounts", variant.id().replace('_', " ")))
        .tag("transaction")
        .actor(RECIPIENT)
        .actor(SENDER);
    let builder = open_chat(builder, variant);
    let builder = request(builder, variant);

    builder
        .step(d2, "accept payment request", PayRequest::new(Text::var("amount")))
        .step(d2, "sign transaction", SignTransaction::new(Text::var("sender.password")))
        .step(
            d2,
            "verify recipient balance moved",
            VerifyBalanceUpdated::new(Text::var("recipient.address"), "initial_balance"),
        )
        .step(d2, "open transaction history", OpenTransactions)
        .step(
            d2,
            "find transaction",
            FindTransaction::new(Text::var("amount"), "transaction_hash"),
        )
        .build()
}

fn funded_user<'a>(config: &'a HarnessConfig, name: &str) -> HarnessResult<&'a Identity> {
    let user = config.user(name)?;
    if user.public_key.is_none() || user.address.is_none() {
        return Err(HarnessError::Config(format!(
            "user '{}' needs a public_key and an address for funds scenarios",
            name
        )));
    }
    Ok(user)
}

/// Role bindings for one case: A_USER receives in the group chat case, the
/// roles swap for the one-to-one case
pub fn bindings(config: &HarnessConfig, variant: FundsVariant) -> HarnessResult<Parametrization> {
    let group_chat = RoleBindings::new()
        .bind(RECIPIENT, funded_user(config, A_USER)?.clone())
        .bind(SENDER, funded_user(config, B_USER)?.clone());

    let bindings = match variant {
        FundsVariant::GroupChat => group_chat,
        FundsVariant::OneToOneChat => group_chat.swapped(&Role::new(RECIPIENT), &Role::new(SENDER)),
    };
    Ok(Parametrization::new(variant.id(), bindings))
}
