//! Scenario definitions, run planning and suite execution

use std::sync::Arc;
use std::time::Duration;

use courier_e2e::scenarios::send_funds::{self, FundsVariant, A_USER, B_USER, RECIPIENT, SENDER};
use courier_e2e::scenarios::{group_chat, one_to_one_chat};
use courier_e2e::views::{payment_request_text, transaction_amount_text};
use courier_e2e::{plan, run_all, tally};
use courier_harness::testing::{ClickEffect, FakeBackend, FakeElement, FakeLedger, FakeRecovery};
use courier_harness::{
    Balance, Expectation, HarnessConfig, HarnessError, Identity, Role, RoleBindings, ScenarioRunner, StepStatus,
    TAG_ALL,
};

fn funded(name: &str, username: &str) -> Identity {
    Identity::new(format!("{} recovery phrase", name), format!("{}-password", name), username)
        .with_public_key(format!("0x04{}", name.to_lowercase()))
        .with_address(format!("0x{}", name.to_lowercase()))
}

fn config_with_users() -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.users.insert(A_USER.to_string(), funded("a", "User A"));
    config.users.insert(B_USER.to_string(), funded("b", "User B"));
    config
}

#[test]
fn test_every_scenario_uses_two_devices() {
    let scenarios = [
        one_to_one_chat::scenario().unwrap(),
        group_chat::scenario().unwrap(),
        send_funds::scenario(FundsVariant::GroupChat).unwrap(),
        send_funds::scenario(FundsVariant::OneToOneChat).unwrap(),
    ];
    for scenario in &scenarios {
        assert_eq!(scenario.actor_count(), 2, "{}", scenario.name);
        assert!(scenario.matches_tag(TAG_ALL));
    }
    assert!(scenarios[0].matches_tag("chat") && !scenarios[0].matches_tag("transaction"));
    assert!(scenarios[2].matches_tag("transaction") && !scenarios[2].matches_tag("chat"));
}

#[test]
fn test_removed_member_must_not_see_later_message() {
    let scenario = group_chat::scenario().unwrap();
    let last = scenario.steps.last().unwrap();
    let expect = last.expect.as_ref().unwrap();

    assert_eq!(last.actor.0, 0);
    assert_eq!(expect.expectation, Expectation::StaysAbsent);
    assert_eq!(expect.target.0, 0);
    assert!(expect.to_string().contains(group_chat::AFTER_REMOVAL));
    // full window, no shortened timeout
    assert_eq!(expect.timeout, None);
}

#[test]
fn test_funds_cases_swap_users() {
    let config = config_with_users();
    let group = send_funds::bindings(&config, FundsVariant::GroupChat).unwrap();
    let direct = send_funds::bindings(&config, FundsVariant::OneToOneChat).unwrap();

    let username = |case: &courier_harness::Parametrization, role: &str| {
        case.bindings.get(&Role::new(role)).unwrap().username.clone()
    };
    assert_eq!(group.id, "group_chat");
    assert_eq!(username(&group, RECIPIENT), "User A");
    assert_eq!(username(&group, SENDER), "User B");
    assert_eq!(direct.id, "one_to_one_chat");
    assert_eq!(username(&direct, RECIPIENT), "User B");
    assert_eq!(username(&direct, SENDER), "User A");
}

#[test]
fn test_funds_users_need_key_and_address() {
    let mut config = config_with_users();
    config
        .users
        .insert(B_USER.to_string(), Identity::new("b phrase", "b-password", "User B"));

    let result = send_funds::bindings(&config, FundsVariant::GroupChat);
    assert!(matches!(result, Err(HarnessError::Config(msg)) if msg.contains(B_USER)));
}

#[test]
fn test_plan_selects_single_case() {
    let config = config_with_users();
    let runs = plan(&config, TAG_ALL, Some("send_funds_via_request[one_to_one_chat]")).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].label(), "send_funds_via_request[one_to_one_chat]");

    let runs = plan(&config, TAG_ALL, Some(send_funds::NAME)).unwrap();
    let labels: Vec<String> = runs.iter().map(|run| run.label()).collect();
    assert_eq!(
        labels,
        vec![
            "send_funds_via_request[group_chat]",
            "send_funds_via_request[one_to_one_chat]"
        ]
    );

    let runs = plan(&config, "chat", Some(send_funds::NAME)).unwrap();
    assert!(runs.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_suite_runs_every_case_and_reports_each() {
    // blank fake screens: every run stops at its first step
    let backend = FakeBackend::new(Duration::ZERO);
    let runner = ScenarioRunner::new(Arc::new(backend.factory()));
    let runs = plan(&HarnessConfig::default(), "chat", None).unwrap();

    let reports = run_all(&runner, &runs).await;

    assert_eq!(reports.len(), 2);
    assert_eq!(tally(&reports), (0, 2));
    for report in &reports {
        let failed = report.failed_step().unwrap();
        assert_eq!(failed.index, 1);
        assert_eq!(failed.status, StepStatus::Timeout);
        assert!(report.summary().starts_with("FAIL"));
    }
    assert_eq!(backend.started_sessions(), 4);
    assert_eq!(backend.live_sessions(), 0);
}

fn new_account_screen(backend: &FakeBackend, index: usize) {
    backend.show_all(
        index,
        [
            FakeElement::button("Create new account"),
            FakeElement::text("Write down your signing phrase"),
            FakeElement::button("Home").with_accessibility_id("home-tab-button"),
        ],
    );
}

fn profile_screen(backend: &FakeBackend, index: usize, public_key: &str) {
    backend.show_all(
        index,
        [
            FakeElement::button("Profile").with_accessibility_id("profile-tab-button"),
            FakeElement::text(public_key).with_accessibility_id("profile-public-key"),
        ],
    );
}

fn add_contact_screen(backend: &FakeBackend, index: usize) {
    backend.show_all(
        index,
        [
            FakeElement::button("+").with_accessibility_id("new-chat-button"),
            FakeElement::button("Start new chat"),
            FakeElement::input("enter-contact-code-input"),
            FakeElement::button("Start chat").with_accessibility_id("confirm-button"),
        ],
    );
}

#[tokio::test(start_paused = true)]
async fn test_one_to_one_chat_passes_end_to_end() {
    let backend = FakeBackend::new(Duration::from_secs(1));
    new_account_screen(&backend, 0);
    new_account_screen(&backend, 1);
    profile_screen(&backend, 0, "0x04c0ffee");
    add_contact_screen(&backend, 1);
    // chat list entries carry the last message received
    backend.on_send(0, |text| vec![FakeElement::button(text)]);

    let scenario = one_to_one_chat::scenario().unwrap();
    let report = ScenarioRunner::new(Arc::new(backend.factory()))
        .run(&scenario, &RoleBindings::new())
        .await;

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.steps.len(), scenario.steps.len());
    let actions = backend.actions();
    assert!(actions.contains(&"device_2 set '0x04c0ffee'".to_string()));
    assert!(actions.contains(&"device_1 click SOMETHING".to_string()));
    assert!(backend.screen_texts(1).contains(&one_to_one_chat::REPLY.to_string()));
    assert_eq!(backend.live_sessions(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_group_chat_passes_and_removed_member_stays_out() {
    let backend = FakeBackend::new(Duration::from_secs(1));
    new_account_screen(&backend, 0);
    new_account_screen(&backend, 1);
    profile_screen(&backend, 0, "0x04feed");
    backend.show(0, FakeElement::button(group_chat::CHAT_NAME));
    add_contact_screen(&backend, 1);
    backend.show_all(
        1,
        [
            FakeElement::text("Calm Quiet Heron").with_accessibility_id("chat-name-text"),
            FakeElement::button("Start group chat"),
            FakeElement::button("Calm Quiet Heron"),
            FakeElement::button("Next").with_accessibility_id("toolbar-next-button"),
            FakeElement::input("chat-name-input"),
            FakeElement::button("Save"),
            FakeElement::button("...").with_accessibility_id("chat-menu-button"),
            FakeElement::button("Settings"),
            FakeElement::button("⋮").with_accessibility_id("member-options-button"),
            FakeElement::button("Confirm"),
        ],
    );
    backend.on_click(
        1,
        "member-options-button",
        ClickEffect::Toggle {
            element: FakeElement::button("Remove from chat"),
            delay: Duration::from_millis(300),
        },
    );
    backend.on_click(1, "Confirm", ClickEffect::RemoveMember(0));
    backend.on_click(
        1,
        "Confirm",
        ClickEffect::Deliver {
            to: 0,
            text: format!("Calm Quiet Heron {}", group_chat::REMOVED_NOTICE),
        },
    );

    let scenario = group_chat::scenario().unwrap();
    let report = ScenarioRunner::new(Arc::new(backend.factory()))
        .run(&scenario, &RoleBindings::new())
        .await;

    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.steps.len(), scenario.steps.len());
    // the negative check holds for its whole window
    assert!(report.steps.last().unwrap().duration >= Duration::from_secs(20));

    let actions = backend.actions();
    assert!(actions.contains(&"device_2 set '0x04feed'".to_string()));
    assert!(actions.contains(&"device_2 click Calm Quiet Heron".to_string()));
    assert!(actions.contains(&"device_2 set 'new_chat'".to_string()));
    assert!(!backend.screen_texts(0).contains(&group_chat::AFTER_REMOVAL.to_string()));
    assert!(backend.screen_texts(1).contains(&group_chat::AFTER_REMOVAL.to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_funds_request_in_one_to_one_chat_passes() {
    let sender = "Courier Funds Sender Alpha Account";
    let mut config = HarnessConfig::default();
    config.users.insert(A_USER.to_string(), funded("a", sender));
    config.users.insert(B_USER.to_string(), funded("b", "Recipient B"));
    // recipient B on device_1, sender A on device_2
    let case = send_funds::bindings(&config, FundsVariant::OneToOneChat).unwrap();

    let backend = FakeBackend::new(Duration::from_secs(1));
    add_contact_screen(&backend, 0);
    backend.show_all(
        0,
        [
            FakeElement::button(format!("{}…", &sender[..25])),
            FakeElement::button("/request"),
        ],
    );
    backend.show_all(
        1,
        [
            FakeElement::button("Recipient B"),
            FakeElement::button("Sign transaction"),
            FakeElement::input("enter-password-input"),
            FakeElement::button("Got it"),
            FakeElement::button("Wallet").with_accessibility_id("wallet-tab-button"),
            FakeElement::button("Transactions").with_accessibility_id("transactions-button"),
            FakeElement::text("0x9e3f5a").with_accessibility_id("transaction-hash"),
        ],
    );
    // request bubble and wallet history entry for the amount device_1 sends
    backend.on_send(1, |amount| {
        vec![
            FakeElement::button(payment_request_text(amount)),
            FakeElement::button(transaction_amount_text(amount)),
        ]
    });

    let ledger = FakeLedger::new();
    ledger.set_balance("0xb", Balance::from_wei(1_000));
    ledger.credit_after("0xb", Balance::from_wei(500), Duration::from_secs(60));

    let runner = ScenarioRunner::new(Arc::new(backend.factory()))
        .with_recovery(Arc::new(FakeRecovery::new(backend.clone())))
        .with_balances(Arc::new(ledger.clone()));
    let scenario = send_funds::scenario(FundsVariant::OneToOneChat).unwrap();
    let reports = runner.run_parametrized(&scenario, std::slice::from_ref(&case)).await;

    let report = &reports[0];
    assert!(report.is_success(), "{}", report.summary());
    assert_eq!(report.label(), "send_funds_via_request[one_to_one_chat]");
    assert_eq!(report.steps.len(), scenario.steps.len());

    let actions = backend.actions();
    assert!(actions.contains(&"device_1 set '0x04a'".to_string()));
    assert!(actions.contains(&"device_2 type 'a-password'".to_string()));
    let amount = actions
        .iter()
        .find_map(|a| a.strip_prefix("device_1 send '")?.strip_suffix('\''))
        .unwrap()
        .to_string();
    assert!(amount.starts_with("0.0"));
    assert!(actions.contains(&format!("device_2 click {}", transaction_amount_text(&amount))));
    assert!(ledger.queries() >= 2);
}
