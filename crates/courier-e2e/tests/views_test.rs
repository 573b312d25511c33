//! Page objects against the in-memory backend

use std::time::Duration;

use tokio::time::Instant;
use tokio_test::{assert_err, assert_ok};

use courier_e2e::views::{ChatView, ConsoleRecovery, Device, HomeView, TransactionsView, View};
use courier_harness::testing::{ClickEffect, FakeBackend, FakeElement};
use courier_harness::{
    wait_for, AccessRecovery, ActorId, AutomationSession, HarnessError, Identity, Locator, PollConfig,
    SessionFactory,
};

fn wait() -> PollConfig {
    PollConfig::new(Duration::from_secs(5), Duration::from_millis(500))
}

async fn devices(backend: &FakeBackend, n: usize) -> Vec<Box<dyn AutomationSession>> {
    let factory = backend.factory();
    let mut sessions = Vec::new();
    for index in 0..n {
        sessions.push(factory.start_session(index).await.unwrap());
    }
    sessions
}

fn clicks_on(backend: &FakeBackend, label: &str) -> usize {
    let suffix = format!("click {}", label);
    backend.actions().iter().filter(|a| a.ends_with(&suffix)).count()
}

#[tokio::test(start_paused = true)]
async fn test_message_sent_from_chat_reaches_peer() {
    let backend = FakeBackend::new(Duration::from_secs(2));
    let sessions = devices(&backend, 2).await;

    let chat = ChatView::on(Device::new(sessions[1].as_ref(), ActorId(1), wait()));
    assert_ok!(chat.send_message("SOMETHING").await);

    let started = Instant::now();
    assert_ok!(wait_for(sessions[0].as_ref(), ActorId(0), &Locator::text("SOMETHING"), wait()).await);
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(
        backend.actions(),
        vec!["device_2 type 'SOMETHING'", "device_2 send 'SOMETHING'"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_public_key_is_read_from_profile() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    backend.show(0, FakeElement::button("Profile").with_accessibility_id("profile-tab-button"));
    backend.show(0, FakeElement::button("Home").with_accessibility_id("home-tab-button"));
    backend.show(0, FakeElement::text("0x04f3a9").with_accessibility_id("profile-public-key"));

    let home = HomeView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));
    assert_eq!(home.public_key().await.unwrap(), "0x04f3a9");
    assert_eq!(
        backend.actions(),
        vec!["device_1 click profile-tab-button", "device_1 click home-tab-button"]
    );
}

#[tokio::test]
async fn test_keypad_amount_is_typed_key_by_key() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    let chat = ChatView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));

    assert!(matches!(chat.enter_amount_keys("0.0a").await, Err(HarnessError::Action { .. })));
    assert_eq!(backend.draft(0), "");

    assert_ok!(chat.enter_amount_keys("0.0042").await);
    assert_eq!(backend.draft(0), "0.0042");
    assert_eq!(backend.actions().len(), 6);
}

fn show_group_settings(backend: &FakeBackend) {
    backend.show(1, FakeElement::button("...").with_accessibility_id("chat-menu-button"));
    backend.show(1, FakeElement::button("Settings"));
    backend.show(1, FakeElement::button("Confirm"));
}

#[tokio::test(start_paused = true)]
async fn test_remove_member_with_menu_already_open() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 2).await;
    show_group_settings(&backend);
    backend.show(1, FakeElement::button("Remove from chat"));

    let chat = ChatView::on(Device::new(sessions[1].as_ref(), ActorId(1), wait()));
    assert_ok!(chat.remove_member().await);

    assert_eq!(clicks_on(&backend, "member-options-button"), 0);
    assert_eq!(clicks_on(&backend, "Remove from chat"), 1);
    assert_eq!(backend.actions().last().map(String::as_str), Some("device_2 back"));
}

#[tokio::test(start_paused = true)]
async fn test_remove_member_taps_options_at_most_twice() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 2).await;
    show_group_settings(&backend);
    backend.show(1, FakeElement::button("⋮").with_accessibility_id("member-options-button"));

    let chat = ChatView::on(Device::new(sessions[1].as_ref(), ActorId(1), wait()));
    let err = assert_err!(chat.remove_member().await);

    assert!(matches!(err, HarnessError::ElementNotFound { locator } if locator.contains("Remove from chat")));
    assert_eq!(clicks_on(&backend, "member-options-button"), 2);
    assert_eq!(clicks_on(&backend, "Confirm"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remove_member_waits_out_a_slow_menu() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 2).await;
    show_group_settings(&backend);
    backend.show(1, FakeElement::button("⋮").with_accessibility_id("member-options-button"));
    // opens 300ms after a tap, a second tap closes it
    backend.on_click(
        1,
        "member-options-button",
        ClickEffect::Toggle {
            element: FakeElement::button("Remove from chat"),
            delay: Duration::from_millis(300),
        },
    );

    let chat = ChatView::on(Device::new(sessions[1].as_ref(), ActorId(1), wait()));
    assert_ok!(chat.remove_member().await);

    assert_eq!(clicks_on(&backend, "member-options-button"), 1);
    assert_eq!(clicks_on(&backend, "Remove from chat"), 1);
    assert_eq!(clicks_on(&backend, "Confirm"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_find_transaction_opens_entry_and_reads_hash() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    backend.show(0, FakeElement::button("0.01234 ETH"));
    backend.show(0, FakeElement::text("0x5fd1c0").with_accessibility_id("transaction-hash"));

    let transactions = TransactionsView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));
    let details = transactions.find_transaction("0.01234").await.unwrap();
    assert_eq!(details.hash().await.unwrap(), "0x5fd1c0");
    assert_eq!(clicks_on(&backend, "0.01234 ETH"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_find_transaction_matches_whole_amount() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    backend.show(0, FakeElement::button("0.0123 ETH"));
    backend.show(0, FakeElement::button("0.01 ETH"));

    let transactions = TransactionsView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));
    assert_ok!(transactions.find_transaction("0.01").await);
    assert_eq!(clicks_on(&backend, "0.01 ETH"), 1);
    assert_eq!(clicks_on(&backend, "0.0123 ETH"), 0);

    backend.hide(0, "0.01 ETH");
    let transactions = TransactionsView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));
    assert!(matches!(
        transactions.find_transaction("0.01").await,
        Err(HarnessError::ElementNotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn test_find_transaction_gives_up_after_bounded_scrolls() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;

    let started = Instant::now();
    let transactions = TransactionsView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));
    let result = transactions.find_transaction("0.05").await;

    assert!(matches!(result, Err(HarnessError::ElementNotFound { .. })));
    assert_eq!(started.elapsed(), Duration::from_secs(12));
}

#[tokio::test(start_paused = true)]
async fn test_transaction_hash_is_checked() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    backend.show(0, FakeElement::button("0.02 ETH"));
    backend.show(0, FakeElement::text("pending").with_accessibility_id("transaction-hash"));

    let transactions = TransactionsView::on(Device::new(sessions[0].as_ref(), ActorId(0), wait()));
    let details = transactions.find_transaction("0.02").await.unwrap();
    assert!(matches!(details.hash().await, Err(HarnessError::Action { .. })));
}

fn show_sign_in(backend: &FakeBackend, index: usize) {
    backend.show(index, FakeElement::button("I already have an account"));
    backend.show(index, FakeElement::input("passphrase-input"));
    backend.show(index, FakeElement::input("password-input"));
    backend.show(index, FakeElement::button("Sign in"));
}

#[tokio::test(start_paused = true)]
async fn test_console_recovery_signs_in() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    show_sign_in(&backend, 0);
    backend.show(0, FakeElement::text("Alice"));

    let identity = Identity::new("one two three", "qwerty", "Alice");
    let recovery = ConsoleRecovery::new(wait());
    assert_ok!(recovery.recover_access(ActorId(0), sessions[0].as_ref(), &identity).await);

    let actions = backend.actions();
    assert!(actions.contains(&"device_1 set 'one two three'".to_string()));
    assert!(actions.contains(&"device_1 set 'qwerty'".to_string()));
    assert_eq!(clicks_on(&backend, "Sign in"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_console_recovery_fails_when_account_never_shows() {
    let backend = FakeBackend::new(Duration::ZERO);
    let sessions = devices(&backend, 1).await;
    show_sign_in(&backend, 0);

    let identity = Identity::new("one two three", "qwerty", "Alice");
    let recovery = ConsoleRecovery::new(wait());
    let started = Instant::now();
    let result = recovery.recover_access(ActorId(0), sessions[0].as_ref(), &identity).await;

    assert!(matches!(result, Err(HarnessError::ObservableTimeout { predicate, .. }) if predicate.contains("Alice")));
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}
