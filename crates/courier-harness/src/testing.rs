//! In-memory backend for exercising the harness without devices
//!
//! `FakeBackend` plays the application backend that links actors: a message
//! typed into one device's input and sent is delivered to every other member
//! device after a configurable latency. Each device is a `FakeSession` whose
//! screen is a flat list of elements matched with [`Locator::matches`].
//!
//! Screens are static unless a test scripts reactions: [`ClickEffect`]s run
//! when a given element is clicked, and [`FakeBackend::on_send`] renders
//! elements on a device whenever another device sends a message.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::actor::{AccessRecovery, ActorId};
use crate::error::{HarnessError, HarnessResult};
use crate::identity::Identity;
use crate::locator::{ElementKind, Locator};
use crate::session::{AutomationSession, ElementHandle, SessionFactory};
use crate::verification::{Balance, BalanceSource};

/// Accessibility id of the chat input every fake device starts with
pub const MESSAGE_INPUT: &str = "chat-message-input";

/// Accessibility id of the send button every fake device starts with
pub const SEND_BUTTON: &str = "send-message-button";

/// An element on a fake device's screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    pub text: String,
    pub kind: ElementKind,
    pub accessibility_id: Option<String>,
}

impl FakeElement {
    pub fn button(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ElementKind::Button,
            accessibility_id: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: ElementKind::Text,
            accessibility_id: None,
        }
    }

    pub fn input(accessibility_id: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            kind: ElementKind::Input,
            accessibility_id: Some(accessibility_id.into()),
        }
    }

    pub fn with_accessibility_id(mut self, id: impl Into<String>) -> Self {
        self.accessibility_id = Some(id.into());
        self
    }

    fn is(&self, accessibility_id: &str) -> bool {
        self.accessibility_id.as_deref() == Some(accessibility_id)
    }
}

/// What clicking a trigger element does besides being logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Show the element on the clicked device after `delay`; hide it instead
    /// when it is showing or about to show
    Toggle { element: FakeElement, delay: Duration },
    /// Stop delivering group messages to this device
    RemoveMember(usize),
    /// Deliver a message to a device, after the backend latency
    Deliver { to: usize, text: String },
}

type Render = Box<dyn Fn(&str) -> Vec<FakeElement> + Send + Sync>;

struct Renderer {
    device: usize,
    render: Render,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer").field("device", &self.device).finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct Delivery {
    text: String,
    visible_at: Instant,
}

#[derive(Debug)]
struct Device {
    session_id: String,
    elements: Vec<FakeElement>,
    /// Elements that show up once their instant has passed
    pending: Vec<(FakeElement, Instant)>,
    messages: Vec<Delivery>,
    member: bool,
    live: bool,
}

impl Device {
    fn promote_due(&mut self, now: Instant) {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, at)| *at <= now);
        self.pending = waiting;
        self.elements.extend(due.into_iter().map(|(element, _)| element));
    }

    fn toggle(&mut self, element: FakeElement, at: Instant) {
        let before = self.elements.len() + self.pending.len();
        self.elements.retain(|e| *e != element);
        self.pending.retain(|(e, _)| *e != element);
        if self.elements.len() + self.pending.len() == before {
            self.pending.push((element, at));
        }
    }

    fn input_mut(&mut self) -> HarnessResult<&mut FakeElement> {
        self.elements
            .iter_mut()
            .find(|e| e.is(MESSAGE_INPUT))
            .ok_or_else(|| HarnessError::ElementNotFound {
                locator: Locator::accessibility_id(MESSAGE_INPUT).to_string(),
            })
    }
}

#[derive(Debug, Default)]
struct BackendState {
    latency: Duration,
    startup_delay: Duration,
    devices: Vec<Device>,
    /// Elements for devices that have not started yet, by device index
    staged: HashMap<usize, Vec<FakeElement>>,
    click_effects: Vec<(usize, String, ClickEffect)>,
    renderers: Vec<Renderer>,
    fail_startup_at: Option<usize>,
    fail_quit_at: Option<usize>,
    quit_attempts: usize,
    log: Vec<String>,
}

impl BackendState {
    fn device(&mut self, index: usize) -> HarnessResult<&mut Device> {
        let device = self
            .devices
            .get_mut(index)
            .ok_or_else(|| HarnessError::Session(format!("no fake device {}", index)))?;
        if !device.live {
            return Err(HarnessError::Session(format!("session {} is closed", device.session_id)));
        }
        Ok(device)
    }

    fn apply(&mut self, clicked_on: usize, effect: ClickEffect) {
        let now = Instant::now();
        match effect {
            ClickEffect::Toggle { element, delay } => {
                if let Some(device) = self.devices.get_mut(clicked_on) {
                    device.toggle(element, now + delay);
                }
            }
            ClickEffect::RemoveMember(index) => {
                if let Some(device) = self.devices.get_mut(index) {
                    device.member = false;
                }
            }
            ClickEffect::Deliver { to, text } => {
                let visible_at = now + self.latency;
                if let Some(device) = self.devices.get_mut(to) {
                    device.messages.push(Delivery { text, visible_at });
                }
            }
        }
    }

    /// Run the renderers of every live member except the sender
    fn render_sent(&mut self, from: usize, text: &str) {
        let visible_at = Instant::now() + self.latency;
        for renderer in &self.renderers {
            if renderer.device == from {
                continue;
            }
            if let Some(device) = self.devices.get_mut(renderer.device) {
                if device.member && device.live {
                    let elements = (renderer.render)(text);
                    device.pending.extend(elements.into_iter().map(|e| (e, visible_at)));
                }
            }
        }
    }

    /// Deliver to every live member except the sender
    fn broadcast(&mut self, from: usize, text: &str) {
        let visible_at = Instant::now() + self.latency;
        for (index, device) in self.devices.iter_mut().enumerate() {
            if index != from && device.member && device.live {
                device.messages.push(Delivery {
                    text: text.to_string(),
                    visible_at,
                });
            }
        }
    }
}

/// Shared backend linking fake devices
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    /// Backend delivering messages `latency` after they are sent
    pub fn new(latency: Duration) -> Self {
        let backend = Self::default();
        backend.lock().latency = latency;
        backend
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn factory(&self) -> FakeSessionFactory {
        FakeSessionFactory { backend: self.clone() }
    }

    /// Make the session for pool slot `index` fail to start
    pub fn fail_startup_at(&self, index: usize) {
        self.lock().fail_startup_at = Some(index);
    }

    /// Make quitting the device at `index` fail
    pub fn fail_quit_at(&self, index: usize) {
        self.lock().fail_quit_at = Some(index);
    }

    pub fn delay_startup(&self, delay: Duration) {
        self.lock().startup_delay = delay;
    }

    pub fn started_sessions(&self) -> usize {
        self.lock().devices.len()
    }

    pub fn live_sessions(&self) -> usize {
        self.lock().devices.iter().filter(|d| d.live).count()
    }

    pub fn quit_attempts(&self) -> usize {
        self.lock().quit_attempts
    }

    /// Current content of the device's chat input
    pub fn draft(&self, index: usize) -> String {
        self.lock()
            .devices
            .get(index)
            .and_then(|d| d.elements.iter().find(|e| e.is(MESSAGE_INPUT)))
            .map(|e| e.text.clone())
            .unwrap_or_default()
    }

    /// Put an element on the screen of the `index`-th started device, now or
    /// as soon as that device starts
    pub fn show(&self, index: usize, element: FakeElement) {
        let mut guard = self.lock();
        let state = &mut *guard;
        match state.devices.get_mut(index) {
            Some(device) => device.elements.push(element),
            None => state.staged.entry(index).or_default().push(element),
        }
    }

    pub fn show_all(&self, index: usize, elements: impl IntoIterator<Item = FakeElement>) {
        for element in elements {
            self.show(index, element);
        }
    }

    /// Make clicks on device `index`'s element labelled `trigger` (its
    /// accessibility id, else its text) also run `effect`
    pub fn on_click(&self, index: usize, trigger: impl Into<String>, effect: ClickEffect) {
        self.lock().click_effects.push((index, trigger.into(), effect));
    }

    /// Show `render(text)` on device `index` whenever another device sends
    /// `text` while `index` is a member
    pub fn on_send(&self, index: usize, render: impl Fn(&str) -> Vec<FakeElement> + Send + Sync + 'static) {
        self.lock().renderers.push(Renderer {
            device: index,
            render: Box::new(render),
        });
    }

    /// Remove elements with this exact text from a device's screen
    pub fn hide(&self, index: usize, text: &str) {
        if let Some(device) = self.lock().devices.get_mut(index) {
            device.elements.retain(|e| e.text != text);
        }
    }

    /// Deliver `text` to one device through the backend, after the latency
    pub fn deliver(&self, to: usize, text: impl Into<String>) {
        self.lock().apply(to, ClickEffect::Deliver { to, text: text.into() });
    }

    /// Stop delivering group messages to a device
    pub fn remove_member(&self, index: usize) {
        self.lock().apply(index, ClickEffect::RemoveMember(index));
    }

    /// Texts currently visible on a device: screen elements then delivered messages
    pub fn screen_texts(&self, index: usize) -> Vec<String> {
        let now = Instant::now();
        let state = self.lock();
        let Some(device) = state.devices.get(index) else {
            return Vec::new();
        };
        device
            .elements
            .iter()
            .map(|e| e.text.clone())
            .filter(|t| !t.is_empty())
            .chain(
                device
                    .messages
                    .iter()
                    .filter(|m| m.visible_at <= now)
                    .map(|m| m.text.clone()),
            )
            .collect()
    }

    /// Every UI action performed, in order, as "<actor> <action>"
    pub fn actions(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn index_of(&self, session_id: &str) -> Option<usize> {
        self.lock().devices.iter().position(|d| d.session_id == session_id)
    }
}

/// Starts fake sessions on a [`FakeBackend`]
#[derive(Debug, Clone)]
pub struct FakeSessionFactory {
    backend: FakeBackend,
}

#[async_trait]
impl SessionFactory for FakeSessionFactory {
    async fn start_session(&self, index: usize) -> HarnessResult<Box<dyn AutomationSession>> {
        let delay = self.backend.lock().startup_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.backend.lock();
        if state.fail_startup_at == Some(index) {
            return Err(HarnessError::SessionStartup {
                index,
                reason: "emulator did not boot".to_string(),
            });
        }

        let session_id = format!("fake-{}", Uuid::new_v4());
        let device = state.devices.len();
        let mut elements = vec![
            FakeElement::input(MESSAGE_INPUT),
            FakeElement::button("Send").with_accessibility_id(SEND_BUTTON),
        ];
        elements.extend(state.staged.remove(&device).unwrap_or_default());
        state.devices.push(Device {
            session_id: session_id.clone(),
            elements,
            pending: Vec::new(),
            messages: Vec::new(),
            member: true,
            live: true,
        });
        debug!("Fake device {} started as {}", device, session_id);

        Ok(Box::new(FakeSession {
            backend: self.backend.clone(),
            device,
            session_id,
        }))
    }
}

/// One fake device
#[derive(Debug)]
pub struct FakeSession {
    backend: FakeBackend,
    device: usize,
    session_id: String,
}

enum Handle {
    Element(usize),
    Message(usize),
}

impl FakeSession {
    fn actor(&self) -> ActorId {
        ActorId(self.device)
    }

    fn parse(&self, element: &ElementHandle) -> HarnessResult<Handle> {
        let stale = || HarnessError::Session(format!("stale element reference {}", element.id));
        let (prefix, n) = element.id.split_at(1.min(element.id.len()));
        let n = n.parse::<usize>().map_err(|_| stale())?;
        match prefix {
            "e" => Ok(Handle::Element(n)),
            "m" => Ok(Handle::Message(n)),
            _ => Err(stale()),
        }
    }

    fn record(&self, state: &mut BackendState, action: String) {
        state.log.push(format!("{} {}", self.actor(), action));
    }

    fn edit(&self, element: &ElementHandle, edit: impl FnOnce(&mut String)) -> HarnessResult<String> {
        let handle = self.parse(element)?;
        let mut state = self.backend.lock();
        let device = state.device(self.device)?;
        match handle {
            Handle::Element(n) => {
                let target = device
                    .elements
                    .get_mut(n)
                    .ok_or_else(|| HarnessError::Session(format!("stale element reference {}", element.id)))?;
                edit(&mut target.text);
                Ok(target.text.clone())
            }
            Handle::Message(_) => Err(HarnessError::action("edit", "messages are read-only")),
        }
    }
}

#[async_trait]
impl AutomationSession for FakeSession {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn find_elements(&self, locator: &Locator) -> HarnessResult<Vec<ElementHandle>> {
        let now = Instant::now();
        let mut state = self.backend.lock();
        let device = state.device(self.device)?;
        device.promote_due(now);

        let elements = device
            .elements
            .iter()
            .enumerate()
            .filter(|(_, e)| locator.matches(&e.text, e.kind, e.accessibility_id.as_deref()))
            .map(|(i, _)| ElementHandle::new(format!("e{}", i)));
        let messages = device
            .messages
            .iter()
            .enumerate()
            .filter(|(_, m)| m.visible_at <= now && locator.matches(&m.text, ElementKind::Text, None))
            .map(|(i, _)| ElementHandle::new(format!("m{}", i)));

        Ok(elements.chain(messages).collect())
    }

    async fn click(&self, element: &ElementHandle) -> HarnessResult<()> {
        let handle = self.parse(element)?;
        let mut state = self.backend.lock();
        let device = state.device(self.device)?;

        let (label, is_send) = match handle {
            Handle::Element(n) => {
                let target = device
                    .elements
                    .get(n)
                    .ok_or_else(|| HarnessError::Session(format!("stale element reference {}", element.id)))?;
                let label = target.accessibility_id.clone().unwrap_or_else(|| target.text.clone());
                (label, target.is(SEND_BUTTON))
            }
            Handle::Message(n) => {
                let text = device.messages.get(n).map(|m| m.text.clone()).unwrap_or_default();
                (text, false)
            }
        };

        if is_send {
            let draft = std::mem::take(&mut device.input_mut()?.text);
            let member = device.member;
            if !draft.is_empty() {
                device.messages.push(Delivery {
                    text: draft.clone(),
                    visible_at: Instant::now(),
                });
                if member {
                    state.broadcast(self.device, &draft);
                    state.render_sent(self.device, &draft);
                }
                self.record(&mut state, format!("send '{}'", draft));
                return Ok(());
            }
        }

        self.record(&mut state, format!("click {}", label));
        let effects: Vec<ClickEffect> = state
            .click_effects
            .iter()
            .filter(|(on, trigger, _)| *on == self.device && *trigger == label)
            .map(|(_, _, effect)| effect.clone())
            .collect();
        for effect in effects {
            state.apply(self.device, effect);
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.edit(element, |content| content.push_str(text))?;
        let mut state = self.backend.lock();
        self.record(&mut state, format!("type '{}'", text));
        Ok(())
    }

    async fn set_value(&self, element: &ElementHandle, text: &str) -> HarnessResult<()> {
        self.edit(element, |content| *content = text.to_string())?;
        let mut state = self.backend.lock();
        self.record(&mut state, format!("set '{}'", text));
        Ok(())
    }

    async fn element_text(&self, element: &ElementHandle) -> HarnessResult<String> {
        let handle = self.parse(element)?;
        let mut state = self.backend.lock();
        let device = state.device(self.device)?;
        let text = match handle {
            Handle::Element(n) => device.elements.get(n).map(|e| e.text.clone()),
            Handle::Message(n) => device.messages.get(n).map(|m| m.text.clone()),
        };
        text.ok_or_else(|| HarnessError::Session(format!("stale element reference {}", element.id)))
    }

    async fn scroll_to(&self, locator: &Locator) -> HarnessResult<ElementHandle> {
        let element = self.find_element(locator).await?;
        let mut state = self.backend.lock();
        self.record(&mut state, format!("scroll to {}", locator));
        Ok(element)
    }

    async fn press_keycode(&self, keycode: u32) -> HarnessResult<()> {
        let c = match keycode {
            7..=16 => char::from(b'0' + (keycode - 7) as u8),
            55 => ',',
            56 => '.',
            other => return Err(HarnessError::action("press_keycode", format!("unsupported keycode {}", other))),
        };
        let mut state = self.backend.lock();
        state.device(self.device)?.input_mut()?.text.push(c);
        self.record(&mut state, format!("key {}", c));
        Ok(())
    }

    async fn back(&self) -> HarnessResult<()> {
        let mut state = self.backend.lock();
        state.device(self.device)?;
        self.record(&mut state, "back".to_string());
        Ok(())
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        let mut state = self.backend.lock();
        state.device(self.device)?;
        Ok(b"\x89PNG\r\n\x1a\nfake".to_vec())
    }

    async fn quit(&self) -> HarnessResult<()> {
        let mut state = self.backend.lock();
        state.quit_attempts += 1;
        if state.fail_quit_at == Some(self.device) {
            return Err(HarnessError::Session(format!("could not delete session {}", self.session_id)));
        }
        if let Some(device) = state.devices.get_mut(self.device) {
            device.live = false;
        }
        Ok(())
    }
}

/// Access recovery that signs the device in by showing the username on its screen
#[derive(Debug)]
pub struct FakeRecovery {
    backend: FakeBackend,
    fail_for: Option<String>,
    attempts: Mutex<usize>,
    recovered: Mutex<Vec<(usize, String)>>,
}

impl FakeRecovery {
    pub fn new(backend: FakeBackend) -> Self {
        Self {
            backend,
            fail_for: None,
            attempts: Mutex::new(0),
            recovered: Mutex::new(Vec::new()),
        }
    }

    /// Reject recovery of this username
    pub fn failing_for(mut self, username: impl Into<String>) -> Self {
        self.fail_for = Some(username.into());
        self
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// (device index, username) per successful recovery
    pub fn recovered(&self) -> Vec<(usize, String)> {
        self.recovered.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl AccessRecovery for FakeRecovery {
    async fn recover_access(
        &self,
        _actor: ActorId,
        session: &dyn AutomationSession,
        identity: &Identity,
    ) -> HarnessResult<()> {
        *self.attempts.lock().unwrap_or_else(|p| p.into_inner()) += 1;

        let device = self
            .backend
            .index_of(session.session_id())
            .ok_or_else(|| HarnessError::Session(format!("unknown session {}", session.session_id())))?;
        if self.fail_for.as_deref() == Some(identity.username.as_str()) {
            return Err(HarnessError::action("recover_access", "passphrase rejected"));
        }

        self.backend.show(device, FakeElement::text(identity.username.clone()));
        self.backend.show(device, FakeElement::button("Home"));
        self.recovered
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((device, identity.username.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<String, u128>,
    pending: Vec<(String, u128, Instant)>,
    queries: usize,
}

/// Balance source with scheduled credits
#[derive(Debug, Clone, Default)]
pub struct FakeLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_balance(&self, address: &str, balance: Balance) {
        self.lock().balances.insert(address.to_lowercase(), balance.wei());
    }

    /// Add `amount` to `address` once `delay` has passed
    pub fn credit_after(&self, address: &str, amount: Balance, delay: Duration) {
        let at = Instant::now() + delay;
        self.lock().pending.push((address.to_lowercase(), amount.wei(), at));
    }

    pub fn queries(&self) -> usize {
        self.lock().queries
    }
}

#[async_trait]
impl BalanceSource for FakeLedger {
    async fn get_balance(&self, address: &str) -> HarnessResult<Balance> {
        let now = Instant::now();
        let mut state = self.lock();
        state.queries += 1;

        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut state.pending)
            .into_iter()
            .partition(|(_, _, at)| *at <= now);
        state.pending = waiting;
        for (credited, amount, _) in due {
            *state.balances.entry(credited).or_insert(0) += amount;
        }

        Ok(Balance::from_wei(
            state.balances.get(&address.to_lowercase()).copied().unwrap_or(0),
        ))
    }
}
