//! Actors: one simulated end-user device each

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HarnessError, HarnessResult};
use crate::identity::Identity;
use crate::session::AutomationSession;

/// Position of an actor in the device pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub usize);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device_{}", self.0 + 1)
    }
}

/// Part an actor plays in a scenario ("sender", "recipient", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Role {
    fn from(name: &str) -> Self {
        Role::new(name)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Restores an existing account into a fresh session.
///
/// Implemented by the page-object layer, which knows the app's sign-in flow.
#[async_trait]
pub trait AccessRecovery: Send + Sync {
    async fn recover_access(
        &self,
        actor: ActorId,
        session: &dyn AutomationSession,
        identity: &Identity,
    ) -> HarnessResult<()>;
}

/// A device under test with its role and, once recovered, its identity
pub struct Actor {
    id: ActorId,
    role: Option<Role>,
    session: Box<dyn AutomationSession>,
    identity: Option<Identity>,
    recovery_attempted: bool,
}

impl Actor {
    pub(crate) fn new(id: ActorId, session: Box<dyn AutomationSession>) -> Self {
        Self {
            id,
            role: None,
            session,
            identity: None,
            recovery_attempted: false,
        }
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref()
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = Some(role);
    }

    pub fn session(&self) -> &dyn AutomationSession {
        self.session.as_ref()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Recover `identity` into this actor's session.
    ///
    /// Allowed once per session, successful or not. Failure is fatal for the
    /// scenario and is not retried.
    pub async fn recover_access(&mut self, identity: Identity, recovery: &dyn AccessRecovery) -> HarnessResult<()> {
        if self.recovery_attempted {
            return Err(HarnessError::IdentityAlreadyRecovered { actor: self.id });
        }
        self.recovery_attempted = true;

        info!("Recovering '{}' on {}", identity.username, self.id);
        recovery
            .recover_access(self.id, self.session.as_ref(), &identity)
            .await
            .map_err(|e| HarnessError::IdentityRecovery {
                actor: self.id,
                reason: e.to_string(),
            })?;

        self.identity = Some(identity);
        Ok(())
    }

    pub(crate) fn into_session(self) -> Box<dyn AutomationSession> {
        self.session
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("session", &self.session.session_id())
            .field("identity", &self.identity)
            .finish()
    }
}
