//! Device pool manager
//!
//! Owns every actor of a scenario run. Sessions are started in slot order and
//! are never shared between actors.

use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};

use crate::actor::{AccessRecovery, Actor, ActorId, Role};
use crate::error::{HarnessError, HarnessResult};
use crate::identity::RoleBindings;
use crate::session::SessionFactory;
use crate::vars::Vars;

pub struct DevicePool {
    actors: Vec<Actor>,
    released: bool,
}

impl DevicePool {
    /// Start `n` isolated sessions.
    ///
    /// Fails without retrying if any session does not come up within
    /// `startup_timeout`; sessions already started are released first.
    pub async fn create_drivers(
        factory: &dyn SessionFactory,
        n: usize,
        startup_timeout: Duration,
    ) -> HarnessResult<Self> {
        if n == 0 {
            return Err(HarnessError::Config("a scenario needs at least one driver".to_string()));
        }

        let mut pool = Self {
            actors: Vec::with_capacity(n),
            released: false,
        };

        for index in 0..n {
            let started = match tokio::time::timeout(startup_timeout, factory.start_session(index)).await {
                Ok(Ok(session)) => Ok(session),
                Ok(Err(HarnessError::SessionStartup { index, reason })) => {
                    Err(HarnessError::SessionStartup { index, reason })
                }
                Ok(Err(e)) => Err(HarnessError::SessionStartup {
                    index,
                    reason: e.to_string(),
                }),
                Err(_) => Err(HarnessError::SessionStartup {
                    index,
                    reason: format!("no session after {:?}", startup_timeout),
                }),
            };

            match started {
                Ok(session) => {
                    info!("Started session {} for {}", session.session_id(), ActorId(index));
                    pool.actors.push(Actor::new(ActorId(index), session));
                }
                Err(e) => {
                    warn!("Driver startup failed, releasing {} started session(s)", pool.actors.len());
                    if let Err(release) = pool.teardown().await {
                        warn!("Release after startup failure was incomplete: {}", release);
                    }
                    return Err(e);
                }
            }
        }

        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    pub fn actor(&self, id: ActorId) -> HarnessResult<&Actor> {
        self.actors
            .get(id.0)
            .ok_or_else(|| HarnessError::UnknownActor(id.to_string()))
    }

    pub fn actor_mut(&mut self, id: ActorId) -> HarnessResult<&mut Actor> {
        self.actors
            .get_mut(id.0)
            .ok_or_else(|| HarnessError::UnknownActor(id.to_string()))
    }

    pub fn actor_by_role(&self, role: &Role) -> Option<&Actor> {
        self.actors.iter().find(|actor| actor.role() == Some(role))
    }

    /// Give actor `i` the role `roles[i]`
    pub fn assign_roles(&mut self, roles: &[Role]) -> HarnessResult<()> {
        if roles.len() != self.actors.len() {
            return Err(HarnessError::Config(format!(
                "{} roles for {} actors",
                roles.len(),
                self.actors.len()
            )));
        }
        for (actor, role) in self.actors.iter_mut().zip(roles) {
            actor.set_role(role.clone());
        }
        Ok(())
    }

    /// Recover every bound identity into the actor holding its role.
    ///
    /// Identity fields are published to `vars` for every bound role, including
    /// roles no actor plays, so scripts can refer to them.
    pub async fn bind_all(
        &mut self,
        bindings: &RoleBindings,
        recovery: Option<&dyn AccessRecovery>,
        vars: &mut Vars,
    ) -> HarnessResult<()> {
        for role in bindings.roles() {
            if let Some(identity) = bindings.get(role) {
                identity.seed_vars(role, vars);
            }
        }

        for actor in self.actors.iter_mut() {
            let identity = match actor.role().and_then(|role| bindings.get(role)) {
                Some(identity) => identity.clone(),
                None => continue,
            };
            let recovery = recovery.ok_or_else(|| {
                HarnessError::Config(format!(
                    "identity bound to {} but no access recovery configured",
                    actor.id()
                ))
            })?;
            actor.recover_access(identity, recovery).await?;
        }
        Ok(())
    }

    /// Quit every session.
    ///
    /// All sessions are released even when some fail to quit; the first failure
    /// is returned afterwards.
    pub async fn teardown(&mut self) -> HarnessResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let sessions: Vec<_> = std::mem::take(&mut self.actors)
            .into_iter()
            .map(|actor| (actor.id(), actor.into_session()))
            .collect();
        let results = join_all(sessions.iter().map(|(_, session)| session.quit())).await;

        let mut first_failure = None;
        for ((id, session), result) in sessions.iter().zip(results) {
            match result {
                Ok(()) => info!("Released session {} of {}", session.session_id(), id),
                Err(e) => {
                    warn!("Failed to release session {} of {}: {}", session.session_id(), id, e);
                    first_failure.get_or_insert(e);
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for DevicePool {
    fn drop(&mut self) {
        if !self.released && !self.actors.is_empty() {
            warn!("Device pool dropped with {} session(s) not torn down", self.actors.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;
    use crate::locator::Locator;
    use crate::testing::{FakeBackend, FakeRecovery, MESSAGE_INPUT};

    const STARTUP: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_create_drivers_yields_isolated_sessions() {
        let backend = FakeBackend::new(Duration::ZERO);
        let factory = backend.factory();
        let mut pool = DevicePool::create_drivers(&factory, 3, STARTUP).await.unwrap();

        assert_eq!(pool.len(), 3);
        let ids: Vec<_> = pool.actors().iter().map(|a| a.session().session_id().to_string()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[0] != ids[1] && ids[1] != ids[2] && ids[0] != ids[2]);

        // typing on one device leaves the others untouched
        let first = pool.actor(ActorId(0)).unwrap().session();
        let input = first.find_element(&Locator::accessibility_id(MESSAGE_INPUT)).await.unwrap();
        first.send_keys(&input, "draft").await.unwrap();
        assert_eq!(backend.draft(0), "draft");
        assert_eq!(backend.draft(1), "");
        assert_eq!(backend.draft(2), "");

        pool.teardown().await.unwrap();
        assert_eq!(backend.live_sessions(), 0);
    }

    #[tokio::test]
    async fn test_zero_drivers_is_rejected() {
        let backend = FakeBackend::new(Duration::ZERO);
        let result = DevicePool::create_drivers(&backend.factory(), 0, STARTUP).await;
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[tokio::test]
    async fn test_startup_failure_releases_started_sessions() {
        let backend = FakeBackend::new(Duration::ZERO);
        backend.fail_startup_at(2);

        let result = DevicePool::create_drivers(&backend.factory(), 3, STARTUP).await;
        assert!(matches!(result, Err(HarnessError::SessionStartup { index: 2, .. })));
        assert_eq!(backend.started_sessions(), 2);
        assert_eq!(backend.live_sessions(), 0);
    }

    #[tokio::test]
    async fn test_teardown_releases_all_even_when_one_quit_fails() {
        let backend = FakeBackend::new(Duration::ZERO);
        backend.fail_quit_at(0);
        let mut pool = DevicePool::create_drivers(&backend.factory(), 2, STARTUP).await.unwrap();

        assert!(pool.teardown().await.is_err());
        assert_eq!(backend.quit_attempts(), 2);
        // second teardown is a no-op
        pool.teardown().await.unwrap();
        assert_eq!(backend.quit_attempts(), 2);
    }

    #[tokio::test]
    async fn test_bind_all_recovers_bound_roles_once() {
        let backend = FakeBackend::new(Duration::ZERO);
        let recovery = FakeRecovery::new(backend.clone());
        let mut pool = DevicePool::create_drivers(&backend.factory(), 2, STARTUP).await.unwrap();
        pool.assign_roles(&[Role::new("recipient"), Role::new("sender")]).unwrap();

        let bindings = RoleBindings::new()
            .bind("recipient", Identity::new("a b c", "pw-a", "Alice"))
            .bind("sender", Identity::new("d e f", "pw-b", "Bob"));
        let mut vars = Vars::default();
        pool.bind_all(&bindings, Some(&recovery), &mut vars).await.unwrap();

        assert_eq!(vars.get("sender.username").unwrap(), "Bob");
        assert_eq!(
            pool.actor_by_role(&Role::new("recipient")).unwrap().identity().unwrap().username,
            "Alice"
        );
        assert_eq!(recovery.recovered(), vec![(0, "Alice".to_string()), (1, "Bob".to_string())]);

        let again = pool
            .actor_mut(ActorId(0))
            .unwrap()
            .recover_access(Identity::new("a b c", "pw-a", "Alice"), &recovery)
            .await;
        assert!(matches!(again, Err(HarnessError::IdentityAlreadyRecovered { .. })));
        pool.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_recovery_is_fatal_and_not_retried() {
        let backend = FakeBackend::new(Duration::ZERO);
        let recovery = FakeRecovery::new(backend.clone()).failing_for("Bob");
        let mut pool = DevicePool::create_drivers(&backend.factory(), 1, STARTUP).await.unwrap();
        pool.assign_roles(&[Role::new("sender")]).unwrap();

        let bindings = RoleBindings::new().bind("sender", Identity::new("d e f", "pw-b", "Bob"));
        let result = pool.bind_all(&bindings, Some(&recovery), &mut Vars::default()).await;

        assert!(matches!(result, Err(HarnessError::IdentityRecovery { actor: ActorId(0), .. })));
        assert_eq!(recovery.attempts(), 1);
        pool.teardown().await.unwrap();
    }

    #[tokio::test]
    async fn test_recovering_same_identity_on_fresh_sessions_reaches_same_home() {
        let identity = Identity::new("a b c", "pw-a", "Alice");
        let mut screens = Vec::new();

        for _ in 0..2 {
            let backend = FakeBackend::new(Duration::ZERO);
            let recovery = FakeRecovery::new(backend.clone());
            let mut pool = DevicePool::create_drivers(&backend.factory(), 1, STARTUP).await.unwrap();
            pool.actor_mut(ActorId(0))
                .unwrap()
                .recover_access(identity.clone(), &recovery)
                .await
                .unwrap();
            screens.push(backend.screen_texts(0));
            pool.teardown().await.unwrap();
        }

        assert_eq!(screens[0], screens[1]);
        assert!(screens[0].contains(&"Alice".to_string()));
    }
}
