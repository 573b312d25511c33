//! Scenario runner
//!
//! Runs one scenario against a fresh device pool: start sessions, recover
//! bound identities, execute steps in order, stop at the first failure and
//! release every session whatever happened.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::actions::StepContext;
use crate::actor::AccessRecovery;
use crate::config::TimingConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::identity::{Parametrization, RoleBindings};
use crate::pool::DevicePool;
use crate::scenario::{Scenario, Step};
use crate::session::SessionFactory;
use crate::vars::Vars;
use crate::verification::BalanceSource;

/// Outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    Passed,
    Failed,
    /// An observable never settled within its window
    Timeout,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// 1-based position in the scenario
    pub index: usize,
    pub name: String,
    pub actor: String,
    pub action: String,
    pub duration: Duration,
    pub status: StepStatus,
    pub error_message: Option<String>,
}

impl StepResult {
    fn new(index: usize, step: &Step, duration: Duration, outcome: &HarnessResult<()>) -> Self {
        let (status, error_message) = match outcome {
            Ok(()) => (StepStatus::Passed, None),
            Err(e @ HarnessError::ObservableTimeout { .. }) => (StepStatus::Timeout, Some(e.to_string())),
            Err(e) => (StepStatus::Failed, Some(e.to_string())),
        };
        Self {
            index,
            name: step.name.clone(),
            actor: step.actor.to_string(),
            action: step.action.describe(),
            duration,
            status,
            error_message,
        }
    }
}

/// Overall result of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    Passed,
    Failed(String),
}

/// Result of one scenario run
#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub run_id: Uuid,
    pub scenario: String,
    /// Parametrization id, when the run is one case of several
    pub case: Option<String>,
    /// Executed steps only; a failed run ends with the failing step
    pub steps: Vec<StepResult>,
    pub outcome: RunOutcome,
    pub duration: Duration,
    pub artifacts: Vec<PathBuf>,
    #[serde(skip)]
    error: Option<HarnessError>,
}

impl ScenarioReport {
    fn new(scenario: &Scenario, case: Option<&str>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.name.clone(),
            case: case.map(str::to_string),
            steps: Vec::new(),
            outcome: RunOutcome::Passed,
            duration: Duration::ZERO,
            artifacts: Vec::new(),
            error: None,
        }
    }

    fn finish(&mut self, duration: Duration, result: HarnessResult<()>) {
        self.duration = duration;
        if let Err(e) = result {
            self.outcome = RunOutcome::Failed(e.to_string());
            self.error = Some(e);
        }
    }

    /// `scenario[case]`
    pub fn label(&self) -> String {
        match &self.case {
            Some(case) => format!("{}[{}]", self.scenario, case),
            None => self.scenario.clone(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Passed)
    }

    pub fn error(&self) -> Option<&HarnessError> {
        self.error.as_ref()
    }

    /// The step the run stopped at, if a step failed
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.status != StepStatus::Passed)
    }

    pub fn summary(&self) -> String {
        match &self.outcome {
            RunOutcome::Passed => format!(
                "PASS {} ({:.2}s, {} steps)",
                self.label(),
                self.duration.as_secs_f64(),
                self.steps.len()
            ),
            RunOutcome::Failed(reason) => format!(
                "FAIL {} ({:.2}s): {}",
                self.label(),
                self.duration.as_secs_f64(),
                reason
            ),
        }
    }

    pub fn into_result(self) -> HarnessResult<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub struct ScenarioRunner {
    factory: Arc<dyn SessionFactory>,
    timing: TimingConfig,
    recovery: Option<Arc<dyn AccessRecovery>>,
    balances: Option<Arc<dyn BalanceSource>>,
    artifacts_dir: Option<PathBuf>,
}

impl ScenarioRunner {
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            timing: TimingConfig::default(),
            recovery: None,
            balances: None,
            artifacts_dir: None,
        }
    }

    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// How bound identities are recovered into fresh sessions
    pub fn with_recovery(mut self, recovery: Arc<dyn AccessRecovery>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn with_balances(mut self, balances: Arc<dyn BalanceSource>) -> Self {
        self.balances = Some(balances);
        self
    }

    /// Save a screenshot of every device here when a run fails
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub async fn run(&self, scenario: &Scenario, bindings: &RoleBindings) -> ScenarioReport {
        self.run_case(scenario, None, bindings).await
    }

    /// One run per case, each on its own pool. A failing case does not stop
    /// the next one.
    pub async fn run_parametrized(&self, scenario: &Scenario, cases: &[Parametrization]) -> Vec<ScenarioReport> {
        let mut reports = Vec::with_capacity(cases.len());
        for case in cases {
            reports.push(self.run_case(scenario, Some(&case.id), &case.bindings).await);
        }
        reports
    }

    async fn run_case(&self, scenario: &Scenario, case: Option<&str>, bindings: &RoleBindings) -> ScenarioReport {
        let started = Instant::now();
        let mut report = ScenarioReport::new(scenario, case);
        info!("Running {} ({})", report.label(), report.run_id);

        let mut pool = match DevicePool::create_drivers(
            self.factory.as_ref(),
            scenario.actor_count(),
            self.timing.session_startup_timeout(),
        )
        .await
        {
            Ok(pool) => pool,
            Err(e) => {
                error!("{}: {}", report.label(), e);
                report.finish(started.elapsed(), Err(e));
                return report;
            }
        };

        let result = self.execute(scenario, bindings, &mut pool, &mut report).await;

        if let (Err(e), Some(dir)) = (&result, &self.artifacts_dir) {
            debug!("Capturing failure screenshots for {}", e);
            report.artifacts = capture_screenshots(&pool, dir, &report).await;
        }

        if let Err(e) = pool.teardown().await {
            warn!("Teardown of {} was incomplete: {}", report.label(), e);
        }

        report.finish(started.elapsed(), result);
        match &report.outcome {
            RunOutcome::Passed => info!("{}", report.summary()),
            RunOutcome::Failed(_) => error!("{}", report.summary()),
        }
        report
    }

    async fn execute(
        &self,
        scenario: &Scenario,
        bindings: &RoleBindings,
        pool: &mut DevicePool,
        report: &mut ScenarioReport,
    ) -> HarnessResult<()> {
        pool.assign_roles(&scenario.roles)?;

        let mut vars = Vars::default();
        pool.bind_all(bindings, self.recovery.as_deref(), &mut vars).await?;

        for (position, step) in scenario.steps.iter().enumerate() {
            let index = position + 1;
            info!("Step {} '{}' on {}: {}", index, step.name, step.actor, step.action.describe());

            let step_started = Instant::now();
            let outcome = self
                .run_step(step, pool, &mut vars)
                .await
                .map_err(|e| e.in_step(&step.name));
            report
                .steps
                .push(StepResult::new(index, step, step_started.elapsed(), &outcome));

            if let Err(source) = outcome {
                return Err(HarnessError::StepFailed {
                    index,
                    step: step.name.clone(),
                    actor: step.actor,
                    source: Box::new(source),
                });
            }
        }
        Ok(())
    }

    async fn run_step(&self, step: &Step, pool: &DevicePool, vars: &mut Vars) -> HarnessResult<()> {
        let wait = self.timing.wait_config();
        let mut ctx = StepContext {
            actor: pool.actor(step.actor)?,
            vars: &mut *vars,
            wait,
            balance_wait: self.timing.balance_config(),
            balances: self.balances.as_deref(),
        };
        step.action.perform(&mut ctx).await?;

        if let Some(observable) = &step.expect {
            debug!("Waiting until {}", observable);
            observable.evaluate(pool, vars, wait).await?;
        }
        Ok(())
    }
}

/// Best effort: a device that cannot be captured is skipped
async fn capture_screenshots(pool: &DevicePool, dir: &Path, report: &ScenarioReport) -> Vec<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        warn!("Cannot create artifacts directory {}: {}", dir.display(), e);
        return Vec::new();
    }

    let label: String = report
        .label()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();

    let mut saved = Vec::new();
    for actor in pool.actors() {
        let png = match actor.session().screenshot().await {
            Ok(png) => png,
            Err(e) => {
                warn!("No screenshot from {}: {}", actor.id(), e);
                continue;
            }
        };
        let path = dir.join(format!("{}-{}-{}.png", label, report.run_id.simple(), actor.id()));
        match tokio::fs::write(&path, png).await {
            Ok(()) => {
                info!("Saved screenshot of {} to {}", actor.id(), path.display());
                saved.push(path);
            }
            Err(e) => warn!("Cannot write {}: {}", path.display(), e),
        }
    }
    saved
}
