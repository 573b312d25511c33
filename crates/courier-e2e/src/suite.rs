//! Wiring the scenarios to a configured runner

use std::sync::Arc;

use tracing::{error, info};

use courier_appium::AppiumSessionFactory;
use courier_harness::{
    EtherscanClient, HarnessConfig, HarnessResult, RoleBindings, ScenarioReport, ScenarioRunner,
};

use crate::scenarios::PlannedRun;
use crate::views::ConsoleRecovery;

/// Runner against the configured Appium server, with console recovery and
/// Etherscan balance checks
pub fn appium_runner(config: &HarnessConfig) -> HarnessResult<ScenarioRunner> {
    let factory = Arc::new(AppiumSessionFactory::new(config.appium.clone()));
    let balances = Arc::new(EtherscanClient::new(&config.balance)?);
    let recovery = Arc::new(ConsoleRecovery::new(config.timing.wait_config()));

    let mut runner = ScenarioRunner::new(factory)
        .with_timing(config.timing.clone())
        .with_recovery(recovery)
        .with_balances(balances);
    if let Some(dir) = &config.artifacts_dir {
        runner = runner.with_artifacts_dir(dir.clone());
    }
    Ok(runner)
}

/// Run every planned run in order; a failing run never stops the next one
pub async fn run_all(runner: &ScenarioRunner, runs: &[PlannedRun]) -> Vec<ScenarioReport> {
    let mut reports = Vec::with_capacity(runs.len());

    for run in runs {
        info!("Running {}", run.label());
        let mut outcome = match &run.case {
            Some(case) => runner.run_parametrized(&run.scenario, std::slice::from_ref(case)).await,
            None => vec![runner.run(&run.scenario, &RoleBindings::new()).await],
        };

        for report in &outcome {
            if report.is_success() {
                info!("{}", report.summary());
            } else {
                error!("{}", report.summary());
            }
        }
        reports.append(&mut outcome);
    }
    reports
}

/// `(passed, failed)`
pub fn tally(reports: &[ScenarioReport]) -> (usize, usize) {
    let passed = reports.iter().filter(|r| r.is_success()).count();
    (passed, reports.len() - passed)
}
