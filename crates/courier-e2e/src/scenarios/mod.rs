//! Multi-device scenarios
//!
//! Each scenario lives in its own module. [`plan`] turns them into the list of
//! runs a tag selects, with parametrized scenarios expanded into one run per
//! case.

pub mod group_chat;
pub mod one_to_one_chat;
pub mod send_funds;

use std::fmt;

use courier_harness::{HarnessConfig, HarnessError, HarnessResult, Parametrization, Scenario, TAG_ALL};

use send_funds::FundsVariant;

/// One scenario run: unbound, or bound to one parametrization case
#[derive(Debug, Clone)]
pub struct PlannedRun {
    pub scenario: Scenario,
    pub case: Option<Parametrization>,
}

impl PlannedRun {
    fn unbound(scenario: Scenario) -> Self {
        Self { scenario, case: None }
    }

    /// `name` or `name[case]`
    pub fn label(&self) -> String {
        match &self.case {
            Some(case) => format!("{}[{}]", self.scenario.name, case.id),
            None => self.scenario.name.clone(),
        }
    }
}

impl fmt::Display for PlannedRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.scenario.tags.join(", "))
    }
}

/// Every scenario name, in run order
pub fn names() -> Vec<&'static str> {
    vec![one_to_one_chat::NAME, group_chat::NAME, send_funds::NAME]
}

/// Runs selected by `tag` and, when given, a scenario name or run label.
///
/// Funds cases need configured users; they are only resolved when selected.
pub fn plan(config: &HarnessConfig, tag: &str, only: Option<&str>) -> HarnessResult<Vec<PlannedRun>> {
    if let Some(name) = only {
        let known = names().contains(&name)
            || FundsVariant::ALL
                .iter()
                .any(|variant| name == format!("{}[{}]", send_funds::NAME, variant.id()));
        if !known {
            return Err(HarnessError::Config(format!("unknown scenario '{}'", name)));
        }
    }

    let selected = |scenario: &Scenario, label: &str| {
        scenario.matches_tag(tag) && only.map_or(true, |name| name == scenario.name || name == label)
    };

    let mut runs = Vec::new();
    for scenario in [one_to_one_chat::scenario()?, group_chat::scenario()?] {
        if selected(&scenario, &scenario.name) {
            runs.push(PlannedRun::unbound(scenario));
        }
    }

    for variant in FundsVariant::ALL {
        let scenario = send_funds::scenario(variant)?;
        let label = format!("{}[{}]", scenario.name, variant.id());
        if selected(&scenario, &label) {
            let case = send_funds::bindings(config, variant)?;
            runs.push(PlannedRun {
                scenario,
                case: Some(case),
            });
        }
    }
    Ok(runs)
}

/// Labels of the runs `tag` selects, without resolving any user
pub fn list(tag: &str) -> HarnessResult<Vec<String>> {
    let mut labels = Vec::new();
    for scenario in [one_to_one_chat::scenario()?, group_chat::scenario()?] {
        if scenario.matches_tag(tag) {
            labels.push(scenario.name);
        }
    }
    for variant in FundsVariant::ALL {
        let scenario = send_funds::scenario(variant)?;
        if scenario.matches_tag(tag) {
            labels.push(format!("{}[{}]", scenario.name, variant.id()));
        }
    }
    Ok(labels)
}

/// Whether any scenario carries `tag`
pub fn is_known_tag(tag: &str) -> bool {
    tag == TAG_ALL || ["chat", "transaction"].contains(&tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_by_tag() {
        assert_eq!(
            list("chat").unwrap(),
            vec![one_to_one_chat::NAME, group_chat::NAME]
        );
        assert_eq!(
            list("transaction").unwrap(),
            vec![
                "send_funds_via_request[group_chat]",
                "send_funds_via_request[one_to_one_chat]"
            ]
        );
        assert_eq!(list(TAG_ALL).unwrap().len(), 4);
        assert!(list("nightly").unwrap().is_empty());
    }

    #[test]
    fn test_chat_plan_needs_no_users() {
        let runs = plan(&HarnessConfig::default(), "chat", None).unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(|run| run.case.is_none()));
    }

    #[test]
    fn test_funds_plan_without_users_is_a_config_error() {
        let result = plan(&HarnessConfig::default(), "transaction", None);
        assert!(matches!(result, Err(HarnessError::Config(_))));
    }

    #[test]
    fn test_unknown_scenario_is_rejected() {
        let result = plan(&HarnessConfig::default(), TAG_ALL, Some("three_device_chat"));
        assert!(matches!(result, Err(HarnessError::Config(msg)) if msg.contains("three_device_chat")));
    }
}
