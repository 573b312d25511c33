//! Scenario variables
//!
//! Values that only exist at run time (a public key read off one device, a
//! generated amount, a captured balance) travel between steps through `Vars`.
//! Steps refer to them with [`Text`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// String blackboard shared by the steps of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vars {
    values: BTreeMap<String, String>,
}

impl Vars {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> HarnessResult<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| HarnessError::UnboundVar(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}

/// Text a step types or looks for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Text {
    Literal(String),
    /// Value of a variable
    Var(String),
    /// Literal text with `{name}` or `{name:N}` placeholders; `:N` keeps the
    /// first N characters of the value
    Template(String),
}

impl Text {
    pub fn literal(text: impl Into<String>) -> Self {
        Text::Literal(text.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Text::Var(name.into())
    }

    pub fn template(template: impl Into<String>) -> Self {
        Text::Template(template.into())
    }

    pub fn resolve(&self, vars: &Vars) -> HarnessResult<String> {
        match self {
            Text::Literal(text) => Ok(text.clone()),
            Text::Var(name) => vars.get(name).map(str::to_string),
            Text::Template(template) => render(template, vars),
        }
    }
}

impl From<&str> for Text {
    fn from(text: &str) -> Self {
        Text::Literal(text.to_string())
    }
}

impl From<String> for Text {
    fn from(text: String) -> Self {
        Text::Literal(text)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Text::Literal(text) => write!(f, "'{}'", text),
            Text::Var(name) => write!(f, "${}", name),
            Text::Template(template) => write!(f, "'{}'", template),
        }
    }
}

fn render(template: &str, vars: &Vars) -> HarnessResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| HarnessError::Config(format!("unterminated placeholder in '{}'", template)))?;
        let placeholder = &after[..close];

        let (name, limit) = match placeholder.split_once(':') {
            Some((name, limit)) => {
                let limit = limit.parse::<usize>().map_err(|_| {
                    HarnessError::Config(format!("bad length '{}' in placeholder '{}'", limit, placeholder))
                })?;
                (name, Some(limit))
            }
            None => (placeholder, None),
        };

        let value = vars.get(name)?;
        match limit {
            Some(limit) => out.extend(value.chars().take(limit)),
            None => out.push_str(value),
        }
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Vars {
        let mut vars = Vars::default();
        vars.set("amount", "0.0042");
        vars.set("sender.username", "Extremely Long Generated Username Here");
        vars
    }

    #[test]
    fn test_template_substitutes_and_truncates() {
        let vars = vars();
        assert_eq!(
            Text::template("Requesting  {amount} ETH").resolve(&vars).unwrap(),
            "Requesting  0.0042 ETH"
        );
        assert_eq!(
            Text::template("{sender.username:25}").resolve(&vars).unwrap(),
            "Extremely Long Generated "
        );
    }

    #[test]
    fn test_unbound_var_is_an_error() {
        let err = Text::var("initial_balance").resolve(&vars()).unwrap_err();
        assert!(matches!(err, HarnessError::UnboundVar(name) if name == "initial_balance"));
    }

    #[test]
    fn test_unterminated_placeholder_is_rejected() {
        assert!(matches!(
            Text::template("from {sender").resolve(&vars()),
            Err(HarnessError::Config(_))
        ));
    }
}
