//! Pre-existing user identities that scenarios recover into fresh sessions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::actor::Role;
use crate::error::{HarnessError, HarnessResult};
use crate::vars::Vars;

/// Account credentials plus the public facts other actors need about it
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Recovery phrase
    pub passphrase: String,
    pub password: String,
    pub username: String,
    /// Chat public key, used to add the account as a contact
    #[serde(default)]
    pub public_key: Option<String>,
    /// Wallet address, used for balance verification
    #[serde(default)]
    pub address: Option<String>,
}

impl Identity {
    pub fn new(passphrase: impl Into<String>, password: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            passphrase: passphrase.into(),
            password: password.into(),
            username: username.into(),
            public_key: None,
            address: None,
        }
    }

    pub fn with_public_key(mut self, public_key: impl Into<String>) -> Self {
        self.public_key = Some(public_key.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Reject identities that cannot be recovered
    pub fn validate(&self, name: &str) -> HarnessResult<()> {
        let missing: Vec<&str> = [
            ("passphrase", self.passphrase.is_empty()),
            ("password", self.password.is_empty()),
            ("username", self.username.is_empty()),
        ]
        .iter()
        .filter(|(_, empty)| *empty)
        .map(|(field, _)| *field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Config(format!(
                "identity '{}' is missing {}",
                name,
                missing.join(", ")
            )))
        }
    }

    /// Publish the identity's fields as `<role>.<field>` scenario variables
    pub fn seed_vars(&self, role: &Role, vars: &mut Vars) {
        vars.set(format!("{}.passphrase", role), self.passphrase.clone());
        vars.set(format!("{}.password", role), self.password.clone());
        vars.set(format!("{}.username", role), self.username.clone());
        if let Some(public_key) = &self.public_key {
            vars.set(format!("{}.public_key", role), public_key.clone());
        }
        if let Some(address) = &self.address {
            vars.set(format!("{}.address", role), address.clone());
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("public_key", &self.public_key)
            .field("address", &self.address)
            .field("passphrase", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Role → identity assignment for one scenario run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleBindings {
    bindings: BTreeMap<Role, Identity>,
}

impl RoleBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, role: impl Into<Role>, identity: Identity) -> Self {
        self.bindings.insert(role.into(), identity);
        self
    }

    pub fn get(&self, role: &Role) -> Option<&Identity> {
        self.bindings.get(role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &Role> {
        self.bindings.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// The same identities with two roles exchanged
    pub fn swapped(&self, a: &Role, b: &Role) -> Self {
        let mut bindings = self.bindings.clone();
        let first = bindings.remove(a);
        let second = bindings.remove(b);
        if let Some(identity) = first {
            bindings.insert(b.clone(), identity);
        }
        if let Some(identity) = second {
            bindings.insert(a.clone(), identity);
        }
        Self { bindings }
    }
}

/// One named case of a parametrized scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parametrization {
    pub id: String,
    pub bindings: RoleBindings,
}

impl Parametrization {
    pub fn new(id: impl Into<String>, bindings: RoleBindings) -> Self {
        Self {
            id: id.into(),
            bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::new("one two three", "qwerty", "Alice").with_address("0xa11ce")
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", alice());
        assert!(rendered.contains("Alice"));
        assert!(!rendered.contains("qwerty"));
        assert!(!rendered.contains("one two three"));
    }

    #[test]
    fn test_validate_lists_missing_fields() {
        let err = Identity::new("", "", "Bob").validate("B_USER").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: identity 'B_USER' is missing passphrase, password"
        );
    }

    #[test]
    fn test_seed_vars_uses_role_prefix() {
        let mut vars = Vars::default();
        alice().seed_vars(&Role::new("recipient"), &mut vars);
        assert_eq!(vars.get("recipient.username").unwrap(), "Alice");
        assert_eq!(vars.get("recipient.address").unwrap(), "0xa11ce");
        assert!(vars.get("recipient.public_key").is_err());
    }

    #[test]
    fn test_swapped_exchanges_identities() {
        let bob = Identity::new("four five six", "secret", "Bob");
        let bindings = RoleBindings::new()
            .bind("recipient", alice())
            .bind("sender", bob.clone());
        let swapped = bindings.swapped(&Role::new("recipient"), &Role::new("sender"));
        assert_eq!(swapped.get(&Role::new("recipient")), Some(&bob));
        assert_eq!(swapped.get(&Role::new("sender")), Some(&alice()));
    }
}
