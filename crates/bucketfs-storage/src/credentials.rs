use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bucketfs_common::error::{FsError, Result};
use serde::{Deserialize, Serialize};

use crate::traits::ObjectStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Username and password against the endpoint.
    #[default]
    Basic,
    /// Scoped token flow, requires tenant and domain.
    Keystone,
}

impl std::str::FromStr for AuthMethod {
    type Err = FsError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "keystone" => Ok(Self::Keystone),
            other => Err(FsError::InvalidConfig(format!("unknown auth method: {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub endpoint: String,
    pub tenant: Option<String>,
    pub domain: Option<String>,
    pub auth_method: AuthMethod,
}

pub trait CredentialProvider: Send + Sync {
    fn lookup(&self, username: &str) -> Option<Credentials>;
}

#[derive(Clone, Debug, Default)]
pub struct StaticCredentialProvider {
    accounts: HashMap<String, Credentials>,
}

impl StaticCredentialProvider {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        let password = password.into();
        let mut provider = Self::default();
        if !username.is_empty() && !password.is_empty() {
            provider.accounts.insert(
                username.clone(),
                Credentials {
                    username,
                    password,
                    endpoint: String::new(),
                    tenant: None,
                    domain: None,
                    auth_method: AuthMethod::Basic,
                },
            );
        }
        provider
    }

    pub fn with_account(mut self, credentials: Credentials) -> Self {
        self.accounts
            .insert(credentials.username.clone(), credentials);
        self
    }

    /// Checks a login attempt against the registered account.
    pub fn authenticate(&self, attempt: &Credentials) -> Result<()> {
        let account = self
            .lookup(&attempt.username)
            .ok_or_else(|| FsError::AuthFailure(format!("unknown user: {}", attempt.username)))?;

        if account.password != attempt.password {
            return Err(FsError::AuthFailure(format!(
                "invalid password for user: {}",
                attempt.username
            )));
        }

        if attempt.auth_method == AuthMethod::Keystone {
            let scoped = account.auth_method == AuthMethod::Keystone
                && account.tenant == attempt.tenant
                && account.domain == attempt.domain;
            if !scoped {
                return Err(FsError::AuthFailure(format!(
                    "user {} has no scope for tenant {:?} in domain {:?}",
                    attempt.username, attempt.tenant, attempt.domain
                )));
            }
        }

        Ok(())
    }
}

impl CredentialProvider for StaticCredentialProvider {
    fn lookup(&self, username: &str) -> Option<Credentials> {
        self.accounts.get(username).cloned()
    }
}

/// Bootstraps an account session and hands out the store bound to it.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, credentials: &Credentials) -> Result<Arc<dyn ObjectStore>>;
}

#[cfg(test)]
mod tests {
    use super::{AuthMethod, Credentials, StaticCredentialProvider};

    fn attempt(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
            endpoint: "http://localhost:8080".to_string(),
            tenant: None,
            domain: None,
            auth_method: AuthMethod::Basic,
        }
    }

    #[test]
    fn basic_login_checks_password() {
        let provider = StaticCredentialProvider::new("alice", "secret");
        assert!(provider.authenticate(&attempt("alice", "secret")).is_ok());
        assert!(provider.authenticate(&attempt("alice", "wrong")).is_err());
        assert!(provider.authenticate(&attempt("bob", "secret")).is_err());
    }

    #[test]
    fn keystone_login_requires_matching_scope() {
        let account = Credentials {
            tenant: Some("analytics".to_string()),
            domain: Some("default".to_string()),
            auth_method: AuthMethod::Keystone,
            ..attempt("alice", "secret")
        };
        let provider = StaticCredentialProvider::default().with_account(account.clone());

        assert!(provider.authenticate(&account).is_ok());

        let wrong_tenant = Credentials {
            tenant: Some("billing".to_string()),
            ..account.clone()
        };
        assert!(provider.authenticate(&wrong_tenant).is_err());
    }

    #[test]
    fn auth_method_parses_case_insensitively() {
        assert_eq!("Keystone".parse::<AuthMethod>().ok(), Some(AuthMethod::Keystone));
        assert_eq!("basic".parse::<AuthMethod>().ok(), Some(AuthMethod::Basic));
        assert!("token".parse::<AuthMethod>().is_err());
    }
}
