use bucketfs_common::error::{FsError, Result};
use bucketfs_storage::credentials::{AuthMethod, Credentials};
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_BLOCK_SIZE: u64 = 32 * 1024 * 1024;
pub const DEFAULT_LIST_PAGE_SIZE: usize = 1000;
pub const DEFAULT_RENAME_BATCH_LIMIT: usize = 100;

pub const ENV_USERNAME: &str = "BUCKETFS_USERNAME";
pub const ENV_PASSWORD: &str = "BUCKETFS_PASSWORD";
pub const ENV_ENDPOINT: &str = "BUCKETFS_ENDPOINT";
pub const ENV_TENANT: &str = "BUCKETFS_TENANT";
pub const ENV_DOMAIN: &str = "BUCKETFS_DOMAIN";
pub const ENV_AUTH_METHOD: &str = "BUCKETFS_AUTH_METHOD";

#[derive(Clone, Serialize, Deserialize)]
pub struct FsConfig {
    pub username: String,
    pub password: String,
    pub endpoint: Url,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default = "default_block_size")]
    pub block_size: u64,
    #[serde(default = "default_list_page_size")]
    pub list_page_size: usize,
    #[serde(default = "default_rename_batch_limit")]
    pub rename_batch_limit: usize,
}

fn default_block_size() -> u64 {
    DEFAULT_BLOCK_SIZE
}

fn default_list_page_size() -> usize {
    DEFAULT_LIST_PAGE_SIZE
}

fn default_rename_batch_limit() -> usize {
    DEFAULT_RENAME_BATCH_LIMIT
}

impl FsConfig {
    pub fn new(username: impl Into<String>, password: impl Into<String>, endpoint: Url) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            endpoint,
            tenant: None,
            domain: None,
            auth_method: AuthMethod::Basic,
            block_size: DEFAULT_BLOCK_SIZE,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            rename_batch_limit: DEFAULT_RENAME_BATCH_LIMIT,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from `BUCKETFS_*` variables resolved through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let require =
            |name: &str| get(name).ok_or_else(|| FsError::InvalidConfig(format!("{name} is not set")));

        let endpoint = require(ENV_ENDPOINT)?;
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| FsError::InvalidConfig(format!("{ENV_ENDPOINT}: {err}")))?;

        let mut config = Self::new(require(ENV_USERNAME)?, require(ENV_PASSWORD)?, endpoint);
        config.tenant = get(ENV_TENANT);
        config.domain = get(ENV_DOMAIN);
        if let Some(method) = get(ENV_AUTH_METHOD) {
            config.auth_method = method.parse()?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(body: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(body)
            .map_err(|err| FsError::InvalidConfig(format!("invalid config json: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(FsError::InvalidConfig("username must not be empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(FsError::InvalidConfig("password must not be empty".to_string()));
        }
        if self.auth_method == AuthMethod::Keystone
            && (self.tenant.is_none() || self.domain.is_none())
        {
            return Err(FsError::InvalidConfig(
                "keystone authentication requires tenant and domain".to_string(),
            ));
        }
        if self.block_size == 0 {
            return Err(FsError::InvalidConfig(
                "block_size must be greater than zero".to_string(),
            ));
        }
        if self.list_page_size == 0 {
            return Err(FsError::InvalidConfig(
                "list_page_size must be greater than zero".to_string(),
            ));
        }
        if self.rename_batch_limit == 0 {
            return Err(FsError::InvalidConfig(
                "rename_batch_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
            endpoint: self.endpoint.to_string(),
            tenant: self.tenant.clone(),
            domain: self.domain.clone(),
            auth_method: self.auth_method,
        }
    }
}

impl std::fmt::Debug for FsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .field("tenant", &self.tenant)
            .field("domain", &self.domain)
            .field("auth_method", &self.auth_method)
            .field("block_size", &self.block_size)
            .field("list_page_size", &self.list_page_size)
            .field("rename_batch_limit", &self.rename_batch_limit)
            .finish()
    }
}
