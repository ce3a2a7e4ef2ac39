//! Configuration for the policy engine connection and identifier namespacing
//!
//! Configuration is an explicit struct handed to every guard at construction.
//! Guards never read the process environment themselves; `merge_with_env` is
//! the only place environment variables are consulted, and tests use
//! `merge_with_vars` to supply fixtures instead.

use crate::{GatehouseError, GatehouseResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "GATEHOUSE_";

/// Core trait for Gatehouse configuration types
pub trait GatehouseConfig: Clone + Default + Send + Sync + 'static {
    /// Load configuration from a TOML or JSON file
    fn load_from_file(path: &Path) -> GatehouseResult<Self>;

    /// Merge with process environment variables
    fn merge_with_env(&mut self) -> GatehouseResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with an explicit set of `GATEHOUSE_*` variables
    fn merge_with_vars<I>(&mut self, vars: I) -> GatehouseResult<()>
    where
        I: IntoIterator<Item = (String, String)>;

    /// Merge non-default values from another configuration
    fn merge_with(&mut self, other: &Self) -> GatehouseResult<()>;

    /// Validate the configuration
    fn validate(&self) -> GatehouseResult<()>;
}

/// Connection and namespacing settings for the remote policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyEngineConfig {
    /// Base URL of the policy engine admin API
    pub admin_url: String,
    /// Root organization identifier every subject/action/resource is namespaced by
    pub root_org_identifier: String,
    /// Prefix for namespaced action identifiers
    pub action_prefix: String,
    /// Prefix for namespaced subject identifiers
    pub subject_prefix: String,
    /// Prefix for namespaced resource identifiers
    pub resource_prefix: String,
    /// Path under `admin_url` where the access control policy engine is mounted
    pub acp_path: String,
    /// Flavor holding the per-user policy records
    pub policy_flavor: String,
    /// Description written onto synchronized policy records
    pub policy_description: String,
    /// HTTP request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for PolicyEngineConfig {
    fn default() -> Self {
        Self {
            admin_url: "http://127.0.0.1:4456".to_string(),
            root_org_identifier: "root".to_string(),
            action_prefix: "actions".to_string(),
            subject_prefix: "subjects".to_string(),
            resource_prefix: "resources".to_string(),
            acp_path: "/engines/acp".to_string(),
            policy_flavor: "exact".to_string(),
            policy_description: "This policy provides access control for the users service"
                .to_string(),
            timeout_ms: 5_000,
        }
    }
}

impl PolicyEngineConfig {
    /// Configuration pointing at `admin_url` with every other value defaulted
    pub fn for_admin_url(admin_url: impl Into<String>) -> Self {
        Self {
            admin_url: admin_url.into(),
            ..Self::default()
        }
    }

    /// Set the root organization identifier
    pub fn with_root_org(mut self, root_org_identifier: impl Into<String>) -> Self {
        self.root_org_identifier = root_org_identifier.into();
        self
    }

    fn namespaced(&self, prefix: &str, value: &str) -> String {
        format!("{prefix}:{}:{value}", self.root_org_identifier)
    }

    /// `actions:{root}:{action}`
    pub fn namespaced_action(&self, action: &str) -> String {
        self.namespaced(&self.action_prefix, action)
    }

    /// `subjects:{root}:{subject}`
    pub fn namespaced_subject(&self, subject: &str) -> String {
        self.namespaced(&self.subject_prefix, subject)
    }

    /// `resources:{root}:{resource}`
    pub fn namespaced_resource(&self, resource: &str) -> String {
        self.namespaced(&self.resource_prefix, resource)
    }

    fn acp_base(&self) -> String {
        let base = self.admin_url.trim_end_matches('/');
        let path = self.acp_path.trim_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }

    /// Decision endpoint for a flavor
    pub fn allowed_url(&self, flavor: &str) -> String {
        format!("{}/{flavor}/allowed", self.acp_base())
    }

    /// Policy collection endpoint. Single records live one escaped path
    /// segment below it.
    pub fn policies_url(&self) -> String {
        format!("{}/{}/policies", self.acp_base(), self.policy_flavor)
    }
}

fn parse_number(key: &str, value: &str) -> GatehouseResult<u64> {
    value
        .parse()
        .map_err(|_| GatehouseError::invalid(format!("Invalid number in {ENV_PREFIX}{key}")))
}

fn require_non_empty(field: &str, value: &str) -> GatehouseResult<()> {
    if value.trim().is_empty() {
        return Err(GatehouseError::invalid(format!(
            "Field '{field}' is required but missing"
        )));
    }
    Ok(())
}

impl GatehouseConfig for PolicyEngineConfig {
    fn load_from_file(path: &Path) -> GatehouseResult<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loading policy engine configuration");

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GatehouseError::invalid(format!("Invalid JSON: {e}"))),
            _ => Err(GatehouseError::invalid(format!(
                "Unsupported config file format: {}",
                path.display()
            ))),
        }
    }

    fn merge_with_vars<I>(&mut self, vars: I) -> GatehouseResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(key) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "ADMIN_URL" => self.admin_url = value,
                "ROOT_ORG_IDENTIFIER" => self.root_org_identifier = value,
                "ACTION_PREFIX" => self.action_prefix = value,
                "SUBJECT_PREFIX" => self.subject_prefix = value,
                "RESOURCE_PREFIX" => self.resource_prefix = value,
                "ACP_PATH" => self.acp_path = value,
                "POLICY_FLAVOR" => self.policy_flavor = value,
                "POLICY_DESCRIPTION" => self.policy_description = value,
                "TIMEOUT_MS" => self.timeout_ms = parse_number(key, &value)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn merge_with(&mut self, other: &Self) -> GatehouseResult<()> {
        let defaults = Self::default();
        if other.admin_url != defaults.admin_url {
            self.admin_url = other.admin_url.clone();
        }
        if other.root_org_identifier != defaults.root_org_identifier {
            self.root_org_identifier = other.root_org_identifier.clone();
        }
        if other.action_prefix != defaults.action_prefix {
            self.action_prefix = other.action_prefix.clone();
        }
        if other.subject_prefix != defaults.subject_prefix {
            self.subject_prefix = other.subject_prefix.clone();
        }
        if other.resource_prefix != defaults.resource_prefix {
            self.resource_prefix = other.resource_prefix.clone();
        }
        if other.acp_path != defaults.acp_path {
            self.acp_path = other.acp_path.clone();
        }
        if other.policy_flavor != defaults.policy_flavor {
            self.policy_flavor = other.policy_flavor.clone();
        }
        if other.policy_description != defaults.policy_description {
            self.policy_description = other.policy_description.clone();
        }
        if other.timeout_ms != defaults.timeout_ms {
            self.timeout_ms = other.timeout_ms;
        }
        Ok(())
    }

    fn validate(&self) -> GatehouseResult<()> {
        require_non_empty("admin_url", &self.admin_url)?;
        if !(self.admin_url.starts_with("http://") || self.admin_url.starts_with("https://")) {
            return Err(GatehouseError::invalid(format!(
                "Field 'admin_url' has invalid format. Expected: http(s) URL, got: {}",
                self.admin_url
            )));
        }
        require_non_empty("root_org_identifier", &self.root_org_identifier)?;
        require_non_empty("action_prefix", &self.action_prefix)?;
        require_non_empty("subject_prefix", &self.subject_prefix)?;
        require_non_empty("resource_prefix", &self.resource_prefix)?;
        require_non_empty("policy_flavor", &self.policy_flavor)?;
        if self.timeout_ms == 0 {
            return Err(GatehouseError::invalid(
                "Field 'timeout_ms' must be at least 1 (got 0)",
            ));
        }
        Ok(())
    }
}
