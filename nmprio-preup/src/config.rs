//! Resolver policy file of the pre-up patcher.

use serde::Deserialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use nmprio::DnsPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/nmprio/preup.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid address {value:?} in {field}")]
    Address { field: &'static str, value: String },
}

/// On-disk layout; addresses are kept as text until [`PreupConfig::policy`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreupConfig {
    pub prefixes: Vec<String>,
    pub priv_ipv6: Vec<String>,
    pub priv_ipv4: Vec<String>,
    pub pub_ipv6: Vec<String>,
    pub pub_ipv4: Vec<String>,
    pub ipv6_token: Option<String>,
}

impl PreupConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Validates every address and builds the policy applied to profiles.
    pub fn policy(&self) -> Result<DnsPolicy, ConfigError> {
        Ok(DnsPolicy {
            prefixes: self.prefixes.clone(),
            private_ipv6: parse_all::<Ipv6Addr>("priv_ipv6", &self.priv_ipv6)?,
            private_ipv4: parse_all::<Ipv4Addr>("priv_ipv4", &self.priv_ipv4)?,
            public_ipv6: parse_all::<Ipv6Addr>("pub_ipv6", &self.pub_ipv6)?,
            public_ipv4: parse_all::<Ipv4Addr>("pub_ipv4", &self.pub_ipv4)?,
            ipv6_token: self.ipv6_token.clone().filter(|t| !t.trim().is_empty()),
        })
    }
}

fn parse_all<T: FromStr>(field: &'static str, values: &[String]) -> Result<Vec<T>, ConfigError> {
    values
        .iter()
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::Address {
                field,
                value: v.clone(),
            })
        })
        .collect()
}
