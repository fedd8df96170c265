use std::path::Path;
use std::time::Duration;

use dpp_crypto::{DynamicHashScheme, HashEngine, SigningKey};
use dpp_ledger::ConfirmationPolicy;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Environment variable that overrides `ledger.signing_key`.
pub const SIGNING_KEY_ENV: &str = "DPP_SIGNING_KEY";

/// JSON-RPC endpoint of a locally running anchoring gateway.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8600/rpc";

/// Anchoring configuration, loaded from TOML.
///
/// ```toml
/// [ledger]
/// endpoint = "http://127.0.0.1:8600/rpc"
/// contract = "0x…40 hex…"
/// signing_key = "…64 hex…"
/// poll_interval_ms = 500
/// confirmation_timeout_ms = 60000
/// request_timeout_ms = 10000
///
/// [hashing]
/// dynamic_scheme = "without-timestamp"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnchorConfig {
    pub ledger: LedgerConfig,
    pub hashing: HashingConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub endpoint: String,
    pub contract: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
    pub poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            contract: String::new(),
            signing_key: None,
            poll_interval_ms: 500,
            confirmation_timeout_ms: 60_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("endpoint", &self.endpoint)
            .field("contract", &self.contract)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "[REDACTED]"))
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("confirmation_timeout_ms", &self.confirmation_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    pub dynamic_scheme: DynamicHashScheme,
}

impl AnchorConfig {
    /// Read and validate a TOML file, then apply the environment override.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))?;
        config.with_env().validated()
    }

    pub fn from_toml(text: &str) -> SdkResult<Self> {
        toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// Apply [`SIGNING_KEY_ENV`] from the process environment.
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps variable names to values.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(SIGNING_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.ledger.signing_key = Some(key);
        }
        self
    }

    pub fn validated(self) -> SdkResult<Self> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> SdkResult<()> {
        let ledger = &self.ledger;
        if !(ledger.endpoint.starts_with("http://") || ledger.endpoint.starts_with("https://")) {
            return Err(SdkError::Config(format!(
                "ledger.endpoint must be an http(s) URL, got {:?}",
                ledger.endpoint
            )));
        }
        if !ledger.contract.is_empty() && !is_contract_address(&ledger.contract) {
            return Err(SdkError::Config(format!(
                "ledger.contract must be 0x followed by 40 hex digits, got {:?}",
                ledger.contract
            )));
        }
        if ledger.poll_interval_ms == 0
            || ledger.confirmation_timeout_ms == 0
            || ledger.request_timeout_ms == 0
        {
            return Err(SdkError::Config("ledger timeouts must be non-zero".into()));
        }
        if ledger.poll_interval_ms > ledger.confirmation_timeout_ms {
            return Err(SdkError::Config(
                "ledger.poll_interval_ms exceeds ledger.confirmation_timeout_ms".into(),
            ));
        }
        Ok(())
    }

    /// Address of the anchoring contract. There is no default; connecting
    /// without one is a configuration error.
    pub fn contract(&self) -> SdkResult<&str> {
        if self.ledger.contract.is_empty() {
            return Err(SdkError::Config("ledger.contract is not set".into()));
        }
        Ok(&self.ledger.contract)
    }

    /// The configured signing key. Required for writes only.
    pub fn signing_key(&self) -> SdkResult<SigningKey> {
        let hex = self.ledger.signing_key.as_deref().ok_or_else(|| {
            SdkError::Config(format!(
                "no signing key: set ledger.signing_key or {SIGNING_KEY_ENV}"
            ))
        })?;
        SigningKey::from_hex(hex.trim())
            .map_err(|e| SdkError::Config(format!("ledger.signing_key: {e}")))
    }

    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            poll_interval: Duration::from_millis(self.ledger.poll_interval_ms),
            timeout: Duration::from_millis(self.ledger.confirmation_timeout_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.ledger.request_timeout_ms)
    }

    pub fn hash_engine(&self) -> HashEngine {
        HashEngine::new(self.hashing.dynamic_scheme)
    }
}

fn is_contract_address(s: &str) -> bool {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .is_some_and(|h| h.len() == 40 && h.bytes().all(|b| b.is_ascii_hexdigit()))
}
