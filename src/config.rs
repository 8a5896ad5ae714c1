//! Engine configuration, read from TOML with environment overrides.

use crate::error::{Result, SettlementError};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    pub gateway: GatewayConfig,
}

/// VNPay merchant settings.
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// Payment page the customer is redirected to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Merchant terminal code issued by the gateway.
    pub tmn_code: String,
    /// Shared secret for request and callback signatures.
    pub hash_secret: String,
    #[serde(default = "default_return_url")]
    pub return_url: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_order_type")]
    pub order_type: String,
    /// Minutes before an unpaid order expires on the gateway side.
    #[serde(default = "default_expire_minutes")]
    pub expire_minutes: i64,
    /// Offset of the gateway's local clock, used for `vnp_CreateDate`.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

fn default_base_url() -> String {
    "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string()
}

fn default_return_url() -> String {
    "http://localhost:8080/payments/return".to_string()
}

fn default_version() -> String {
    "2.1.0".to_string()
}

fn default_command() -> String {
    "pay".to_string()
}

fn default_currency() -> String {
    "VND".to_string()
}

fn default_locale() -> String {
    "vn".to_string()
}

fn default_order_type() -> String {
    "other".to_string()
}

fn default_expire_minutes() -> i64 {
    15
}

fn default_utc_offset_hours() -> i32 {
    7
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("tmn_code", &self.tmn_code)
            .field("hash_secret", &"<redacted>")
            .field("return_url", &self.return_url)
            .field("version", &self.version)
            .field("command", &self.command)
            .field("currency", &self.currency)
            .field("locale", &self.locale)
            .field("order_type", &self.order_type)
            .field("expire_minutes", &self.expire_minutes)
            .field("utc_offset_hours", &self.utc_offset_hours)
            .finish()
    }
}

impl GatewayConfig {
    /// Minimal settings for the given merchant; everything else defaulted.
    pub fn new(tmn_code: impl Into<String>, hash_secret: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            tmn_code: tmn_code.into(),
            hash_secret: hash_secret.into(),
            return_url: default_return_url(),
            version: default_version(),
            command: default_command(),
            currency: default_currency(),
            locale: default_locale(),
            order_type: default_order_type(),
            expire_minutes: default_expire_minutes(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tmn_code.trim().is_empty() {
            return Err(SettlementError::Config("gateway.tmn_code is blank".into()));
        }
        if self.hash_secret.trim().is_empty() {
            return Err(SettlementError::Config("gateway.hash_secret is blank".into()));
        }
        if self.base_url.trim().is_empty() {
            return Err(SettlementError::Config("gateway.base_url is blank".into()));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(SettlementError::Config(format!(
                "gateway.utc_offset_hours out of range: {}",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }
}

impl SettlementConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| SettlementError::Config(e.to_string()))
    }

    /// Reads a TOML file, applies `EVRENT_*` environment overrides and validates.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&source)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.gateway.validate()?;
        Ok(config)
    }

    /// Applies overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let gateway = &mut self.gateway;
        let fields: [(&str, &mut String); 4] = [
            ("EVRENT_VNP_TMN_CODE", &mut gateway.tmn_code),
            ("EVRENT_VNP_HASH_SECRET", &mut gateway.hash_secret),
            ("EVRENT_VNP_BASE_URL", &mut gateway.base_url),
            ("EVRENT_VNP_RETURN_URL", &mut gateway.return_url),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }
    }
}
