use serde::{Deserialize, Serialize};
use std::env;

use crate::errors::{LoanError, Result};
use crate::types::CurrencyCode;

pub const ALLOWED_CURRENCIES_VAR: &str = "LOAN_ALLOWED_CURRENCIES";
pub const MAX_TERMS_VAR: &str = "LOAN_MAX_TERMS";

/// default upper bound on installments, thirty years of monthly payments
pub const DEFAULT_MAX_TERMS: u32 = 360;

/// loan service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanServiceConfig {
    /// currencies loans may be issued in; empty accepts any well-formed code
    pub allowed_currencies: Vec<CurrencyCode>,
    pub max_terms: u32,
}

impl Default for LoanServiceConfig {
    fn default() -> Self {
        Self {
            allowed_currencies: vec![CurrencyCode::sgd(), CurrencyCode::thb(), CurrencyCode::vnd()],
            max_terms: DEFAULT_MAX_TERMS,
        }
    }
}

impl LoanServiceConfig {
    /// configuration accepting any currency
    pub fn any_currency() -> Self {
        Self {
            allowed_currencies: Vec::new(),
            ..Self::default()
        }
    }

    /// parse from json; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| LoanError::InvalidConfiguration {
            message: format!("malformed config json: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// read overrides from `LOAN_ALLOWED_CURRENCIES` (comma separated) and `LOAN_MAX_TERMS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ALLOWED_CURRENCIES_VAR) {
            config.allowed_currencies = raw
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(|code| {
                    CurrencyCode::new(code).map_err(|_| LoanError::InvalidConfiguration {
                        message: format!("{} contains invalid currency {:?}", ALLOWED_CURRENCIES_VAR, code),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
        }

        if let Some(raw) = lookup(MAX_TERMS_VAR) {
            config.max_terms = raw.trim().parse().map_err(|_| LoanError::InvalidConfiguration {
                message: format!("{} must be a positive integer, got {:?}", MAX_TERMS_VAR, raw),
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_terms == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "max_terms must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn accepts_currency(&self, currency: &CurrencyCode) -> bool {
        self.allowed_currencies.is_empty() || self.allowed_currencies.contains(currency)
    }
}
