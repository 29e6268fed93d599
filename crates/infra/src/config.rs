//! Ledger service configuration.

use serde::{Deserialize, Serialize};

use rollcall_core::{DomainError, DomainResult};
use rollcall_ledger::WithdrawalPolicy;

pub const WITHDRAWALS_VAR: &str = "ROLLCALL_WITHDRAWALS";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub withdrawal_policy: WithdrawalPolicy,
}

impl LedgerConfig {
    /// Read configuration from the process environment.
    ///
    /// `ROLLCALL_WITHDRAWALS`: `forfeit` (default) or `disabled`.
    pub fn from_env() -> DomainResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DomainResult<Self> {
        let withdrawal_policy = match lookup(WITHDRAWALS_VAR) {
            Some(raw) => parse_withdrawal_policy(&raw)?,
            None => WithdrawalPolicy::default(),
        };
        Ok(Self { withdrawal_policy })
    }
}

fn parse_withdrawal_policy(raw: &str) -> DomainResult<WithdrawalPolicy> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "forfeit" | "forfeit_to_organizer" => Ok(WithdrawalPolicy::ForfeitToOrganizer),
        "disabled" | "off" => Ok(WithdrawalPolicy::Disabled),
        other => Err(DomainError::validation(format!(
            "{WITHDRAWALS_VAR} must be `forfeit` or `disabled`, got `{other}`"
        ))),
    }
}
