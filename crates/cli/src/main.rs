mod walkthrough;

use anyhow::Context;

use rollcall_core::SystemClock;
use rollcall_infra::LedgerConfig;
use rollcall_observability::ObservabilityConfig;

fn main() -> anyhow::Result<()> {
    let obs = ObservabilityConfig::from_env().context("invalid logging configuration")?;
    rollcall_observability::init(&obs);

    let config = LedgerConfig::from_env().context("invalid ledger configuration")?;
    tracing::info!(withdrawal_policy = ?config.withdrawal_policy, "starting walkthrough");

    let summary = walkthrough::run(config, &SystemClock)?;
    tracing::info!(
        events = summary.events,
        paid_out = %summary.paid_out,
        still_held = %summary.still_held,
        "walkthrough finished"
    );
    Ok(())
}
