//! Period resolution shared by the `fetch` and `period` commands.

use clientpulse_core::{
    current_period, current_period_today, format_period_label, previous_period, DateRange,
};

use crate::PeriodArgs;

/// Resolves the `(current, previous)` ranges described by the CLI flags.
///
/// # Errors
///
/// Returns an error if an explicit `--start`/`--end` pair is out of order.
pub(crate) fn resolve(args: &PeriodArgs) -> anyhow::Result<(DateRange, DateRange)> {
    let current = match (args.start, args.end) {
        (Some(start), Some(end)) => DateRange::new(start, end)?,
        _ => match args.reference {
            Some(reference) => current_period(args.granularity, reference),
            None => current_period_today(args.granularity),
        },
    };
    Ok((current, previous_period(&current)))
}

pub(crate) fn run_period(args: &PeriodArgs) -> anyhow::Result<()> {
    let (current, previous) = resolve(args)?;
    let out = serde_json::json!({
        "current": current,
        "previous": previous,
        "label": format_period_label(&current),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
