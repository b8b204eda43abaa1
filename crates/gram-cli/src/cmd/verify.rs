use super::Context;
use crate::output::{CliError, render};
use anyhow::Result;
use gram_core::ErrorCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct VerifyOutput {
    ok: bool,
    violations: Vec<String>,
}

/// Check every initiative's counters against the rows they summarize.
///
/// # Errors
///
/// Returns an error when any counter disagrees with its rows.
pub fn run_verify(ctx: &Context) -> Result<()> {
    let store = ctx.open_store()?;
    let violations = store
        .verify_invariants()
        .map_err(|err| ctx.fail(&CliError::from(&err)))?;

    let report = VerifyOutput {
        ok: violations.is_empty(),
        violations: violations.iter().map(ToString::to_string).collect(),
    };
    render(ctx.output, &report, |r, w| {
        for violation in &r.violations {
            writeln!(w, "FAIL {violation}")?;
        }
        if r.ok {
            writeln!(w, "verify: success")
        } else {
            writeln!(w, "verify: failed")
        }
    })?;

    if report.ok {
        Ok(())
    } else {
        Err(ctx.fail(&CliError::with_code(
            format!("{} counter violation(s) found", report.violations.len()),
            ErrorCode::InvariantViolation,
        )))
    }
}
