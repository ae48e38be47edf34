//! `settle exec`: poll a command until it exits successfully

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use humantime_serde::re::humantime::format_duration;
use settle_poll::{AsyncPoller, Mismatch};
use tokio::process::Command;
use tokio::time::Instant;
use tracing::debug;

use super::Summary;
use crate::cli::ExecArgs;
use crate::config::AppConfig;

/// Time one attempt may run: what is left of the poll budget, capped at
/// `attempt_timeout`. An attempt that starts with no budget left still gets
/// the full `attempt_timeout`.
pub fn attempt_limit(budget: Duration, elapsed: Duration, attempt_timeout: Duration) -> Duration {
    let remaining = budget.saturating_sub(elapsed);
    if remaining.is_zero() {
        attempt_timeout
    } else {
        remaining.min(attempt_timeout)
    }
}

/// Run `program` once, killing it after `limit`; a non-zero exit becomes a
/// mismatch carrying the exit status and trimmed stderr
pub async fn run_once(program: &str, args: &[String], limit: Duration) -> Result<(), Mismatch> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).kill_on_drop(true);

    let output = tokio::time::timeout(limit, command.output())
        .await
        .map_err(|_| {
            Mismatch::new(format!(
                "`{program}` did not finish within {}",
                format_duration(Duration::from_millis(limit.as_millis() as u64))
            ))
        })?
        .map_err(|e| Mismatch::new(format!("`{program}` could not be started: {e}")))?;

    debug!(program, status = %output.status, "Command finished");
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(Mismatch::new(format!("`{program}` failed ({})", output.status)))
    } else {
        Err(Mismatch::new(format!(
            "`{program}` failed ({}): {stderr}",
            output.status
        )))
    }
}

pub async fn run(args: ExecArgs, config: &AppConfig) -> Result<Summary> {
    let policy = config
        .poll
        .policy(args.poll.interval, args.poll.timeout)
        .context("invalid poll policy")?;
    let Some((program, rest)) = args.command.split_first() else {
        bail!("no command given");
    };

    let budget = policy.timeout();
    let attempt_timeout = args.attempt_timeout.unwrap_or(config.exec.attempt_timeout);
    if attempt_timeout.is_zero() {
        bail!("--attempt-timeout must be greater than zero");
    }

    let started = Instant::now();
    let mut attempts = 0u64;
    let result = AsyncPoller::new(policy)
        .named(format!("exec {program}"))
        .run(|| {
            attempts += 1;
            let limit = attempt_limit(budget, started.elapsed(), attempt_timeout);
            run_once(program, rest, limit)
        })
        .await;

    Ok(match result {
        Ok(()) => Summary::satisfied("exec", attempts, started.elapsed(), format!("`{program}` succeeded")),
        Err(err) => Summary::unsatisfied("exec", err.attempts().into(), err.elapsed(), err.to_string()),
    })
}
