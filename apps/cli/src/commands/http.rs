//! `settle http`: poll an endpoint until status and body match

use anyhow::{Context, Result};
use reqwest::Client;
use settle_poll::check::{check_contains, check_eq};
use settle_poll::{AsyncPoller, Mismatch};
use tokio::time::Instant;
use tracing::debug;

use super::Summary;
use crate::cli::HttpArgs;
use crate::config::AppConfig;

/// What a response must look like to count as ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expectation {
    pub status: u16,
    pub contains: Option<String>,
}

/// HTTP client with the configured per-request timeout
pub fn client(config: &AppConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.http.request_timeout)
        .user_agent(concat!("settle/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// One GET against `url`, checked against `expect`
pub async fn check_once(client: &Client, url: &str, expect: &Expectation) -> Result<(), Mismatch> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Mismatch::new(format!("GET {url} failed: {e}")))?;

    let status = response.status().as_u16();
    debug!(url, status, "Response received");
    check_eq(&status, &expect.status, format_args!("GET {url} status"))?;

    if let Some(needle) = &expect.contains {
        let body = response
            .text()
            .await
            .map_err(|e| Mismatch::new(format!("GET {url} body could not be read: {e}")))?;
        check_contains(&body, needle, format_args!("GET {url} body"))?;
    }

    Ok(())
}

pub async fn run(args: HttpArgs, config: &AppConfig) -> Result<Summary> {
    let policy = config
        .poll
        .policy(args.poll.interval, args.poll.timeout)
        .context("invalid poll policy")?;
    let client = client(config)?;
    let expect = Expectation {
        status: args.status,
        contains: args.contains,
    };
    let url = args.url;

    let started = Instant::now();
    let mut attempts = 0u64;
    let result = AsyncPoller::new(policy)
        .named(format!("http {url}"))
        .run(|| {
            attempts += 1;
            check_once(&client, &url, &expect)
        })
        .await;

    Ok(match result {
        Ok(()) => Summary::satisfied("http", attempts, started.elapsed(), format!("GET {url} is ready")),
        Err(err) => Summary::unsatisfied("http", err.attempts().into(), err.elapsed(), err.to_string()),
    })
}
