//! `settle probe`: measure availability of an endpoint over a period

use anyhow::{Context, Result};
use reqwest::Client;
use settle_poll::{AvailabilityProbe, ProbeOutcome, ProbeStats};
use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::info;

use super::Summary;
use crate::cli::ProbeArgs;
use crate::config::AppConfig;

/// One GET against `url`, classified
pub async fn probe_once(client: &Client, url: &str, status: u16) -> ProbeOutcome {
    match client.get(url).send().await {
        Ok(response) if response.status().as_u16() == status => ProbeOutcome::Ok,
        Ok(_) => ProbeOutcome::Fail,
        Err(err) => classify(&err),
    }
}

/// Failure classes reported in the outcome table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestFailure {
    Timeout,
    Connect,
    Request,
}

impl From<&reqwest::Error> for RequestFailure {
    fn from(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else {
            Self::Request
        }
    }
}

fn classify(err: &reqwest::Error) -> ProbeOutcome {
    ProbeOutcome::from_error(&RequestFailure::from(err))
}

/// Render outcome counts one per line, followed by the ratio
pub fn render(stats: &ProbeStats) -> String {
    let mut lines: Vec<String> = stats
        .iter()
        .map(|(outcome, count)| format!("{:<12} {count}", outcome.to_string()))
        .collect();
    lines.push(format!("success ratio {}%", stats.success_ratio_percent()));
    lines.join("\n")
}

pub async fn run(args: ProbeArgs, config: &AppConfig) -> Result<Summary> {
    let rate = args.rate.unwrap_or(config.probe.rate);
    let client = super::http::client(config)?;
    let handle = Handle::current();
    let url = args.url.clone();
    let status = args.status;

    let running = AvailabilityProbe::new(rate, move || handle.block_on(probe_once(&client, &url, status)))
        .context("invalid probe rate")?
        .start()
        .context("failed to start availability probe")?;

    let started = Instant::now();
    tokio::time::sleep(args.duration).await;
    let stats = tokio::task::spawn_blocking(move || running.stop())
        .await
        .context("availability probe did not shut down")?;
    let elapsed = started.elapsed();

    let ratio = stats.success_ratio_percent();
    info!(url = %args.url, total = stats.total(), ratio, "Probe finished");

    let table = render(&stats);
    Ok(if ratio >= args.min_success {
        Summary::satisfied("probe", stats.total(), elapsed, table)
    } else {
        let message = format!("{table}\nrequired at least {}%", args.min_success);
        Summary::unsatisfied("probe", stats.total(), elapsed, message)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn render_lists_counts_then_ratio() {
        let stats: ProbeStats = [
            ProbeOutcome::Ok,
            ProbeOutcome::Ok,
            ProbeOutcome::Ok,
            ProbeOutcome::Failure("Connect".into()),
        ]
        .into_iter()
        .collect();
        assert_eq!(render(&stats), "OK           3\nConnect      1\nsuccess ratio 75%");
    }

    #[test]
    fn failure_classes_name_their_outcome() {
        for (failure, kind) in [
            (RequestFailure::Timeout, "Timeout"),
            (RequestFailure::Connect, "Connect"),
            (RequestFailure::Request, "Request"),
        ] {
            assert_eq!(ProbeOutcome::from_error(&failure), ProbeOutcome::Failure(kind.into()));
        }
    }

    #[tokio::test]
    async fn unexpected_status_is_a_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = Client::new();
        assert_eq!(probe_once(&client, &server.uri(), 200).await, ProbeOutcome::Fail);
        assert_eq!(probe_once(&client, &server.uri(), 500).await, ProbeOutcome::Ok);
    }

    #[tokio::test]
    async fn refused_connection_is_classified() {
        // bind then drop to get a port with nothing listening
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let outcome = probe_once(&Client::new(), &format!("http://127.0.0.1:{port}/"), 200).await;
        assert_eq!(outcome, ProbeOutcome::Failure("Connect".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn healthy_endpoint_meets_minimum() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let args = ProbeArgs {
            url: server.uri(),
            duration: Duration::from_millis(300),
            rate: Some(20),
            status: 200,
            min_success: 100,
        };
        let summary = run(args, &AppConfig::default()).await.unwrap();
        assert!(summary.satisfied, "{}", summary.message);
        assert!(summary.attempts >= 1);
    }
}
