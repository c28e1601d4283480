//! `get` command: fetch URLs through the dispatcher.

use std::time::Duration;

use boundfetch::config::ConfigFile;
use boundfetch::{Dispatcher, ResponseOutcome};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::error::CliError;

const PROGRESS_TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}";

/// Arguments for `boundfetch get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// URLs to fetch, admitted in the order given
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Maximum requests in flight (overrides the config file)
    #[arg(short = 'c', long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Pretty-print JSON bodies
    #[arg(long)]
    pub pretty: bool,
}

/// Submit every URL, print each outcome as it completes and fail if any
/// request failed.
pub fn run(runtime: &Runtime, config: &ConfigFile, args: GetArgs) -> Result<(), CliError> {
    let GetArgs {
        urls,
        concurrency,
        pretty,
    } = args;
    let mut dispatcher_config = config.dispatcher.clone();
    if let Some(concurrency) = concurrency {
        dispatcher_config = dispatcher_config.with_max_concurrency(concurrency);
    }
    let total = urls.len();

    runtime.block_on(async {
        let dispatcher = Dispatcher::from_config(&dispatcher_config)?;
        let (tx, mut rx) = mpsc::unbounded_channel();

        for url in urls {
            let tx = tx.clone();
            dispatcher.submit(url, move |outcome| {
                let _ = tx.send(outcome);
            })?;
        }
        drop(tx);

        let progress = progress_bar(total as u64);
        let mut failed = 0;
        while let Some(outcome) = rx.recv().await {
            if !outcome.is_success() {
                failed += 1;
            }
            progress.suspend(|| println!("{}", render(&outcome, pretty)));
            progress.set_message(format!("{} in flight", dispatcher.in_flight()));
            progress.inc(1);
        }
        progress.finish_and_clear();

        eprintln!("{}", style(dispatcher.metrics()).dim());
        if failed > 0 {
            Err(CliError::RequestsFailed { failed, total })
        } else {
            Ok(())
        }
    })
}

fn progress_bar(len: u64) -> ProgressBar {
    let progress = ProgressBar::new(len);
    if let Ok(progress_style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        progress.set_style(progress_style.progress_chars("=> "));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Header line plus body (or error) for one outcome.
fn render(outcome: &ResponseOutcome, pretty: bool) -> String {
    let status = outcome
        .status()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "---".to_string());

    match &outcome.result {
        Ok(body) => {
            let ttl = outcome
                .ttl
                .map(|t| format!("ttl {}s", t))
                .unwrap_or_else(|| "no ttl".to_string());
            let body = if pretty {
                serde_json::to_string_pretty(body)
            } else {
                serde_json::to_string(body)
            }
            .unwrap_or_else(|e| format!("<unprintable body: {}>", e));
            format!(
                "{} {} {} ({})\n{}",
                style("OK").green().bold(),
                status,
                outcome.url,
                style(ttl).dim(),
                body
            )
        }
        Err(e) => format!(
            "{} {} {}\n{}",
            style("FAIL").red().bold(),
            status,
            outcome.url,
            style(e).red()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boundfetch::transport::{HeaderMap, ResponseMetadata, TransportOutcome};
    use boundfetch::FetchError;
    use serde_json::json;

    fn success(ttl_header: Option<&'static str>) -> ResponseOutcome {
        let mut headers = HeaderMap::new();
        if let Some(value) = ttl_header {
            headers.insert("cache-control", value.parse().unwrap());
        }
        ResponseOutcome::from_transport(
            "http://x/api".to_string(),
            TransportOutcome::success(json!({"a": 1}), ResponseMetadata::new(200, headers)),
        )
    }

    #[test]
    fn test_render_success_with_ttl() {
        console::set_colors_enabled(false);
        let text = render(&success(Some("max-age=60")), false);
        assert_eq!(text, "OK 200 http://x/api (ttl 60s)\n{\"a\":1}");
    }

    #[test]
    fn test_render_pretty_body() {
        console::set_colors_enabled(false);
        let text = render(&success(None), true);
        assert!(text.contains("(no ttl)"));
        assert!(text.ends_with("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn test_render_failure() {
        console::set_colors_enabled(false);
        let outcome = ResponseOutcome::failed(
            "http://x/api".to_string(),
            FetchError::Transport {
                url: "http://x/api".to_string(),
                reason: "connection failed".to_string(),
            },
        );
        let text = render(&outcome, false);
        assert!(text.starts_with("FAIL --- http://x/api\n"));
        assert!(text.contains("connection failed"));
    }
}
