//! `transports` command: show transport candidates and probe results.

use boundfetch::config::ConfigFile;
use boundfetch::transport::CandidateStatus;
use console::style;
use tokio::runtime::Runtime;

use crate::error::CliError;

/// Probe every configured transport from inside the runtime and print the
/// results in priority order.
pub fn run(runtime: &Runtime, config: &ConfigFile) -> Result<(), CliError> {
    let transport = &config.dispatcher.transport;
    let candidates = runtime.block_on(async { transport.build_selector().describe() });

    println!("Transports (priority order):");
    for line in render(&candidates) {
        println!("  {}", line);
    }
    println!();
    println!("  Timeout:    {}s", transport.timeout.as_secs());
    println!("  User-Agent: {}", transport.user_agent);

    if candidates.iter().any(|c| c.available) {
        Ok(())
    } else {
        Err(CliError::Dispatch(boundfetch::DispatchError::NoTransport {
            tried: candidates.into_iter().map(|c| c.name).collect(),
        }))
    }
}

/// One line per candidate; the first available one is marked as selected.
fn render(candidates: &[CandidateStatus]) -> Vec<String> {
    let selected = candidates.iter().position(|c| c.available);
    candidates
        .iter()
        .enumerate()
        .map(|(i, candidate)| {
            let state = if candidate.available {
                style("available").green()
            } else {
                style("unavailable").red()
            };
            let marker = if Some(i) == selected { " (selected)" } else { "" };
            format!("{}. {:<8} {}{}", i + 1, candidate.name, state, marker)
        })
        .collect()
}
