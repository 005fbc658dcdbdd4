mod cli;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{bail, eyre, WrapErr};

use kasq_core::rpc::{GetBlockDagInfo, GetCoinSupply, GetInfo, HttpConnector, NoParams};
use kasq_core::{ClientConfig, ConnectOutcome, CoreError, MultiClient, Params, SelectionPolicy};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_level(true)
        .init();

    let hosts = args.resolve_hosts();
    if hosts.is_empty() {
        bail!("no node hosts configured; pass --host or set at least KASPAD_HOST_1");
    }

    let connector = HttpConnector::new(
        args.rpc_user.as_deref(),
        args.rpc_pass.as_deref(),
        args.requests_per_second,
    )
    .context("configure RPC transport")?;

    let mut config = ClientConfig::default()
        .with_connect_timeout(Duration::from_secs(args.connect_timeout_secs))
        .with_request_timeout(Duration::from_secs(args.request_timeout_secs));
    if let Some(attempts) = args.max_attempts {
        config = config.with_max_attempts(attempts);
    }
    if args.round_robin {
        config = config.with_selection(SelectionPolicy::RoundRobin);
    }

    let client = MultiClient::new(hosts, Arc::new(connector), config)
        .context("configure node client")?;

    // Connect every node up front; partial connectivity is fine.
    let outcomes = match client.initialize_all().await {
        Ok(outcomes) => outcomes,
        Err(err) => {
            let message = format_connect_error(&err);
            return Err(eyre!(message).wrap_err("while connecting to node RPC endpoints"));
        }
    };

    let result = run_command(&client, args.command, &outcomes).await;
    client.shutdown().await;
    result
}

/// Dispatch one subcommand and print its result.
async fn run_command(
    client: &MultiClient,
    command: cli::Command,
    outcomes: &[ConnectOutcome],
) -> eyre::Result<()> {
    match command {
        cli::Command::Status => print_json(&outcomes),
        cli::Command::CoinSupply => {
            let supply = client.call::<GetCoinSupply>(&NoParams {}).await?;
            print_json(&supply)
        }
        cli::Command::Blockdag => {
            let info = client.call::<GetBlockDagInfo>(&NoParams {}).await?;
            print_json(&info)
        }
        cli::Command::Info => {
            let info = client.call::<GetInfo>(&NoParams {}).await?;
            print_json(&info)
        }
        cli::Command::Call { method, params } => {
            let payload = parse_params(params.as_deref())?;
            let response = client.request(&method, payload).await?;
            tracing::debug!(endpoint = %response.endpoint, "served");
            print_json(&response.payload)
        }
    }
}

fn print_json(value: &impl serde::Serialize) -> eyre::Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("render JSON output")?;
    println!("{rendered}");
    Ok(())
}

fn parse_params(raw: Option<&str>) -> eyre::Result<Params> {
    let Some(raw) = raw else {
        return Ok(Params::new());
    };
    match serde_json::from_str::<serde_json::Value>(raw).context("parse --params as JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(eyre!("--params must be a JSON object, got {other}")),
    }
}

/// Render a startup failure with one line per endpoint and a hint when every
/// endpoint failed the same recognisable way.
fn format_connect_error(err: &CoreError) -> String {
    let CoreError::NoReachableEndpoints { outcomes } = err else {
        return err.to_string();
    };

    let mut lines = vec!["could not connect to any configured node".to_owned()];
    for outcome in outcomes {
        if let Some(error) = &outcome.error {
            lines.push(format!("  {}: {error}", outcome.address));
        }
    }

    let errors: Vec<&str> = outcomes
        .iter()
        .filter_map(|outcome| outcome.error.as_deref())
        .collect();
    let all = |needle: &str| errors.iter().all(|e| e.contains(needle));

    if all("dns error") {
        lines.push(
            "hint: hostname resolution failed; verify the node hostnames and your DNS/network"
                .into(),
        );
    } else if all("timed out") {
        lines.push(
            "hint: nodes did not answer in time; check firewalls or raise --connect-timeout-secs"
                .into(),
        );
    } else if all("401") || all("403") {
        lines.push("hint: authentication failed; verify --rpc-user/--rpc-pass".into());
    } else if all("error sending request for url") {
        lines.push(
            "hint: request could not be sent; verify the node RPC port and that the nodes are running"
                .into(),
        );
    }

    lines.join("\n")
}
