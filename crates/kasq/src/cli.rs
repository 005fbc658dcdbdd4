use clap::{Parser, Subcommand};

/// Numbered host variables are read up to this index.
const MAX_ENV_HOSTS: usize = 100;

/// Query Kaspa nodes with failover across several RPC endpoints.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Node RPC address (repeatable, in priority order). When omitted, hosts
    /// are read from KASPAD_HOST_1, KASPAD_HOST_2, ...
    #[arg(long = "host", value_name = "ADDRESS")]
    pub hosts: Vec<String>,

    /// RPC username (optional).
    #[arg(long, env = "KASQ_RPC_USER")]
    pub rpc_user: Option<String>,

    /// RPC password (optional).
    #[arg(long, env = "KASQ_RPC_PASS")]
    pub rpc_pass: Option<String>,

    /// Per-endpoint connect timeout in seconds.
    #[arg(long, default_value = "10", env = "KASQ_CONNECT_TIMEOUT_SECS")]
    pub connect_timeout_secs: u64,

    /// Per-attempt request timeout in seconds.
    #[arg(long, default_value = "30", env = "KASQ_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: u64,

    /// Maximum endpoints tried per request (defaults to all of them).
    #[arg(long, env = "KASQ_MAX_ATTEMPTS")]
    pub max_attempts: Option<usize>,

    /// Rotate the first endpoint tried instead of always preferring the first host.
    #[arg(long)]
    pub round_robin: bool,

    /// Per-endpoint request rate limit.
    #[arg(long, env = "KASQ_REQUESTS_PER_SECOND")]
    pub requests_per_second: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Connect to every host and report which ones are reachable.
    Status,
    /// Circulating and maximum coin supply.
    CoinSupply,
    /// Global BlockDAG information.
    Blockdag,
    /// Identity and sync state of the serving node.
    Info,
    /// Issue an arbitrary RPC method and print the raw result.
    Call {
        /// Remote method name, e.g. `getBlockDagInfo`.
        method: String,
        /// Parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },
}

impl Cli {
    /// Hosts from the command line, falling back to the environment.
    pub fn resolve_hosts(&self) -> Vec<String> {
        if !self.hosts.is_empty() {
            return self.hosts.iter().map(|h| h.trim().to_owned()).collect();
        }
        hosts_from_lookup(|key| std::env::var(key).ok())
    }
}

/// Read `KASPAD_HOST_1..` until the first missing variable.
fn hosts_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    (1..=MAX_ENV_HOSTS)
        .map_while(|i| lookup(&format!("KASPAD_HOST_{i}")))
        .map(|host| host.trim().to_owned())
        .collect()
}
