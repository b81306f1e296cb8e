//! Pinned balancer demo client.
//!
//! Drives the balancer end to end against simulated servers:
//!
//! ```text
//!   StaticResolver ──full address list──▶ SimulatedConnections ──ready snapshot──┐
//!         │                                                                     ▼
//!         └──────────────reconcile──────────────────────────────────────▶ PinnedBalancer
//!                                                                               │ pick()
//!   Retrying ──▶ BalancedInvoker ──▶ SimulatedTransport ◀──────── pinned handle ─┘
//!                     │
//!                     └── completion hook: failure → witness_failure → re-pin
//! ```
//!
//! Addresses passed with `--overloaded` answer every call with an overload
//! signal, so the first calls fail over away from them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use pinned_balancer::config::{load_config, BalancerConfig, TargetConfig};
use pinned_balancer::error::CallError;
use pinned_balancer::invoke::{CallContext, Invoker};
use pinned_balancer::load_balancer::{
    Address, BalancedInvoker, BalancerRegistry, PinnedBalancer, Transport,
};
use pinned_balancer::observability::{logging, metrics};
use pinned_balancer::rebalance::RebalanceScheduler;
use pinned_balancer::resilience::{RetryPolicy, Retrying};
use pinned_balancer::resolver::{AddressSink, StaticResolver};

#[derive(Parser)]
#[command(name = "pinned-balancer")]
#[command(about = "Sticky connection selection demo with overload retries", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Candidate addresses for a single target (overrides configured targets).
    #[arg(short, long, value_delimiter = ',')]
    addrs: Vec<String>,

    /// Target name used with --addrs.
    #[arg(short, long, default_value = "server.dc1")]
    target: String,

    /// Addresses whose simulated server always reports overload.
    #[arg(long, value_delimiter = ',')]
    overloaded: Vec<String>,

    /// Calls to issue per target.
    #[arg(long, default_value_t = 2)]
    calls: u32,

    /// Rebalances to run before issuing calls.
    #[arg(long, default_value_t = 10)]
    rebalances: u32,

    /// Print the inventory of each target as JSON when done.
    #[arg(long)]
    print_state: bool,
}

/// Stand-in for a physical connection.
#[derive(Debug)]
struct SimulatedServer {
    address: Address,
    overloaded: bool,
}

type ServerHandle = Arc<SimulatedServer>;

struct SimulatedTransport;

impl Transport<ServerHandle, String> for SimulatedTransport {
    type Response = String;

    async fn call(
        &self,
        server: &ServerHandle,
        request: &String,
        _ctx: &CallContext,
    ) -> Result<String, CallError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if server.overloaded {
            Err(CallError::Overloaded(format!("{} is shedding load", server.address)))
        } else {
            Ok(format!("{} answered {request}", server.address))
        }
    }
}

/// Connection manager stand-in: every resolved address becomes ready.
struct SimulatedConnections {
    balancer: PinnedBalancer<ServerHandle>,
    overloaded: Vec<Address>,
}

impl AddressSink for SimulatedConnections {
    fn update_addresses(&self, addresses: &[Address]) {
        self.balancer.update_readiness(addresses.iter().map(|address| {
            let server = SimulatedServer {
                address: address.clone(),
                overloaded: self.overloaded.contains(address),
            };
            (address.clone(), Arc::new(server))
        }));
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };
    if !cli.addrs.is_empty() {
        config.targets = vec![TargetConfig {
            name: cli.target.clone(),
            addresses: cli.addrs.clone(),
        }];
    }
    if config.targets.is_empty() {
        return Err("--addrs or a config file with [[targets]] is required".into());
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("pinned-balancer v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let registry: Arc<BalancerRegistry<ServerHandle>> = Arc::new(match config.rebalance.seed {
        Some(seed) => BalancerRegistry::with_seed(seed),
        None => BalancerRegistry::new(),
    });

    let shutdown = CancellationToken::new();
    let scheduler = if config.rebalance.enabled {
        let rebalance = config.rebalance.clone();
        let scheduler = RebalanceScheduler::new(
            registry.clone(),
            Duration::from_secs(rebalance.interval_secs),
        )
        .with_filter(move |target| rebalance.matches(target));
        Some(tokio::spawn(scheduler.run(shutdown.clone())))
    } else {
        None
    };

    let overloaded: Vec<Address> = cli.overloaded.iter().map(|a| Address::new(a.as_str())).collect();
    let policy = RetryPolicy::from(&config.retries);

    for target in &config.targets {
        let balancer = registry.balancer_for(&target.name);
        run_target(&balancer, target, &overloaded, policy, &cli).await;

        if cli.print_state {
            let state = json!({
                "target": target.name,
                "records": balancer.snapshot(),
            });
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    shutdown.cancel();
    if let Some(handle) = scheduler {
        handle.await?;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_target(
    balancer: &PinnedBalancer<ServerHandle>,
    target: &TargetConfig,
    overloaded: &[Address],
    policy: RetryPolicy,
    cli: &Cli,
) {
    let resolver = StaticResolver::new(target.addresses.iter().map(String::as_str));
    resolver.subscribe(Arc::new(SimulatedConnections {
        balancer: balancer.clone(),
        overloaded: overloaded.to_vec(),
    }));
    resolver.subscribe(Arc::new(balancer.clone()));

    for _ in 0..cli.rebalances {
        balancer.rebalance();
    }

    let invoker = Retrying::new(
        BalancedInvoker::new(balancer.picker(), SimulatedTransport),
        policy,
    );
    let request = String::from("health check");

    for n in 1..=cli.calls {
        tracing::info!(target_name = %target.name, call = n, "===> RPC");
        match invoker.invoke(&request, &CallContext::new()).await {
            Ok(response) => tracing::info!(call = n, response = %response, "RPC succeeded"),
            Err(e) => tracing::warn!(call = n, error = %e, "RPC failed"),
        }
    }

    if let Some(first) = target.addresses.first() {
        if target.addresses.len() > 1 {
            tracing::info!(target_name = %target.name, keep = %first, "===> Removing all other addresses");
            resolver.set_addresses([first.as_str()]);
        }
    }
}
