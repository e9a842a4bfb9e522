//! VPN Resolver - CLI Entry Point
//!
//! - `public-ip`: show public IP information, ours or for a given address
//! - `resolve`: resolve hostnames the way server catalogs are resolved
//! - `connect`: fetch the provider catalog and pick a connection
//!
//! Ctrl-C cancels the running command.

// Use mimalloc as global allocator
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vpn_resolver::common::random;
use vpn_resolver::models::Protocol;
use vpn_resolver::{Config, VpnResolver, VERSION};

#[derive(Parser, Debug)]
#[command(name = "vpn-resolver")]
#[command(author = "Tsang")]
#[command(version = VERSION)]
#[command(about = "VPN endpoint resolution and public IP lookup")]
struct Args {
    /// Path to configuration file; defaults apply when omitted
    #[arg(short = 'c', short_alias = 'f', long = "config")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show public IP information
    PublicIp {
        /// Address to look up instead of our own
        #[arg(long)]
        ip: Option<IpAddr>,

        /// API to use (overrides config)
        #[arg(long)]
        api: Option<String>,

        /// API token (overrides config)
        #[arg(long)]
        token: Option<String>,
    },

    /// Resolve hostnames concurrently
    Resolve {
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Pick a connection from the provider's servers
    Connect {
        /// Provider name (overrides config)
        #[arg(long)]
        provider: Option<String>,

        /// Country filter, repeatable
        #[arg(long = "country")]
        countries: Vec<String>,

        /// tcp or udp
        #[arg(long)]
        protocol: Option<String>,

        /// Seed for a reproducible pick
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().max(2))
        .enable_all()
        .thread_name("vpn-resolver-worker")
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_async(path).await?,
        None => Config::default(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(format!("vpn_resolver={}", config.log_level))
            }),
        )
        .init();

    info!("VPN Resolver v{}", VERSION);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received interrupt, cancelling");
                cancel.cancel();
            }
        });
    }

    match args.command {
        Command::PublicIp { ip, api, token } => {
            if let Some(api) = api {
                config.public_ip.apis = vec![api];
            }
            if let Some(token) = token {
                config.public_ip.token = token;
            }
            let resolver = VpnResolver::new(config)?;
            let info = resolver.public_ip(&cancel, ip).await?;
            println!("{}", info);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Resolve { hosts } => {
            let resolver = VpnResolver::new(config)?;
            let resolution = resolver.resolve_hosts(&cancel, hosts).await?;
            let mut hosts: Vec<_> = resolution.host_to_ips.into_iter().collect();
            hosts.sort();
            for (host, ips) in hosts {
                let ips: Vec<String> = ips.iter().map(IpAddr::to_string).collect();
                println!("{} {}", host, ips.join(" "));
            }
        }
        Command::Connect {
            provider,
            countries,
            protocol,
            seed,
        } => {
            if let Some(provider) = provider {
                config.provider = provider;
            }
            let mut selection = config.selection.clone();
            if !countries.is_empty() {
                selection.countries = countries;
            }
            if let Some(protocol) = protocol {
                selection.protocol = Some(protocol.parse::<Protocol>()?);
            }

            let resolver = VpnResolver::new(config)?;
            let mut rand_source = match seed {
                Some(seed) => random::seeded(seed),
                None => random::from_entropy(),
            };
            let connection = resolver
                .connect(&cancel, &selection, &mut rand_source)
                .await?;
            println!("{}", connection);
        }
    }

    Ok(())
}
