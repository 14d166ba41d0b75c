//! main - starts the SGW control plane session manager

use anyhow::{Result, ensure};
use async_channel::Receiver;
use async_std::channel::Sender;
use async_std::prelude::*;
use clap::Parser;
use sgwc::data::{MemoryStateStore, StateStore};
use sgwc::protocols::Envelope;
use sgwc::{Config, SgwC, load_config_file};
use signal_hook::consts::signal::*;
use signal_hook_async_std::Signals;
use slog::{Drain, Logger, debug, info, o};
use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file.  If it does not exist, every interface uses the local IP and the
    /// defaults apply.
    #[arg(long, default_value = "sgwc.toml")]
    config: String,

    /// Local IPv4 address, used for any interface the configuration file does not give an address
    /// for.  Defaults to the eth0 address.
    #[arg(long)]
    local_ip: Option<IpAddr>,

    /// Persist sessions while running, and restore them at startup.
    #[arg(long)]
    persist_state: bool,
}

#[async_std::main]
async fn main() -> Result<()> {
    exit_on_panic();
    let logger = init_logging();

    let args = Args::parse();
    let local_ip = match args.local_ip {
        Some(ip) => ip,
        None => local_ip_address::local_ip()?,
    };
    let local_ip = check_local_ip(&local_ip)?;

    let mut config = if Path::new(&args.config).exists() {
        load_config_file(&args.config, local_ip, &logger)?
    } else {
        info!(&logger, "No {} - using defaults on {local_ip}", args.config);
        Config::with_local_ip(local_ip)
    };
    config.persist_state |= args.persist_state;
    check_ue_subnet(&config.ue_subnet)?;

    let store: Option<Arc<dyn StateStore>> = config
        .persist_state
        .then(|| Arc::new(MemoryStateStore::new()) as Arc<dyn StateStore>);

    let (sgwc, queues) = SgwC::start(config, store, logger.clone()).await?;

    // Encoding onto the wire belongs to the transport, so here outbound messages are just traced.
    async_std::task::spawn(trace_outbound(queues.to_mme, logger.new(o!("peer" => "mme"))));
    async_std::task::spawn(trace_outbound(queues.to_pgw, logger.new(o!("peer" => "pgw"))));

    wait_for_signal(&logger).await?;
    sgwc.graceful_shutdown().await;

    Ok(())
}

fn init_logging() -> Logger {
    // Use info level logging by default
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info") }
    }
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog_envlogger::new(drain);
    slog::Logger::root(drain, o!())
}

fn exit_on_panic() {
    let orig_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        orig_hook(panic_info);
        std::process::exit(1);
    }));
}

fn check_ue_subnet(ue_subnet: &Ipv4Addr) -> Result<()> {
    ensure!(
        ue_subnet.octets()[3] == 0,
        "Final byte of UE subnet must be 0"
    );
    Ok(())
}

fn check_local_ip(ip: &IpAddr) -> Result<Ipv4Addr> {
    let IpAddr::V4(ip) = ip else {
        anyhow::bail!("Local IP {ip} must be IPv4");
    };
    ensure!(
        !ip.is_unspecified(),
        "Unspecific IP address 0.0.0.0 not allowed for local IP - this must be an address that the MME and PGW can send to"
    );
    Ok(*ip)
}

async fn trace_outbound<M: Debug>(receiver: Receiver<Envelope<M>>, logger: Logger) {
    while let Ok(envelope) = receiver.recv().await {
        match envelope.imsi64 {
            Some(imsi64) => debug!(logger, "Send {:?}", envelope.message; "imsi" => imsi64),
            None => debug!(logger, "Send {:?}", envelope.message),
        }
    }
}

async fn wait_for_signal(logger: &Logger) -> Result<i32> {
    let signals = Signals::new([SIGHUP, SIGTERM, SIGINT, SIGQUIT])?;
    let handle = signals.handle();
    let (sig_sender, sig_receiver) = async_std::channel::unbounded();
    let signals_task =
        async_std::task::spawn(handle_signals(signals, sig_sender, logger.clone()));
    let signal = sig_receiver.recv().await?;
    info!(logger, "Signal {signal} - stopping");
    handle.close();
    signals_task.await;
    Ok(signal)
}

async fn handle_signals(signals: Signals, sig_sender: Sender<i32>, logger: Logger) {
    let mut signals = signals.fuse();
    while let Some(signal) = signals.next().await {
        match signal {
            // Configuration is only read at startup.
            SIGHUP => info!(logger, "Ignoring SIGHUP"),
            SIGTERM | SIGINT | SIGQUIT => {
                let _ = sig_sender.send(signal).await;
            }
            _ => unreachable!(),
        }
    }
}
