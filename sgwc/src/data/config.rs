use anyhow::Result;
use serde::Deserialize;
use slog::{Logger, error, info};
use std::fs;
use std::net::Ipv4Addr;

#[derive(Debug, Clone)]
pub struct Config {
    // Local S11 address, signaled to the MME in the SGW S11 F-TEID.
    pub s11_ip: Ipv4Addr,

    // Local S5/S8 address, used for both control plane and core side user plane.
    pub s5s8_ip: Ipv4Addr,

    // Local S1-U address, signaled to the MME for the eNB to send uplink packets to.
    pub s1u_ip: Ipv4Addr,

    // /24 subnet that UE addresses are allocated from when the PGW does not supply one.
    pub ue_subnet: Ipv4Addr,

    // How often to log procedure statistics.
    pub stats_interval_secs: u64,

    // Whether to persist sessions and restore them at startup.
    pub persist_state: bool,
}

fn default_ue_subnet() -> Ipv4Addr {
    Ipv4Addr::new(10, 255, 0, 0)
}

fn default_stats_interval_secs() -> u64 {
    5
}

impl Config {
    /// A configuration using one address on every interface.
    pub fn with_local_ip(ip: Ipv4Addr) -> Self {
        Config {
            s11_ip: ip,
            s5s8_ip: ip,
            s1u_ip: ip,
            ue_subnet: default_ue_subnet(),
            stats_interval_secs: default_stats_interval_secs(),
            persist_state: false,
        }
    }
}

/// Addresses may be left out of the file, in which case the local IP from the command line is used.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    s11_ip: Option<Ipv4Addr>,
    s5s8_ip: Option<Ipv4Addr>,
    s1u_ip: Option<Ipv4Addr>,
    ue_subnet: Option<Ipv4Addr>,
    stats_interval_secs: Option<u64>,
    persist_state: Option<bool>,
}

/// Load the configuration file, filling in any missing address with `local_ip`.
pub fn load_config_file(filename: &str, local_ip: Ipv4Addr, logger: &Logger) -> Result<Config> {
    let path = std::env::current_dir()?;
    let contents = fs::read_to_string(filename).inspect_err(|e| {
        error!(
            logger,
            "Failed to load config file {filename} (current directory {}) with error code {e}",
            path.display()
        )
    })?;
    let config = parse_config(&contents, local_ip)?;
    info!(
        logger,
        "Loaded config from {filename}: S11 {} S5/S8 {} S1-U {}",
        config.s11_ip,
        config.s5s8_ip,
        config.s1u_ip
    );
    Ok(config)
}

pub fn parse_config(contents: &str, local_ip: Ipv4Addr) -> Result<Config> {
    let file: ConfigFile = toml::from_str(contents)?;
    let defaults = Config::with_local_ip(local_ip);
    Ok(Config {
        s11_ip: file.s11_ip.unwrap_or(defaults.s11_ip),
        s5s8_ip: file.s5s8_ip.unwrap_or(defaults.s5s8_ip),
        s1u_ip: file.s1u_ip.unwrap_or(defaults.s1u_ip),
        ue_subnet: file.ue_subnet.unwrap_or(defaults.ue_subnet),
        stats_interval_secs: file
            .stats_interval_secs
            .unwrap_or(defaults.stats_interval_secs),
        persist_state: file.persist_state.unwrap_or(defaults.persist_state),
    })
}
