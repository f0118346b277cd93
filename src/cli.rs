//! Command-line interface definitions using clap

use clap::Parser;

use crate::config::StaticConfig;
use crate::errors::{BridgeError, Result};

/// Bridge - host-aware URL redirect service
#[derive(Parser, Debug, Default)]
#[command(name = "bridge")]
#[command(version)]
#[command(about = "Host-aware URL redirect service", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Listen address, `host:port` or `:port`
    #[arg(long, short = 'l')]
    pub listen: Option<String>,

    /// Storage URL (memory://, file://, shard://, s3://, http(s)://)
    #[arg(long, short = 's')]
    pub storage: Option<String>,

    /// Serve enriched HTML with the destination's preview metadata
    #[arg(long)]
    pub enable_opengraph: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub generate_config: bool,
}

impl Cli {
    /// Apply flag overrides on top of file/env configuration.
    pub fn apply_overrides(&self, config: &mut StaticConfig) -> Result<()> {
        if let Some(listen) = &self.listen {
            let (host, port) = parse_listen(listen)?;
            if let Some(host) = host {
                config.server.host = host;
            }
            config.server.port = port;
        }
        if let Some(storage) = &self.storage {
            config.storage.url = storage.clone();
        }
        if self.enable_opengraph {
            config.redirect.enrich = true;
        }
        Ok(())
    }
}

/// `host:port`, `:port` or `[v6]:port`
fn parse_listen(listen: &str) -> Result<(Option<String>, u16)> {
    let invalid = || BridgeError::validation(format!("invalid listen address '{}'", listen));

    let (host, port) = listen.rsplit_once(':').ok_or_else(invalid)?;
    let port: u16 = port.parse().map_err(|_| invalid())?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let host = (!host.is_empty()).then(|| host.to_string());
    Ok((host, port))
}
