use clap::Parser;

use bridge::cli::Cli;
use bridge::config::{StaticConfig, get_config, init_config, update_config};
use bridge::errors::BridgeError;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    init_config(cli.config.as_deref());

    let mut override_error: Option<BridgeError> = None;
    update_config(|config| {
        if let Err(e) = cli.apply_overrides(config) {
            override_error = Some(e);
        }
    });
    if let Some(e) = override_error {
        eprintln!("{}", e.format_colored());
        std::process::exit(2);
    }

    let config = get_config();
    if let Err(e) = config.validate() {
        eprintln!("{}", e.format_colored());
        std::process::exit(1);
    }

    if cli.print_config {
        match toml::to_string_pretty(config.as_ref()) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to render configuration: {}", e),
        }
        return Ok(());
    }

    // Guard 必须存活到进程结束，否则非阻塞日志会丢失
    let _log_guard = bridge::system::init_logging(&config.logging)?;

    bridge::runtime::modes::run_server().await
}
