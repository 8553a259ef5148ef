use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use log::error;

use zabbix_agent_installer::cli::Args;
use zabbix_agent_installer::install::download::platform::Platform;
use zabbix_agent_installer::{FileConfig, InstallConfig, run_install};

fn main() {
    // `[LEVEL] message` on stdout, info unless RUST_LOG says otherwise
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = real_main() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    let args = Args::parse();

    let platform = Platform::detect()?;
    let file = FileConfig::load(args.config.as_deref())?;
    let cfg = InstallConfig::resolve(&args, &file, platform)
        .context("Invalid installer arguments")?;

    run_install(&cfg)?;
    Ok(())
}
