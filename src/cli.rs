use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(version, about = "Zabbix agent installer")]
pub struct Args {
    /// Zabbix server ip (required)
    #[arg(short = 's', long = "server")]
    pub server_ip: Option<String>,

    /// Zabbix server port [default: 8001]
    #[arg(short = 'p', long = "port")]
    pub server_port: Option<u16>,

    /// Agent ip reported as Hostname [default: outbound address]
    #[arg(short = 'i', long = "agent-ip")]
    pub agent_ip: Option<String>,

    /// Install directory [default: home directory]
    #[arg(short = 'd', long = "dir")]
    pub install_dir: Option<PathBuf>,

    /// User the install must run as
    #[arg(short = 'u', long = "user")]
    pub user: Option<String>,

    /// Package URL to download, skipping index scraping
    #[arg(short = 'l', long = "url", conflicts_with = "package_file")]
    pub package_url: Option<String>,

    /// Package file name inside the install directory
    #[arg(short = 'f', long = "file")]
    pub package_file: Option<String>,

    /// Directory listing to search for a package
    #[arg(long = "index-url")]
    pub index_url: Option<String>,

    /// Path to configuration file
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Do not register the crontab health check
    #[arg(long = "no-cron")]
    pub no_cron: bool,

    /// Unpack and configure only, do not start the agent
    #[arg(long = "no-start")]
    pub no_start: bool,
}
