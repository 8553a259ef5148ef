use assert_cmd::cargo;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn installer(config_home: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("zabbix-agent-installer"));
    cmd.env("XDG_CONFIG_HOME", config_home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_flags() {
    let home = tempfile::tempdir().unwrap();
    installer(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--no-cron"));
}

#[test]
fn server_ip_is_required() {
    let home = tempfile::tempdir().unwrap();
    installer(home.path())
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("[ERROR]"))
        .stdout(predicate::str::contains("must input the zabbix server ip"));
}

#[test]
fn malformed_server_ip_fails() {
    let home = tempfile::tempdir().unwrap();
    installer(home.path())
        .args(["-s", "10.0.0"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid server ip: 10.0.0"));
}

#[test]
fn malformed_agent_ip_fails() {
    let home = tempfile::tempdir().unwrap();
    installer(home.path())
        .args(["-s", "127.0.0.1", "-i", "999.1.1.1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid agent ip: 999.1.1.1"));
}

#[test]
fn package_url_must_be_http() {
    let home = tempfile::tempdir().unwrap();
    installer(home.path())
        .args(["-s", "127.0.0.1", "-i", "127.0.0.1", "-l", "ftp://mirror/agent.tar.gz"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("invalid package URL"));
}

#[test]
fn broken_config_file_fails() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("installer.toml");
    std::fs::write(&config, "server_port = \"not a port\"\n").unwrap();

    installer(home.path())
        .args(["-s", "127.0.0.1", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to parse config"));
}
