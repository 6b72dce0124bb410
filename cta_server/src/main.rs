//! A chase-the-ace game server.

use std::{
    net::{IpAddr, SocketAddr},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Error};
use chase_the_ace::server::{self, ServerConfig};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a chase-the-ace game server

USAGE:
  cta_server [OPTIONS] PORT

OPTIONS:
  --bind-ip IP             Listening IP address  [default: 0.0.0.0]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  COUNTDOWN_SECS           Lobby countdown length in seconds    [default: 30]
  DEAL_PAUSE_MS            Pause after dealing, milliseconds    [default: 500]
  ROUND_PAUSE_MS           Pause between rounds, milliseconds   [default: 2000]
  DECISION_TIMEOUT_SECS    Seconds before a silent seat defaults to keep
                           [default: wait forever]
  RUST_LOG                 Log level filter                     [default: error]
";

fn main() -> Result<(), Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_ip: IpAddr = pargs.value_from_str("--bind-ip").unwrap_or_else(|_| {
        "0.0.0.0".parse().expect("Default bind address is valid")
    });
    let port: u16 = pargs
        .free_from_str()
        .context("missing PORT argument (see --help)")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::builder().format_target(false).init();

    let config = ServerConfig {
        countdown_ticks: parse_env_or("COUNTDOWN_SECS", 30),
        tick_interval: Duration::from_secs(1),
        deal_pause: Duration::from_millis(parse_env_or("DEAL_PAUSE_MS", 500)),
        round_pause: Duration::from_millis(parse_env_or("ROUND_PAUSE_MS", 2000)),
        decision_timeout: std::env::var("DECISION_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs),
    };

    let addr = SocketAddr::new(bind_ip, port);
    info!("Starting chase-the-ace server at {addr}");
    server::run(addr, config).with_context(|| format!("failed to serve on {addr}"))
}

fn parse_env_or<T: FromStr>(var: &str, default: T) -> T {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
