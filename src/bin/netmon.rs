use clap::Parser;
use log::info;
use tokio::time::sleep;

use netmon::cli::procs::SystemProcesses;
use netmon::cli::report::run_cycle;
use netmon::cli::screen::clear_screen;
use netmon::cli::ss::SsCommand;
use netmon::cli::{Cli, MonitorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = MonitorConfig::from(Cli::parse());
    init_logging();

    let stats = SsCommand::for_platform(cfg.command_timeout);
    if stats.is_none() {
        info!("ss is not available on this platform; Rx/Tx columns will show N/A");
    }
    let mut procs = SystemProcesses::new();

    loop {
        // fatal: returned to main, which prints it once
        let report = run_cycle(&cfg.filter, &mut procs, stats.as_ref()).await?;
        print!("{report}");

        if cfg.once {
            return Ok(());
        }
        sleep(cfg.interval).await;
        if cfg.clear_screen {
            clear_screen(cfg.command_timeout).await;
        }
    }
}

fn init_logging() {
    let default = if std::env::var("NETMON_DEBUG").is_ok() { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}
