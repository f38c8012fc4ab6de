pub mod procs;
pub mod report;
pub mod screen;
pub mod ss;
pub mod types;

use clap::Parser;
use tokio::time::Duration;

pub const DEFAULT_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 5;

#[derive(Parser, Debug)]
#[command(
    name = "netmon",
    version,
    about = "Show network connections of processes whose name contains FILTER"
)]
pub struct Cli {
    /// Case-insensitive substring of the process name; an empty string matches every process
    pub filter: String,

    /// Seconds to wait between refreshes
    #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
    pub interval: u64,

    /// Seconds before an external command (ss, clear) is abandoned
    #[arg(short = 't', long, default_value_t = DEFAULT_COMMAND_TIMEOUT_SECS)]
    pub command_timeout: u64,

    /// Print a single report and exit
    #[arg(long)]
    pub once: bool,

    /// Never clear the screen between refreshes
    #[arg(long)]
    pub no_clear: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonitorConfig {
    pub filter: String,
    pub interval: Duration,
    pub command_timeout: Duration,
    pub once: bool,
    pub clear_screen: bool,
}

impl From<Cli> for MonitorConfig {
    fn from(cli: Cli) -> Self {
        Self {
            filter: cli.filter,
            interval: Duration::from_secs(cli.interval),
            command_timeout: Duration::from_secs(cli.command_timeout),
            once: cli.once,
            clear_screen: !cli.no_clear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_three_second_refresh() {
        let cfg = MonitorConfig::from(Cli::try_parse_from(["netmon", "nginx"]).unwrap());
        assert_eq!(cfg.filter, "nginx");
        assert_eq!(cfg.interval, Duration::from_secs(3));
        assert_eq!(cfg.command_timeout, Duration::from_secs(5));
        assert!(cfg.clear_screen);
        assert!(!cfg.once);
    }

    #[test]
    fn filter_is_required() {
        assert!(Cli::try_parse_from(["netmon"]).is_err());
    }

    #[test]
    fn empty_filter_is_accepted() {
        let cli = Cli::try_parse_from(["netmon", ""]).unwrap();
        assert_eq!(cli.filter, "");
    }

    #[test]
    fn flags_override_defaults() {
        let args = ["netmon", "-i", "10", "-t", "1", "--once", "--no-clear", "db"];
        let cli = Cli::try_parse_from(args).unwrap();
        let cfg = MonitorConfig::from(cli);
        assert_eq!(cfg.interval, Duration::from_secs(10));
        assert_eq!(cfg.command_timeout, Duration::from_secs(1));
        assert!(cfg.once);
        assert!(!cfg.clear_screen);
    }
}
