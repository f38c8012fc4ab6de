use anyhow::Context;
use log::debug;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

use crate::cli::types::{ConnectionKey, Endpoint, QueueCounters, StatsTable};

pub const SS_PROGRAM: &str = "ss";
pub const SS_ARGS: [&str; 4] = ["-tuln", "-o", "state", "established"];

// first-column labels of the ss title line
const HEADER_LABELS: [&str; 3] = ["Netid", "State", "Recv-Q"];

/// Anything that can hand back raw `ss` text for one refresh cycle.
#[allow(async_fn_in_trait)]
pub trait StatsSource {
    async fn fetch(&self) -> anyhow::Result<String>;
}

/// Runs the real `ss` binary, bounded by `timeout`.
#[derive(Clone, Debug)]
pub struct SsCommand {
    timeout: Duration,
}

impl SsCommand {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// `ss` only exists on Linux; elsewhere there is no stats source at all.
    pub fn for_platform(timeout: Duration) -> Option<Self> {
        if cfg!(target_os = "linux") { Some(Self::new(timeout)) } else { None }
    }
}

impl StatsSource for SsCommand {
    async fn fetch(&self) -> anyhow::Result<String> {
        let child = Command::new(SS_PROGRAM)
            .args(SS_ARGS)
            .kill_on_drop(true)
            .output();

        let output = match timeout(self.timeout, child).await {
            Ok(res) => res.with_context(|| format!("failed to run {SS_PROGRAM}"))?,
            Err(_) => anyhow::bail!("{SS_PROGRAM} timed out after {:?}", self.timeout),
        };

        if !output.status.success() {
            anyhow::bail!(
                "{SS_PROGRAM} failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("{SS_PROGRAM} produced unreadable output"))
    }
}

pub async fn collect_stats<S: StatsSource>(source: &S) -> anyhow::Result<StatsTable> {
    let text = source.fetch().await?;
    Ok(parse_ss_output(&text))
}

/// Builds the queue table from `ss` output. Indented continuation lines and
/// blank lines are ignored; a record line that cannot be read is dropped
/// without affecting the lines after it. Later duplicates win.
pub fn parse_ss_output(text: &str) -> StatsTable {
    let mut table = StatsTable::new();

    for line in text.lines() {
        if line.trim().is_empty() || line.starts_with([' ', '\t']) {
            continue;
        }

        match parse_record(line) {
            Some((key, counters)) => {
                table.insert(key, counters);
            }
            None => debug!("skipping ss line: {line}"),
        }
    }

    table
}

fn parse_record(line: &str) -> Option<(ConnectionKey, QueueCounters)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 5 || HEADER_LABELS.contains(&parts[0]) {
        return None;
    }

    // some ss invocations print a State column between Netid and Recv-Q
    let shift = usize::from(!is_count(parts[1]) && parts.len() >= 6 && is_count(parts[2]));
    let fields = &parts[shift + 1..shift + 5];

    let key = ConnectionKey::new(Endpoint::parse(fields[2]), Endpoint::parse(fields[3]));
    let counters = QueueCounters { rx: fields[0].to_string(), tx: fields[1].to_string() };
    Some((key, counters))
}

fn is_count(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
