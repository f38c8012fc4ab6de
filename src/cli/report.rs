use std::fmt;

use anyhow::Context;
use log::{debug, warn};

use crate::cli::procs::{ProcessHandle, ProcessSource};
use crate::cli::ss::{StatsSource, collect_stats};
use crate::cli::types::{ReportRow, SocketConnection, StatsTable};

/// Shown in the Rx/Tx columns when ss has nothing for a connection.
pub const NOT_APPLICABLE: &str = "N/A";

pub const HEADERS: [&str; 7] = [
    "PID",
    "Process",
    "Local Address",
    "Remote Address",
    "State",
    "Rx Bytes",
    "Tx Bytes",
];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub rows: Vec<ReportRow>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [pid, name, local, remote, state, rx, tx] = HEADERS;
        writeln!(
            f,
            "{:<6} {:<15} {:<22} {:<22} {:<12} {:<10} {:<10}",
            pid, name, local, remote, state, rx, tx
        )?;
        for r in &self.rows {
            writeln!(
                f,
                "{:<6} {:<15} {:<22} {:<22} {:<12} {:<10} {:<10}",
                r.pid, r.name, r.local, r.remote, r.state, r.rx, r.tx
            )?;
        }
        Ok(())
    }
}

/// One collect/join pass. A failing stats source only costs the Rx/Tx
/// columns; a failing process listing fails the whole cycle.
pub async fn run_cycle<P, S>(
    filter: &str,
    processes: &mut P,
    stats: Option<&S>,
) -> anyhow::Result<Report>
where
    P: ProcessSource,
    S: StatsSource,
{
    let table = match stats {
        Some(source) => match collect_stats(source).await {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("could not parse ss output: {e:#}");
                None
            }
        },
        None => None,
    };

    let procs = processes.processes().context("error retrieving processes")?;
    Ok(build_report(filter, &procs, table.as_ref()))
}

/// Joins every connection of every process whose name contains `filter`
/// (case-insensitive) against `table`. Keys must match exactly.
pub fn build_report<H: ProcessHandle>(
    filter: &str,
    processes: &[H],
    table: Option<&StatsTable>,
) -> Report {
    let needle = filter.to_lowercase();
    let mut rows = Vec::new();

    for p in processes {
        let name = match p.name() {
            Ok(n) => n,
            Err(e) => {
                debug!("skipping pid {}: {e:#}", p.pid());
                continue;
            }
        };
        if !name.to_lowercase().contains(&needle) {
            continue;
        }

        let conns = match p.connections() {
            Ok(c) => c,
            Err(e) => {
                debug!("skipping {name} ({}): {e:#}", p.pid());
                continue;
            }
        };
        rows.extend(conns.iter().map(|c| join_row(p.pid(), &name, c, table)));
    }

    // stable, so each process keeps its connection order
    rows.sort_by_key(|r| r.pid);
    Report { rows }
}

fn join_row(
    pid: u32,
    name: &str,
    conn: &SocketConnection,
    table: Option<&StatsTable>,
) -> ReportRow {
    let (rx, tx) = match table.and_then(|t| t.get(&conn.key())) {
        Some(q) => (q.rx.clone(), q.tx.clone()),
        None => (NOT_APPLICABLE.to_string(), NOT_APPLICABLE.to_string()),
    };

    ReportRow {
        pid,
        name: name.to_string(),
        local: conn.local.to_string(),
        remote: conn.remote.to_string(),
        state: conn.state.clone(),
        rx,
        tx,
    }
}
