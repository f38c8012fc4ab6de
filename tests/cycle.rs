use netmon::cli::procs::{ProcessHandle, ProcessSource};
use netmon::cli::report::{NOT_APPLICABLE, run_cycle};
use netmon::cli::ss::{SsCommand, StatsSource};
use netmon::cli::types::{Endpoint, SocketConnection};

const SS_CAPTURE: &str = "\
Netid State  Recv-Q Send-Q Local Address:Port  Peer Address:Port
tcp   ESTAB  0      0      127.0.0.1:49911     127.0.0.1:42488
     users:((\"app\",pid=100))
";

struct Capture(&'static str);

impl StatsSource for Capture {
    async fn fetch(&self) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct FailingSs;

impl StatsSource for FailingSs {
    async fn fetch(&self) -> anyhow::Result<String> {
        anyhow::bail!("ss failed (exit status: 255)")
    }
}

#[derive(Clone)]
struct Proc {
    pid: u32,
    name: &'static str,
    conns: Vec<SocketConnection>,
}

impl ProcessHandle for Proc {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> anyhow::Result<String> {
        Ok(self.name.to_string())
    }

    fn connections(&self) -> anyhow::Result<Vec<SocketConnection>> {
        Ok(self.conns.clone())
    }
}

struct Snapshot(Option<Vec<Proc>>);

impl ProcessSource for Snapshot {
    type Process = Proc;

    fn processes(&mut self) -> anyhow::Result<Vec<Proc>> {
        self.0.clone().ok_or_else(|| anyhow::anyhow!("permission denied"))
    }
}

fn myapp() -> Snapshot {
    Snapshot(Some(vec![
        Proc {
            pid: 100,
            name: "myapp",
            conns: vec![SocketConnection {
                local: Endpoint::from_socket("127.0.0.1".parse().unwrap(), 49911),
                remote: Endpoint::from_socket("127.0.0.1".parse().unwrap(), 42488),
                state: "ESTABLISHED".to_string(),
            }],
        },
        Proc { pid: 1, name: "init", conns: vec![] },
    ]))
}

#[tokio::test]
async fn captured_ss_output_joins_with_process_sockets() {
    let report = run_cycle("APP", &mut myapp(), Some(&Capture(SS_CAPTURE))).await.unwrap();

    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.pid, 100);
    assert_eq!(row.name, "myapp");
    assert_eq!(row.local, "127.0.0.1:49911");
    assert_eq!(row.remote, "127.0.0.1:42488");
    assert_eq!(row.state, "ESTABLISHED");
    assert_eq!((row.rx.as_str(), row.tx.as_str()), ("0", "0"));

    let rendered = report.to_string();
    assert!(rendered.starts_with("PID "));
    assert!(rendered.lines().nth(1).unwrap().starts_with("100    myapp"));
}

#[tokio::test]
async fn no_stats_source_reports_not_applicable() {
    let report = run_cycle("myapp", &mut myapp(), None::<&SsCommand>).await.unwrap();
    assert_eq!(report.rows[0].rx, NOT_APPLICABLE);
    assert_eq!(report.rows[0].tx, NOT_APPLICABLE);
}

#[tokio::test]
async fn failing_ss_degrades_the_cycle() {
    let report = run_cycle("myapp", &mut myapp(), Some(&FailingSs)).await.unwrap();
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].rx, NOT_APPLICABLE);
}

#[tokio::test]
async fn process_listing_failure_is_fatal() {
    let err = run_cycle("myapp", &mut Snapshot(None), Some(&Capture(SS_CAPTURE)))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("permission denied"));
}

#[tokio::test]
async fn cycles_do_not_share_state() {
    let mut procs = myapp();
    let first = run_cycle("myapp", &mut procs, Some(&Capture(SS_CAPTURE))).await.unwrap();
    let second = run_cycle("myapp", &mut procs, Some(&FailingSs)).await.unwrap();
    assert_eq!(first.rows[0].rx, "0");
    assert_eq!(second.rows[0].rx, NOT_APPLICABLE);
}
