use std::collections::HashMap;
use std::ffi::OsString;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::debug;
use netstat2::{AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState, get_sockets_info};
use sysinfo::{ProcessesToUpdate, System};

use crate::cli::types::{Endpoint, SocketConnection};

/// One running process as seen during a single refresh. Both accessors may
/// fail independently; callers skip the process when they do.
pub trait ProcessHandle {
    fn pid(&self) -> u32;
    fn name(&self) -> anyhow::Result<String>;
    fn connections(&self) -> anyhow::Result<Vec<SocketConnection>>;
}

pub trait ProcessSource {
    type Process: ProcessHandle;

    /// Full process list for this cycle. An error here means nothing can be
    /// reported at all.
    fn processes(&mut self) -> anyhow::Result<Vec<Self::Process>>;
}

type SocketsByPid = Result<HashMap<u32, Vec<SocketConnection>>, String>;

/// Kernel view of UDP sockets: local address to the peer it is connected to.
type UdpPeers = HashMap<SocketAddr, SocketAddr>;

/// Process list from `sysinfo`, connections from the `netstat2` socket table.
pub struct SystemProcesses {
    system: System,
}

impl SystemProcesses {
    pub fn new() -> Self {
        Self { system: System::new() }
    }
}

impl Default for SystemProcesses {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SystemProcesses {
    type Process = SystemProcess;

    fn processes(&mut self) -> anyhow::Result<Vec<SystemProcess>> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            anyhow::bail!("process enumeration is not supported on this platform");
        }
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let sockets = Arc::new(read_sockets());
        if let Err(e) = sockets.as_ref() {
            debug!("socket table unavailable this cycle: {e}");
        }

        Ok(self
            .system
            .processes()
            .iter()
            .map(|(pid, p)| SystemProcess {
                pid: pid.as_u32(),
                name: p.name().to_os_string(),
                sockets: Arc::clone(&sockets),
            })
            .collect())
    }
}

pub struct SystemProcess {
    pid: u32,
    name: OsString,
    sockets: Arc<SocketsByPid>,
}

impl ProcessHandle for SystemProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn name(&self) -> anyhow::Result<String> {
        self.name
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("process {} has a non UTF-8 name", self.pid))
    }

    fn connections(&self) -> anyhow::Result<Vec<SocketConnection>> {
        match self.sockets.as_ref() {
            Ok(by_pid) => Ok(by_pid.get(&self.pid).cloned().unwrap_or_default()),
            Err(e) => anyhow::bail!("connections of process {}: {e}", self.pid),
        }
    }
}

fn read_sockets() -> SocketsByPid {
    let sockets = get_sockets_info(
        AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6,
        ProtocolFlags::TCP | ProtocolFlags::UDP,
    )
    .map_err(|e| format!("failed to list sockets: {e}"))?;
    let peers = read_udp_peers();

    let mut by_pid: HashMap<u32, Vec<SocketConnection>> = HashMap::new();
    for socket in sockets {
        let conn = to_connection(&socket.protocol_socket_info, &peers);
        for pid in &socket.associated_pids {
            by_pid.entry(*pid).or_default().push(conn.clone());
        }
    }
    Ok(by_pid)
}

fn to_connection(info: &ProtocolSocketInfo, peers: &UdpPeers) -> SocketConnection {
    match info {
        ProtocolSocketInfo::Tcp(tcp) => SocketConnection {
            local: Endpoint::from_socket(tcp.local_addr, tcp.local_port),
            remote: Endpoint::from_socket(tcp.remote_addr, tcp.remote_port),
            state: tcp_state_label(&tcp.state).to_string(),
        },
        ProtocolSocketInfo::Udp(udp) => udp_connection(udp.local_addr, udp.local_port, peers),
    }
}

/// netstat2 has no peer for UDP, so it comes from the kernel table. A socket
/// missing from that table gets `*:*`.
fn udp_connection(addr: IpAddr, port: u16, peers: &UdpPeers) -> SocketConnection {
    let remote = match peers.get(&SocketAddr::new(addr, port)) {
        Some(peer) => Endpoint::from_socket(peer.ip(), peer.port()),
        None => Endpoint::new("*", "*"),
    };

    SocketConnection {
        local: Endpoint::from_socket(addr, port),
        remote,
        state: "NONE".to_string(),
    }
}

#[cfg(target_os = "linux")]
fn read_udp_peers() -> UdpPeers {
    let mut peers = UdpPeers::new();
    for table in [procfs::net::udp(), procfs::net::udp6()] {
        match table {
            Ok(entries) => {
                for e in entries {
                    peers.insert(e.local_address, e.remote_address);
                }
            }
            Err(e) => debug!("udp table unavailable: {e}"),
        }
    }
    peers
}

#[cfg(not(target_os = "linux"))]
fn read_udp_peers() -> UdpPeers {
    UdpPeers::new()
}

fn tcp_state_label(state: &TcpState) -> &'static str {
    match state {
        TcpState::Closed => "CLOSE",
        TcpState::Listen => "LISTEN",
        TcpState::SynSent => "SYN_SENT",
        TcpState::SynReceived => "SYN_RECV",
        TcpState::Established => "ESTABLISHED",
        TcpState::FinWait1 => "FIN_WAIT1",
        TcpState::FinWait2 => "FIN_WAIT2",
        TcpState::CloseWait => "CLOSE_WAIT",
        TcpState::Closing => "CLOSING",
        TcpState::LastAck => "LAST_ACK",
        TcpState::TimeWait => "TIME_WAIT",
        _ => "UNKNOWN",
    }
}
