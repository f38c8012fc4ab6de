use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

/// Address and port of one side of a connection, kept as the literal text the
/// source reported. Two endpoints are equal only if both texts are identical.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Endpoint {
    pub addr: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(addr: impl Into<String>, port: impl Into<String>) -> Self {
        Self { addr: addr.into(), port: port.into() }
    }

    pub fn from_socket(ip: IpAddr, port: u16) -> Self {
        Self { addr: ip.to_string(), port: port.to_string() }
    }

    /// Splits `addr:port` at the last colon. `[::1]:22` keeps its brackets and
    /// `*:*` is taken as is.
    pub fn parse(text: &str) -> Self {
        match text.rsplit_once(':') {
            Some((addr, port)) => Self::new(addr, port),
            None => Self::new(text, ""),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Directional `local -> remote` pair used to join the ss table with the
/// process socket listing.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct ConnectionKey {
    pub local: Endpoint,
    pub remote: Endpoint,
}

impl ConnectionKey {
    pub fn new(local: Endpoint, remote: Endpoint) -> Self {
        Self { local, remote }
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.local, self.remote)
    }
}

/// Recv-Q / Send-Q figures exactly as `ss` printed them. These are queue depths
/// at sample time, not cumulative byte counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueCounters {
    pub rx: String,
    pub tx: String,
}

pub type StatsTable = HashMap<ConnectionKey, QueueCounters>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SocketConnection {
    pub local: Endpoint,
    pub remote: Endpoint,
    pub state: String,
}

impl SocketConnection {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.local.clone(), self.remote.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportRow {
    pub pid: u32,
    pub name: String,
    pub local: String,
    pub remote: String,
    pub state: String,
    pub rx: String,
    pub tx: String,
}
