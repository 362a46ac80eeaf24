use std::fmt;
use std::str::FromStr;

/// How the distribution is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// One server process, readiness read from `server-state`.
    Standalone,
    /// Process controller, host controller and managed servers.
    Domain,
}

impl Topology {
    pub const ALL: [Topology; 2] = [Topology::Standalone, Topology::Domain];

    /// Mode name, which is also the start script stem.
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::Standalone => "standalone",
            Topology::Domain => "domain",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "standalone" => Ok(Topology::Standalone),
            "domain" => Ok(Topology::Domain),
            other => Err(format!("Unknown server mode: {}", other)),
        }
    }
}
