use clap::Subcommand;
use distprobe_harness::Topology;

use crate::orchestrator::{Plan, Scenario};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start each server mode from directories with unusual names
    Paths {
        /// Only test this server mode (standalone or domain)
        #[arg(long)]
        topology: Option<Topology>,

        /// Extra arguments for the server start scripts
        #[arg(last = true)]
        server_args: Vec<String>,
    },
    /// Check the --help output of each start script
    Help,
    /// Override the standalone log directory with awkward names
    LogDir,
    /// Shut standalone servers down through the management CLI script
    Cli,
    /// Run every scenario
    All {
        /// Extra arguments for the server start scripts
        #[arg(last = true)]
        server_args: Vec<String>,
    },
}

impl Commands {
    /// What to run for this command.
    pub fn plan(&self) -> Plan {
        match self {
            Commands::Paths {
                topology,
                server_args,
            } => Plan {
                scenarios: vec![Scenario::Paths],
                topologies: topology.map_or_else(|| Topology::ALL.to_vec(), |t| vec![t]),
                server_args: server_args.clone(),
            },
            Commands::Help => Plan::only(Scenario::Help),
            Commands::LogDir => Plan::only(Scenario::LogDir),
            Commands::Cli => Plan::only(Scenario::Cli),
            Commands::All { server_args } => Plan {
                server_args: server_args.clone(),
                ..Plan::default()
            },
        }
    }
}
