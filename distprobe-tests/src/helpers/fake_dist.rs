//! A fake server distribution for driving the harness end to end.
//!
//! The start scripts behave like the real ones as far as the harness can
//! tell: they answer `--help`, honour `-Djboss.server.log.dir`, publish their
//! lifecycle through files read by [`FileControlPlane`], and exit once a
//! `shutdown` has been accepted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use distprobe_harness::config::DEFAULT_HOME_MARKER;
use distprobe_harness::{HarnessConfig, Platform};
use tracing::debug;

use super::file_control::FileControlPlane;

/// Environment variable telling the fake scripts where to publish state.
pub const STATE_DIR_ENV: &str = "DISTPROBE_FAKE_STATE";

pub const STANDALONE_SCRIPT: &str = r#"#!/bin/sh
state="$DISTPROBE_FAKE_STATE"
log_dir="$PWD/standalone/log"
for arg in "$@"; do
    case "$arg" in
        --help)
            echo "Usage: standalone.sh [args...]"
            echo "where args include:"
            echo "    -b=<value>    Set system property jboss.bind.address"
            exit 0
            ;;
        -Djboss.server.log.dir=*)
            log_dir="${arg#-Djboss.server.log.dir=}"
            ;;
    esac
done

set_state() {
    echo "$1" > "$state/.server-state.tmp" && mv "$state/.server-state.tmp" "$state/server-state"
}
cleanup() {
    rm -f "$state/server-state" "$state/shutdown"
}
trap 'cleanup; exit 143' TERM

echo "JBOSS_HOME: $PWD"
mkdir -p "$log_dir"
set_state starting
echo "Server booting" > "$log_dir/server.log"
sleep 1
set_state running
echo "Server started"
while [ ! -f "$state/shutdown" ]; do
    sleep 0.1
done
set_state stopping
echo "Server stopping"
cleanup
exit 0
"#;

pub const DOMAIN_SCRIPT: &str = r#"#!/bin/sh
state="$DISTPROBE_FAKE_STATE"
for arg in "$@"; do
    case "$arg" in
        --help)
            echo "Usage: domain.sh [args...]"
            exit 0
            ;;
    esac
done

members() {
    printf '{"master":{"server-one":{"group":"main-server-group","status":"%s"},"server-two":{"group":"main-server-group","status":"%s"},"server-three":{"group":"other-server-group","status":"DISABLED"}}}\n' "$1" "$2" > "$state/.members.tmp"
    mv "$state/.members.tmp" "$state/members.json"
}
cleanup() {
    rm -f "$state/members.json" "$state/shutdown" "$state/stop-servers"
}
trap 'cleanup; exit 143' TERM

echo "JBOSS_HOME: $PWD"
members STARTING STARTING
sleep 1
members STARTED STARTING
sleep 1
members STARTED STARTED
echo "Domain started"
while [ ! -f "$state/stop-servers" ] && [ ! -f "$state/shutdown" ]; do
    sleep 0.1
done
members STOPPED STOPPED
while [ ! -f "$state/shutdown" ]; do
    sleep 0.1
done
echo "Domain stopping"
cleanup
exit 0
"#;

pub const CLI_SCRIPT: &str = r#"#!/bin/sh
state="$DISTPROBE_FAKE_STATE"
connect=false
command=""
for arg in "$@"; do
    case "$arg" in
        -c|--connect) connect=true ;;
        --command=*) command="${arg#--command=}" ;;
    esac
done
if [ "$connect" != true ] || [ ! -f "$state/server-state" ]; then
    echo "Failed to connect to the controller"
    exit 1
fi
if [ "$command" = ":shutdown" ]; then
    : > "$state/shutdown"
    echo '{"outcome" => "success"}'
    exit 0
fi
echo "Unknown command $command"
exit 1
"#;

/// Script that dies immediately, for startup failure paths.
pub const FAILING_SCRIPT: &str = "#!/bin/sh\necho \"Address already in use\"\nexit 1\n";

pub struct FakeDistribution {
    home: PathBuf,
    state_dir: PathBuf,
}

impl FakeDistribution {
    /// Lay out `<root>/dist` and an empty `<root>/state`.
    pub fn create(root: &Path) -> io::Result<Self> {
        let home = root.join("dist");
        let state_dir = root.join("state");
        fs::create_dir_all(home.join("bin"))?;
        fs::create_dir_all(home.join("standalone/configuration"))?;
        fs::create_dir_all(&state_dir)?;
        fs::write(home.join(DEFAULT_HOME_MARKER), b"PK")?;

        let dist = Self { home, state_dir };
        dist.write_script("standalone.sh", STANDALONE_SCRIPT)?;
        dist.write_script("domain.sh", DOMAIN_SCRIPT)?;
        dist.write_script("jboss-cli.sh", CLI_SCRIPT)?;
        debug!("Created fake distribution at {}", dist.home.display());
        Ok(dist)
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Replace or add an executable script under `bin/`.
    pub fn write_script(&self, name: &str, body: &str) -> io::Result<()> {
        let path = self.home.join("bin").join(name);
        fs::write(&path, body)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        }
        Ok(())
    }

    /// Harness configuration pointed at this distribution, with short
    /// grace periods so tests stay quick.
    pub fn config(&self, tmp_dir: &Path) -> HarnessConfig {
        let mut config = HarnessConfig::new(&self.home)
            .with_platform(Platform::Unix)
            .with_tmp_dir(tmp_dir)
            .with_env(STATE_DIR_ENV, self.state_dir.to_string_lossy());
        config.startup_timeout = Duration::from_secs(15);
        config.shutdown_timeout = Duration::from_secs(15);
        config.stop_grace = Duration::from_millis(300);
        config.destroy_grace = Duration::from_secs(2);
        config.settle_delay = Duration::ZERO;
        config
    }

    pub fn control_plane(&self) -> FileControlPlane {
        FileControlPlane::new(&self.state_dir)
    }
}
