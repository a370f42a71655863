//! Process-wide log subscriber.
//!
//! Installs a `tracing` subscriber once, at startup, writing either to
//! stderr or to the runtime's log forwarding socket. The filter comes from
//! `RUST_LOG` and falls back to `info`.
//!
//! The forwarding socket may not be listening yet when the process starts,
//! so connecting is retried under a [`RetryPolicy`]. Running out of retries
//! is fatal to startup.

use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::Error;
use crate::retry::{RetryPolicy, retry};

/// Where the runtime's log forwarder listens.
pub const LOG_SOCKET_PATH: &str = "/var/lib/encore/applog.sock";

/// Destination for log output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// Human-readable lines on stderr.
    Stderr,
    /// JSON lines into a Unix stream socket.
    Socket(PathBuf),
}

impl Default for LogTarget {
    fn default() -> Self {
        Self::Socket(PathBuf::from(LOG_SOCKET_PATH))
    }
}

/// Installs the global subscriber. May be called once per process.
pub fn init(target: LogTarget, policy: &RetryPolicy) -> Result<(), Error> {
    let layer = match target {
        LogTarget::Stderr => fmt::layer().with_writer(std::io::stderr).boxed(),
        LogTarget::Socket(path) => {
            let sock = connect(&path, policy)?;
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(sock))
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;
    Ok(())
}

#[cfg(unix)]
fn connect(
    path: &std::path::Path,
    policy: &RetryPolicy,
) -> Result<std::os::unix::net::UnixStream, Error> {
    use std::os::unix::net::UnixStream;

    // No global subscriber exists yet; report retries on stderr meanwhile.
    let bootstrap = tracing_subscriber::fmt().with_writer(std::io::stderr).finish();
    tracing::subscriber::with_default(bootstrap, || {
        retry(policy, "dial logging socket", || UnixStream::connect(path))
    })
    .map_err(Error::LogSocket)
}

#[cfg(not(unix))]
fn connect(path: &std::path::Path, _policy: &RetryPolicy) -> Result<std::fs::File, Error> {
    let err = std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        format!("unix sockets unavailable: {}", path.display()),
    );
    Err(Error::LogSocket(crate::retry::RetryError { attempts: 0, last: err }))
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixListener;
    use std::time::Duration;

    use super::*;

    #[test]
    fn connect_succeeds_once_listener_exists() {
        let dir = std::env::temp_dir().join(format!("gantry-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("applog.sock");
        let _ = std::fs::remove_file(&path);
        let _listener = UnixListener::bind(&path).unwrap();

        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert!(connect(&path, &policy).is_ok());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn connect_gives_up_on_missing_socket() {
        let path = std::env::temp_dir().join("gantry-log-missing.sock");
        let policy = RetryPolicy::new(2, Duration::ZERO);
        match connect(&path, &policy) {
            Err(Error::LogSocket(e)) => assert_eq!(e.attempts, 3),
            other => panic!("expected LogSocket error, got {other:?}"),
        }
    }
}
