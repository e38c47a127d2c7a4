//! Network reachability probe with a bounded retry loop.

use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Tracing target for reachability checks.
const NETWORK_TARGET: &str = "winhome_engine::network";

/// A single reachability attempt.
pub trait NetworkProbe: Send + Sync {
    /// Returns `true` when the network is reachable.
    fn probe(&self) -> bool;
}

/// Probe that opens a TCP connection to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    address: String,
    connect_timeout: Duration,
}

impl TcpProbe {
    /// Probe against `address` (for example `github.com:443`).
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

impl NetworkProbe for TcpProbe {
    fn probe(&self) -> bool {
        let Ok(addresses) = self.address.to_socket_addrs() else {
            return false;
        };
        addresses
            .into_iter()
            .any(|address| TcpStream::connect_timeout(&address, self.connect_timeout).is_ok())
    }
}

/// Probe settings used by the engine.
#[derive(Clone)]
pub struct NetworkCheck {
    probe: Arc<dyn NetworkProbe>,
    timeout: Duration,
    interval: Duration,
}

impl NetworkCheck {
    /// Retries `probe` every `interval` until it succeeds or `timeout` passes.
    #[must_use]
    pub fn new(probe: Arc<dyn NetworkProbe>, timeout: Duration, interval: Duration) -> Self {
        Self {
            probe,
            timeout,
            interval,
        }
    }

    /// Blocks until the network answers or the budget runs out. Returns
    /// whether it answered.
    #[must_use]
    pub fn wait(&self) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            if self.probe.probe() {
                debug!(target: NETWORK_TARGET, attempts, "network reachable");
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(target: NETWORK_TARGET, attempts, "network unreachable");
                return false;
            }
            thread::sleep(self.interval.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    struct CountingProbe {
        succeed_on: u32,
        calls: AtomicU32,
    }

    impl NetworkProbe for CountingProbe {
        fn probe(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) + 1 >= self.succeed_on
        }
    }

    fn probe(succeed_on: u32) -> Arc<CountingProbe> {
        Arc::new(CountingProbe {
            succeed_on,
            calls: AtomicU32::new(0),
        })
    }

    #[test]
    fn returns_once_the_probe_succeeds() {
        let probe = probe(3);
        let check = NetworkCheck::new(probe.clone(), Duration::from_secs(5), Duration::from_millis(5));
        assert!(check.wait());
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_the_timeout() {
        let probe = probe(u32::MAX);
        let check = NetworkCheck::new(probe, Duration::from_millis(100), Duration::from_millis(20));
        let started = Instant::now();
        assert!(!check.wait());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn unresolvable_host_is_unreachable() {
        assert!(!TcpProbe::new("invalid host name without port").probe());
    }
}
