//! Periodic reachability probing.
//!
//! The probe loop polls connectivity only. It feeds observations into the
//! monitor, which decides whether a signal is due; the queue itself is never
//! polled.

use super::ConnectivityMonitor;
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One-shot reachability check.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Whether the network is reachable right now.
    async fn check(&self) -> bool;
}

/// Probe that issues a GET to a fixed URL.
///
/// Any HTTP response counts as reachable, whatever its status. Connection
/// errors and timeouts count as unreachable.
pub struct HttpProbe {
    url: String,
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: impl Into<String>, client: Client, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            client,
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    fn name(&self) -> &str {
        "http-probe"
    }

    async fn check(&self) -> bool {
        match self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => {
                tracing::trace!(url = %self.url, status = %response.status(), "Probe reachable");
                true
            }
            Err(e) => {
                tracing::trace!(url = %self.url, error = %e, "Probe unreachable");
                false
            }
        }
    }
}

/// Background task running a probe on a fixed interval.
pub struct ProbeLoop {
    probe: Arc<dyn ReachabilityProbe>,
    monitor: Arc<ConnectivityMonitor>,
    interval: Duration,
}

impl ProbeLoop {
    pub fn new(
        probe: Arc<dyn ReachabilityProbe>,
        monitor: Arc<ConnectivityMonitor>,
        interval: Duration,
    ) -> Self {
        Self {
            probe,
            monitor,
            interval,
        }
    }

    /// Run one probe and report the result.
    pub async fn probe_once(&self) -> bool {
        let reachable = self.probe.check().await;
        self.monitor.observe(reachable, self.probe.name());
        reachable
    }

    /// Start the loop. The first probe runs immediately.
    pub fn start(self, cancel_token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            tracing::info!(
                probe = self.probe.name(),
                interval_seconds = self.interval.as_secs(),
                "Reachability probe started"
            );

            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => {
                        tracing::info!("Reachability probe shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.probe_once().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Scripted {
        results: Mutex<VecDeque<bool>>,
    }

    #[async_trait]
    impl ReachabilityProbe for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn check(&self) -> bool {
            self.results.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    #[tokio::test]
    async fn test_http_probe_any_response_is_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(server.uri(), Client::new(), Duration::from_secs(1));
        assert!(probe.check().await);
    }

    #[tokio::test]
    async fn test_http_probe_refused_is_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = HttpProbe::new(
            format!("http://127.0.0.1:{}/", port),
            Client::new(),
            Duration::from_secs(1),
        );
        assert!(!probe.check().await);
    }

    #[tokio::test]
    async fn test_http_probe_timeout_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(server.uri(), Client::new(), Duration::from_millis(100));
        assert!(!probe.check().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_loop_feeds_monitor() {
        let monitor = ConnectivityMonitor::new(true, Duration::ZERO);
        let mut signals = monitor.subscribe();
        let probe = Arc::new(Scripted {
            results: Mutex::new(VecDeque::from([false, true])),
        });

        let cancel = CancellationToken::new();
        let handle =
            ProbeLoop::new(probe, monitor.clone(), Duration::from_secs(10)).start(cancel.clone());

        // First tick runs at once: unreachable
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!monitor.is_reachable());

        // Second tick: reachable again, one signal
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(monitor.is_reachable());
        assert_eq!(signals.try_recv().unwrap().source, "scripted");

        cancel.cancel();
        handle.await.unwrap();
    }
}
