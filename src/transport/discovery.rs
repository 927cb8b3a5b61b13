//! Fan-out race over transport candidates
//!
//! Every candidate is probed concurrently. The first successful probe wins;
//! the race settles to [`TransportError::Unavailable`] when every probe
//! fails or the deadline passes first. Losing probes are aborted, and any
//! that managed to connect anyway are closed.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;

use super::probe::{TransportConnection, TransportProbe};
use crate::utils::Result;
use crate::utils::error::TransportError;

/// Winning endpoint with its open probe connection
pub struct Discovered {
    pub endpoint: String,
    pub connection: Box<dyn TransportConnection>,
}

impl Discovered {
    /// Close the probe connection and keep only the address
    pub async fn into_endpoint(mut self) -> String {
        self.connection.close().await;
        self.endpoint
    }
}

impl std::fmt::Debug for Discovered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Discovered")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

type ProbeOutcome = (String, Result<Box<dyn TransportConnection>>);

/// Race `candidates` against each other and against `deadline`
pub async fn discover(
    candidates: Vec<String>,
    probe: Arc<dyn TransportProbe>,
    deadline: Duration,
) -> Result<Discovered> {
    if candidates.is_empty() {
        return Err(TransportError::Unavailable.into());
    }
    log::info!(
        "probing {} transport candidates (deadline {:?})",
        candidates.len(),
        deadline
    );

    let mut attempts: JoinSet<ProbeOutcome> = JoinSet::new();
    for endpoint in candidates {
        let probe = Arc::clone(&probe);
        attempts.spawn(async move {
            let outcome = probe.connect(&endpoint).await;
            (endpoint, outcome)
        });
    }

    let timeout = tokio::time::sleep(deadline);
    tokio::pin!(timeout);

    let winner = loop {
        tokio::select! {
            // A success that is ready together with the deadline still wins
            biased;
            joined = attempts.join_next() => match joined {
                Some(Ok((endpoint, Ok(connection)))) => {
                    break Some(Discovered { endpoint, connection });
                }
                Some(Ok((endpoint, Err(e)))) => {
                    log::debug!("candidate {} failed: {}", endpoint, e);
                }
                Some(Err(e)) => {
                    log::warn!("probe task failed: {}", e);
                }
                None => break None,
            },
            _ = &mut timeout => {
                log::warn!("transport discovery timed out after {:?}", deadline);
                break None;
            }
        }
    };

    close_losers(attempts).await;

    match winner {
        Some(discovered) => {
            log::info!("transport endpoint selected: {}", discovered.endpoint);
            Ok(discovered)
        }
        None => Err(TransportError::Unavailable.into()),
    }
}

async fn close_losers(mut attempts: JoinSet<ProbeOutcome>) {
    attempts.abort_all();
    while let Some(joined) = attempts.join_next().await {
        if let Ok((endpoint, Ok(mut connection))) = joined {
            log::debug!("closing losing connection to {}", endpoint);
            connection.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ShellError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted outcome per endpoint
    #[derive(Clone, Copy)]
    enum Script {
        Fail(u64),
        Connect(u64),
    }

    struct ScriptedProbe {
        scripts: HashMap<String, Script>,
        closed: Arc<AtomicUsize>,
        started: Mutex<Vec<String>>,
    }

    impl ScriptedProbe {
        fn new(scripts: &[(&str, Script)]) -> Self {
            Self {
                scripts: scripts
                    .iter()
                    .map(|(e, s)| (e.to_string(), *s))
                    .collect(),
                closed: Arc::new(AtomicUsize::new(0)),
                started: Mutex::new(Vec::new()),
            }
        }
    }

    struct CountingConnection {
        endpoint: String,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TransportConnection for CountingConnection {
        fn endpoint(&self) -> &str {
            &self.endpoint
        }

        async fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TransportProbe for ScriptedProbe {
        async fn connect(&self, endpoint: &str) -> Result<Box<dyn TransportConnection>> {
            self.started.lock().unwrap().push(endpoint.to_string());
            match self.scripts[endpoint] {
                Script::Fail(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Err(TransportError::Connect {
                        endpoint: endpoint.to_string(),
                        reason: "refused".to_string(),
                    }
                    .into())
                }
                Script::Connect(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(Box::new(CountingConnection {
                        endpoint: endpoint.to_string(),
                        closed: Arc::clone(&self.closed),
                    }))
                }
            }
        }
    }

    fn list(endpoints: &[&str]) -> Vec<String> {
        endpoints.iter().map(|e| e.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_wins_well_before_deadline() {
        let probe = Arc::new(ScriptedProbe::new(&[
            ("wss://a", Script::Fail(0)),
            ("wss://b", Script::Fail(0)),
            ("wss://c", Script::Connect(200)),
        ]));

        let started = tokio::time::Instant::now();
        let found = discover(
            list(&["wss://a", "wss://b", "wss://c"]),
            probe.clone(),
            Duration::from_secs(10),
        )
        .await
        .unwrap();

        assert_eq!(found.endpoint, "wss://c");
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(probe.started.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_fail_is_unavailable() {
        let probe = Arc::new(ScriptedProbe::new(&[
            ("wss://a", Script::Fail(10)),
            ("wss://b", Script::Fail(20)),
        ]));
        let err = discover(list(&["wss://a", "wss://b"]), probe, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Transport(TransportError::Unavailable)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_beats_late_success() {
        let probe = Arc::new(ScriptedProbe::new(&[("wss://slow", Script::Connect(15_000))]));
        let started = tokio::time::Instant::now();
        let err = discover(list(&["wss://slow"]), probe, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ShellError::Transport(TransportError::Unavailable)));
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_simultaneous_winners_close_the_loser() {
        let probe = Arc::new(ScriptedProbe::new(&[
            ("wss://a", Script::Connect(100)),
            ("wss://b", Script::Connect(100)),
        ]));
        let found = discover(list(&["wss://a", "wss://b"]), probe.clone(), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(found.endpoint == "wss://a" || found.endpoint == "wss://b");
        // Winner stays open; a loser that also connected is closed, the
        // other possibility is that it was aborted before connecting
        assert!(probe.closed.load(Ordering::SeqCst) <= 1);

        found.into_endpoint().await;
        assert!(probe.closed.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let probe = Arc::new(ScriptedProbe::new(&[]));
        assert!(discover(Vec::new(), probe, Duration::from_secs(1)).await.is_err());
    }
}
