//! First-time cluster initialization.
//!
//! [`ClusterBootstrap`] walks a small state machine:
//!
//! ```text
//! Uninitialized -> InitRequested ---------------> PollingLabels -> Ready
//!                       |                              ^      \
//!                       v                              |       v
//!               AmbiguousAddress -> RetryWithAddress --+     Degraded
//!                                          |
//!                                          v
//!                                        Failed
//! ```
//!
//! An init rejected because the host has several candidate addresses is
//! retried once with the best-ranked address from the error text. Once the
//! cluster exists, the label store is polled until the cluster object is
//! observable and the pre-cluster buffer has been migrated into it. A run
//! that runs out of poll attempts leaves the machine `Degraded`; the next run
//! skips the init and goes back to polling.
mod address;
mod error;

pub use address::{AddressVariant, is_ambiguity, ranked_candidates};
pub use error::BootstrapError;

use std::net::Ipv4Addr;

use hive_model::SwarmInitRequest;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{context::Context, metrics::BootstrapOutcome, store::LoadOutcome};

/// Current position of the bootstrap state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BootstrapState {
    Uninitialized,
    InitRequested,
    AmbiguousAddress {
        candidates: Vec<Ipv4Addr>,
        variant: AddressVariant,
    },
    RetryWithAddress {
        address: Ipv4Addr,
        variant: AddressVariant,
    },
    PollingLabels {
        attempt: u32,
    },
    /// Cluster initialized, buffered configuration not migrated yet.
    Degraded {
        attempts: u32,
    },
    Ready,
    Failed {
        reason: String,
    },
}

/// Outcome of a bootstrap run that did not fail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    /// Node id returned by the init call; `None` when no init was issued.
    pub node_id: Option<String>,
    /// The cluster was ready before this run; nothing was done.
    pub already_ready: bool,
    /// Pre-cluster configuration now lives in the cluster object.
    pub migrated: bool,
    /// Address used for the init retry, if one was needed.
    pub address: Option<Ipv4Addr>,
    pub candidates: Vec<Ipv4Addr>,
    pub poll_attempts: u32,
}

impl BootstrapReport {
    /// Cluster initialized but configuration not migrated yet.
    pub fn is_partial(&self) -> bool {
        !self.migrated
    }

    pub fn message(&self) -> &'static str {
        if self.already_ready {
            "Swarm already initialized"
        } else if self.migrated {
            "Swarm initialized successfully"
        } else {
            "Swarm initialized; configuration not yet migrated"
        }
    }
}

/// Drives first-time cluster initialization.
pub struct ClusterBootstrap {
    ctx: Context,
    state: Mutex<BootstrapState>,
    /// Concurrent onboarding requests run one at a time.
    running: tokio::sync::Mutex<()>,
}

impl ClusterBootstrap {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            state: Mutex::new(BootstrapState::Uninitialized),
            running: tokio::sync::Mutex::new(()),
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state.lock().clone()
    }

    pub fn is_ready(&self) -> bool {
        *self.state.lock() == BootstrapState::Ready
    }

    fn transition(&self, next: BootstrapState) {
        debug!(state = ?next, "bootstrap transition");
        *self.state.lock() = next;
    }

    /// Bring the cluster up and migrate buffered configuration into it.
    ///
    /// Returns immediately when the cluster is ready and nothing waits for
    /// migration. An existing cluster with buffered configuration is not
    /// initialized again, only migrated. Exhausting the poll budget is not an
    /// error: the report says `migrated == false` and the machine is left
    /// `Degraded`.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self) -> Result<BootstrapReport, BootstrapError> {
        let _running = self.running.lock().await;
        let store = self.ctx.store();

        if self.is_ready() && store.is_observed() && !store.needs_migration() {
            return Ok(self.already_ready());
        }

        let observed = store.load().await.is_observed();
        if store.is_observed() && !store.needs_migration() {
            self.transition(BootstrapState::Ready);
            return Ok(self.already_ready());
        }

        let mut report = if observed {
            info!("cluster exists; migrating buffered configuration");
            BootstrapReport::default()
        } else {
            match self.initialize().await {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %e, "cluster init failed");
                    self.transition(BootstrapState::Failed {
                        reason: e.to_string(),
                    });
                    self.ctx.metrics().record_bootstrap(BootstrapOutcome::Failed);
                    return Err(e);
                }
            }
        };

        self.poll_labels(&mut report).await;

        let outcome = if report.migrated {
            self.transition(BootstrapState::Ready);
            info!(attempts = report.poll_attempts, "cluster ready");
            BootstrapOutcome::Ready
        } else {
            self.transition(BootstrapState::Degraded {
                attempts: report.poll_attempts,
            });
            warn!(attempts = report.poll_attempts, "cluster initialized; configuration not migrated yet");
            BootstrapOutcome::Partial
        };
        self.ctx.metrics().record_bootstrap(outcome);
        Ok(report)
    }

    fn already_ready(&self) -> BootstrapReport {
        self.ctx.metrics().record_bootstrap(BootstrapOutcome::AlreadyReady);
        BootstrapReport {
            already_ready: true,
            migrated: !self.ctx.store().needs_migration(),
            ..Default::default()
        }
    }

    /// Issue the init call, retrying once with an explicit address if asked to.
    async fn initialize(&self) -> Result<BootstrapReport, BootstrapError> {
        let engine = self.ctx.engine();
        let mut report = BootstrapReport::default();

        self.transition(BootstrapState::InitRequested);
        let err = match engine.init_swarm(&SwarmInitRequest::default()).await {
            Ok(id) => {
                report.node_id = Some(checked_id(id)?);
                return Ok(report);
            }
            Err(e) => e,
        };

        let message = err.message();
        if already_member(&message) {
            info!("node is already part of a cluster");
            return Ok(report);
        }
        let candidates = ranked_candidates(&message);
        let Some(&address) = candidates.first().filter(|_| is_ambiguity(&message)) else {
            return Err(err.into());
        };

        let variant = AddressVariant::from_message(&message);
        self.transition(BootstrapState::AmbiguousAddress {
            candidates: candidates.clone(),
            variant,
        });
        info!(candidates = ?candidates, ?variant, "engine asked for an address; retrying");

        self.transition(BootstrapState::RetryWithAddress { address, variant });
        let addr = address.to_string();
        let req = match variant {
            AddressVariant::Listen => SwarmInitRequest::listen_on(&addr),
            AddressVariant::Advertise => SwarmInitRequest::advertise(&addr),
        };
        match engine.init_swarm(&req).await {
            Ok(id) => {
                report.node_id = Some(checked_id(id)?);
                report.address = Some(address);
                report.candidates = candidates;
                Ok(report)
            }
            Err(e) => Err(BootstrapError::AmbiguousAddress {
                candidates,
                message: e.message(),
            }),
        }
    }

    async fn poll_labels(&self, report: &mut BootstrapReport) {
        let store = self.ctx.store();
        let cfg = self.ctx.config();

        for attempt in 1..=cfg.bootstrap_attempts {
            self.transition(BootstrapState::PollingLabels { attempt });
            report.poll_attempts = attempt;
            tokio::time::sleep(cfg.bootstrap_poll()).await;

            let LoadOutcome::Observed(cluster) = store.load().await else {
                debug!(attempt, "cluster object not observable yet");
                continue;
            };
            if store.is_observed() && !store.needs_migration() {
                report.migrated = true;
                return;
            }
            match store.migrate(cluster).await {
                Ok(()) => {
                    report.migrated = true;
                    return;
                }
                Err(e) => debug!(attempt, error = %e, "label migration rejected; retrying"),
            }
        }
    }
}

fn already_member(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already part of a swarm")
}

fn checked_id(id: String) -> Result<String, BootstrapError> {
    let id = id.trim().trim_matches('"').to_string();
    if (10..=64).contains(&id.len()) && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(id)
    } else {
        Err(BootstrapError::MalformedId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{engine::EngineError, testing::FakeEngine};
    use hive_model::SwarmLabel;
    use std::sync::Arc;

    fn setup(engine: &Arc<FakeEngine>) -> (Context, ClusterBootstrap) {
        let ctx = Context::with_engine(engine.clone());
        (ctx.clone(), ClusterBootstrap::new(ctx))
    }

    #[test]
    fn cluster_ids_are_checked() {
        assert!(checked_id("k3x9tq0v2m8wz4p7r1n6c5b2d".into()).is_ok());
        assert_eq!(checked_id("\"abcdef0123\"\n".into()).unwrap(), "abcdef0123");
        assert!(checked_id("short".into()).is_err());
        assert!(checked_id("not-a-node-id-at-all".into()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_node_initializes_and_migrates() {
        let engine = Arc::new(FakeEngine::new());
        let (ctx, boot) = setup(&engine);
        ctx.store().set(&SwarmLabel::PanelTint, "120");

        let report = boot.run().await.unwrap();

        assert!(report.migrated);
        assert!(report.node_id.is_some());
        assert_eq!(report.message(), "Swarm initialized successfully");
        assert_eq!(boot.state(), BootstrapState::Ready);
        assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("120"));
        assert!(!ctx.store().needs_migration());
    }

    #[tokio::test(start_paused = true)]
    async fn ambiguous_address_is_retried_with_the_best_candidate() {
        let engine = Arc::new(FakeEngine::new());
        engine.script_init(Err(EngineError::api(
            400,
            "could not choose an IP address to advertise since this system has multiple addresses on interface eth0 (10.0.0.5 and 10.0.0.9)",
        )));
        let (_ctx, boot) = setup(&engine);

        let report = boot.run().await.unwrap();

        assert_eq!(report.candidates, vec![Ipv4Addr::new(10, 0, 0, 5), Ipv4Addr::new(10, 0, 0, 9)]);
        assert_eq!(report.address, Some(Ipv4Addr::new(10, 0, 0, 5)));
        let calls = engine.init_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].advertise_addr.as_deref(), Some("10.0.0.5"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_retry_reports_the_candidates() {
        let engine = Arc::new(FakeEngine::new());
        let ambiguous = "could not choose an IP address to listen on: multiple addresses (10.0.0.5 and 10.0.0.9)";
        engine.script_init(Err(EngineError::api(400, ambiguous)));
        engine.script_init(Err(EngineError::api(400, "listen failed")));
        let (_ctx, boot) = setup(&engine);

        let err = boot.run().await.unwrap_err();
        assert!(matches!(err, BootstrapError::AmbiguousAddress { ref candidates, .. } if candidates.len() == 2));
        assert_eq!(engine.init_calls()[1].listen_addr, "10.0.0.5:2377");
        assert!(matches!(boot.state(), BootstrapState::Failed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn other_init_errors_fail_without_retry() {
        let engine = Arc::new(FakeEngine::new());
        engine.script_init(Err(EngineError::api(500, "raft backend unavailable")));
        let (_ctx, boot) = setup(&engine);

        assert!(matches!(boot.run().await, Err(BootstrapError::Engine(_))));
        assert_eq!(engine.init_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_id_fails() {
        let engine = Arc::new(FakeEngine::new());
        engine.script_init(Ok("??".into()));
        let (_ctx, boot) = setup(&engine);

        assert!(matches!(boot.run().await, Err(BootstrapError::MalformedId(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn second_run_is_a_no_op() {
        let engine = Arc::new(FakeEngine::new());
        let (_ctx, boot) = setup(&engine);

        boot.run().await.unwrap();
        let report = boot.run().await.unwrap();

        assert!(report.already_ready);
        assert_eq!(engine.init_calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn existing_cluster_is_ready_without_init() {
        let engine = Arc::new(FakeEngine::with_cluster());
        let (_ctx, boot) = setup(&engine);

        let report = boot.run().await.unwrap();
        assert!(report.already_ready);
        assert!(engine.init_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unobservable_cluster_is_a_partial_success() {
        let engine = Arc::new(FakeEngine::new());
        let (ctx, boot) = setup(&engine);
        ctx.store().set(&SwarmLabel::PanelTint, "1");

        // Init succeeds but the cluster object never becomes readable.
        engine.hide_swarm(true);
        let report = boot.run().await.unwrap();

        assert!(report.is_partial());
        assert_eq!(report.poll_attempts, 20);
        assert!(ctx.store().needs_migration());
        assert_eq!(boot.state(), BootstrapState::Degraded { attempts: 20 });
        assert!(!boot.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_run_is_finished_by_the_next_one() {
        let engine = Arc::new(FakeEngine::new());
        let (ctx, boot) = setup(&engine);
        ctx.store().set(&SwarmLabel::PanelTint, "1");

        engine.hide_swarm(true);
        assert!(boot.run().await.unwrap().is_partial());

        engine.hide_swarm(false);
        let report = boot.run().await.unwrap();

        assert!(report.migrated);
        assert!(!report.already_ready);
        assert_eq!(engine.init_calls().len(), 1);
        assert!(ctx.store().is_observed());
        assert!(!ctx.store().needs_migration());
        assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("1"));
        assert_eq!(boot.state(), BootstrapState::Ready);

        let again = boot.run().await.unwrap();
        assert!(again.already_ready && again.migrated);
    }
}
