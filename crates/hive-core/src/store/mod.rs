//! Panel configuration kept in the cluster object's label map.
//!
//! [`LabelStore`] is a write-through cache. Writes land in local state first
//! (so reads see them at once) and are then persisted in the background with
//! the version index the store last observed. Until a cluster exists, writes go
//! to a pre-cluster buffer that [`LabelStore::migrate`] later folds into the
//! cluster object.
//!
//! A background write that loses the version race is dropped, not retried.
//! The registered conflict hook is told about it and the cache is resynced
//! from the engine before the next write goes out, so later writes carry the
//! current version index.
mod error;
pub use error::StoreError;

use std::{collections::BTreeMap, fmt, sync::Arc};

use hive_model::{ClusterObject, Labels, SwarmLabel};
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::{
    engine::{EngineError, EngineHandle},
    metrics::{MetricsHandle, WriteOutcome},
};

/// Called for every background write dropped on a version conflict.
pub type ConflictHook = Arc<dyn Fn(&StoreError) + Send + Sync>;

/// Result of [`LabelStore::load`].
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// The engine returned the cluster object.
    Observed(ClusterObject),
    /// The engine answered but manages no readable cluster.
    NotObserved,
    /// The engine could not be reached at all.
    Unreachable,
}

impl LoadOutcome {
    pub fn is_observed(&self) -> bool {
        matches!(self, LoadOutcome::Observed(_))
    }

    /// The engine answered, with or without a cluster.
    pub fn engine_answered(&self) -> bool {
        !matches!(self, LoadOutcome::Unreachable)
    }
}

#[derive(Default)]
struct State {
    cluster: Option<ClusterObject>,
    /// Writes made while no cluster was observed.
    buffer: Labels,
    /// Local writes not yet acknowledged (or dropped) by the engine.
    unacked: Labels,
}

struct Inner {
    engine: EngineHandle,
    metrics: MetricsHandle,
    state: RwLock<State>,
    pending: Mutex<Vec<JoinHandle<()>>>,
    /// Serializes remote writes so each one carries the freshest known version.
    lane: tokio::sync::Mutex<()>,
    on_conflict: RwLock<ConflictHook>,
}

/// Write-through label cache over the cluster object.
#[derive(Clone)]
pub struct LabelStore {
    inner: Arc<Inner>,
}

impl LabelStore {
    pub fn new(engine: EngineHandle, metrics: MetricsHandle) -> Self {
        let hook: ConflictHook = Arc::new(|err: &StoreError| warn!(error = %err, "label write lost"));
        Self {
            inner: Arc::new(Inner {
                engine,
                metrics,
                state: RwLock::new(State::default()),
                pending: Mutex::new(Vec::new()),
                lane: tokio::sync::Mutex::new(()),
                on_conflict: RwLock::new(hook),
            }),
        }
    }

    /// Replace the conflict hook. The default one logs a warning.
    pub fn on_conflict<F>(&self, hook: F)
    where
        F: Fn(&StoreError) + Send + Sync + 'static,
    {
        *self.inner.on_conflict.write() = Arc::new(hook);
    }

    /// Returns `true` once a cluster object has been adopted as the source of truth.
    pub fn is_observed(&self) -> bool {
        self.inner.state.read().cluster.is_some()
    }

    /// Returns `true` while buffered writes wait for [`LabelStore::migrate`].
    pub fn needs_migration(&self) -> bool {
        !self.inner.state.read().buffer.is_empty()
    }

    /// Version index the next remote write will carry.
    pub fn version(&self) -> Option<u64> {
        self.inner.state.read().cluster.as_ref().map(|c| c.version.index)
    }

    /// Read a label from the cluster object if observed, else from the buffer.
    ///
    /// An empty value is a tombstone and reads as `None`.
    pub fn get(&self, label: &SwarmLabel) -> Option<String> {
        let st = self.inner.state.read();
        authoritative(&st).get_set(&label.key()).map(str::to_string)
    }

    /// Copy of the authoritative label map, tombstones included.
    pub fn snapshot(&self) -> Labels {
        authoritative(&self.inner.state.read()).clone()
    }

    /// Identity to credential-hash view. Tombstoned identities are left out.
    pub fn users(&self) -> BTreeMap<String, String> {
        let st = self.inner.state.read();
        authoritative(&st)
            .with_prefix(SwarmLabel::USER_PREFIX)
            .filter(|(_, hash)| !hash.is_empty())
            .map(|(id, hash)| (id.to_string(), hash.to_string()))
            .collect()
    }

    /// Write one label. See [`LabelStore::set_all`].
    pub fn set(&self, label: &SwarmLabel, value: impl Into<String>) {
        self.write(vec![(label.key(), value.into())]);
    }

    /// Write several labels locally, then persist them in one background call.
    ///
    /// Never blocks on the engine. Without an observed cluster the entries go to
    /// the pre-cluster buffer and nothing is sent.
    pub fn set_all<I, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (SwarmLabel, V)>,
        V: Into<String>,
    {
        self.write(
            entries
                .into_iter()
                .map(|(k, v)| (k.key(), v.into()))
                .collect(),
        );
    }

    /// Number of background writes still running.
    pub fn pending(&self) -> usize {
        let mut q = self.inner.pending.lock();
        q.retain(|h| !h.is_finished());
        q.len()
    }

    /// Wait until every background write issued so far has settled.
    pub async fn flush(&self) {
        loop {
            let handles = std::mem::take(&mut *self.inner.pending.lock());
            if handles.is_empty() {
                break;
            }
            for h in handles {
                let _ = h.await;
            }
        }
    }

    /// Fetch the cluster object from the engine.
    ///
    /// Never fails: a node outside any cluster reads as
    /// [`LoadOutcome::NotObserved`], an engine that cannot be reached as
    /// [`LoadOutcome::Unreachable`], and the cache is left alone in both cases.
    /// The fetched object is adopted unless buffered writes still wait for
    /// migration.
    #[instrument(level = "debug", skip(self))]
    pub async fn load(&self) -> LoadOutcome {
        // A write landing between the fetch and the adoption would be lost.
        let _lane = self.inner.lane.lock().await;
        let mut remote = match self.inner.engine.inspect_swarm().await {
            Ok(c) => c,
            Err(EngineError::Unreachable(e)) => {
                debug!(error = %e, "engine unreachable");
                return LoadOutcome::Unreachable;
            }
            Err(e) => {
                debug!(error = %e, "cluster object not observable");
                return LoadOutcome::NotObserved;
            }
        };

        let mut st = self.inner.state.write();
        if !st.buffer.is_empty() {
            debug!(buffered = st.buffer.len(), "cluster observed; buffered labels await migration");
            return LoadOutcome::Observed(remote);
        }
        remote.spec.labels.merge(&st.unacked);
        debug!(version = remote.version.index, labels = remote.spec.labels.len(), "cluster object loaded");
        st.cluster = Some(remote.clone());
        LoadOutcome::Observed(remote)
    }

    /// Fold the pre-cluster buffer into `cluster` and make it authoritative.
    ///
    /// Buffered values win over the object's own labels, except credentials:
    /// an identity that already has a credential in the cluster keeps it. The
    /// merged map is
    /// persisted synchronously with the object's version; a rejection is
    /// returned and leaves the buffer untouched.
    #[instrument(level = "debug", skip_all, fields(version = cluster.version.index))]
    pub async fn migrate(&self, cluster: ClusterObject) -> Result<(), StoreError> {
        let buffered = self.inner.state.read().buffer.clone();
        let mut merged = cluster;
        let kept: Labels = buffered
            .iter()
            .filter(|(k, _)| {
                !(k.starts_with(SwarmLabel::USER_PREFIX) && merged.spec.labels.get_set(k).is_some())
            })
            .collect();
        if kept.len() < buffered.len() {
            warn!(
                skipped = buffered.len() - kept.len(),
                "cluster already holds credentials for buffered identities; keeping the cluster's"
            );
        }
        merged.spec.labels.merge(&kept);

        if !buffered.is_empty() {
            if let Err(e) = self
                .inner
                .engine
                .update_swarm(&merged.spec, merged.version.index)
                .await
            {
                let outcome = if e.is_conflict() {
                    WriteOutcome::Conflict
                } else {
                    WriteOutcome::Failed
                };
                self.inner.metrics.record_label_write(outcome);
                return Err(StoreError::Migrate(e));
            }
            self.inner.metrics.record_label_write(WriteOutcome::Persisted);
        }

        let late = {
            let mut st = self.inner.state.write();
            let State {
                cluster,
                buffer,
                unacked,
            } = &mut *st;
            // Entries buffered while the update was in flight were not part of it.
            let late: Labels = buffer
                .iter()
                .filter(|(k, v)| buffered.get(k) != Some(*v))
                .collect();
            merged.spec.labels.merge(&late);
            unacked.merge(&late);
            *buffer = Labels::new();
            *cluster = Some(merged);
            late
        };
        info!(keys = buffered.len(), "buffered labels migrated into cluster object");

        if !buffered.is_empty() {
            // Pick up the version index produced by our own update.
            self.load().await;
        }
        if !late.is_empty() {
            self.spawn_persist();
        }
        Ok(())
    }

    fn write(&self, entries: Vec<(String, String)>) {
        if entries.is_empty() {
            return;
        }
        let observed = {
            let mut st = self.inner.state.write();
            let State {
                cluster,
                buffer,
                unacked,
            } = &mut *st;
            match cluster.as_mut() {
                Some(c) => {
                    for (k, v) in entries {
                        c.spec.labels.insert(k.clone(), v.clone());
                        unacked.insert(k, v);
                    }
                    true
                }
                None => {
                    for (k, v) in entries {
                        buffer.insert(k, v);
                    }
                    false
                }
            }
        };

        if observed {
            self.spawn_persist();
        } else {
            self.inner.metrics.record_label_write(WriteOutcome::Buffered);
        }
    }

    fn spawn_persist(&self) {
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime; label write stays local until the next load");
            return;
        };
        let inner = Arc::clone(&self.inner);
        let handle = rt.spawn(async move { inner.persist().await });

        let mut q = self.inner.pending.lock();
        q.retain(|h| !h.is_finished());
        q.push(handle);
    }
}

impl Inner {
    async fn persist(&self) {
        let _lane = self.lane.lock().await;

        let (spec, version, written) = {
            let st = self.state.read();
            match st.cluster.as_ref() {
                Some(c) if !st.unacked.is_empty() => {
                    (c.spec.clone(), c.version.index, st.unacked.clone())
                }
                // An earlier write in the lane already carried these entries.
                _ => return,
            }
        };

        match self.engine.update_swarm(&spec, version).await {
            Ok(()) => {
                self.settle(&written);
                self.metrics.record_label_write(WriteOutcome::Persisted);
                debug!(version, keys = written.len(), "labels persisted");
                self.refresh_version(&spec.labels).await;
            }
            Err(e) if e.is_conflict() => {
                self.settle(&written);
                self.metrics.record_label_write(WriteOutcome::Conflict);
                let err = StoreError::Conflict { version };
                let hook = Arc::clone(&*self.on_conflict.read());
                hook(&err);
                self.resync().await;
            }
            Err(e) => {
                self.settle(&written);
                self.metrics.record_label_write(WriteOutcome::Failed);
                warn!(error = %e, keys = written.len(), "label write dropped");
            }
        }
    }

    /// Forget unacked entries that `written` covered. Newer local values stay.
    fn settle(&self, written: &Labels) {
        let mut st = self.state.write();
        for (k, v) in written.iter() {
            if st.unacked.get(k) == Some(v) {
                st.unacked.remove(k);
            }
        }
    }

    /// Replace the cache with the engine's cluster object, keeping local
    /// writes that are still waiting in the lane.
    async fn resync(&self) {
        let mut remote = match self.engine.inspect_swarm().await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "resync after conflict failed; next load will retry");
                return;
            }
        };
        let mut st = self.state.write();
        if st.cluster.is_none() {
            return;
        }
        remote.spec.labels.merge(&st.unacked);
        debug!(version = remote.version.index, "label cache resynced after conflict");
        st.cluster = Some(remote);
    }

    /// Adopt the post-write version index, unless someone else wrote in between.
    async fn refresh_version(&self, expected: &Labels) {
        let Ok(remote) = self.engine.inspect_swarm().await else {
            return;
        };
        if remote.spec.labels != *expected {
            debug!("cluster labels changed elsewhere; keeping the old version index");
            return;
        }
        if let Some(c) = self.state.write().cluster.as_mut() {
            c.version = remote.version;
        }
    }
}

fn authoritative(st: &State) -> &Labels {
    match &st.cluster {
        Some(c) => &c.spec.labels,
        None => &st.buffer,
    }
}

impl fmt::Debug for LabelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.inner.state.read();
        f.debug_struct("LabelStore")
            .field("observed", &st.cluster.is_some())
            .field("version", &st.cluster.as_ref().map(|c| c.version.index))
            .field("buffered", &st.buffer.len())
            .field("unacked", &st.unacked.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metrics::noop_metrics, testing::FakeEngine};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store(engine: &Arc<FakeEngine>) -> LabelStore {
        LabelStore::new(engine.clone(), noop_metrics())
    }

    #[tokio::test]
    async fn read_your_writes_before_remote_ack() {
        let engine = Arc::new(FakeEngine::with_cluster());
        let store = store(&engine);
        assert!(store.load().await.is_observed());

        store.set(&SwarmLabel::PanelTint, "120");
        assert_eq!(store.get(&SwarmLabel::PanelTint).as_deref(), Some("120"));
        assert_eq!(engine.cluster_label("hive.panel.tint"), None);

        store.flush().await;
        assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("120"));
    }

    #[tokio::test]
    async fn sequential_writes_all_reach_the_engine() {
        let engine = Arc::new(FakeEngine::with_cluster());
        let store = store(&engine);
        store.load().await;

        store.set(&SwarmLabel::PanelTint, "1");
        store.set(&SwarmLabel::PanelPort, "8080");
        store.set_all([
            (SwarmLabel::ProxyService, "hive-caddy"),
            (SwarmLabel::ProxyVolume, "hive_caddy"),
        ]);
        store.flush().await;

        assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("1"));
        assert_eq!(engine.cluster_label("hive.panel.port").as_deref(), Some("8080"));
        assert_eq!(engine.cluster_label("hive.caddy.volume").as_deref(), Some("hive_caddy"));
        assert_eq!(store.pending(), 0);
    }

    #[tokio::test]
    async fn conflict_drops_the_write_and_calls_the_hook() {
        let engine = Arc::new(FakeEngine::with_cluster());
        let store = store(&engine);
        store.load().await;

        let conflicts = Arc::new(AtomicUsize::new(0));
        let seen = conflicts.clone();
        store.on_conflict(move |e| {
            assert!(matches!(e, StoreError::Conflict { .. }));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        // Someone else updates the cluster behind our back.
        engine.bump_cluster_version();
        store.set(&SwarmLabel::PanelTint, "120");
        store.flush().await;

        assert_eq!(conflicts.load(Ordering::SeqCst), 1);
        assert_eq!(engine.cluster_label("hive.panel.tint"), None);
        // The cache follows the engine again once the conflict is handled.
        assert_eq!(store.get(&SwarmLabel::PanelTint), None);
        assert_eq!(store.version(), Some(engine.cluster_version()));
    }

    #[tokio::test]
    async fn writes_after_a_conflict_still_persist() {
        let engine = Arc::new(FakeEngine::with_cluster());
        let store = store(&engine);
        store.load().await;

        engine.bump_cluster_version();
        store.set(&SwarmLabel::PanelTint, "120");
        store.flush().await;
        assert_eq!(engine.cluster_label("hive.panel.tint"), None);

        store.set(&SwarmLabel::Session("tok".into()), "admin");
        store.set(&SwarmLabel::NetworkDefault, "hivenet");
        store.flush().await;

        assert_eq!(engine.cluster_label("hive.session.tok").as_deref(), Some("admin"));
        assert_eq!(engine.cluster_label("hive.network.default").as_deref(), Some("hivenet"));
        assert_eq!(store.version(), Some(engine.cluster_version()));
    }

    #[tokio::test]
    async fn buffer_is_used_without_a_cluster() {
        let engine = Arc::new(FakeEngine::new());
        let store = store(&engine);

        assert!(!store.load().await.is_observed());
        store.set(&SwarmLabel::NetworkDefault, "hivenet");

        assert!(store.needs_migration());
        assert_eq!(store.pending(), 0);
        assert_eq!(store.get(&SwarmLabel::NetworkDefault).as_deref(), Some("hivenet"));
    }

    #[tokio::test]
    async fn migrate_merges_buffer_into_cluster() {
        let engine = Arc::new(FakeEngine::new());
        let store = store(&engine);
        store.set(&SwarmLabel::PanelTint, "1");

        engine.seed_cluster([("hive.panel.port", "2")]);
        let LoadOutcome::Observed(cluster) = store.load().await else {
            panic!("cluster should be observed");
        };
        assert!(!store.is_observed(), "load must not adopt while the buffer is pending");

        store.migrate(cluster).await.unwrap();

        assert!(store.is_observed());
        assert!(!store.needs_migration());
        assert_eq!(store.get(&SwarmLabel::PanelTint).as_deref(), Some("1"));
        assert_eq!(store.get(&SwarmLabel::PanelPort).as_deref(), Some("2"));
        assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("1"));
        assert_eq!(store.version(), Some(engine.cluster_version()));
    }

    #[tokio::test]
    async fn migrate_fails_loudly_on_rejection() {
        let engine = Arc::new(FakeEngine::new());
        let store = store(&engine);
        store.set(&SwarmLabel::PanelTint, "1");

        engine.seed_cluster([("hive.panel.port", "2")]);
        let LoadOutcome::Observed(cluster) = store.load().await else {
            panic!("cluster should be observed");
        };
        engine.bump_cluster_version();

        let err = store.migrate(cluster).await.unwrap_err();
        assert!(matches!(err, StoreError::Migrate(_)));
        assert!(store.needs_migration());
        assert!(!store.is_observed());
    }

    #[tokio::test]
    async fn load_tolerates_unreachable_engine() {
        let engine = Arc::new(FakeEngine::with_cluster());
        engine.set_reachable(false);
        let store = store(&engine);

        let outcome = store.load().await;
        assert!(matches!(outcome, LoadOutcome::Unreachable));
        assert!(!outcome.engine_answered());
        assert!(!store.is_observed());
    }

    #[tokio::test]
    async fn node_outside_a_cluster_is_not_observed() {
        let store = store(&Arc::new(FakeEngine::new()));
        let outcome = store.load().await;
        assert!(matches!(outcome, LoadOutcome::NotObserved));
        assert!(outcome.engine_answered());
    }

    #[tokio::test]
    async fn migrate_keeps_credentials_already_in_the_cluster() {
        let engine = Arc::new(FakeEngine::new());
        let store = store(&engine);
        store.set_all([
            (SwarmLabel::PanelUser("admin".into()), "sha256$new"),
            (SwarmLabel::PanelUser("ops".into()), "sha256$ops"),
            (SwarmLabel::PanelTint, "7"),
        ]);

        engine.seed_cluster([("hive.panel.user.admin", "sha256$real")]);
        let LoadOutcome::Observed(cluster) = store.load().await else {
            panic!("cluster should be observed");
        };
        store.migrate(cluster).await.unwrap();

        assert_eq!(engine.cluster_label("hive.panel.user.admin").as_deref(), Some("sha256$real"));
        assert_eq!(engine.cluster_label("hive.panel.user.ops").as_deref(), Some("sha256$ops"));
        assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("7"));
        assert_eq!(store.users().get("admin").map(String::as_str), Some("sha256$real"));
    }

    #[tokio::test]
    async fn users_view_skips_tombstones() {
        let engine = Arc::new(FakeEngine::new());
        let store = store(&engine);
        store.set_all([
            (SwarmLabel::PanelUser("admin".into()), "hash-a"),
            (SwarmLabel::PanelUser("old".into()), ""),
            (SwarmLabel::PanelTint, "5"),
        ]);

        let users = store.users();
        assert_eq!(users.len(), 1);
        assert_eq!(users.get("admin").map(String::as_str), Some("hash-a"));
    }

    #[test]
    fn debug_hides_values() {
        let store = LabelStore::new(Arc::new(FakeEngine::new()), noop_metrics());
        store.set(&SwarmLabel::Session("secret-token".into()), "admin");
        let out = format!("{store:?}");
        assert!(!out.contains("secret-token"));
        assert!(out.contains("buffered: 1"));
    }
}
