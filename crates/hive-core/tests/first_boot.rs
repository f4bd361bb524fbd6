use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use hive_core::{prelude::*, testing::FakeEngine};
use hive_model::SwarmLabel;

fn fresh() -> (Arc<FakeEngine>, Context) {
    let engine = Arc::new(FakeEngine::new());
    let ctx = Context::with_engine(engine.clone());
    (engine, ctx)
}

#[tokio::test(start_paused = true)]
async fn credential_made_before_the_cluster_survives_bootstrap() {
    let (engine, ctx) = fresh();
    assert!(!ctx.store().load().await.is_observed());

    let auth = AuthGateway::new(ctx.clone());
    let cred = auth.ensure_bootstrap_credential().expect("first boot provisions admin");
    assert_eq!(cred.secret().len(), 20);
    ctx.store().set(&SwarmLabel::PanelTint, "210");
    assert!(ctx.store().needs_migration());

    let report = ClusterBootstrap::new(ctx.clone()).run().await.unwrap();
    assert!(report.migrated);
    assert!(report.node_id.is_some());
    assert!(!ctx.store().needs_migration());

    let stored = engine.cluster_label("hive.panel.user.admin").unwrap();
    assert!(stored.starts_with("sha256$"));
    assert_ne!(stored, cred.secret());
    assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("210"));

    let session = auth.login("admin", cred.secret()).unwrap();
    assert!(auth.login("admin", "not the secret").is_err());
    ctx.store().flush().await;
    assert!(engine.cluster_label(&format!("hive.session.{}", session.token)).is_some());
    assert!(auth.ensure_bootstrap_credential().is_none());
}

#[tokio::test(start_paused = true)]
async fn concurrent_onboarding_initializes_once() {
    let (engine, ctx) = fresh();
    let bootstrap = ClusterBootstrap::new(ctx);

    let (a, b) = tokio::join!(bootstrap.run(), bootstrap.run());
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(engine.init_calls().len(), 1);
    assert!(a.already_ready || b.already_ready);
    assert!(bootstrap.is_ready());
}

#[tokio::test(start_paused = true)]
async fn ambiguous_address_is_resolved_with_a_private_candidate() {
    let (engine, ctx) = fresh();
    engine.script_init(Err(EngineError::api(
        400,
        "could not choose an IP address to advertise since this system has multiple addresses \
         on different interfaces (203.0.113.9 on eth0 and 10.0.0.5 on eth1)",
    )));

    let report = ClusterBootstrap::new(ctx).run().await.unwrap();

    assert_eq!(report.address, Some("10.0.0.5".parse().unwrap()));
    assert_eq!(report.candidates.first(), report.address.as_ref());
    let calls = engine.init_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].advertise_addr.as_deref(), Some("10.0.0.5"));
}

#[tokio::test]
async fn lost_write_is_reported_and_the_cache_resyncs() {
    let engine = Arc::new(FakeEngine::with_cluster());
    engine.seed_cluster([("hive.panel.tint", "1")]);
    let ctx = Context::with_engine(engine.clone());
    ctx.store().load().await;

    let lost = Arc::new(AtomicUsize::new(0));
    let counter = lost.clone();
    ctx.store().on_conflict(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    ctx.store().set(&SwarmLabel::PanelTint, "2");
    engine.bump_cluster_version();
    assert_eq!(ctx.store().get(&SwarmLabel::PanelTint).as_deref(), Some("2"));

    ctx.store().flush().await;
    assert_eq!(lost.load(Ordering::SeqCst), 1);
    assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("1"));
    assert_eq!(ctx.store().get(&SwarmLabel::PanelTint).as_deref(), Some("1"));
    assert_eq!(ctx.store().version(), Some(engine.cluster_version()));

    ctx.store().set(&SwarmLabel::PanelTint, "3");
    ctx.store().flush().await;
    assert_eq!(engine.cluster_label("hive.panel.tint").as_deref(), Some("3"));
}

#[tokio::test(start_paused = true)]
async fn credential_made_while_the_engine_was_down_does_not_replace_the_cluster_one() {
    let engine = Arc::new(FakeEngine::new());
    engine.seed_cluster([("hive.panel.user.admin", "sha256$00$real")]);
    engine.set_reachable(false);
    let ctx = Context::with_engine(engine.clone());

    let outcome = ctx.store().load().await;
    assert!(!outcome.engine_answered());
    let auth = AuthGateway::new(ctx.clone());
    assert!(auth.ensure_bootstrap_credential().is_some());

    engine.set_reachable(true);
    let report = ClusterBootstrap::new(ctx.clone()).run().await.unwrap();

    assert!(report.migrated);
    assert!(engine.init_calls().is_empty());
    assert_eq!(engine.cluster_label("hive.panel.user.admin").as_deref(), Some("sha256$00$real"));
    assert_eq!(ctx.store().users()["admin"], "sha256$00$real");
}
