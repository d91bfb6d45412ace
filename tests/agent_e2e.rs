// tests/agent_e2e.rs
// Full orchestrator passes against stub sources, a scratch store, and a
// scratch site directory.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use mixsite_agent::agent::Agent;
use mixsite_agent::config::AgentConfig;
use mixsite_agent::notify::MemoryNotifier;
use mixsite_agent::source::{Mix, MixSource};
use mixsite_agent::store::Store;
use tempfile::TempDir;

const INDEX_HTML: &str = include_str!("fixtures/index.html");

struct StubSource(Vec<Mix>);

#[async_trait::async_trait]
impl MixSource for StubSource {
    async fn fetch_latest(&self, limit: usize) -> anyhow::Result<Vec<Mix>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "stub"
    }
}

struct FailingSource;

#[async_trait::async_trait]
impl MixSource for FailingSource {
    async fn fetch_latest(&self, _limit: usize) -> anyhow::Result<Vec<Mix>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

fn mix(seg: &str) -> Mix {
    Mix::from_link(
        format!("Title {seg}"),
        format!("https://www.mixcloud.com/djjackspace/{seg}/"),
    )
}

struct Scratch {
    _dir: TempDir,
    index: PathBuf,
    db: PathBuf,
    notifier: Arc<MemoryNotifier>,
}

impl Scratch {
    fn new(write_index: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let index = dir.path().join("index.html");
        if write_index {
            fs::write(&index, INDEX_HTML).unwrap();
        }
        Self {
            db: dir.path().join("agent.db"),
            index,
            notifier: Arc::new(MemoryNotifier::new()),
            _dir: dir,
        }
    }

    fn agent(&self, sources: Vec<Box<dyn MixSource>>) -> Agent {
        let cfg = AgentConfig {
            index_file: self.index.clone(),
            database_file: self.db.clone(),
            site_url: Some("https://dj.example.com".to_string()),
            ..AgentConfig::default()
        };
        let store = Store::open(&self.db).unwrap();
        Agent::new(sources, store, &cfg, Box::new(self.notifier.clone()))
    }

    fn store(&self) -> Store {
        Store::open(&self.db).unwrap()
    }
}

#[tokio::test]
async fn scenario_all_items_new_persists_publishes_and_notifies() {
    let scratch = Scratch::new(true);
    let items = vec![mix("a"), mix("b"), mix("c")];
    let agent = scratch.agent(vec![Box::new(StubSource(items))]);

    agent.check_for_new_mixes().await;

    let store = scratch.store();
    for seg in ["a", "b", "c"] {
        assert!(store.mix_exists(seg).unwrap());
    }

    let html = fs::read_to_string(&scratch.index).unwrap();
    assert_eq!(html.matches("<iframe").count(), 3);

    let sent = scratch.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (subject, body) = &sent[0];
    assert!(subject.contains("3 new mixes"));
    for seg in ["a", "b", "c"] {
        assert!(body.contains(&format!("Title {seg}")));
    }
    assert!(body.contains("https://dj.example.com"));

    let events = store.recent_updates(10).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].update_type, "mixcloud_update");
    assert!(events[0].description.contains("3 new mixes"));
}

#[tokio::test]
async fn scenario_rerun_with_same_items_is_quiet() {
    let scratch = Scratch::new(true);
    let items = vec![mix("a"), mix("b"), mix("c")];
    let agent = scratch.agent(vec![Box::new(StubSource(items))]);

    agent.check_for_new_mixes().await;
    let after_first = fs::read_to_string(&scratch.index).unwrap();

    agent.check_for_new_mixes().await;

    // No new persistence, no second publish, no second notification.
    assert_eq!(scratch.store().recent_mixes(10).unwrap().len(), 3);
    assert_eq!(fs::read_to_string(&scratch.index).unwrap(), after_first);
    assert_eq!(scratch.notifier.sent.lock().unwrap().len(), 1);
    assert_eq!(scratch.store().recent_updates(10).unwrap().len(), 1);
}

#[tokio::test]
async fn scenario_one_new_item_regenerates_full_set_but_announces_only_it() {
    let scratch = Scratch::new(true);

    let first_batch = vec![mix("a"), mix("b"), mix("c")];
    let agent = scratch.agent(vec![Box::new(StubSource(first_batch.clone()))]);
    agent.check_for_new_mixes().await;

    let mut second_batch = vec![mix("fresh")];
    second_batch.extend(first_batch);
    let agent = scratch.agent(vec![Box::new(StubSource(second_batch))]);
    agent.check_for_new_mixes().await;

    // Only the new item was persisted on the second run.
    assert_eq!(scratch.store().recent_mixes(10).unwrap().len(), 4);
    assert_eq!(scratch.store().recent_mixes(1).unwrap()[0].id, "fresh");

    // The region is regenerated from the whole fetched set.
    let html = fs::read_to_string(&scratch.index).unwrap();
    assert_eq!(html.matches("<iframe").count(), 4);

    // The second notification names the new mix only.
    let sent = scratch.notifier.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    let (subject, body) = &sent[1];
    assert!(subject.contains("1 new mix"));
    assert!(body.contains("Title fresh"));
    assert!(!body.contains("Title a"));
}

#[tokio::test]
async fn scenario_missing_index_persists_but_skips_notification() {
    let scratch = Scratch::new(false);
    let agent = scratch.agent(vec![Box::new(StubSource(vec![mix("a"), mix("b")]))]);

    agent.check_for_new_mixes().await;

    // Items are recorded before the publish step; the consistency gap is
    // accepted and self-heals on a later run.
    assert_eq!(scratch.store().recent_mixes(10).unwrap().len(), 2);

    assert!(!scratch.index.exists());
    assert!(!scratch.index.with_extension("html.backup").exists());
    assert!(scratch.notifier.sent.lock().unwrap().is_empty());
    assert!(scratch.store().recent_updates(10).unwrap().is_empty());
}

#[tokio::test]
async fn empty_and_failing_sources_fall_through_to_the_next_strategy() {
    let scratch = Scratch::new(true);
    let agent = scratch.agent(vec![
        Box::new(FailingSource),
        Box::new(StubSource(vec![])),
        Box::new(StubSource(vec![mix("a")])),
    ]);

    agent.check_for_new_mixes().await;

    assert!(scratch.store().mix_exists("a").unwrap());
    assert_eq!(scratch.notifier.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn all_sources_empty_means_no_work_at_all() {
    let scratch = Scratch::new(true);
    let agent = scratch.agent(vec![Box::new(FailingSource), Box::new(StubSource(vec![]))]);

    agent.check_for_new_mixes().await;

    assert!(scratch.store().recent_mixes(10).unwrap().is_empty());
    assert_eq!(fs::read_to_string(&scratch.index).unwrap(), INDEX_HTML);
    assert!(scratch.notifier.sent.lock().unwrap().is_empty());
}
