//! agent.rs — ties fetch, diff, persist, publish and notify together.
//! Each run is a fresh linear pass; continuous mode is a cooperative
//! 60-second poll loop with a periodic check task and a daily
//! maintenance task.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

use crate::config::AgentConfig;
use crate::notify::{email::EmailNotifier, Notifier, NullNotifier};
use crate::publish::SiteUpdater;
use crate::source::{self, feed::FeedSource, page::ProfilePageSource, Mix, MixSource};
use crate::store::Store;

const SCHEDULER_TICK: Duration = Duration::from_secs(60);
const MAINTENANCE_PERIOD: Duration = Duration::from_secs(24 * 3600);

pub struct Agent {
    sources: Vec<Box<dyn MixSource>>,
    store: Store,
    updater: SiteUpdater,
    notifier: Box<dyn Notifier>,
    site_url: Option<String>,
    site_dir: PathBuf,
    fetch_limit: usize,
    check_interval: Duration,
    backup_retention_days: u64,
}

impl Agent {
    /// Wire the production strategy order: feed first, profile-page
    /// scrape as fallback.
    pub fn from_config(cfg: &AgentConfig) -> Result<Self> {
        let sources: Vec<Box<dyn MixSource>> = vec![
            Box::new(FeedSource::from_url(cfg.feed_url())),
            Box::new(ProfilePageSource::from_url(cfg.profile_url())),
        ];
        let store = Store::open(&cfg.database_file)?;
        let notifier: Box<dyn Notifier> = match &cfg.smtp {
            Some(smtp) => Box::new(EmailNotifier::from_config(smtp).context("smtp config")?),
            None => Box::new(NullNotifier),
        };
        Ok(Self::new(sources, store, cfg, notifier))
    }

    pub fn new(
        sources: Vec<Box<dyn MixSource>>,
        store: Store,
        cfg: &AgentConfig,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let site_dir = cfg
            .index_file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            sources,
            store,
            updater: SiteUpdater::new(&cfg.index_file),
            notifier,
            site_url: cfg.site_url.clone(),
            site_dir,
            fetch_limit: cfg.fetch_limit,
            check_interval: Duration::from_secs(cfg.check_interval_secs),
            backup_retention_days: cfg.backup_retention_days,
        }
    }

    /// One full pass. Never fails to the caller: anything that escapes
    /// the run sequence is logged and reported with an error email.
    pub async fn check_for_new_mixes(&self) {
        tracing::info!("starting check for new mixes");
        if let Err(e) = self.run_check().await {
            tracing::error!(error = ?e, "check for new mixes failed");
            self.notify_best_effort(
                "Mixsite agent error",
                &format!(
                    "<p>Error occurred while checking for new mixes: {}</p>",
                    html_escape::encode_text(&format!("{e:#}"))
                ),
            )
            .await;
        }
    }

    async fn run_check(&self) -> Result<()> {
        let latest = source::fetch_first_non_empty(&self.sources, self.fetch_limit).await;
        if latest.is_empty() {
            tracing::warn!("no mixes found from any source");
            return Ok(());
        }

        // Persist unseen mixes immediately so a crash mid-loop does not
        // re-announce them next run.
        let mut new_mixes: Vec<Mix> = Vec::new();
        for mix in &latest {
            if !self.store.mix_exists(&mix.id)? {
                new_mixes.push(mix.clone());
                self.store.add_mix(mix);
            }
        }

        if new_mixes.is_empty() {
            tracing::info!("no new mixes found");
            return Ok(());
        }
        tracing::info!(count = new_mixes.len(), "found new mixes");

        // The marker region is always regenerated from the full fetched
        // set, not appended to.
        if self.updater.publish(&latest) {
            self.store.log_update(
                "mixcloud_update",
                &format!("Added {} new mixes", new_mixes.len()),
            )?;
            self.send_update_notification(&new_mixes).await;
            tracing::info!("site successfully updated");
        } else {
            tracing::error!("failed to update site");
        }
        Ok(())
    }

    async fn send_update_notification(&self, new_mixes: &[Mix]) {
        let noun = if new_mixes.len() == 1 { "mix" } else { "mixes" };
        let subject = format!("Mixsite: {} new {} published", new_mixes.len(), noun);

        let mut body = String::from("<h2>New Mixcloud uploads detected!</h2>\n<ul>\n");
        for mix in new_mixes {
            body.push_str(&format!(
                "<li><strong>{}</strong><br><a href=\"{}\">{}</a></li>\n",
                html_escape::encode_text(&mix.title),
                mix.url,
                mix.url
            ));
        }
        body.push_str("</ul>\n<p>The website has been updated with the latest content.</p>\n");
        if let Some(site) = &self.site_url {
            body.push_str(&format!(
                "<p>Visit the site: <a href=\"{site}\">{site}</a></p>\n"
            ));
        }

        self.notify_best_effort(&subject, &body).await;
    }

    async fn notify_best_effort(&self, subject: &str, body: &str) {
        if let Err(e) = self.notifier.send(subject, body).await {
            tracing::warn!(error = ?e, subject, "notification failed");
        }
    }

    /// Scheduled mode: one check at startup, then a poll loop. Tasks run
    /// to completion before the loop resumes; an overdue task simply
    /// runs late on the next tick.
    pub async fn run_continuous(&self) {
        tracing::info!(
            interval_secs = self.check_interval.as_secs(),
            "starting continuous mode"
        );

        self.check_for_new_mixes().await;
        let mut next_check = Instant::now() + self.check_interval;
        let mut next_maintenance = Instant::now() + MAINTENANCE_PERIOD;

        loop {
            tokio::time::sleep(SCHEDULER_TICK).await;
            let now = Instant::now();
            if now >= next_check {
                self.check_for_new_mixes().await;
                next_check = Instant::now() + self.check_interval;
            }
            if now >= next_maintenance {
                self.run_maintenance().await;
                next_maintenance = Instant::now() + MAINTENANCE_PERIOD;
            }
        }
    }

    /// Daily pass: prune stale backups, then send a status summary.
    pub async fn run_maintenance(&self) {
        tracing::info!("running daily maintenance");

        let cutoff =
            SystemTime::now() - Duration::from_secs(self.backup_retention_days * 24 * 3600);
        match prune_backups_older_than(&self.site_dir, cutoff) {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "removed old backup files")
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = ?e, "backup pruning failed"),
        }

        let recent = match self.store.recent_mixes(5) {
            Ok(v) => v.len(),
            Err(e) => {
                tracing::warn!(error = ?e, "recent mixes query failed");
                0
            }
        };
        self.notify_best_effort(
            "Mixsite agent - daily status",
            &format!("<p>Agent is running normally. {recent} mixes in recent store.</p>"),
        )
        .await;
    }
}

/// Delete `*.backup` files under `dir` whose mtime predates `cutoff`.
/// Returns how many were removed; per-file failures are logged, not
/// propagated.
pub fn prune_backups_older_than(dir: &Path, cutoff: SystemTime) -> Result<usize> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("reading site directory {}", dir.display()))?;

    let mut removed = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("backup") {
            continue;
        }
        let Ok(meta) = entry.metadata() else { continue };
        let Ok(mtime) = meta.modified() else { continue };
        if mtime < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => {
                    removed += 1;
                    tracing::info!(path = %path.display(), "removed old backup");
                }
                Err(e) => tracing::warn!(error = ?e, path = %path.display(), "backup removal failed"),
            }
        }
    }
    Ok(removed)
}
