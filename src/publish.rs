//! publish.rs — rewrites the marker region of the target HTML document
//! with fresh Mixcloud embeds, keeping a `.backup` sibling of the prior
//! version.
//!
//! The marker match is non-greedy: the region ends at the FIRST `</div>`
//! after the opening `<div id="mixcloud-container" ...>` tag. The
//! rendered fragment therefore never contains a nested `</div>` (items
//! are wrapped in `<section>` blocks); a target document whose marker
//! region already holds one is out of contract.

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::source::Mix;

/// Only the newest mixes are embedded, however many were fetched.
const EMBED_LIMIT: usize = 6;

pub struct SiteUpdater {
    index_file: PathBuf,
}

impl SiteUpdater {
    pub fn new(index_file: impl Into<PathBuf>) -> Self {
        Self {
            index_file: index_file.into(),
        }
    }

    /// Rewrite the marker region with embeds for `mixes`. Returns true
    /// iff the document content actually changed. All failures (missing
    /// file, I/O, absent marker) are logged and reported as false.
    pub fn publish(&self, mixes: &[Mix]) -> bool {
        match self.try_publish(mixes) {
            Ok(changed) => changed,
            Err(e) => {
                tracing::error!(error = ?e, "site update failed");
                false
            }
        }
    }

    fn try_publish(&self, mixes: &[Mix]) -> Result<bool> {
        if !self.index_file.exists() {
            anyhow::bail!("index file not found: {}", self.index_file.display());
        }

        let current = fs::read_to_string(&self.index_file).context("reading index file")?;
        let fragment = render_embed_fragment(mixes);
        let updated = replace_marker_region(&current, &fragment);

        if updated == current {
            tracing::info!("no site update needed");
            return Ok(false);
        }

        let backup = backup_path(&self.index_file);
        fs::write(&backup, &current).context("writing backup file")?;
        fs::write(&self.index_file, updated).context("writing index file")?;

        tracing::info!(path = %self.index_file.display(), "site updated with new embeds");
        Ok(true)
    }
}

fn marker_re() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)(<div id="mixcloud-container"[^>]*>)(.*?)(</div>)"#).unwrap()
    })
}

/// Replace only the inner content of the marker region; everything else
/// is preserved byte-for-byte. A document without the marker comes back
/// unchanged.
pub fn replace_marker_region(document: &str, fragment: &str) -> String {
    marker_re()
        .replace(document, |caps: &regex::Captures| {
            format!("{}\n{}\n        {}", &caps[1], fragment, &caps[3])
        })
        .into_owned()
}

/// Turn a mix page URL into the inline widget URL: everything after the
/// source domain is substituted into the embed template. URLs that do
/// not match pass through untouched.
pub fn embed_url(mix_url: &str) -> String {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"mixcloud\.com(/.*)").unwrap());
    match re.captures(mix_url) {
        Some(caps) => format!(
            "https://www.mixcloud.com/widget/iframe/?hide_cover=1&mini=1&feed={}",
            &caps[1]
        ),
        None => mix_url.to_string(),
    }
}

fn render_embed_fragment(mixes: &[Mix]) -> String {
    let parts: Vec<String> = mixes
        .iter()
        .take(EMBED_LIMIT)
        .map(|mix| {
            format!(
                r#"        <section class="mixcloud-set">
          <iframe width="100%" height="120"
                  src="{}"
                  frameborder="0" class="rounded-lg" title="{}">
          </iframe>
        </section>"#,
                embed_url(&mix.url),
                html_escape::encode_double_quoted_attribute(&mix.title),
            )
        })
        .collect();
    parts.join("\n")
}

fn backup_path(index_file: &Path) -> PathBuf {
    let mut name = index_file.as_os_str().to_owned();
    name.push(".backup");
    PathBuf::from(name)
}
