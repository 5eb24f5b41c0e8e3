//! Archival policy: bundle stale files, then offload aged bundles.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use cronkeep_core::{ArchiveBundle, ArchiveConfig};
use cronkeep_infra::{select_older_than, Archiver, FileCatalog, OffloadReport, RemoteOffloader};
use cronkeep_storage::RemoteStorage;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const BUNDLE_SUFFIX: &str = ".zip";

/// Summary of one policy pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PolicyRun {
    pub root: PathBuf,
    /// Files seen in the watched folder.
    pub scanned: usize,
    /// Files past the archival threshold.
    pub stale: usize,
    pub bundle: Option<ArchiveBundle>,
    /// Bundles seen after archiving.
    pub bundles_seen: usize,
    /// Bundles past the offload threshold.
    pub offload_eligible: usize,
    pub offload: Option<OffloadReport>,
}

/// One pass over a watched folder:
///
/// 1. list every file
/// 2. keep those older than `stale_after`
/// 3. bundle them into `{prefix}-{YYMMDD}.zip`
/// 4. list `.zip` files
/// 5. keep those older than `offload_after`
/// 6. upload them to the remote destination
///
/// Step 1 does not exclude existing bundles, so a bundle older than
/// `stale_after` is itself bundled again on the next pass.
pub struct ArchivalPolicy {
    catalog: FileCatalog,
    archiver: Archiver,
    offloader: RemoteOffloader,
    config: ArchiveConfig,
}

impl ArchivalPolicy {
    pub fn new(
        root: impl Into<PathBuf>,
        config: ArchiveConfig,
        storage: Arc<dyn RemoteStorage>,
    ) -> Self {
        let root = root.into();
        Self {
            catalog: FileCatalog::new(root.clone(), config.timestamp_source),
            archiver: Archiver::new(root.clone(), config.collision_policy),
            offloader: RemoteOffloader::new(root, storage),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.catalog.root()
    }

    pub async fn run(&self, destination: &str) -> anyhow::Result<PolicyRun> {
        self.run_on(Local::now().date_naive(), destination).await
    }

    /// Run the policy with `date` used for the bundle name.
    #[tracing::instrument(skip(self), fields(root = %self.root().display()))]
    pub async fn run_on(&self, date: NaiveDate, destination: &str) -> anyhow::Result<PolicyRun> {
        let mut run = PolicyRun {
            root: self.root().to_path_buf(),
            ..PolicyRun::default()
        };

        let all = self
            .catalog
            .list("")
            .context("Failed to list watched folder")?;
        run.scanned = all.len();

        let stale = select_older_than(&all, self.config.stale_after);
        run.stale = stale.len();
        tracing::info!(
            scanned = run.scanned,
            stale = run.stale,
            threshold = %self.config.stale_after,
            "Selected stale files"
        );

        if !stale.is_empty() {
            let bundle = self
                .archiver
                .build_on(date, &stale, &self.config.prefix, self.config.delete_sources)
                .context("Failed to build archive bundle")?;
            run.bundle = Some(bundle);
        }

        let bundles = self
            .catalog
            .list(BUNDLE_SUFFIX)
            .context("Failed to list bundles")?;
        run.bundles_seen = bundles.len();

        let eligible = select_older_than(&bundles, self.config.offload_after);
        run.offload_eligible = eligible.len();
        tracing::info!(
            bundles = run.bundles_seen,
            eligible = run.offload_eligible,
            threshold = %self.config.offload_after,
            "Selected bundles for offload"
        );

        if !eligible.is_empty() {
            let report = self
                .offloader
                .upload(&eligible, destination, self.config.delete_after_upload)
                .await
                .with_context(|| format!("Failed to offload bundles to {}", destination))?;
            run.offload = Some(report);
        }

        Ok(run)
    }
}
