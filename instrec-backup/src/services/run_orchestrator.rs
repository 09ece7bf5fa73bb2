//! Run orchestrator
//!
//! Sequences one backup run over a single navigable session:
//!
//! 1. Gatekeeper: log in and open the listing (failure aborts the run)
//! 2. Read every owner row before touching any owner page
//! 3. Per owner: skip check, discover records, create folders, reconcile each file
//!
//! A failure while processing one owner is logged and counted, the session is
//! sent back to the listing, and the run moves on to the next owner after a
//! short pause. Fatal errors (bad configuration, revoked remote access) end the
//! run instead.

use std::time::Duration;

use crate::error::{BackupError, BackupResult};
use crate::models::{OwnerKey, OwnerListing, OwnerOutcome, OwnerTally, ReconcileOutcome, RunSummary};
use crate::remote::RemoteStore;
use crate::services::mirror_reconciler::MirrorReconciler;
use crate::services::record_discovery::{RecordDiscovery, RecordListing};
use crate::services::session_gatekeeper::SessionGatekeeper;
use crate::session::NavigableSession;
use crate::transfer::HttpFetch;

pub const DEFAULT_FAILURE_PAUSE: Duration = Duration::from_secs(2);

/// Runs the whole pipeline for one session
pub struct RunOrchestrator<'a, R: RemoteStore + ?Sized, F: HttpFetch + ?Sized> {
    gatekeeper: SessionGatekeeper,
    discovery: RecordDiscovery,
    reconciler: MirrorReconciler<'a, R, F>,
    failure_pause: Duration,
}

impl<'a, R: RemoteStore + ?Sized, F: HttpFetch + ?Sized> RunOrchestrator<'a, R, F> {
    pub fn new(
        gatekeeper: SessionGatekeeper,
        discovery: RecordDiscovery,
        reconciler: MirrorReconciler<'a, R, F>,
    ) -> Self {
        Self {
            gatekeeper,
            discovery,
            reconciler,
            failure_pause: DEFAULT_FAILURE_PAUSE,
        }
    }

    pub fn with_failure_pause(mut self, pause: Duration) -> Self {
        self.failure_pause = pause;
        self
    }

    pub fn gatekeeper(&self) -> &SessionGatekeeper {
        &self.gatekeeper
    }

    /// Execute one run
    ///
    /// # Errors
    /// When the session cannot be established, the owner listing cannot be
    /// read, or an owner fails with a fatal error. Everything else below owner
    /// level is folded into the summary.
    pub async fn run<S: NavigableSession + ?Sized>(&mut self, session: &mut S) -> BackupResult<RunSummary> {
        let mut summary = RunSummary::new();
        tracing::info!(
            run_id = %summary.run_id,
            mode = %self.reconciler.mode(),
            "Backup run starting"
        );

        self.gatekeeper.establish_session(session).await?;

        let listings = self.discovery.discover_owners(session).await.map_err(|e| {
            tracing::error!(error = %e, "Could not read the owner listing");
            BackupError::Session(format!("owner listing unreadable: {}", e))
        })?;
        summary.owners_discovered = listings.len();

        for (index, listing) in listings.iter().enumerate() {
            let key = OwnerKey::resolve(&listing.raw_name, listing.identifying_text.as_deref(), index + 1);

            match self.process_owner(session, &key, listing).await {
                Ok(outcome) => {
                    log_owner_outcome(&key, &outcome);
                    summary.record_owner(&outcome);
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(owner = %key, error = %e, "Fatal error, aborting run");
                    return Err(e);
                }
                Err(e) => {
                    let e = BackupError::OwnerLevel(e.to_string());
                    tracing::error!(owner = %key, error = %e, "Owner failed, continuing with next owner");
                    summary.record_owner_failure(key.as_str(), e.to_string());
                    self.return_to_listing(session).await;
                }
            }
        }

        summary.finish();
        tracing::info!(
            run_id = %summary.run_id,
            owners = summary.owners_discovered,
            mirrored = summary.owners_mirrored,
            already_mirrored = summary.owners_already_mirrored,
            failed = summary.owners_failed,
            downloaded = summary.files_downloaded,
            complete = summary.is_complete(),
            "Backup run finished"
        );

        Ok(summary)
    }

    async fn process_owner<S: NavigableSession + ?Sized>(
        &self,
        session: &mut S,
        key: &OwnerKey,
        listing: &OwnerListing,
    ) -> BackupResult<OwnerOutcome> {
        if self.reconciler.is_already_mirrored(key)? {
            return Ok(OwnerOutcome::AlreadyMirrored);
        }

        // Folders only after the owner page was read, so a failed visit leaves no marker
        let records = self.discovery.discover_records(session, key, listing).await?;
        let owner = self.reconciler.prepare_owner(key).await?;

        let (records, unreadable) = match records {
            RecordListing::NoRecords => return Ok(OwnerOutcome::NoRecords),
            RecordListing::Records { records, unreadable } => (records, unreadable),
        };

        let mut tally = OwnerTally {
            records: records.len(),
            discovery_failures: unreadable,
            ..OwnerTally::default()
        };

        for (index, record) in records.iter().enumerate() {
            let file = match self.discovery.discover_file(session, record).await {
                Ok(Some(file)) => file,
                Ok(None) => {
                    tally.records_without_file += 1;
                    tracing::info!(
                        owner = %key,
                        record = index + 1,
                        total = records.len(),
                        "No file attached to record"
                    );
                    continue;
                }
                Err(e) => {
                    tally.discovery_failures += 1;
                    tracing::warn!(
                        owner = %key,
                        record = index + 1,
                        url = %record.source_url,
                        error = %e,
                        "Record lookup failed, skipping"
                    );
                    continue;
                }
            };

            match self.reconciler.reconcile(&owner, &file).await {
                ReconcileOutcome::Failed(e) if e.is_fatal() => return Err(e),
                ReconcileOutcome::Failed(BackupError::Discovery(_)) => tally.discovery_failures += 1,
                outcome => tally.record_file(&outcome),
            }
        }

        Ok(OwnerOutcome::Processed(tally))
    }

    async fn return_to_listing<S: NavigableSession + ?Sized>(&self, session: &mut S) {
        if let Err(e) = session.navigate_to(self.gatekeeper.listing_url()).await {
            tracing::warn!(error = %e, "Could not navigate back to the owner listing");
        }
        tokio::time::sleep(self.failure_pause).await;
    }
}

fn log_owner_outcome(key: &OwnerKey, outcome: &OwnerOutcome) {
    match outcome {
        OwnerOutcome::AlreadyMirrored => {
            tracing::debug!(owner = %key, "Owner already mirrored");
        }
        OwnerOutcome::NoRecords => {
            tracing::info!(owner = %key, "Owner has no records");
        }
        OwnerOutcome::Processed(tally) => {
            tracing::info!(
                owner = %key,
                records = tally.records,
                downloaded = tally.files_downloaded,
                skipped = tally.files_skipped,
                without_file = tally.records_without_file,
                failures = tally.discovery_failures + tally.transfer_failures,
                "Owner processed"
            );
        }
    }
}
