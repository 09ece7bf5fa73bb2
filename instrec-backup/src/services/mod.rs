//! Backup pipeline services
//!
//! Leaves first: name canonicalization, session gatekeeping, record discovery,
//! mirror reconciliation, then the run orchestrator tying them together.
//! `local_sync` pushes an existing local tree without touching the portal.

pub mod local_sync;
pub mod mirror_reconciler;
pub mod name_canonicalizer;
pub mod record_discovery;
pub mod run_orchestrator;
pub mod session_gatekeeper;

pub use local_sync::{sync_local_mirror, SyncSummary};
pub use mirror_reconciler::{MirrorReconciler, OwnerMirror, ReconcileMode};
pub use name_canonicalizer::{canonicalize, UNKNOWN_OWNER};
pub use record_discovery::{PortalLayout, RecordDiscovery, RecordListing};
pub use run_orchestrator::RunOrchestrator;
pub use session_gatekeeper::{GatekeeperConfig, LoginSelectors, SessionGatekeeper};
