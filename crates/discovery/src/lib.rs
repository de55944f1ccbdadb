//! Paper discovery for litscout.
//!
//! - [`dedup`]: title normalization and citation/date ranking
//! - [`ExistingDocsChecker`]: decides whether the knowledge store already
//!   holds enough relevant content to skip fresh discovery
//! - [`DiscoveryCoordinator`]: concurrent multi-source search with
//!   iterative widening and round-level backoff

pub mod coordinator;
pub mod dedup;
pub mod existing;

pub use coordinator::{DiscoveryCoordinator, DiscoveryOutcome, DiscoverySettings};
pub use dedup::{dedupe, normalize_title};
pub use existing::{ExistingDocs, ExistingDocsChecker};
