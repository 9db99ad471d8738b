//! gray-reconcile
//!
//! Tag-identity reconciliation for inbound alerts and blackouts.
//!
//! Every event carries a *claimed* identity in its ordinary tags and, when the
//! ingesting agent asserts one, a *reporter* identity through a reserved
//! channel (prefixed tags or request headers). The engine decides whether the
//! claimed identity is trusted as-is, overwritten, allowed by a graylist rule,
//! or rejected:
//!
//! - Incomplete reporter identity => BYPASS (event untouched)
//! - Target-host tag + unmodified own identity => DELEGATED
//! - No target-host tag + claimed host == reporter host => SELF_MATCH
//! - First usable graylist rule for the reporter host and event role => RULE_MATCH
//! - Otherwise the configured fallback: IMPERSONATED or REJECTED
//!
//! Deterministic, pure logic. The only IO is the caller-supplied
//! [`FilterLookup`], read once per reconciliation.

mod engine;
mod identity;
mod lookup;
mod types;

pub use engine::{ReconcileInput, Reconciler};
pub use identity::{extract, ClaimedIdentity, ReporterSource};
pub use lookup::{
    FilterLookup, GrayAttributes, GraylistRule, LookupError, MalformedRule, StaticFilterStore,
};
pub use types::*;
