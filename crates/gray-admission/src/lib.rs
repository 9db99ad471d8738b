//! gray-admission
//!
//! Event admission on top of the reconciliation engine:
//! parse tags, extract the reporter identity, reconcile, then either write the
//! reconciled tags back onto the event or refuse it.
//!
//! - [`AdmissionAdapter::admit_alert`] / [`AdmissionAdapter::admit_blackout`]
//!   are the whole core contract.
//! - A refused event yields [`AdmissionRejected`] and no tag mutation survives
//!   it.
//! - [`EventPlugin`] maps the host pipeline's lifecycle callbacks onto the
//!   adapter. Hooks outside admission report [`PluginError::Unsupported`].

mod adapter;
mod event;
mod plugin;

pub use adapter::AdmissionAdapter;
pub use event::{AdmissionRejected, Admitted, Event};
pub use plugin::{EventPlugin, GraylistPlugin, PluginError};
