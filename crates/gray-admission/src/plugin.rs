use std::fmt;

use gray_reconcile::{FilterLookup, GraylistRule};

use crate::{AdmissionAdapter, AdmissionRejected, Event};

/// Lifecycle callbacks the host pipeline invokes on a plugin.
///
/// Admission happens in `pre_receive` (alerts) and `receive_blackout`. The
/// remaining hooks are part of the host contract but carry no graylist
/// behaviour.
pub trait EventPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn pre_receive(&self, event: Event) -> Result<Event, PluginError>;

    fn post_receive(&self, event: Event) -> Result<Event, PluginError> {
        Ok(event)
    }

    fn status_change(
        &self,
        _event: &Event,
        _status: &str,
        _text: &str,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn receive_blackout(&self, event: Event) -> Result<Event, PluginError>;

    fn take_action(
        &self,
        _event: &Event,
        _action: &str,
        _text: &str,
    ) -> Result<Event, PluginError> {
        Err(PluginError::unsupported("take_action"))
    }

    fn delete(&self, _event: &Event) -> Result<bool, PluginError> {
        Err(PluginError::unsupported("delete"))
    }

    fn delete_blackout(&self, _blackout: &Event) -> Result<bool, PluginError> {
        Err(PluginError::unsupported("delete_blackout"))
    }

    fn create_filter(&self, _rule: GraylistRule) -> Result<GraylistRule, PluginError> {
        Err(PluginError::unsupported("create_filter"))
    }

    fn receive_filter(&self, _rule: GraylistRule) -> Result<GraylistRule, PluginError> {
        Err(PluginError::unsupported("receive_filter"))
    }

    fn delete_filter(&self, _rule: &GraylistRule) -> Result<bool, PluginError> {
        Err(PluginError::unsupported("delete_filter"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PluginError {
    Rejected(AdmissionRejected),
    Unsupported { hook: &'static str },
}

impl PluginError {
    fn unsupported(hook: &'static str) -> Self {
        PluginError::Unsupported { hook }
    }
}

impl fmt::Display for PluginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginError::Rejected(r) => write!(f, "{r}"),
            PluginError::Unsupported { hook } => {
                write!(f, "plugin hook '{hook}' is not supported")
            }
        }
    }
}

impl std::error::Error for PluginError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PluginError::Rejected(r) => Some(r),
            PluginError::Unsupported { .. } => None,
        }
    }
}

impl From<AdmissionRejected> for PluginError {
    fn from(r: AdmissionRejected) -> Self {
        PluginError::Rejected(r)
    }
}

/// The graylist admission plugin.
#[derive(Clone, Debug)]
pub struct GraylistPlugin<L> {
    adapter: AdmissionAdapter<L>,
}

impl<L: FilterLookup> GraylistPlugin<L> {
    pub fn new(adapter: AdmissionAdapter<L>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &AdmissionAdapter<L> {
        &self.adapter
    }
}

impl<L: FilterLookup> EventPlugin for GraylistPlugin<L> {
    fn name(&self) -> &'static str {
        "graylist"
    }

    fn pre_receive(&self, event: Event) -> Result<Event, PluginError> {
        Ok(self.adapter.admit_alert(event)?.event)
    }

    fn receive_blackout(&self, event: Event) -> Result<Event, PluginError> {
        Ok(self.adapter.admit_blackout(event)?.event)
    }
}
