use gray_config::{AdmissionConfig, IdentitySource};
use gray_reconcile::{
    extract, Decision, EventKind, FilterLookup, ReconcileInput, Reconciler, ReporterSource,
};
use http::HeaderMap;
use tracing::{debug, info, warn};

use crate::{AdmissionRejected, Admitted, Event};

/// Binds a [`Reconciler`] to a rule store.
///
/// Stateless between calls: share one adapter across threads.
#[derive(Clone, Debug)]
pub struct AdmissionAdapter<L> {
    reconciler: Reconciler,
    lookup: L,
}

impl<L: FilterLookup> AdmissionAdapter<L> {
    pub fn new(config: AdmissionConfig, lookup: L) -> Self {
        Self {
            reconciler: Reconciler::new(config),
            lookup,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Admit `event` as an alert, reading the reporter from the configured
    /// identity source. Header-sourced configs have no headers here, so the
    /// event is bypassed; use [`Self::admit_alert_from`] instead.
    pub fn admit_alert(&self, event: Event) -> Result<Admitted, AdmissionRejected> {
        self.admit_as(EventKind::Alert, event, self.configured_source())
    }

    pub fn admit_blackout(&self, event: Event) -> Result<Admitted, AdmissionRejected> {
        self.admit_as(EventKind::Blackout, event, self.configured_source())
    }

    pub fn admit_alert_from(
        &self,
        event: Event,
        source: ReporterSource<'_>,
    ) -> Result<Admitted, AdmissionRejected> {
        self.admit_as(EventKind::Alert, event, Some(source))
    }

    pub fn admit_blackout_from(
        &self,
        event: Event,
        source: ReporterSource<'_>,
    ) -> Result<Admitted, AdmissionRejected> {
        self.admit_as(EventKind::Blackout, event, Some(source))
    }

    /// Dispatch on `event.kind`. With `headers`, identity comes from them
    /// regardless of the configured source.
    pub fn admit(
        &self,
        event: Event,
        headers: Option<&HeaderMap>,
    ) -> Result<Admitted, AdmissionRejected> {
        let source = match headers {
            Some(h) => Some(ReporterSource::Headers(h)),
            None => self.configured_source(),
        };
        self.admit_as(event.kind, event, source)
    }

    fn configured_source(&self) -> Option<ReporterSource<'static>> {
        match self.reconciler.config().identity_source {
            IdentitySource::Tags => Some(ReporterSource::Tags),
            IdentitySource::Headers => None,
        }
    }

    fn admit_as(
        &self,
        kind: EventKind,
        mut event: Event,
        source: Option<ReporterSource<'_>>,
    ) -> Result<Admitted, AdmissionRejected> {
        let parsed = gray_tags::parse(&event.tags);
        let Some(source) = source else {
            warn!(
                event_id = %event.id,
                kind = %kind,
                "identity source is headers but none were supplied; passing event through"
            );
            return Ok(bypassed(event, "reporter headers not supplied"));
        };
        let Some(reporter) = extract(&parsed, source, self.reconciler.config()) else {
            debug!(
                event_id = %event.id,
                kind = %kind,
                decision = %Decision::Bypass,
                "reporter identity incomplete; passing event through"
            );
            return Ok(bypassed(event, "reporter identity incomplete"));
        };

        let result = self.reconciler.reconcile(
            ReconcileInput {
                event_id: &event.id,
                environment: &event.environment,
                kind,
                tags: parsed,
                reporter: &reporter,
            },
            &self.lookup,
        );

        let Some(tags) = result.tags else {
            info!(
                event_id = %event.id,
                environment = %event.environment,
                kind = %kind,
                decision = %result.decision,
                reason = %result.reason,
                "event rejected"
            );
            return Err(AdmissionRejected {
                event_id: event.id,
                reason: result.reason,
            });
        };

        event.tags = gray_tags::serialize(&tags, Some(self.reconciler.reserved()));
        debug!(
            event_id = %event.id,
            decision = %result.decision,
            rule_id = ?result.rule_id,
            "event admitted"
        );
        Ok(Admitted {
            event,
            decision: result.decision,
            reason: result.reason,
            rule_id: result.rule_id,
        })
    }
}

fn bypassed(event: Event, reason: &str) -> Admitted {
    Admitted {
        event,
        decision: Decision::Bypass,
        reason: reason.to_string(),
        rule_id: None,
    }
}
