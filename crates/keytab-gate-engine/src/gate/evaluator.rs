use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use keytab_gate_core::context::ExecutionContext;
use keytab_gate_core::errors::GateError;
use keytab_gate_core::report::Report;
use keytab_gate_core::traits::{
    AuditSink, ClusterRegistry, ConfigStore, GateAuditEvent, KerberosOracle,
};
use keytab_gate_core::types::{GateStatus, KdcType};
use keytab_gate_core::{KDC_TYPE_KEY, KERBEROS_ENV};

use super::transcript::Transcript;

/// Upgrade gate deciding whether Kerberos keytabs need manual regeneration.
///
/// Algorithm:
/// 1. Resolve the cluster name from the execution context
/// 2. Look the cluster up in the registry
/// 3. Ask the oracle whether Kerberos is enabled; if not, complete
/// 4. Read `kerberos-env/kdc_type`; absent, blank or `none` completes
/// 5. Any other KDC type holds the upgrade for keytab regeneration
///
/// The configuration store is only read once the oracle has confirmed
/// Kerberos. Nothing is written upstream; the only side effect is the
/// optional audit event.
pub struct KerberosKeytabGate<'a> {
    registry: &'a dyn ClusterRegistry,
    oracle: &'a dyn KerberosOracle,
    configs: &'a dyn ConfigStore,
    audit: Option<&'a dyn AuditSink>,
}

impl<'a> KerberosKeytabGate<'a> {
    pub fn new(
        registry: &'a dyn ClusterRegistry,
        oracle: &'a dyn KerberosOracle,
        configs: &'a dyn ConfigStore,
    ) -> Self {
        Self {
            registry,
            oracle,
            configs,
            audit: None,
        }
    }

    pub fn with_audit(mut self, sink: &'a dyn AuditSink) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Evaluate the gate. Infrastructure failures become a FAILED report.
    pub fn evaluate(&self, ctx: &ExecutionContext) -> Report {
        let span = info_span!(
            "keytab_gate",
            cluster = ctx.resolve_cluster_name().unwrap_or_default(),
            request_id = ?ctx.request_id,
            stage_id = ?ctx.stage_id,
        );
        let _enter = span.enter();

        let mut transcript = Transcript::default();
        let (report, reason) = match self.decide(ctx, &mut transcript) {
            Ok(status) => {
                info!(status = %status, "keytab gate decided");
                let reason = transcript.last_line().to_string();
                (
                    Report::new(status, transcript.stdout.clone(), transcript.structured()),
                    reason,
                )
            }
            Err(err) => {
                warn!(kind = err.kind(), retryable = err.is_retryable(), "keytab gate failed: {err}");
                let stderr = err.to_string();
                (
                    Report::failed(
                        transcript.stdout.clone(),
                        stderr.clone(),
                        transcript.structured(),
                    ),
                    stderr,
                )
            }
        };

        self.record(ctx, &report, transcript.kdc_type, reason);
        report
    }

    /// Same decision as [`evaluate`](Self::evaluate), but failures are
    /// returned as errors and nothing is audited.
    pub fn try_evaluate(&self, ctx: &ExecutionContext) -> Result<Report, GateError> {
        let mut transcript = Transcript::default();
        let status = self.decide(ctx, &mut transcript)?;
        Ok(Report::new(
            status,
            transcript.stdout.clone(),
            transcript.structured(),
        ))
    }

    fn decide(
        &self,
        ctx: &ExecutionContext,
        out: &mut Transcript,
    ) -> Result<GateStatus, GateError> {
        let name = ctx.resolve_cluster_name()?;
        out.cluster = Some(name.to_string());

        let cluster = self.registry.get_cluster(name)?;
        debug!(cluster_id = cluster.cluster_id, "resolved cluster");

        let enabled = self.oracle.is_cluster_kerberos_enabled(&cluster)?;
        debug!(enabled, "kerberos enablement checked");
        out.kerberos_enabled = Some(enabled);
        out.line(format!("Checking {name} is secured by Kerberos... {enabled}"));

        if !enabled {
            out.line(format!(
                "Cluster {name} is not secured by Kerberos.  No action required."
            ));
            return Ok(GateStatus::Completed);
        }

        out.line(format!("Checking for {KERBEROS_ENV}/{KDC_TYPE_KEY}..."));
        let config = self.configs.desired_config(&cluster, KERBEROS_ENV)?;
        debug!(
            found = config.is_some(),
            tag = config.as_ref().and_then(|c| c.tag.as_deref()),
            "read {KERBEROS_ENV}"
        );

        let Some(raw) = config.as_ref().and_then(|bag| bag.property(KDC_TYPE_KEY)) else {
            out.kdc_type = Some(KdcType::None);
            out.line("KDC Type is NONE.  No action required.");
            return Ok(GateStatus::Completed);
        };

        let kdc_type = KdcType::from_property(Some(raw));
        out.line(format!("Checking KDC type... {kdc_type}"));

        if kdc_type.is_none() {
            out.kdc_type = Some(kdc_type);
            out.line("KDC Type is NONE.  No action required.");
            return Ok(GateStatus::Completed);
        }

        if !kdc_type.is_recognized() {
            warn!(kdc_type = raw, "unrecognized KDC type, holding for operator review");
        }
        out.kdc_type = Some(kdc_type);
        out.line("Regenerate keytabs after upgrade is complete.");
        Ok(GateStatus::Holding)
    }

    fn record(
        &self,
        ctx: &ExecutionContext,
        report: &Report,
        kdc_type: Option<KdcType>,
        reason: String,
    ) {
        let Some(sink) = self.audit else {
            return;
        };
        let cluster_name = ctx
            .resolve_cluster_name()
            .map(str::to_string)
            .unwrap_or_default();
        let event = GateAuditEvent {
            cluster_name,
            request_id: ctx.request_id,
            stage_id: ctx.stage_id,
            status: report.status,
            kdc_type,
            reason,
            ts: Utc::now(),
        };
        if let Err(err) = sink.log_gate_report(&event) {
            warn!("audit sink rejected gate event: {err}");
        }
    }
}
