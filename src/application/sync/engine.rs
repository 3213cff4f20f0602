//! Sync engine
//!
//! Runs the two periodic pull jobs against the remote clearing house.
//! Each job is Idle or Running; a tick that finds its job running is
//! dropped, not queued. On success the job's cursor moves to the time the
//! run started. A `partly` answer keeps the cursor where it was, so the
//! next incremental run asks for the missing records again.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::client::OchpClient;
use super::guard::SingleFlight;
use super::reconcile::{
    reconcile_charge_points, reconcile_statuses, store_authorisations, store_tariffs,
    OperatorFilter,
};
use super::report::{
    Change, Diagnostic, DiagnosticKind, DiagnosticSink, SyncReport, TracingDiagnostics,
};
use crate::domain::RoamingNetwork;
use crate::protocol::messages::{
    GetChargePointListRequest, GetChargePointListUpdatesRequest,
    GetRoamingAuthorisationListRequest, GetRoamingAuthorisationListUpdatesRequest,
    GetStatusRequest, GetTariffUpdatesRequest,
};
use crate::protocol::{OchpOperation, OchpResponse, OchpResult, ResultCode};
use crate::support::errors::SyncError;
use crate::support::shutdown::ShutdownSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobKind {
    /// Charge point, tariff and authorisation metadata
    PullData,
    /// Live EVSE status
    PullStatus,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::PullData, JobKind::PullStatus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PullData => "pull_data",
            Self::PullStatus => "pull_status",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub enabled: bool,
    pub period: Duration,
    /// Deadline for each remote call of the job
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub data: JobSettings,
    pub status: JobSettings,
    /// Ask for changes since the last successful run instead of full lists
    pub incremental: bool,
    pub pull_tariffs: bool,
    pub pull_authorisations: bool,
    pub operators: OperatorFilter,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            data: JobSettings {
                enabled: true,
                period: Duration::from_secs(900),
                timeout: Duration::from_secs(120),
            },
            status: JobSettings {
                enabled: true,
                period: Duration::from_secs(60),
                timeout: Duration::from_secs(30),
            },
            incremental: true,
            pull_tariffs: true,
            pull_authorisations: true,
            operators: OperatorFilter::accept_all(),
        }
    }
}

/// Result of one timer tick
#[derive(Debug)]
pub enum TickOutcome {
    Disabled,
    /// A previous run of the same job still holds the guard
    AlreadyRunning,
    Completed(SyncReport),
    /// `report` holds whatever the run applied before it failed.
    Failed { error: SyncError, report: SyncReport },
}

impl TickOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Completed(report) => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::AlreadyRunning => "already_running",
            Self::Completed(_) => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

struct JobState {
    guard: SingleFlight,
    enabled: AtomicBool,
    cursor: RwLock<Option<DateTime<Utc>>>,
    settings: JobSettings,
}

impl JobState {
    fn new(settings: JobSettings) -> Self {
        Self {
            guard: SingleFlight::new(),
            enabled: AtomicBool::new(settings.enabled),
            cursor: RwLock::new(None),
            settings,
        }
    }
}

/// Cheap to clone; clones share job state.
#[derive(Clone)]
pub struct SyncEngine {
    client: Arc<OchpClient>,
    network: Arc<dyn RoamingNetwork>,
    settings: Arc<SyncSettings>,
    data: Arc<JobState>,
    status: Arc<JobState>,
    diagnostics: Arc<dyn DiagnosticSink>,
    shutdown: ShutdownSignal,
}

impl SyncEngine {
    pub fn new(client: OchpClient, network: Arc<dyn RoamingNetwork>, settings: SyncSettings) -> Self {
        Self {
            client: Arc::new(client),
            network,
            data: Arc::new(JobState::new(settings.data.clone())),
            status: Arc::new(JobState::new(settings.status.clone())),
            settings: Arc::new(settings),
            diagnostics: Arc::new(TracingDiagnostics),
            shutdown: ShutdownSignal::new(),
        }
    }

    /// Signal that stops the timers and cancels in-flight remote calls.
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    fn job(&self, kind: JobKind) -> &JobState {
        match kind {
            JobKind::PullData => &self.data,
            JobKind::PullStatus => &self.status,
        }
    }

    /// Takes effect on the next tick; a run in flight completes normally.
    pub fn set_enabled(&self, kind: JobKind, enabled: bool) {
        self.job(kind).enabled.store(enabled, Ordering::Release);
        info!(job = %kind, enabled, "Sync job toggled");
    }

    pub fn is_enabled(&self, kind: JobKind) -> bool {
        self.job(kind).enabled.load(Ordering::Acquire)
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.job(kind).guard.is_running()
    }

    /// Start time of the last successful run.
    pub async fn cursor(&self, kind: JobKind) -> Option<DateTime<Utc>> {
        *self.job(kind).cursor.read().await
    }

    /// Attempt one run of `kind`. Never blocks on a busy job.
    pub async fn tick(&self, kind: JobKind) -> TickOutcome {
        let job = self.job(kind);
        if !job.enabled.load(Ordering::Acquire) {
            debug!(job = %kind, "Sync job disabled, tick skipped");
            return TickOutcome::Disabled;
        }
        let Some(_permit) = job.guard.try_acquire() else {
            debug!(job = %kind, "Sync job still running, tick dropped");
            metrics::counter!("ochp_sync_runs_total", "job" => kind.as_str(), "outcome" => "already_running")
                .increment(1);
            return TickOutcome::AlreadyRunning;
        };

        let started_at = Utc::now();
        let timer = Instant::now();
        let since = *job.cursor.read().await;
        debug!(job = %kind, since = ?since, "Sync run started");

        let mut report = SyncReport::new(kind, started_at);
        let result = match kind {
            JobKind::PullData => self.pull_data(since, &mut report).await,
            JobKind::PullStatus => self.pull_status(since, &mut report).await,
        };
        let elapsed = timer.elapsed();
        report.duration = elapsed;

        // Work applied before a failure still reaches the sink and metrics.
        for diagnostic in &report.diagnostics {
            self.diagnostics.report(kind, diagnostic);
        }
        record_entities(&report);

        let outcome = match result {
            Ok(()) => {
                let partial = report
                    .diagnostics_of(DiagnosticKind::PartialResult)
                    .next()
                    .is_some();
                if partial {
                    info!(job = %kind, since = ?since, "Partial result, cursor kept");
                } else {
                    *job.cursor.write().await = Some(started_at);
                }
                info!(
                    job = %kind,
                    created = report.evses().created,
                    updated = report.evses().updated,
                    statuses = report.statuses.updated,
                    diagnostics = report.diagnostics.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Sync run completed"
                );
                TickOutcome::Completed(report)
            }
            Err(error) => {
                warn!(job = %kind, error = %error, timeout = error.is_timeout(), "Sync run failed");
                self.diagnostics.report(
                    kind,
                    &Diagnostic::new(DiagnosticKind::FetchFailed, error.to_string()),
                );
                TickOutcome::Failed { error, report }
            }
        };

        metrics::counter!("ochp_sync_runs_total", "job" => kind.as_str(), "outcome" => outcome.label())
            .increment(1);
        metrics::histogram!("ochp_sync_run_duration_seconds", "job" => kind.as_str())
            .record(elapsed.as_secs_f64());
        outcome
    }

    /// Start one background timer per job. Each tick runs on its own task
    /// so a slow run never delays the timer.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        JobKind::ALL
            .into_iter()
            .map(|kind| {
                let engine = self.clone();
                tokio::spawn(async move { engine.run_timer(kind).await })
            })
            .collect()
    }

    async fn run_timer(self, kind: JobKind) {
        let period = self.job(kind).settings.period;
        info!("🔄 Sync job {} started (period: {}s)", kind, period.as_secs());

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let engine = self.clone();
                    tokio::spawn(async move {
                        engine.tick(kind).await;
                    });
                }
                _ = self.shutdown.notified().wait() => {
                    info!("🔄 Sync job {} shutting down", kind);
                    break;
                }
            }
        }
    }

    async fn fetch<Op: OchpOperation>(
        &self,
        kind: JobKind,
        request: Op,
        report: &mut SyncReport,
    ) -> Result<Op::Response, SyncError> {
        let timeout = self.job(kind).settings.timeout;
        let response = self
            .client
            .call(&request, timeout, &self.shutdown)
            .await
            .map_err(|source| SyncError::Fetch {
                operation: Op::NAME,
                source,
            })?;
        check_result(Op::NAME, response.result(), report)?;
        Ok(response)
    }

    async fn pull_data(
        &self,
        since: Option<DateTime<Utc>>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let kind = JobKind::PullData;
        let network = self.network.as_ref();
        let since = since.filter(|_| self.settings.incremental);

        let charge_points = match since {
            Some(last_update) => {
                self.fetch(kind, GetChargePointListUpdatesRequest { last_update }, report)
                    .await?
                    .items
            }
            None => self.fetch(kind, GetChargePointListRequest, report).await?.items,
        };
        reconcile_charge_points(network, &self.settings.operators, charge_points, report).await;

        if self.settings.pull_tariffs {
            let tariffs = self
                .fetch(kind, GetTariffUpdatesRequest { last_update: since }, report)
                .await?
                .items;
            store_tariffs(network, tariffs, report).await;
        }

        if self.settings.pull_authorisations {
            let authorisations = match since {
                Some(last_update) => {
                    self.fetch(kind, GetRoamingAuthorisationListUpdatesRequest { last_update }, report)
                        .await?
                        .items
                }
                None => {
                    self.fetch(kind, GetRoamingAuthorisationListRequest, report)
                        .await?
                        .items
                }
            };
            store_authorisations(network, authorisations, report).await;
        }

        Ok(())
    }

    async fn pull_status(
        &self,
        since: Option<DateTime<Utc>>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let kind = JobKind::PullStatus;
        let request = GetStatusRequest {
            start_date_time: since.filter(|_| self.settings.incremental),
            status_type: None,
        };
        let response = self.fetch(kind, request, report).await?;
        let observed_at = report.started_at;
        reconcile_statuses(
            self.network.as_ref(),
            &self.settings.operators,
            response.evse,
            observed_at,
            report,
        )
        .await;

        if !response.parking.is_empty() {
            debug!(count = response.parking.len(), "Parking status has no local target, skipped");
            report.parking.add(Change::Skipped, response.parking.len());
        }
        Ok(())
    }
}

/// `ok` passes, `partly` passes with a diagnostic, anything else fails the run.
fn check_result(
    operation: &'static str,
    result: &OchpResult,
    report: &mut SyncReport,
) -> Result<(), SyncError> {
    if !result.is_success() {
        return Err(SyncError::Rejected {
            operation,
            result: result.clone(),
        });
    }
    if result.code == ResultCode::Partly {
        report.diagnose(
            Diagnostic::new(
                DiagnosticKind::PartialResult,
                result
                    .description
                    .clone()
                    .unwrap_or_else(|| "remote returned a partial result".to_string()),
            )
            .subject(operation),
        );
    }
    Ok(())
}

fn record_entities(report: &SyncReport) {
    let job = report.job.as_str();
    let groups = [
        ("pool", report.pools()),
        ("station", report.stations()),
        ("evse", report.evses()),
        ("status", report.statuses),
        ("parking", report.parking),
        ("tariff", report.tariffs),
        ("authorisation", report.authorisations),
    ];
    for (entity, counters) in groups {
        for (change, count) in counters.iter().filter(|(_, n)| *n > 0) {
            metrics::counter!(
                "ochp_sync_entities_total",
                "job" => job,
                "entity" => entity,
                "change" => change.as_str()
            )
            .increment(count as u64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sync::testing::{CollectingDiagnostics, ScriptedTransport};
    use crate::domain::EvseId;
    use crate::infrastructure::storage::InMemoryRoamingNetwork;
    use crate::protocol::messages::{
        GetChargePointListResponse, GetChargePointListUpdatesResponse,
        GetRoamingAuthorisationListResponse, GetRoamingAuthorisationListUpdatesResponse,
        GetStatusResponse, GetTariffUpdatesResponse,
    };
    use crate::protocol::types::authorisation::fixtures::authorisation;
    use crate::protocol::types::charge_point::fixtures::charge_point;
    use crate::protocol::types::tariff::fixtures::tariff;
    use crate::protocol::types::{
        EvseStatus, MajorStatus, MinorStatus, ParkingSpotStatus, ParkingStatus,
    };
    use crate::support::errors::{ClientError, TransportError};

    struct Harness {
        transport: Arc<ScriptedTransport>,
        network: Arc<InMemoryRoamingNetwork>,
        diagnostics: Arc<CollectingDiagnostics>,
        engine: SyncEngine,
    }

    fn harness(settings: SyncSettings) -> Harness {
        let transport = Arc::new(ScriptedTransport::new());
        let network = Arc::new(InMemoryRoamingNetwork::new());
        let diagnostics = Arc::new(CollectingDiagnostics::default());
        let engine = SyncEngine::new(
            OchpClient::new(transport.clone()),
            network.clone(),
            settings,
        )
        .with_diagnostics(diagnostics.clone());
        Harness {
            transport,
            network,
            diagnostics,
            engine,
        }
    }

    fn script_snapshot(transport: &ScriptedTransport) {
        let records = vec![
            charge_point("DE*ABC*E1*1", "LOC-1", "Invalidenstraße"),
            charge_point("DE*ABC*E1*2", "LOC-1", "Invalidenstraße"),
            charge_point("DE*XYZ*E7", "LOC-7", "Chausseestraße"),
        ];
        transport.respond_to::<GetChargePointListRequest>(&GetChargePointListResponse::new(
            OchpResult::ok(),
            records.clone(),
        ));
        transport.respond_to::<GetChargePointListUpdatesRequest>(
            &GetChargePointListUpdatesResponse::new(OchpResult::ok(), records),
        );
        transport.respond_to::<GetTariffUpdatesRequest>(&GetTariffUpdatesResponse::new(
            OchpResult::ok(),
            vec![tariff("T1", "0.30")],
        ));
        let authorisations = vec![authorisation("04A2B3C4", "DE-XYZ-C1")];
        transport.respond_to::<GetRoamingAuthorisationListRequest>(
            &GetRoamingAuthorisationListResponse::new(OchpResult::ok(), authorisations.clone()),
        );
        transport.respond_to::<GetRoamingAuthorisationListUpdatesRequest>(
            &GetRoamingAuthorisationListUpdatesResponse::new(OchpResult::ok(), authorisations),
        );
    }

    fn status_response(evse: &str) -> GetStatusResponse {
        GetStatusResponse {
            result: OchpResult::ok(),
            evse: vec![EvseStatus {
                evse_id: evse.parse().unwrap(),
                major: MajorStatus::Available,
                minor: Some(MinorStatus::Available),
                ttl: None,
            }],
            parking: vec![],
        }
    }

    #[tokio::test]
    async fn second_identical_run_creates_nothing() {
        let h = harness(SyncSettings::default());
        script_snapshot(&h.transport);

        let first = h.engine.tick(JobKind::PullData).await;
        let first = first.report().unwrap();
        assert_eq!(first.evses().created, 3);
        assert_eq!(first.stations().created, 2);
        assert_eq!(first.pools().created, 2);
        assert_eq!(first.tariffs.created, 1);
        assert_eq!(first.authorisations.created, 1);

        let second = h.engine.tick(JobKind::PullData).await;
        let second = second.report().unwrap();
        assert_eq!(second.evses().created, 0);
        assert_eq!(second.stations().created, 0);
        assert_eq!(second.pools().created, 0);
        assert_eq!(second.evses().unchanged, 3);
        assert_eq!(second.tariffs.unchanged, 1);
        assert_eq!(second.authorisations.unchanged, 1);
        assert_eq!(h.transport.calls_to::<GetRoamingAuthorisationListUpdatesRequest>(), 1);
        assert_eq!(h.network.size().evses, 3);
    }

    #[tokio::test]
    async fn cursor_advances_to_run_start_and_drives_updates() {
        let h = harness(SyncSettings::default());
        script_snapshot(&h.transport);
        assert_eq!(h.engine.cursor(JobKind::PullData).await, None);

        let outcome = h.engine.tick(JobKind::PullData).await;
        let started_at = outcome.report().unwrap().started_at;
        assert_eq!(h.engine.cursor(JobKind::PullData).await, Some(started_at));
        assert_eq!(h.transport.calls_to::<GetChargePointListRequest>(), 1);

        assert!(h.engine.tick(JobKind::PullData).await.report().is_some());
        assert_eq!(h.transport.calls_to::<GetChargePointListRequest>(), 1);
        assert_eq!(h.transport.calls_to::<GetChargePointListUpdatesRequest>(), 1);
        let (_, body) = h
            .transport
            .requests()
            .into_iter()
            .find(|(action, _)| *action == GetChargePointListUpdatesRequest::soap_action())
            .unwrap();
        let request: GetChargePointListUpdatesRequest =
            crate::protocol::decode_message(&body).unwrap();
        assert_eq!(request.last_update, started_at);
    }

    #[tokio::test]
    async fn failed_run_keeps_cursor_and_reports_diagnostic() {
        let h = harness(SyncSettings::default());
        h.transport.fail(TransportError::Http("connection refused".into()));

        let outcome = h.engine.tick(JobKind::PullData).await;
        assert!(matches!(
            outcome,
            TickOutcome::Failed {
                error: SyncError::Fetch {
                    operation: "GetChargePointList",
                    ..
                },
                ..
            }
        ));
        assert_eq!(h.engine.cursor(JobKind::PullData).await, None);
        assert!(!h.engine.is_running(JobKind::PullData));
        assert_eq!(
            h.diagnostics.kinds(JobKind::PullData),
            vec![DiagnosticKind::FetchFailed]
        );
    }

    #[tokio::test]
    async fn remote_rejection_fails_the_run() {
        let h = harness(SyncSettings::default());
        h.transport
            .respond_to::<GetChargePointListRequest>(&GetChargePointListResponse::not_authorized(
                "unknown partner",
            ));

        let outcome = h.engine.tick(JobKind::PullData).await;
        match outcome {
            TickOutcome::Failed {
                error: SyncError::Rejected { operation, result },
                ..
            } => {
                assert_eq!(operation, "GetChargePointList");
                assert_eq!(result.code, ResultCode::NotAuthorized);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(h.network.size().evses, 0);
    }

    #[tokio::test]
    async fn partial_result_is_kept_with_diagnostic() {
        let h = harness(SyncSettings {
            pull_tariffs: false,
            pull_authorisations: false,
            ..SyncSettings::default()
        });
        h.transport.respond_to::<GetChargePointListRequest>(&GetChargePointListResponse::new(
            OchpResult::partly("page 1 of 2"),
            vec![charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße")],
        ));

        let outcome = h.engine.tick(JobKind::PullData).await;
        let report = outcome.report().unwrap();
        assert_eq!(report.evses().created, 1);
        assert_eq!(
            h.diagnostics.kinds(JobKind::PullData),
            vec![DiagnosticKind::PartialResult]
        );
        assert_eq!(h.engine.cursor(JobKind::PullData).await, None);

        h.transport.respond_to::<GetChargePointListRequest>(&GetChargePointListResponse::new(
            OchpResult::ok(),
            vec![charge_point("DE*ABC*E1", "LOC-1", "Invalidenstraße")],
        ));
        let complete = h.engine.tick(JobKind::PullData).await;
        assert_eq!(h.transport.calls_to::<GetChargePointListRequest>(), 2);
        assert_eq!(
            h.engine.cursor(JobKind::PullData).await,
            Some(complete.report().unwrap().started_at)
        );
    }

    #[tokio::test]
    async fn later_stage_failure_keeps_earlier_diagnostics() {
        let h = harness(SyncSettings {
            pull_authorisations: false,
            ..SyncSettings::default()
        });
        h.transport.respond_to::<GetChargePointListRequest>(&GetChargePointListResponse::new(
            OchpResult::ok(),
            vec![
                charge_point("DE*ABC*E2", "LOC-B", "Invalidenstraße"),
                charge_point("DE*ABC*E1", "LOC-A", "Invalidenstraße"),
            ],
        ));
        h.transport
            .fail_on::<GetTariffUpdatesRequest>(TransportError::Http("connection reset".into()));

        let outcome = h.engine.tick(JobKind::PullData).await;
        match &outcome {
            TickOutcome::Failed { error, report } => {
                assert!(matches!(
                    error,
                    SyncError::Fetch {
                        operation: "GetTariffUpdates",
                        ..
                    }
                ));
                assert_eq!(report.evses().created, 1);
                assert_eq!(report.evses().skipped, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            h.diagnostics.kinds(JobKind::PullData),
            vec![DiagnosticKind::IdentityCollision, DiagnosticKind::FetchFailed]
        );
        assert_eq!(h.network.size().evses, 1);
        assert_eq!(h.engine.cursor(JobKind::PullData).await, None);
    }

    #[tokio::test]
    async fn timeout_releases_guard() {
        let mut settings = SyncSettings::default();
        settings.status.timeout = Duration::from_millis(20);
        let h = harness(settings);
        h.transport.hang_on::<GetStatusRequest>();

        let outcome = h.engine.tick(JobKind::PullStatus).await;
        match outcome {
            TickOutcome::Failed { error: err, .. } => {
                assert!(err.is_timeout());
                assert!(matches!(
                    err,
                    SyncError::Fetch {
                        source: ClientError::Timeout(_),
                        ..
                    }
                ));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!h.engine.is_running(JobKind::PullStatus));
        assert_eq!(
            h.diagnostics.kinds(JobKind::PullStatus),
            vec![DiagnosticKind::FetchFailed]
        );

        // The next tick gets through once the remote answers again.
        h.transport
            .respond_to::<GetStatusRequest>(&GetStatusResponse::ok());
        assert!(h.engine.tick(JobKind::PullStatus).await.report().is_some());
    }

    #[tokio::test]
    async fn disabled_job_skips_without_fetching() {
        let h = harness(SyncSettings::default());
        h.engine.set_enabled(JobKind::PullStatus, false);
        assert!(matches!(
            h.engine.tick(JobKind::PullStatus).await,
            TickOutcome::Disabled
        ));
        assert!(h.transport.requests().is_empty());

        h.engine.set_enabled(JobKind::PullStatus, true);
        h.transport
            .respond_to::<GetStatusRequest>(&GetStatusResponse::ok());
        assert!(h.engine.tick(JobKind::PullStatus).await.report().is_some());
    }

    #[tokio::test]
    async fn busy_job_drops_tick_while_other_job_proceeds() {
        let h = harness(SyncSettings {
            pull_tariffs: false,
            pull_authorisations: false,
            ..SyncSettings::default()
        });
        script_snapshot(&h.transport);
        h.transport
            .respond_to::<GetStatusRequest>(&status_response("DE*ABC*E404"));
        let gate = h.transport.gate::<GetChargePointListRequest>();

        let engine = h.engine.clone();
        let running = tokio::spawn(async move { engine.tick(JobKind::PullData).await });
        h.transport
            .wait_for_calls::<GetChargePointListRequest>(1)
            .await;
        assert!(h.engine.is_running(JobKind::PullData));

        assert!(matches!(
            h.engine.tick(JobKind::PullData).await,
            TickOutcome::AlreadyRunning
        ));
        assert_eq!(h.transport.calls_to::<GetChargePointListRequest>(), 1);

        let status = h.engine.tick(JobKind::PullStatus).await;
        assert_eq!(status.report().unwrap().statuses.skipped, 1);

        gate.notify_one();
        let finished = running.await.unwrap();
        assert_eq!(finished.report().unwrap().evses().created, 3);
        assert!(!h.engine.is_running(JobKind::PullData));
    }

    #[tokio::test]
    async fn status_run_updates_known_evse() {
        let h = harness(SyncSettings::default());
        script_snapshot(&h.transport);
        h.engine.tick(JobKind::PullData).await;

        h.transport
            .respond_to::<GetStatusRequest>(&status_response("DE*ABC*E1*1"));
        let outcome = h.engine.tick(JobKind::PullStatus).await;
        assert_eq!(outcome.report().unwrap().statuses.updated, 1);

        let id: EvseId = "DE*ABC*E1*1".parse().unwrap();
        let evse = h.network.evses().find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(evse.status, crate::domain::EvseStatusType::Available);
    }

    #[tokio::test]
    async fn parking_status_is_counted_as_skipped() {
        let h = harness(SyncSettings::default());
        let mut response = GetStatusResponse::ok();
        response.parking = vec![ParkingStatus {
            parking_id: "DE*ABC*P1".into(),
            status: ParkingSpotStatus::Available,
            ttl: None,
        }];
        h.transport.respond_to::<GetStatusRequest>(&response);

        let outcome = h.engine.tick(JobKind::PullStatus).await;
        let report = outcome.report().unwrap();
        assert_eq!(report.parking.skipped, 1);
        assert_eq!(report.statuses.total(), 0);
    }

    #[tokio::test]
    async fn timers_stop_on_shutdown() {
        let shutdown = ShutdownSignal::new();
        let mut settings = SyncSettings::default();
        settings.data.enabled = false;
        settings.status.enabled = false;
        let h = harness(settings);
        let engine = h.engine.with_shutdown(shutdown.clone());

        let handles = engine.start();
        shutdown.trigger();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(1), handle)
                .await
                .unwrap()
                .unwrap();
        }
    }
}
