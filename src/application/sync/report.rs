//! Per-run counters and diagnostics
//!
//! A fresh [`SyncReport`] is created for every run and handed back to the
//! caller. Nothing here feeds back into reconciliation decisions.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::engine::JobKind;
use crate::domain::{OperatorId, Upsert};

/// What happened to one entity during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Created,
    Updated,
    Unchanged,
    Skipped,
}

impl Change {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
        }
    }
}

impl From<Upsert> for Change {
    fn from(upsert: Upsert) -> Self {
        match upsert {
            Upsert::Created => Self::Created,
            Upsert::Updated => Self::Updated,
            Upsert::Unchanged => Self::Unchanged,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl Counters {
    pub fn record(&mut self, change: Change) {
        self.add(change, 1);
    }

    pub fn add(&mut self, change: Change, count: usize) {
        match change {
            Change::Created => self.created += count,
            Change::Updated => self.updated += count,
            Change::Unchanged => self.unchanged += count,
            Change::Skipped => self.skipped += count,
        }
    }

    pub fn total(&self) -> usize {
        self.created + self.updated + self.unchanged + self.skipped
    }

    pub fn merge(&mut self, other: &Counters) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Change, usize)> {
        [
            (Change::Created, self.created),
            (Change::Updated, self.updated),
            (Change::Unchanged, self.unchanged),
            (Change::Skipped, self.skipped),
        ]
        .into_iter()
    }
}

/// Counters for one operator group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperatorCounters {
    pub pools: Counters,
    pub stations: Counters,
    pub evses: Counters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Operator failed the acceptance predicate
    OperatorRejected,
    /// Two records derived the same identity for different locations
    IdentityCollision,
    DuplicateEvse,
    UnknownEvse,
    InvalidRecord,
    /// Storage failure aborted one operator group
    GroupFailed,
    /// Remote answered `partly`
    PartialResult,
    FetchFailed,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OperatorRejected => "operator_rejected",
            Self::IdentityCollision => "identity_collision",
            Self::DuplicateEvse => "duplicate_evse",
            Self::UnknownEvse => "unknown_evse",
            Self::InvalidRecord => "invalid_record",
            Self::GroupFailed => "group_failed",
            Self::PartialResult => "partial_result",
            Self::FetchFailed => "fetch_failed",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub operator: Option<OperatorId>,
    /// Identifier of the affected record, if any
    pub subject: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            operator: None,
            subject: None,
            message: message.into(),
        }
    }

    pub fn operator(mut self, operator: &OperatorId) -> Self {
        self.operator = Some(operator.clone());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(operator) = &self.operator {
            write!(f, " {operator}")?;
        }
        if let Some(subject) = &self.subject {
            write!(f, " {subject}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Receives diagnostics as runs finish or fail.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, job: JobKind, diagnostic: &Diagnostic);
}

/// Default sink: every diagnostic becomes a `warn!` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticSink for TracingDiagnostics {
    fn report(&self, job: JobKind, diagnostic: &Diagnostic) {
        warn!(
            job = %job,
            kind = %diagnostic.kind,
            operator = diagnostic.operator.as_ref().map(|o| o.to_string()).as_deref(),
            subject = diagnostic.subject.as_deref(),
            "{}",
            diagnostic.message
        );
    }
}

/// Outcome of one completed run
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub job: JobKind,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub operators: BTreeMap<OperatorId, OperatorCounters>,
    /// Records whose operator could not be determined or was rejected
    pub rejected: usize,
    pub statuses: Counters,
    /// Parking spots have no local counterpart; every record is skipped.
    pub parking: Counters,
    pub tariffs: Counters,
    pub authorisations: Counters,
    pub diagnostics: Vec<Diagnostic>,
}

impl SyncReport {
    pub fn new(job: JobKind, started_at: DateTime<Utc>) -> Self {
        Self {
            job,
            started_at,
            duration: Duration::ZERO,
            operators: BTreeMap::new(),
            rejected: 0,
            statuses: Counters::default(),
            parking: Counters::default(),
            tariffs: Counters::default(),
            authorisations: Counters::default(),
            diagnostics: Vec::new(),
        }
    }

    pub fn operator_mut(&mut self, operator: &OperatorId) -> &mut OperatorCounters {
        self.operators.entry(operator.clone()).or_default()
    }

    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn pools(&self) -> Counters {
        self.sum(|c| c.pools)
    }

    pub fn stations(&self) -> Counters {
        self.sum(|c| c.stations)
    }

    pub fn evses(&self) -> Counters {
        self.sum(|c| c.evses)
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    fn sum(&self, pick: impl Fn(&OperatorCounters) -> Counters) -> Counters {
        self.operators.values().fold(Counters::default(), |mut acc, c| {
            acc.merge(&pick(c));
            acc
        })
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} started {} took {:.2}s",
            self.job,
            self.started_at.to_rfc3339(),
            self.duration.as_secs_f64()
        )?;
        for (operator, c) in &self.operators {
            writeln!(
                f,
                "  {operator}: pools {}/{}/{} stations {}/{}/{} evses {}/{}/{} (created/updated/skipped)",
                c.pools.created,
                c.pools.updated,
                c.pools.skipped,
                c.stations.created,
                c.stations.updated,
                c.stations.skipped,
                c.evses.created,
                c.evses.updated,
                c.evses.skipped,
            )?;
        }
        if self.rejected > 0 {
            writeln!(f, "  rejected records: {}", self.rejected)?;
        }
        if self.statuses.total() > 0 {
            writeln!(
                f,
                "  statuses: {} updated, {} unchanged, {} skipped",
                self.statuses.updated, self.statuses.unchanged, self.statuses.skipped
            )?;
        }
        if self.parking.total() > 0 {
            writeln!(f, "  parking: {} skipped", self.parking.skipped)?;
        }
        if self.tariffs.total() > 0 {
            writeln!(
                f,
                "  tariffs: {} created, {} updated, {} unchanged",
                self.tariffs.created, self.tariffs.updated, self.tariffs.unchanged
            )?;
        }
        if self.authorisations.total() > 0 {
            writeln!(
                f,
                "  authorisations: {} created, {} updated, {} unchanged",
                self.authorisations.created,
                self.authorisations.updated,
                self.authorisations.unchanged
            )?;
        }
        for diagnostic in &self.diagnostics {
            writeln!(f, "  {diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_over_operators() {
        let mut report = SyncReport::new(JobKind::PullData, Utc::now());
        let abc: OperatorId = "DE*ABC".parse().unwrap();
        let xyz: OperatorId = "DE*XYZ".parse().unwrap();
        report.operator_mut(&abc).evses.record(Change::Created);
        report.operator_mut(&xyz).evses.add(Change::Created, 2);
        report.operator_mut(&xyz).evses.record(Change::Skipped);

        let evses = report.evses();
        assert_eq!(evses.created, 3);
        assert_eq!(evses.skipped, 1);
        assert_eq!(evses.total(), 4);
        assert_eq!(report.pools(), Counters::default());
    }

    #[test]
    fn diagnostic_display() {
        let operator: OperatorId = "DE*ABC".parse().unwrap();
        let diagnostic = Diagnostic::new(DiagnosticKind::UnknownEvse, "no local EVSE")
            .operator(&operator)
            .subject("DE*ABC*E1");
        assert_eq!(
            diagnostic.to_string(),
            "[unknown_evse] DE*ABC DE*ABC*E1: no local EVSE"
        );
    }
}
