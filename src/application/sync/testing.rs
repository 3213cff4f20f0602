//! Test doubles for the sync engine

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::engine::JobKind;
use super::report::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::application::ports::SoapTransport;
use crate::domain::{
    AuthorisationStore, ChargingPool, ChargingPoolId, ChargingPoolRepository,
    ChargingStationRepository, DomainError, DomainResult, EvseRepository, OperatorId,
    RoamingNetwork, TariffStore,
};
use crate::infrastructure::storage::InMemoryRoamingNetwork;
use crate::protocol::{EnvelopeBuilder, OchpMessage, OchpOperation};
use crate::support::errors::TransportError;

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail(TransportError),
    Hang,
}

/// Transport answering from per-action scripts, falling back to a shared
/// queue. The last reply of a queue repeats forever.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    fallback: Mutex<VecDeque<Reply>>,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<(String, String)>>,
}

pub(crate) fn envelope<M: OchpMessage>(message: &M) -> String {
    EnvelopeBuilder::new()
        .message(message)
        .unwrap()
        .build()
        .unwrap()
        .to_xml()
        .unwrap()
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any action without a script of its own.
    pub fn respond<M: OchpMessage>(&self, message: &M) {
        self.fallback
            .lock()
            .unwrap()
            .push_back(Reply::Text(envelope(message)));
    }

    pub fn respond_raw(&self, text: &str) {
        self.fallback
            .lock()
            .unwrap()
            .push_back(Reply::Text(text.to_string()));
    }

    pub fn fail(&self, error: TransportError) {
        self.fallback.lock().unwrap().push_back(Reply::Fail(error));
    }

    pub fn hang(&self) {
        self.fallback.lock().unwrap().push_back(Reply::Hang);
    }

    pub fn respond_to<Op: OchpOperation>(&self, response: &Op::Response) {
        self.script::<Op>(Reply::Text(envelope(response)));
    }

    pub fn fail_on<Op: OchpOperation>(&self, error: TransportError) {
        self.script::<Op>(Reply::Fail(error));
    }

    pub fn hang_on<Op: OchpOperation>(&self) {
        self.script::<Op>(Reply::Hang);
    }

    /// Calls to `Op` block until the returned gate is notified once per call.
    pub fn gate<Op: OchpOperation>(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(Op::soap_action(), gate.clone());
        gate
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to<Op: OchpOperation>(&self) -> usize {
        let action = Op::soap_action();
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == action)
            .count()
    }

    pub async fn wait_for_calls<Op: OchpOperation>(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.calls_to::<Op>() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("transport never saw the expected calls");
    }

    /// Replaces whatever `Op` was scripted to answer before.
    fn script<Op: OchpOperation>(&self, reply: Reply) {
        self.scripts
            .lock()
            .unwrap()
            .insert(Op::soap_action(), VecDeque::from([reply]));
    }

    fn next_reply(&self, action: &str) -> Option<Reply> {
        fn take(queue: &mut VecDeque<Reply>) -> Option<Reply> {
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        }
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(action) {
            Some(queue) if !queue.is_empty() => take(queue),
            _ => take(&mut self.fallback.lock().unwrap()),
        }
    }
}

#[async_trait]
impl SoapTransport for ScriptedTransport {
    async fn send(&self, soap_action: &str, envelope: String) -> Result<String, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((soap_action.to_string(), envelope));
        let gate = self.gates.lock().unwrap().get(soap_action).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.next_reply(soap_action) {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Hang) => std::future::pending().await,
            None => Err(TransportError::Http(format!(
                "no scripted reply for {soap_action}"
            ))),
        }
    }
}

/// Sink that keeps everything it receives.
#[derive(Default)]
pub(crate) struct CollectingDiagnostics {
    received: Mutex<Vec<(JobKind, Diagnostic)>>,
}

impl CollectingDiagnostics {
    pub fn kinds(&self, job: JobKind) -> Vec<DiagnosticKind> {
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|(j, _)| *j == job)
            .map(|(_, d)| d.kind)
            .collect()
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn report(&self, job: JobKind, diagnostic: &Diagnostic) {
        self.received
            .lock()
            .unwrap()
            .push((job, diagnostic.clone()));
    }
}

/// In-memory network whose pool writes fail for one operator.
pub(crate) struct FailingPools {
    inner: InMemoryRoamingNetwork,
    operator: OperatorId,
}

impl FailingPools {
    pub fn new(operator: OperatorId) -> Self {
        Self {
            inner: InMemoryRoamingNetwork::new(),
            operator,
        }
    }

    fn check(&self, pool: &ChargingPool) -> DomainResult<()> {
        if pool.operator_id == self.operator {
            return Err(DomainError::Storage(format!("pool table locked for {}", self.operator)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChargingPoolRepository for FailingPools {
    async fn find_by_id(&self, id: &ChargingPoolId) -> DomainResult<Option<ChargingPool>> {
        self.inner.pools().find_by_id(id).await
    }

    async fn create(&self, pool: ChargingPool) -> DomainResult<()> {
        self.check(&pool)?;
        self.inner.pools().create(pool).await
    }

    async fn update(&self, pool: ChargingPool) -> DomainResult<()> {
        self.check(&pool)?;
        self.inner.pools().update(pool).await
    }
}

impl RoamingNetwork for FailingPools {
    fn pools(&self) -> &dyn ChargingPoolRepository {
        self
    }

    fn stations(&self) -> &dyn ChargingStationRepository {
        self.inner.stations()
    }

    fn evses(&self) -> &dyn EvseRepository {
        self.inner.evses()
    }

    fn tariffs(&self) -> &dyn TariffStore {
        self.inner.tariffs()
    }

    fn authorisations(&self) -> &dyn AuthorisationStore {
        self.inner.authorisations()
    }
}
