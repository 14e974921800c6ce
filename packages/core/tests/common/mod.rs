//! Shared test doubles
//!
//! `MockTransport` and `MockChannel` replay scripted responses in order and
//! record every statement they receive. With nothing scripted they answer
//! with empty results.

#![allow(dead_code)]

use async_trait::async_trait;
use graphmodel_core::db::{QueryResult, Transport, TransportError, TransactionChannel};
use graphmodel_core::query::Statement;
use graphmodel_core::{ModelHolder, Transaction};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Batch = Result<Vec<QueryResult>, TransportError>;

/// Result of a node statement: `[id, properties]` rows
pub fn node_rows(rows: Vec<(i64, Value)>) -> QueryResult {
    QueryResult::from_rows(
        vec!["id(n)".into(), "n".into()],
        rows.into_iter()
            .map(|(id, props)| vec![Value::from(id), props])
            .collect(),
    )
}

pub fn rows(rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::from_rows(Vec::new(), rows)
}

pub fn db_error(code: &str, message: &str) -> TransportError {
    TransportError::database(code, message)
}

#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Batch>>,
    batches: Mutex<Vec<(Vec<Statement>, bool)>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the results of the next batch
    pub fn respond(&self, results: Vec<QueryResult>) {
        self.responses.lock().unwrap().push_back(Ok(results));
    }

    /// Script a single-statement batch
    pub fn respond_with(&self, result: QueryResult) {
        self.respond(vec![result]);
    }

    pub fn fail(&self, err: TransportError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn batches(&self) -> Vec<Vec<Statement>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .map(|(statements, _)| statements.clone())
            .collect()
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.batches().into_iter().flatten().collect()
    }

    pub fn last_statement(&self) -> Statement {
        self.statements().pop().expect("no statement submitted")
    }

    pub fn submissions(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn all_committed(&self) -> bool {
        self.batches.lock().unwrap().iter().all(|(_, commit)| *commit)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn submit(
        &self,
        statements: Vec<Statement>,
        commit: bool,
    ) -> Result<Vec<QueryResult>, TransportError> {
        let count = statements.len();
        self.batches.lock().unwrap().push((statements, commit));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![QueryResult::default(); count]))
    }
}

/// Observable state of a `MockChannel`
#[derive(Default)]
pub struct ChannelLog {
    responses: Mutex<VecDeque<Result<QueryResult, TransportError>>>,
    executed: Mutex<Vec<Statement>>,
    pub commits: AtomicUsize,
    pub rollbacks: AtomicUsize,
    rollback_error: Mutex<Option<TransportError>>,
}

impl ChannelLog {
    pub fn respond_with(&self, result: QueryResult) {
        self.responses.lock().unwrap().push_back(Ok(result));
    }

    pub fn fail(&self, err: TransportError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    pub fn fail_rollback(&self, err: TransportError) {
        *self.rollback_error.lock().unwrap() = Some(err);
    }

    pub fn executed(&self) -> Vec<Statement> {
        self.executed.lock().unwrap().clone()
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

pub struct MockChannel(Arc<ChannelLog>);

#[async_trait]
impl TransactionChannel for MockChannel {
    async fn execute(&self, statement: Statement) -> Result<QueryResult, TransportError> {
        self.0.executed.lock().unwrap().push(statement);
        self.0
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(QueryResult::default()))
    }

    async fn commit(&self) -> Result<(), TransportError> {
        self.0.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> Result<(), TransportError> {
        self.0.rollbacks.fetch_add(1, Ordering::SeqCst);
        match self.0.rollback_error.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// A transaction over a fresh `MockChannel`
pub fn transaction() -> (Transaction, Arc<ChannelLog>) {
    let log = Arc::new(ChannelLog::default());
    (Transaction::new(MockChannel(log.clone())), log)
}

pub fn holder() -> (ModelHolder, Arc<MockTransport>) {
    let transport = MockTransport::new();
    (ModelHolder::new(transport.clone()), transport)
}
