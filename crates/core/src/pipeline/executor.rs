//! Tiered execution of a [`TaskGraph`].
//!
//! Every node of a tier is spawned onto its own task in a `JoinSet`.
//! Panics, timeouts and payloads of the wrong field are turned into an
//! [`ErrorOutcome`] at the node boundary, so one node never unwinds into
//! its siblings. A node failing under [`FailurePolicy::Abort`] drops the
//! join set (aborting whatever is still running) and no later tier starts.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::error::{ErrorOutcome, TaskResult};
use crate::model::{Field, FieldValue, Metadata, RobotsPolicy};

use super::graph::{FailurePolicy, TaskGraph, TaskNode};

/// How node failure policies are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Honor each node's own policy.
    #[default]
    PerNode,
    /// Every failure aborts. Used when a single field is requested.
    Strict,
}

/// Results of finished nodes, keyed by field.
#[derive(Debug, Clone, Default)]
pub struct TaskOutputs {
    results: BTreeMap<Field, TaskResult<FieldValue>>,
}

impl TaskOutputs {
    pub fn insert(&mut self, result: (Field, TaskResult<FieldValue>)) {
        self.results.insert(result.0, result.1);
    }

    pub fn get(&self, field: Field) -> Option<&TaskResult<FieldValue>> {
        self.results.get(&field)
    }

    pub fn take(&mut self, field: Field) -> Option<TaskResult<FieldValue>> {
        self.results.remove(&field)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The robots policy, if the gate has resolved successfully.
    pub fn robots(&self) -> Option<&RobotsPolicy> {
        match self.results.get(&Field::Robots) {
            Some(Ok(FieldValue::Robots(policy))) => Some(policy),
            _ => None,
        }
    }

    /// Resolved metadata, or the all-empty value when the task degraded.
    pub fn metadata(&self) -> Metadata {
        match self.results.get(&Field::Metadata) {
            Some(Ok(FieldValue::Metadata(metadata))) => metadata.clone(),
            _ => Metadata::default(),
        }
    }

    pub fn into_results(self) -> BTreeMap<Field, TaskResult<FieldValue>> {
        self.results
    }
}

/// Runs graphs tier by tier with per-node isolation.
#[derive(Debug, Clone)]
pub struct Executor {
    task_timeout: Duration,
    mode: ExecutionMode,
}

impl Executor {
    pub fn new(task_timeout: Duration) -> Self {
        Self { task_timeout, mode: ExecutionMode::PerNode }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    fn policy_for(&self, node: &TaskNode) -> FailurePolicy {
        match self.mode {
            ExecutionMode::Strict => FailurePolicy::Abort,
            ExecutionMode::PerNode => node.policy(),
        }
    }

    /// Execute every tier of `graph`.
    ///
    /// Returns the first aborting outcome, or the outputs of all nodes.
    pub async fn run(&self, graph: &TaskGraph) -> Result<TaskOutputs, ErrorOutcome> {
        let mut outputs = TaskOutputs::default();

        for (index, tier) in graph.tiers().iter().enumerate() {
            let inputs = Arc::new(outputs.clone());
            let mut join_set = JoinSet::new();

            for field in tier {
                let Some(node) = graph.node(*field) else { continue };
                let span = tracing::debug_span!("task", field = %field, tier = index);
                join_set.spawn(run_node(node.clone(), inputs.clone(), self.task_timeout).instrument(span));
            }

            while let Some(joined) = join_set.join_next().await {
                let (field, result) = match joined {
                    Ok(done) => done,
                    Err(err) => {
                        // Nodes catch their own panics, so this is a cancelled runtime task.
                        tracing::warn!("task join failed: {err}");
                        continue;
                    }
                };

                if let Err(outcome) = &result {
                    let policy = graph.node(field).map(|node| self.policy_for(node)).unwrap_or(FailurePolicy::Abort);
                    if policy == FailurePolicy::Abort {
                        tracing::warn!(%field, code = %outcome.code, "task failed, aborting request");
                        return Err(outcome.clone());
                    }
                    tracing::warn!(%field, code = %outcome.code, "task failed, field degraded: {}", outcome.message);
                }

                outputs.insert((field, result));
            }

            for field in tier {
                if outputs.get(*field).is_none() {
                    let outcome = ErrorOutcome::internal(format!("task for {field} did not complete"));
                    if graph.node(*field).map(|node| self.policy_for(node)) == Some(FailurePolicy::Abort) {
                        return Err(outcome);
                    }
                    outputs.insert((*field, Err(outcome)));
                }
            }
        }

        Ok(outputs)
    }
}

async fn run_node(node: TaskNode, inputs: Arc<TaskOutputs>, timeout: Duration) -> (Field, TaskResult<FieldValue>) {
    let field = node.field();
    let started = Instant::now();

    let guarded = AssertUnwindSafe(node.start(inputs)).catch_unwind();
    let result = match tokio::time::timeout(timeout, guarded).await {
        Err(_) => Err(ErrorOutcome::timeout(format!("{field} did not finish within {}ms", timeout.as_millis()))),
        Ok(Err(panic)) => Err(ErrorOutcome::panicked(format!("{field} panicked: {}", panic_message(&*panic)))),
        Ok(Ok(Ok(value))) if value.field() != field => Err(ErrorOutcome::unexpected_shape(format!(
            "{field} task returned a {} payload",
            value.field()
        ))),
        Ok(Ok(result)) => result,
    };

    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, ok = result.is_ok(), "task finished");
    (field, result)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ok_node(field: Field, value: FieldValue) -> TaskNode {
        TaskNode::new(field, FailurePolicy::Degrade, move |_| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    fn robots_node(result: TaskResult<RobotsPolicy>) -> TaskNode {
        TaskNode::new(Field::Robots, FailurePolicy::Abort, move |_| {
            let result = result.clone();
            async move { result.map(FieldValue::Robots) }
        })
    }

    async fn crash() -> TaskResult<FieldValue> {
        panic!("browser crashed")
    }

    fn allowed() -> RobotsPolicy {
        RobotsPolicy { allowed: true, base_url: "https://example.com".into(), ..Default::default() }
    }

    #[tokio::test]
    async fn test_downstream_sees_upstream_outputs() {
        let graph = TaskGraph::new(vec![
            robots_node(Ok(allowed())),
            TaskNode::new(Field::Logo, FailurePolicy::Degrade, |inputs: Arc<TaskOutputs>| async move {
                let base = inputs.robots().map(|r| r.base_url.clone()).unwrap_or_default();
                Ok(FieldValue::Logo(format!("{base}/logo.png")))
            })
            .depends_on(&[Field::Robots]),
        ])
        .unwrap();

        let outputs = Executor::new(Duration::from_secs(1)).run(&graph).await.unwrap();
        assert_eq!(outputs.get(Field::Logo), Some(&Ok(FieldValue::Logo("https://example.com/logo.png".into()))));
    }

    #[tokio::test]
    async fn test_abort_policy_stops_later_tiers() {
        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        let graph = TaskGraph::new(vec![
            robots_node(Err(ErrorOutcome::not_found("robots.txt missing"))),
            TaskNode::new(Field::Images, FailurePolicy::Degrade, move |_| {
                flag.store(true, Ordering::SeqCst);
                async { Ok(FieldValue::Images(vec![])) }
            })
            .depends_on(&[Field::Robots]),
        ])
        .unwrap();

        let err = Executor::new(Duration::from_secs(1)).run(&graph).await.unwrap_err();
        assert_eq!(err.code, "NOT_FOUND");
        assert!(!started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_abort_does_not_wait_for_slow_sibling() {
        let graph = TaskGraph::new(vec![
            robots_node(Err(ErrorOutcome::disallowed("/"))),
            TaskNode::new(Field::DomainStatus, FailurePolicy::Degrade, |_| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(FieldValue::DomainStatus(crate::model::DomainStatus::Live))
            }),
        ])
        .unwrap();

        let started = Instant::now();
        let result = Executor::new(Duration::from_secs(60)).run(&graph).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let graph = TaskGraph::new(vec![
            robots_node(Ok(allowed())),
            TaskNode::new(Field::Screenshot, FailurePolicy::Degrade, |_| crash()).depends_on(&[Field::Robots]),
            ok_node(Field::Images, FieldValue::Images(vec!["a.png".into(), "b.png".into()])).depends_on(&[Field::Robots]),
        ])
        .unwrap();

        let outputs = Executor::new(Duration::from_secs(1)).run(&graph).await.unwrap();
        let screenshot = outputs.get(Field::Screenshot).unwrap().as_ref().unwrap_err();
        assert_eq!(screenshot.code, ErrorOutcome::TASK_PANICKED);
        assert!(screenshot.message.contains("browser crashed"));
        assert!(matches!(outputs.get(Field::Images), Some(Ok(FieldValue::Images(v))) if v.len() == 2));
    }

    #[tokio::test]
    async fn test_timeout_becomes_outcome() {
        let graph = TaskGraph::new(vec![TaskNode::new(Field::Logo, FailurePolicy::Degrade, |_| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(FieldValue::Logo(String::new()))
        })])
        .unwrap();

        let outputs = Executor::new(Duration::from_millis(20)).run(&graph).await.unwrap();
        let err = outputs.get(Field::Logo).unwrap().as_ref().unwrap_err();
        assert_eq!(err.code, ErrorOutcome::TIMEOUT);
        assert_eq!(err.status_code, 504);
    }

    #[tokio::test]
    async fn test_wrong_payload_is_unexpected_shape() {
        let graph = TaskGraph::new(vec![ok_node(Field::Logo, FieldValue::Screenshot("x".into()))]).unwrap();

        let outputs = Executor::new(Duration::from_secs(1)).run(&graph).await.unwrap();
        let err = outputs.get(Field::Logo).unwrap().as_ref().unwrap_err();
        assert_eq!(err.code, ErrorOutcome::UNEXPECTED_SHAPE);
    }

    #[tokio::test]
    async fn test_strict_mode_aborts_on_degradable_failure() {
        let graph = TaskGraph::new(vec![
            robots_node(Ok(allowed())),
            TaskNode::new(Field::Metadata, FailurePolicy::Degrade, |_| async {
                Err(ErrorOutcome::upstream("status 500"))
            })
            .depends_on(&[Field::Robots]),
        ])
        .unwrap();

        let lenient = Executor::new(Duration::from_secs(1)).run(&graph).await.unwrap();
        assert!(lenient.metadata().is_empty());

        let strict = Executor::new(Duration::from_secs(1)).with_mode(ExecutionMode::Strict).run(&graph).await;
        assert_eq!(strict.unwrap_err().code, ErrorOutcome::UPSTREAM_ERROR);
    }
}
