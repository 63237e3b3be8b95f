//! Task dependency graph.
//!
//! Nodes declare the fields they read; the graph derives the tier order
//! with Kahn's algorithm. Construction rejects graphs where two nodes
//! produce the same field, a dependency has no producer, or the
//! dependencies form a cycle.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{ErrorOutcome, TaskResult};
use crate::model::{Field, FieldValue};

use super::executor::TaskOutputs;

/// Boxed future returned by a node body.
pub type TaskFuture = Pin<Box<dyn Future<Output = TaskResult<FieldValue>> + Send + 'static>>;

type TaskFn = Arc<dyn Fn(Arc<TaskOutputs>) -> TaskFuture + Send + Sync>;

/// What a node failure does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the whole request with the node's outcome.
    Abort,
    /// Record the outcome against the field and keep going.
    Degrade,
}

/// Errors from graph validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("field {0} has more than one producer")]
    DuplicateProducer(Field),

    #[error("{field} depends on {dependency}, which nothing produces")]
    MissingDependency { field: Field, dependency: Field },

    #[error("dependency cycle among {0:?}")]
    Cycle(Vec<Field>),

    #[error("no node produces {0}")]
    UnknownTarget(Field),
}

impl From<GraphError> for crate::Error {
    fn from(err: GraphError) -> Self {
        crate::Error::InvalidGraph(err.to_string())
    }
}

impl From<GraphError> for ErrorOutcome {
    fn from(err: GraphError) -> Self {
        ErrorOutcome::internal(err.to_string())
    }
}

/// One unit of work filling one record field.
#[derive(Clone)]
pub struct TaskNode {
    field: Field,
    deps: Vec<Field>,
    policy: FailurePolicy,
    run: TaskFn,
}

impl TaskNode {
    pub fn new<F, Fut>(field: Field, policy: FailurePolicy, run: F) -> Self
    where
        F: Fn(Arc<TaskOutputs>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult<FieldValue>> + Send + 'static,
    {
        let run: TaskFn = Arc::new(move |inputs| Box::pin(run(inputs)) as TaskFuture);
        Self { field, deps: Vec::new(), policy, run }
    }

    pub fn depends_on(mut self, deps: &[Field]) -> Self {
        for dep in deps {
            if !self.deps.contains(dep) {
                self.deps.push(*dep);
            }
        }
        self
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn deps(&self) -> &[Field] {
        &self.deps
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub(crate) fn start(&self, inputs: Arc<TaskOutputs>) -> TaskFuture {
        (self.run)(inputs)
    }
}

impl std::fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskNode")
            .field("field", &self.field)
            .field("deps", &self.deps)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// A validated DAG of task nodes with its tier order.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<Field, TaskNode>,
    tiers: Vec<Vec<Field>>,
}

impl TaskGraph {
    pub fn new(nodes: Vec<TaskNode>) -> Result<Self, GraphError> {
        let mut by_field = BTreeMap::new();
        for node in nodes {
            let field = node.field;
            if by_field.insert(field, node).is_some() {
                return Err(GraphError::DuplicateProducer(field));
            }
        }

        for node in by_field.values() {
            if let Some(dependency) = node.deps.iter().find(|dep| !by_field.contains_key(dep)) {
                return Err(GraphError::MissingDependency { field: node.field, dependency: *dependency });
            }
        }

        let tiers = layer(&by_field)?;
        Ok(Self { nodes: by_field, tiers })
    }

    /// Tiers in execution order. Fields within a tier are sorted.
    pub fn tiers(&self) -> &[Vec<Field>] {
        &self.tiers
    }

    pub fn node(&self, field: Field) -> Option<&TaskNode> {
        self.nodes.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The graph restricted to `target` and everything it transitively reads.
    pub fn subgraph(&self, target: Field) -> Result<TaskGraph, GraphError> {
        if !self.nodes.contains_key(&target) {
            return Err(GraphError::UnknownTarget(target));
        }

        let mut keep = BTreeSet::new();
        let mut stack = vec![target];
        while let Some(field) = stack.pop() {
            if keep.insert(field)
                && let Some(node) = self.nodes.get(&field)
            {
                stack.extend(node.deps.iter().copied());
            }
        }

        let nodes = keep.iter().filter_map(|field| self.nodes.get(field).cloned()).collect();
        TaskGraph::new(nodes)
    }
}

fn layer(nodes: &BTreeMap<Field, TaskNode>) -> Result<Vec<Vec<Field>>, GraphError> {
    let mut remaining: BTreeMap<Field, BTreeSet<Field>> = nodes
        .iter()
        .map(|(field, node)| (*field, node.deps.iter().copied().collect()))
        .collect();
    let mut tiers = Vec::new();

    while !remaining.is_empty() {
        let ready: Vec<Field> = remaining
            .iter()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(field, _)| *field)
            .collect();

        if ready.is_empty() {
            return Err(GraphError::Cycle(remaining.keys().copied().collect()));
        }

        for field in &ready {
            remaining.remove(field);
        }
        for deps in remaining.values_mut() {
            for field in &ready {
                deps.remove(field);
            }
        }
        tiers.push(ready);
    }

    Ok(tiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(field: Field, deps: &[Field]) -> TaskNode {
        TaskNode::new(field, FailurePolicy::Degrade, |_| async { Ok(FieldValue::Logo(String::new())) })
            .depends_on(deps)
    }

    #[test]
    fn test_tiers_follow_dependencies() {
        let graph = TaskGraph::new(vec![
            node(Field::Logo, &[Field::Metadata, Field::Robots]),
            node(Field::Metadata, &[Field::Robots]),
            node(Field::Robots, &[]),
            node(Field::DomainStatus, &[]),
            node(Field::Images, &[Field::Robots]),
        ])
        .unwrap();

        assert_eq!(
            graph.tiers(),
            &[
                vec![Field::Robots, Field::DomainStatus],
                vec![Field::Metadata, Field::Images],
                vec![Field::Logo],
            ]
        );
    }

    #[test]
    fn test_duplicate_producer_rejected() {
        let result = TaskGraph::new(vec![node(Field::Robots, &[]), node(Field::Robots, &[])]);
        assert_eq!(result.unwrap_err(), GraphError::DuplicateProducer(Field::Robots));
    }

    #[test]
    fn test_missing_dependency_rejected() {
        let result = TaskGraph::new(vec![node(Field::Logo, &[Field::Metadata])]);
        assert!(matches!(
            result,
            Err(GraphError::MissingDependency { field: Field::Logo, dependency: Field::Metadata })
        ));
    }

    #[test]
    fn test_cycle_rejected() {
        let result = TaskGraph::new(vec![
            node(Field::Robots, &[]),
            node(Field::Metadata, &[Field::Logo]),
            node(Field::Logo, &[Field::Metadata]),
        ]);
        assert_eq!(result.unwrap_err(), GraphError::Cycle(vec![Field::Metadata, Field::Logo]));
    }

    #[test]
    fn test_subgraph_keeps_ancestors_only() {
        let graph = TaskGraph::new(vec![
            node(Field::Robots, &[]),
            node(Field::DomainStatus, &[]),
            node(Field::Metadata, &[Field::Robots]),
            node(Field::IndustryClassification, &[Field::Metadata]),
            node(Field::Images, &[Field::Robots]),
        ])
        .unwrap();

        let sub = graph.subgraph(Field::IndustryClassification).unwrap();
        assert_eq!(sub.fields().collect::<Vec<_>>(), vec![
            Field::Robots,
            Field::Metadata,
            Field::IndustryClassification
        ]);
        assert_eq!(sub.tiers().len(), 3);
    }

    #[test]
    fn test_subgraph_unknown_target() {
        let graph = TaskGraph::new(vec![node(Field::Robots, &[])]).unwrap();
        assert_eq!(graph.subgraph(Field::Logo).unwrap_err(), GraphError::UnknownTarget(Field::Logo));
    }

    #[test]
    fn test_depends_on_deduplicates() {
        let n = node(Field::Logo, &[Field::Robots, Field::Robots]);
        assert_eq!(n.deps(), &[Field::Robots]);
    }
}
