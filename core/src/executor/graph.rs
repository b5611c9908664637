use std::collections::{HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::TaskLike;

/// Task dependency graph (DAG)
#[derive(Debug, Clone)]
pub struct TaskGraph<T: TaskLike> {
    /// Task nodes: task_id -> Task
    pub nodes: HashMap<String, T>,

    /// Dependency edges: task_id -> list of dependencies
    pub edges: HashMap<String, Vec<String>>,

    /// Reverse edges: task_id -> list of tasks that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,

    /// Original insertion order (for stable sorting)
    insertion_order: Vec<String>,
}

impl<T: TaskLike> TaskGraph<T> {
    /// Construct task graph from task list
    pub fn from_tasks(tasks: &[T]) -> Result<Self, ExecutorError> {
        let mut nodes = HashMap::new();
        let mut edges = HashMap::new();
        let mut reverse_edges: HashMap<String, Vec<String>> = HashMap::new();
        let mut insertion_order = Vec::new();

        for task in tasks {
            if nodes.contains_key(task.id()) {
                return Err(ExecutorError::DuplicateTaskId(task.id().to_string()));
            }

            let task_id = task.id().to_string();
            let dependencies = task.dependencies().to_vec();

            nodes.insert(task_id.clone(), task.clone());
            edges.insert(task_id.clone(), dependencies.clone());
            insertion_order.push(task_id.clone());

            for dep in dependencies {
                reverse_edges.entry(dep).or_default().push(task_id.clone());
            }
        }

        Ok(Self {
            nodes,
            edges,
            reverse_edges,
            insertion_order,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, task_id: &str) -> Option<&T> {
        self.nodes.get(task_id)
    }

    /// Validate dependency relationships
    pub fn validate(&self) -> Result<(), ExecutorError> {
        for task_id in &self.insertion_order {
            for dep in self.dependencies_of(task_id) {
                if !self.nodes.contains_key(dep) {
                    return Err(ExecutorError::DependencyNotFound {
                        task_id: task_id.clone(),
                        missing_dep: dep.clone(),
                    });
                }
            }
        }

        if let Some(cycle) = self.detect_cycle() {
            return Err(ExecutorError::CircularDependency(cycle));
        }

        Ok(())
    }

    /// Layered topological sort (Kahn's algorithm)
    ///
    /// Returns execution batches where tasks in the same batch have no
    /// dependency relationship and can run concurrently. Within a batch the
    /// input order is preserved.
    ///
    /// # Algorithm
    ///
    /// 1. Calculate in-degree for all nodes
    /// 2. Collect all nodes with in-degree 0 (first batch)
    /// 3. Remove these nodes and update in-degrees
    /// 4. Repeat until all nodes processed; a round that selects nothing
    ///    while nodes remain means the graph has a cycle
    ///
    /// # Time Complexity
    ///
    /// O(V + E) plus the per-batch ordering
    pub fn topological_sort(&self) -> Result<Vec<Vec<String>>, ExecutorError> {
        // edges[A] = [B, C] means A depends on B and C, so A's in-degree = 2.
        // Duplicate entries are counted once, the reverse edge list mirrors that.
        let mut in_degree: HashMap<&str, usize> = HashMap::with_capacity(self.nodes.len());
        for task_id in &self.insertion_order {
            let distinct: HashSet<&String> = self.dependencies_of(task_id).iter().collect();
            in_degree.insert(task_id.as_str(), distinct.len());
        }

        let position: HashMap<&str, usize> = self
            .insertion_order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut stages: Vec<Vec<String>> = Vec::new();
        let mut current_stage: Vec<String> = self
            .insertion_order
            .iter()
            .filter(|id| in_degree.get(id.as_str()) == Some(&0))
            .cloned()
            .collect();

        let mut processed = 0;

        while !current_stage.is_empty() {
            processed += current_stage.len();

            let mut next_stage = Vec::new();
            for task_id in &current_stage {
                let Some(dependents) = self.reverse_edges.get(task_id) else {
                    continue;
                };
                let mut seen = HashSet::new();
                for dependent in dependents {
                    if !seen.insert(dependent) {
                        continue;
                    }
                    if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next_stage.push(dependent.clone());
                        }
                    }
                }
            }

            // Preserve input order
            next_stage.sort_by_key(|id| position.get(id.as_str()).copied().unwrap_or(usize::MAX));

            stages.push(std::mem::replace(&mut current_stage, next_stage));
        }

        if processed != self.nodes.len() {
            let stuck: Vec<&str> = self
                .insertion_order
                .iter()
                .filter(|id| in_degree.get(id.as_str()).is_some_and(|d| *d > 0))
                .map(String::as_str)
                .collect();
            return Err(ExecutorError::CircularDependency(format!(
                "unable to schedule remaining tasks: {}",
                stuck.join(", ")
            )));
        }

        Ok(stages)
    }

    fn dependencies_of(&self, task_id: &str) -> &[String] {
        self.edges.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Detect circular dependencies using DFS
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    fn detect_cycle(&self) -> Option<String> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) && self.dfs_cycle(task_id, &mut visited, &mut stack) {
                return Some(format_cycle_path(&stack));
            }
        }

        None
    }

    fn dfs_cycle(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        visited.insert(node.to_string());
        stack.push(node.to_string());

        for dep in self.dependencies_of(node) {
            // Dependency already on the current path: cycle
            if let Some(pos) = stack.iter().position(|x| x == dep) {
                stack.push(dep.clone());
                *stack = stack[pos..].to_vec();
                return true;
            }

            if !visited.contains(dep) && self.dfs_cycle(dep, visited, stack) {
                return true;
            }
        }

        stack.pop();
        false
    }
}

fn format_cycle_path(stack: &[String]) -> String {
    stack.join(" -> ")
}

/// Build, validate and batch a task list in one step.
pub fn plan_batches<T: TaskLike>(tasks: &[T]) -> Result<Vec<Vec<String>>, ExecutorError> {
    let graph = TaskGraph::from_tasks(tasks)?;
    graph.validate()?;
    graph.topological_sort()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::{Task, TaskKind};
    use pretty_assertions::assert_eq;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task::new(id, TaskKind::HttpInstrumentation, format!("{id}.js"), "")
            .with_dependencies(deps.iter().map(|d| d.to_string()).collect())
    }

    fn batch_index(batches: &[Vec<String>], id: &str) -> usize {
        batches
            .iter()
            .position(|b| b.iter().any(|t| t == id))
            .unwrap()
    }

    #[test]
    fn layers_follow_dependencies() {
        let tasks = vec![
            task("dep", &[]),
            task("cfg", &["dep"]),
            task("a", &["cfg"]),
            task("b", &["cfg"]),
            task("c", &["cfg"]),
        ];
        let batches = plan_batches(&tasks).unwrap();
        assert_eq!(
            batches,
            vec![
                vec!["dep".to_string()],
                vec!["cfg".to_string()],
                vec!["a".to_string(), "b".to_string(), "c".to_string()],
            ]
        );
    }

    #[test]
    fn batches_are_a_permutation_and_respect_prerequisites() {
        // Diamond plus a tail and an independent root
        let tasks = vec![
            task("d", &["b", "c"]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("a", &[]),
            task("e", &["d", "a"]),
            task("solo", &[]),
        ];
        let batches = plan_batches(&tasks).unwrap();

        let mut flat: Vec<String> = batches.iter().flatten().cloned().collect();
        flat.sort();
        let mut ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        ids.sort();
        assert_eq!(flat, ids);

        for t in &tasks {
            let own = batch_index(&batches, &t.id);
            for dep in &t.dependencies {
                assert!(batch_index(&batches, dep) < own, "{dep} must precede {}", t.id);
            }
        }
        assert_eq!(batches[0], vec!["a".to_string(), "solo".to_string()]);
    }

    #[test]
    fn two_cycle_is_fatal() {
        let tasks = vec![task("A", &["B"]), task("B", &["A"])];
        let err = plan_batches(&tasks).unwrap_err();
        assert!(matches!(err, ExecutorError::CircularDependency(_)));
        assert!(err.is_graph_error());
    }

    #[test]
    fn sort_without_validate_still_detects_cycle() {
        let tasks = vec![task("root", &[]), task("x", &["y"]), task("y", &["x"])];
        let graph = TaskGraph::from_tasks(&tasks).unwrap();
        let err = graph.topological_sort().unwrap_err();
        match err {
            ExecutorError::CircularDependency(msg) => {
                assert!(msg.contains('x') && msg.contains('y'), "{msg}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = vec![task("loop", &["loop"])];
        assert!(matches!(
            plan_batches(&tasks),
            Err(ExecutorError::CircularDependency(_))
        ));
    }

    #[test]
    fn missing_dependency_is_reported() {
        let tasks = vec![task("a", &["ghost"])];
        match plan_batches(&tasks) {
            Err(ExecutorError::DependencyNotFound {
                task_id,
                missing_dep,
            }) => {
                assert_eq!(task_id, "a");
                assert_eq!(missing_dep, "ghost");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let tasks = vec![task("a", &[]), task("a", &[])];
        assert!(matches!(
            TaskGraph::from_tasks(&tasks),
            Err(ExecutorError::DuplicateTaskId(_))
        ));
    }

    #[test]
    fn repeated_prerequisite_counts_once() {
        let tasks = vec![task("a", &[]), task("b", &["a", "a"])];
        let batches = plan_batches(&tasks).unwrap();
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn empty_task_list_has_no_batches() {
        let tasks: Vec<Task> = Vec::new();
        assert!(plan_batches(&tasks).unwrap().is_empty());
    }
}
