//! Arrow paths and the pure operations composing them.
//!
//! A leaf that asks for transition `x` produces the path `[("", x)]`. Each
//! ancestor re-prefixes the path with the name of the child it came through
//! and pads it with a step for itself, so by the time the path leaves the root
//! it reads deepest-first, e.g. `[("B:A", x), ("B", x), ("", x)]`.

use super::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `(node, label)` step. An empty label requests nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrowStep {
    pub node: NodeId,
    pub label: String,
}

impl ArrowStep {
    pub fn new(node: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            label: label.into(),
        }
    }

    pub fn requests_transition(&self) -> bool {
        !self.label.is_empty()
    }
}

/// Root-ward chain of steps produced for one participating leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArrowPath(Vec<ArrowStep>);

impl ArrowPath {
    pub fn new(steps: Vec<ArrowStep>) -> Self {
        Self(steps)
    }

    /// The path a leaf produces: a single step for itself.
    pub fn leaf(label: impl Into<String>) -> Self {
        Self(vec![ArrowStep::new(NodeId::empty(), label)])
    }

    /// Build a path from `(node, label)` pairs.
    ///
    /// # Example
    ///
    /// ```rust
    /// use hierarch::core::ArrowPath;
    ///
    /// let path = ArrowPath::from_pairs([("main:A:A", "x"), ("main:A", "x")]);
    /// assert_eq!(path.steps().len(), 2);
    /// assert!(path.requests_transition());
    /// ```
    pub fn from_pairs<I, N, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (N, L)>,
        N: Into<NodeId>,
        L: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(node, label)| ArrowStep::new(node, label))
                .collect(),
        )
    }

    pub fn steps(&self) -> &[ArrowStep] {
        &self.0
    }

    pub fn last(&self) -> Option<&ArrowStep> {
        self.0.last()
    }

    /// Re-root every step under `prefix`.
    pub fn prefixed(self, prefix: &str) -> Self {
        Self(
            self.0
                .into_iter()
                .map(|step| ArrowStep {
                    node: step.node.prefixed(prefix),
                    label: step.label,
                })
                .collect(),
        )
    }

    /// Whether the last step is the node the path is relative to.
    pub fn reaches_root(&self) -> bool {
        self.last().map_or(true, |step| step.node.is_empty())
    }

    /// Append `("", last label)` unless the path already ends at its root.
    pub fn padded(mut self) -> Self {
        if let Some(label) = self
            .last()
            .filter(|step| !step.node.is_empty())
            .map(|step| step.label.clone())
        {
            self.0.push(ArrowStep::new(NodeId::empty(), label));
        }
        self
    }

    /// Whether any step carries a non-empty label.
    pub fn requests_transition(&self) -> bool {
        self.0.iter().any(ArrowStep::requests_transition)
    }

    /// Rename the label of the last step according to `renames`.
    pub fn renamed_trailing(mut self, renames: &HashMap<String, String>) -> Self {
        if let Some(step) = self.0.last_mut() {
            if let Some(renamed) = renames.get(&step.label) {
                step.label = renamed.clone();
            }
        }
        self
    }
}

/// Re-root all paths under `prefix`.
pub fn prefix(prefix: &str, paths: Vec<ArrowPath>) -> Vec<ArrowPath> {
    paths.into_iter().map(|path| path.prefixed(prefix)).collect()
}

/// Pad every path so it reaches the node it is relative to.
pub fn pad_to_root(paths: Vec<ArrowPath>) -> Vec<ArrowPath> {
    paths.into_iter().map(ArrowPath::padded).collect()
}

/// Whether any transition was requested, whether or not it changes anything.
pub fn any_requested(paths: &[ArrowPath]) -> bool {
    paths.iter().any(ArrowPath::requests_transition)
}

/// Rename the trailing label of every path.
///
/// Lets an overriding binding surface a different label to its parent than
/// the one its children asked for.
pub fn rename_trailing(renames: &HashMap<String, String>, paths: Vec<ArrowPath>) -> Vec<ArrowPath> {
    paths
        .into_iter()
        .map(|path| path.renamed_trailing(renames))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_rewrites_every_step() {
        let paths = vec![ArrowPath::from_pairs([("B:A", "x"), ("B", "y"), ("", "z")])];

        let prefixed = prefix("C", paths);

        assert_eq!(
            prefixed,
            vec![ArrowPath::from_pairs([("C:B:A", "x"), ("C:B", "y"), ("C", "z")])]
        );
    }

    #[test]
    fn padding_adds_missing_root_step_once() {
        let padded = pad_to_root(vec![
            ArrowPath::from_pairs([("A", "x")]),
            ArrowPath::from_pairs([("A", "x"), ("", "x")]),
        ]);

        assert_eq!(padded[0], ArrowPath::from_pairs([("A", "x"), ("", "x")]));
        assert_eq!(padded[1], ArrowPath::from_pairs([("A", "x"), ("", "x")]));
        assert!(padded[0].reaches_root());
    }

    #[test]
    fn padding_leaves_empty_paths_alone() {
        assert_eq!(ArrowPath::default().padded(), ArrowPath::default());
    }

    #[test]
    fn any_requested_detects_labels_anywhere() {
        let quiet = vec![ArrowPath::from_pairs([("A", ""), ("", "")])];
        let renamed = vec![ArrowPath::from_pairs([("A", ""), ("", "y")])];

        assert!(!any_requested(&quiet));
        assert!(any_requested(&renamed));
        assert!(!any_requested(&[]));
    }

    #[test]
    fn rename_touches_only_the_trailing_step() {
        let renames = HashMap::from([("x".to_string(), "y".to_string())]);
        let paths = vec![ArrowPath::from_pairs([("main:a:a", "x"), ("main:a", "x")])];

        let renamed = rename_trailing(&renames, paths);

        assert_eq!(
            renamed,
            vec![ArrowPath::from_pairs([("main:a:a", "x"), ("main:a", "y")])]
        );
    }
}
