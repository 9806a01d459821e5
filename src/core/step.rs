//! Step tree: leaves and parallel groups in document order

use crate::core::image::ImageRef;
use serde_yaml::Value;
use tracing::warn;

/// A single executable step
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    /// Optional display name from the document
    pub name: Option<String>,

    /// Shell command lines, in declared order
    pub script: Vec<String>,

    /// Image override for this step
    pub image: Option<ImageRef>,

    /// Per-step time budget in minutes
    pub max_time: Option<f64>,
}

impl Leaf {
    /// Build a leaf from the body of a `step` entry
    pub fn from_value(body: &Value) -> Self {
        let script = body
            .get("script")
            .and_then(Value::as_sequence)
            .map(|lines| {
                lines
                    .iter()
                    .filter_map(|line| match line.as_str() {
                        Some(command) => Some(command.to_string()),
                        None => {
                            warn!("Skipping non-string script entry: {:?}", line);
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Leaf {
            name: body.get("name").and_then(Value::as_str).map(str::to_string),
            script,
            image: body.get("image").and_then(ImageRef::from_value),
            max_time: body.get("max-time").and_then(minutes),
        }
    }

    /// Label used in output: the step name, or `Step <n>`
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Step {}", index + 1))
    }
}

/// A node of the step tree
#[derive(Debug, Clone, PartialEq)]
pub enum StepNode {
    Leaf(Leaf),
    /// Steps declared together inside a `parallel` block
    Group(Vec<StepNode>),
}

impl StepNode {
    /// Leaves of this node in execution order
    pub fn leaves(&self) -> Vec<&Leaf> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
        match self {
            StepNode::Leaf(leaf) => out.push(leaf),
            StepNode::Group(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

/// Resolve the steps array of a pipeline body into step nodes.
///
/// `step` entries become leaves and `parallel` entries become groups.
/// Entries with neither key (e.g. a custom pipeline's `variables`) are
/// skipped. Order is exactly document order.
pub fn resolve_steps(entries: Option<&Value>) -> Vec<StepNode> {
    let Some(entries) = entries.and_then(Value::as_sequence) else {
        return Vec::new();
    };

    let mut nodes = Vec::new();
    for entry in entries {
        if let Some(body) = entry.get("step") {
            nodes.push(StepNode::Leaf(Leaf::from_value(body)));
        } else if let Some(parallel) = entry.get("parallel") {
            // `parallel: { steps: [...] }` or the older `parallel: [...]`
            let children = match parallel.get("steps") {
                Some(steps) => resolve_steps(Some(steps)),
                None if parallel.is_sequence() => resolve_steps(Some(parallel)),
                None => {
                    warn!("Skipping parallel block without steps");
                    continue;
                }
            };
            nodes.push(StepNode::Group(children));
        }
    }

    nodes
}

/// Flatten resolved nodes into execution order
pub fn flatten(nodes: &[StepNode]) -> Vec<&Leaf> {
    nodes.iter().flat_map(StepNode::leaves).collect()
}

/// Read a duration in minutes; integers and floats are both accepted
pub(crate) fn minutes(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_i64().map(|m| m as f64))
}
