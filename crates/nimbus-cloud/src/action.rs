//! Action types for collection reconciliation

use crate::diff::DiffRecord;
use crate::entity::Entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a planned action for one entity of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Create a new entity from its desired spec
    Create { entity: Entity },

    /// Partially update an existing entity
    Update {
        entity: Entity,
        changed_paths: Vec<String>,
    },

    /// Delete an entity that is no longer desired
    Delete { key: String },

    /// Present on both sides with nothing to update
    NoOp { key: String },
}

impl Action {
    /// Translate a diff record into exactly one action
    pub fn from_diff(diff: DiffRecord) -> Self {
        match (diff.old, diff.new) {
            (None, Some(entity)) => Action::Create { entity },
            (Some(_), None) => Action::Delete { key: diff.key },
            (Some(_), Some(entity)) if !diff.changed_paths.is_empty() => Action::Update {
                entity,
                changed_paths: diff.changed_paths,
            },
            _ => Action::NoOp { key: diff.key },
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Action::Create { .. } => ActionType::Create,
            Action::Update { .. } => ActionType::Update,
            Action::Delete { .. } => ActionType::Delete,
            Action::NoOp { .. } => ActionType::NoOp,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Action::Create { entity } | Action::Update { entity, .. } => &entity.key,
            Action::Delete { key } | Action::NoOp { key } => key,
        }
    }

    /// Description of the action
    pub fn describe(&self) -> String {
        match self {
            Action::Create { entity } => format!("create {}", entity.key),
            Action::Update {
                entity,
                changed_paths,
            } => format!("update {} [{}]", entity.key, changed_paths.join(", ")),
            Action::Delete { key } => format!("delete {key}"),
            Action::NoOp { key } => format!("keep {key}"),
        }
    }
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// Move a resource to another folder
    Move,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::Move => write!(f, "move"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Result of applying a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Applied actions, in call order
    pub applied: Vec<ActionResult>,

    /// When the apply started
    pub started_at: DateTime<Utc>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self {
            applied: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    pub fn add(&mut self, action_type: ActionType, key: impl Into<String>, message: String) {
        self.applied.push(ActionResult {
            action_type,
            key: key.into(),
            message,
        });
    }

    /// Number of remote mutations issued
    pub fn changes(&self) -> usize {
        self.applied
            .iter()
            .filter(|r| r.action_type != ActionType::NoOp)
            .count()
    }
}

impl Default for ApplyReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a single applied action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: ActionType,

    /// Entity key
    pub key: String,

    /// Success message
    pub message: String,
}

/// Plan containing all actions for one collection of one parent resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Resource type (e.g., "kafka-topic", "mysql-host")
    pub resource_type: String,

    /// Parent resource identifier (e.g., a cluster ID)
    pub parent: String,

    /// Actions ordered by entity key
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(
        resource_type: impl Into<String>,
        parent: impl Into<String>,
        actions: Vec<Action>,
    ) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type() != ActionType::NoOp);
        Self {
            resource_type: resource_type.into(),
            parent: parent.into(),
            actions,
            has_changes,
        }
    }

    pub fn empty(resource_type: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::new(resource_type, parent, Vec::new())
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type() == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}
