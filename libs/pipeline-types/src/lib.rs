//! Records shared between the coverage pipeline and its callers.
//!
//! These types carry no geometry, so storage and transport layers can
//! serialize them without depending on the geometry kernel.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// The input was adjusted and processing continued unchanged.
    Info,
    /// An entity was skipped.
    Warning,
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Boundary,
    Grid,
    Vertices,
    Sectors,
    Index,
    Intersections,
    Output,
}

impl Stage {
    /// Stable lowercase name, used in log fields and serialized records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Boundary => "boundary",
            Stage::Grid => "grid",
            Stage::Vertices => "vertices",
            Stage::Sectors => "sectors",
            Stage::Index => "index",
            Stage::Intersections => "intersections",
            Stage::Output => "output",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit of work a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Sector(u64),
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityRef::Sector(id) => write!(f, "sector {id}"),
        }
    }
}

/// Something a run worked around: a skipped entity or an adjusted input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    pub entity: Option<EntityRef>,
    pub message: String,
}

impl Diagnostic {
    /// Creates a warning about one skipped entity.
    pub fn skipped(stage: Stage, entity: EntityRef, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage,
            entity: Some(entity),
            message: message.into(),
        }
    }

    /// Creates an informational note about a whole stage.
    pub fn note(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            stage,
            entity: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity {
            Some(entity) => write!(f, "[{}] {}: {}", self.stage, entity, self.message),
            None => write!(f, "[{}] {}", self.stage, self.message),
        }
    }
}
