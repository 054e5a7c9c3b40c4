use serde::{Deserialize, Serialize};

/// Assignment of a resource (person, equipment, crew) to a task.
///
/// Carried as opaque payload for cost and coordinator display; the scheduler
/// never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAssignment {
    /// Identifier for the resource. This can be a person id, crew name, or equipment tag.
    pub resource_id: String,
    /// Share of the resource's working time spent on the task, in percent. Must be non-negative.
    pub load: f64,
    /// Whether this resource coordinates the task.
    #[serde(default)]
    pub coordinator: bool,
    /// Optional role of the resource while working on the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl ResourceAssignment {
    pub fn new(resource_id: impl Into<String>, load: f64) -> Self {
        Self {
            resource_id: resource_id.into(),
            load,
            coordinator: false,
            role: None,
        }
    }

    pub fn as_coordinator(mut self) -> Self {
        self.coordinator = true;
        self
    }
}
