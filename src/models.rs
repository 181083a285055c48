use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// Task struct
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub due_at: DateTime<Utc>,
    #[serde(default)]
    pub is_done: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

// Fields supplied when creating a task
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub due_at: DateTime<Utc>,
}

// Fields overwritten by a full edit
#[derive(Clone, Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskEdit {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub due_at: DateTime<Utc>,
}

/// The slice of a task that gets embedded into a schedule prompt.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskBrief {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub due_at: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<&Task> for TaskBrief {
    fn from(task: &Task) -> Self {
        TaskBrief {
            title: task.title.clone(),
            due_at: task.due_at.to_rfc3339(),
            description: task.description.clone(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct ScheduleRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<TaskBrief>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TaskBrief>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TaskBrief>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Active,
    Completed,
}

impl Filter {
    pub fn matches(self, task: &Task) -> bool {
        match self {
            Filter::All => true,
            Filter::Active => !task.is_done,
            Filter::Completed => task.is_done,
        }
    }

    pub fn next(self) -> Filter {
        match self {
            Filter::All => Filter::Active,
            Filter::Active => Filter::Completed,
            Filter::Completed => Filter::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Filter::All => "All",
            Filter::Active => "Active",
            Filter::Completed => "Completed",
        }
    }
}
