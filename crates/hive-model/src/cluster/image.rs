use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Entry of the engine's image list.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub repo_tags: Vec<String>,
    #[serde(default)]
    pub size: i64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageSummary {
    /// Produced by an inline Dockerfile build.
    pub fn is_inline_build(&self) -> bool {
        self.repo_tags.iter().any(|t| t.starts_with("hive/"))
    }
}
