use serde::{Deserialize, Serialize};

fn default_required_role() -> String {
    "guest".to_string()
}

/// A frontpage content page, visible only to roles that are (or inherit) `required_role`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub slug: String,
    pub title: String,
    #[serde(default = "default_required_role")]
    pub required_role: String,
    #[serde(default)]
    pub body: String,
}
