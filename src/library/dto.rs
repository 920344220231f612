use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct SavedStatus {
    pub saved: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { 50 }
