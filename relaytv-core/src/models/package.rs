use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::PackageId;

/// Purchasable plan. Read-only to the streaming core; the concurrent stream
/// ceiling is the only field admission control consults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    /// Max simultaneous streams per subscriber on this plan.
    pub concurrent_limit: i32,
    pub duration_days: i32,
    /// Delivery bitrate ceiling in kbps, if the plan caps it.
    pub max_bitrate_kbps: Option<i32>,
    /// Free-form feature metadata (catalog concern, passed through).
    pub features: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
