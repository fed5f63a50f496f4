//! Upload payload for one block

use super::buckets::{GlobalCounters, LengthStat, PosLengthStat, TldLengthStat};
use serde::{Deserialize, Serialize};

/// JSON body sent to the backend's aggregate upload endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    /// UTC date of the block, `YYYY-MM-DD`
    pub date: String,
    pub global: GlobalCounters,
    pub length_stats: Vec<LengthStat>,
    pub length_stats_by_tld: Vec<TldLengthStat>,
    pub word_pos_stats: Vec<PosLengthStat>,
}

impl BlockPayload {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
