//! Block aggregation and upload payloads

pub mod block;
pub mod buckets;
pub mod payload;

pub use block::{BlockAggregate, BlockTally};
pub use buckets::{
    GlobalCounters, LengthStat, PosLengthStat, TldLengthStat, TldStat, TrackedCounters,
};
pub use payload::BlockPayload;
