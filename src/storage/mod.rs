pub mod anomaly_store;
pub mod batch_writer;
pub mod bucket;

pub use anomaly_store::{AnomalyStore, JsonLinesStore, MemoryStore, StoredAnomaly};
pub use batch_writer::{BatchWriter, WriteReport};
pub use bucket::{BucketStore, LocalBucketStore};
