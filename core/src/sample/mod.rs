pub mod batch;
pub mod record;

pub use batch::SampleBatch;
pub use record::{PointCloudSample, SampleRecord};
