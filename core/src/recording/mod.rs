pub mod recorder;
pub mod row;

pub use recorder::DetectionRecorder;
pub use row::{OutputRow, RESERVED_FIELDS};
