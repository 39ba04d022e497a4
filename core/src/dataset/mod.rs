pub mod format;
pub mod source;

pub use format::SampleFormat;
pub use source::SampleSource;
