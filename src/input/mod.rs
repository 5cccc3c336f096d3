//! Input acquisition: typed text, OCR-extracted text and speech transcripts,
//! normalized into a single [`InputSample`].

pub mod builder;
pub mod sample;

pub use builder::{AcquisitionError, InputSampleBuilder};
pub use sample::{InputMode, InputSample, SampleSource};
