pub mod error;
pub mod summary;
pub mod tags;

pub use error::{CliError, PipelineError};
pub use summary::StageSummary;
pub use tags::{NodeNormalizer, RawTags, WayClass, WayNormalizer};
