//! Result sink port trait.

use crate::domain::error::IdxtrackError;
use crate::domain::pipeline::IndexBuild;

/// Port for writing a finished index build.
pub trait ReportPort {
    fn write(&self, build: &IndexBuild, output_dir: &str) -> Result<(), IdxtrackError>;
}
