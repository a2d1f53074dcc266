//! Output formatting
//!
//! The coordinator streams results into a `Report` as they arrive. The text
//! report is the console output; the JSON summary is written once after the
//! run.

pub mod json;
pub mod text;

use crate::walker::WalkerResult;
use crate::Result;

/// Sink for coordinator progress
///
/// Calls arrive in result arrival order: one `walker_finished` per result,
/// then a single `all_complete`.
pub trait Report {
    fn walker_finished(&mut self, result: &WalkerResult) -> Result<()>;

    fn all_complete(&mut self) -> Result<()>;
}

impl<R: Report + ?Sized> Report for &mut R {
    fn walker_finished(&mut self, result: &WalkerResult) -> Result<()> {
        (**self).walker_finished(result)
    }

    fn all_complete(&mut self) -> Result<()> {
        (**self).all_complete()
    }
}
