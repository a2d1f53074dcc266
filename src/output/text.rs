//! Human-readable text output

use super::Report;
use crate::walker::WalkerResult;
use crate::Result;
use std::io::{self, Write};

/// Line-per-result console report
///
/// Each line is flushed as soon as it is written so progress shows while
/// slower walkers are still running.
pub struct TextReport<W: Write> {
    out: W,
}

impl TextReport<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextReport<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Report for TextReport<W> {
    fn walker_finished(&mut self, result: &WalkerResult) -> Result<()> {
        writeln!(
            self.out,
            "Walker {} finished in {} steps.",
            result.source, result.steps_taken
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn all_complete(&mut self) -> Result<()> {
        writeln!(self.out, "All walkers have completed their walks.")?;
        self.out.flush()?;
        Ok(())
    }
}
