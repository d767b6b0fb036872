//! Plain-text trajectory records.
//!
//! Header lines: `goal_x goal_y radius max_speed`, one per agent.
//! Snapshot lines: `global_time x0 y0 x1 y1 ...`, agents in index order.

use crate::structs::Vector2D;
use std::io::{self, Write};

pub struct TelemetryWriter<W: Write> {
    out: W,
    lines: usize,
}

impl<W: Write> TelemetryWriter<W> {
    pub fn new(out: W) -> Self {
        TelemetryWriter { out, lines: 0 }
    }

    pub fn write_header(&mut self, goal: Vector2D, radius: f64, max_speed: f64) -> io::Result<()> {
        writeln!(self.out, "{} {} {}", goal, radius, max_speed)?;
        self.lines += 1;
        Ok(())
    }

    pub fn write_snapshot<I>(&mut self, global_time: f64, positions: I) -> io::Result<()>
    where
        I: IntoIterator<Item = Vector2D>,
    {
        write!(self.out, "{}", global_time)?;
        for position in positions {
            write!(self.out, " {}", position)?;
        }
        writeln!(self.out)?;
        self.lines += 1;
        Ok(())
    }

    /// Lines written so far.
    pub fn lines(&self) -> usize {
        self.lines
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
