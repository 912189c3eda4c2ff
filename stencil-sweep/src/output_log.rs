// Copyright 2022 Clemens Lutz
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The sweep results file.
//!
//! The format is meant to be plotted directly with gnuplot: comment lines
//! start with `#`, and data rows hold tab-separated columns.
//!
//! ```text
//! #MATRIX_SIZE : 8192
//! #START : Mon Oct 17 10:00:00 CEST 2022
//! #num_iteration	ydim_gpu	speedup
//! 1	0	0.98
//! ...
//! #END : Mon Oct 17 16:00:00 CEST 2022
//! ```

use crate::error::Result;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const COLUMNS: [&str; 3] = ["num_iteration", "ydim_gpu", "speedup"];

/// The averaged measurement of one grid point.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResultRow {
    pub iteration_count: u32,
    pub gpu_dim: u32,
    pub mean: f64,
}

impl fmt::Display for ResultRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t", self.iteration_count, self.gpu_dim)?;

        // gnuplot treats "nan" as a missing value
        if self.mean.is_nan() {
            write!(f, "nan")
        } else {
            write!(f, "{}", self.mean)
        }
    }
}

/// Line-oriented, append-only writer of the results file.
///
/// Each line is flushed as soon as it is written, so that an interrupted sweep
/// leaves behind all rows measured so far.
pub struct OutputLog<W: Write> {
    writer: W,
}

impl OutputLog<BufWriter<File>> {
    /// Creates the results file, truncating previous contents.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::from_writer(BufWriter::new(file)))
    }
}

impl<W: Write> OutputLog<W> {
    pub fn from_writer(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self, matrix_size: u32, start: &str) -> Result<()> {
        self.write_line(format_args!("#MATRIX_SIZE : {}", matrix_size))?;
        self.write_line(format_args!("#START : {}", start))?;
        self.write_line(format_args!("#{}", COLUMNS.join("\t")))
    }

    pub fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        self.write_line(format_args!("{}", row))
    }

    pub fn write_footer(&mut self, end: &str) -> Result<()> {
        self.write_line(format_args!("#END : {}", end))
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line(&mut self, line: fmt::Arguments<'_>) -> Result<()> {
        self.writer.write_fmt(line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
