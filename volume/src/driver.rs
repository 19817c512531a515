// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Processing of a whole backup set, one volume after another.

use std::{
    fmt,
    io,
    path::{Path, PathBuf},
};

use crate::{
    header::Volume,
    image::{merge, Image, MergeStats},
    report::{count_pages, VolumeReport, VolumeSummary},
    Error,
};

/// The width of a header dump row.
const DUMP_WIDTH: usize = 16;

/// What to do with each volume. The mode is fixed for a whole run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Describe each volume. A failing volume does not stop the run.
    Report,
    /// Scatter each volume's pages into the image at `output`. The first failing volume stops the
    /// run, as later volumes cannot make up for the pages it was meant to contribute.
    Merge { output: PathBuf },
}

/// The result of one volume that was processed successfully.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VolumeOutcome {
    Reported(VolumeReport),
    Merged {
        summary: VolumeSummary,
        stats: MergeStats,
    },
}

/// A volume that could not be processed.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// The result of a run.
#[derive(Debug, Default)]
pub struct Outcome {
    pub volumes: Vec<VolumeOutcome>,
    pub failures: Vec<Failure>,
    /// Whether volumes were left unprocessed because of a failure.
    pub is_aborted: bool,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Driver {
    pub fn new(mode: Mode) -> Self {
        Self { mode, dumps_header: false }
    }
}

pub struct Driver {
    mode: Mode,
    dumps_header: bool,
}

impl Driver {
    /// Whether to follow each volume's description with a hex dump of its header metadata.
    pub fn dump_header(mut self, dumps_header: bool) -> Self {
        self.dumps_header = dumps_header;
        self
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    /// Processes `volumes` in the given order, writing descriptions to `out`.
    ///
    /// Volume metadata is never used to reorder the set. Only a failure to write to `out` makes
    /// this return an error; volume failures are collected in the [`Outcome`].
    pub fn run<P: AsRef<Path>>(
        &self,
        volumes: &[P],
        out: &mut impl io::Write,
    ) -> Result<Outcome, Error> {
        let mut outcome = Outcome::default();

        for (i, path) in volumes.iter().enumerate() {
            let path = path.as_ref();
            if i > 0 {
                writeln!(out).map_err(Error::Output)?;
            }

            match self.process(path, out) {
                Ok(it) => outcome.volumes.push(it),
                Err(Error::Output(e)) => return Err(Error::Output(e)),
                Err(error) => {
                    let failure = Failure { path: path.to_path_buf(), error };
                    tracing::error!("{}", failure);
                    outcome.failures.push(failure);

                    if let Mode::Merge { output } = &self.mode {
                        let remaining = volumes.len() - i - 1;
                        if remaining > 0 {
                            tracing::error!(
                                "not merging the remaining {} volume(s) into {}",
                                remaining,
                                output.display(),
                            );
                        }
                        outcome.is_aborted = remaining > 0;

                        break;
                    }
                }
            }
        }

        Ok(outcome)
    }

    fn process(&self, path: &Path, out: &mut impl io::Write) -> Result<VolumeOutcome, Error> {
        let mut volume = Volume::open(path)?;
        let summary = VolumeSummary::from(volume.header().fields());
        tracing::info!(
            "{}: volume {} of {}",
            path.display(),
            summary.volume_index,
            summary.volume_total,
        );

        let outcome = match &self.mode {
            Mode::Report => {
                let report = VolumeReport {
                    summary,
                    pages: count_pages(volume.page_map()),
                };
                writeln!(out, "{}", report).map_err(Error::Output)?;
                self.dump(&volume, out)?;

                VolumeOutcome::Reported(report)
            }
            Mode::Merge { output } => {
                writeln!(out, "{}", summary).map_err(Error::Output)?;
                self.dump(&volume, out)?;

                // The image is only held open for as long as this volume is being merged.
                let mut image = Image::open_or_create(output)?;
                let stats = merge(&mut volume, &mut image)?;
                tracing::info!("{}: wrote {} pages", path.display(), stats.pages_written);

                VolumeOutcome::Merged { summary, stats }
            }
        };

        Ok(outcome)
    }

    fn dump<R>(&self, volume: &Volume<R>, out: &mut impl io::Write) -> Result<(), Error> {
        if !self.dumps_header {
            return Ok(());
        }

        winch_util::dump_rows(out, volume.header().metadata_bytes(), DUMP_WIDTH)
            .map_err(Error::Output)
    }
}
