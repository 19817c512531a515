// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod log;

use std::{io::Write as _, path::PathBuf};

use anyhow::{bail, Context as _};
use clap::Parser;
use winch_volume::{Driver, Mode};

/// Recreates an ND filesystem image from floppy disks or floppy disk images originally made with
/// the SINTRAN-III backup utility "WINCH-TO-FLOPP".
///
/// If no output file is given, only information about the backup volumes is written.
#[derive(Debug, Parser)]
#[command(name = "flopp-to-winch", version)]
struct Args {
    /// Write the decoded image to this file. The file is updated if it exists already, so volumes
    /// can be added one or more at a time.
    #[arg(short, long, value_name = "IMAGE")]
    output: Option<PathBuf>,
    /// Follow each volume's description with a hex dump of its header metadata.
    #[arg(long)]
    dump_header: bool,
    /// Volume files or floppy devices, in backup order.
    #[arg(required = true, value_name = "VOLUME")]
    volumes: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    log::init();
    let args = Args::parse();

    let mode = match args.output {
        Some(output) => Mode::Merge { output },
        None => Mode::Report,
    };
    tracing::debug!("{:?} over {} volume(s)", mode, args.volumes.len());
    let driver = Driver::new(mode).dump_header(args.dump_header);

    let mut stdout = std::io::stdout().lock();
    let outcome = driver
        .run(&args.volumes, &mut stdout)
        .context("failed to write volume descriptions")?;
    stdout.flush().context("failed to flush standard output")?;

    if let Some(failure) = outcome.failures.first() {
        if let Mode::Merge { output } = driver.mode() {
            bail!(
                "{} is incomplete: merging {} failed",
                output.display(),
                failure.path.display(),
            );
        }
        bail!("{} of {} volume(s) failed", outcome.failures.len(), args.volumes.len());
    }

    Ok(())
}
