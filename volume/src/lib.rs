// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// A backup volume is what the SINTRAN-III utility WINCH-TO-FLOPP writes to one floppy: a 16 KiB
// header followed by raw 2 KiB pages. The header says where in the Winchester filesystem image
// each of those pages belongs. Restoring an image is a matter of scattering the pages of every
// volume back to those positions.

pub mod codec;
pub mod driver;
pub mod header;
pub mod image;
pub mod page_map;
pub mod report;

use std::{fmt, io, path::PathBuf};

pub use codec::{DeserializeError, TextField};
pub use driver::{Driver, Failure, Mode, Outcome, VolumeOutcome};
pub use header::{Fields, Header, Volume};
pub use image::{merge, Image, MergeStats};
pub use page_map::{PageMap, PageMapEntry, Slot};
pub use report::{count_pages, VolumeReport, VolumeSummary};

/// The size of the header at the start of every volume.
pub const HEADER_SIZE: usize = 16384;

/// The size of a page, in both a volume's payload and the restored image.
pub const PAGE_SIZE: usize = 2048;

/// The number of pages assumed when reading straight from a device whose size is unknown. This is
/// the capacity of an HD floppy.
pub const FLOPPY_PAGES: usize = 608;

#[derive(Debug)]
pub enum Error {
    /// The volume is too small to hold a header.
    InvalidVolume,
    VolumeOpen(io::Error),
    VolumeRead(io::Error),
    ImageCreate { path: PathBuf, source: io::Error },
    ImageOpen { path: PathBuf, source: io::Error },
    ImageSeek { page: i32, source: io::Error },
    ImageWrite { page: i32, source: io::Error },
    Deserialize(DeserializeError),
    /// The report could not be written.
    Output(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidVolume => {
                write!(f, "illegal volume: shorter than the {}-byte header", HEADER_SIZE)
            }
            Self::VolumeOpen(e) => write!(f, "cannot open volume: {}", e),
            Self::VolumeRead(e) => write!(f, "error reading volume: {}", e),
            Self::ImageCreate { path, source } => {
                write!(f, "cannot create {}: {}", path.display(), source)
            }
            Self::ImageOpen { path, source } => {
                write!(f, "cannot open {} for writing: {}", path.display(), source)
            }
            Self::ImageSeek { page, source } => {
                write!(f, "error seeking to page {} in output image: {}", page, source)
            }
            Self::ImageWrite { page, source } => {
                write!(f, "error updating output image page {}: {}", page, source)
            }
            Self::Deserialize(e) => write!(f, "malformed volume header: {}", e),
            Self::Output(e) => write!(f, "error writing report: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidVolume => None,
            Self::VolumeOpen(e) | Self::VolumeRead(e) | Self::Output(e) => Some(e),
            Self::ImageCreate { source, .. }
            | Self::ImageOpen { source, .. }
            | Self::ImageSeek { source, .. }
            | Self::ImageWrite { source, .. } => Some(source),
            Self::Deserialize(e) => Some(e),
        }
    }
}
