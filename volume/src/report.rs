// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use crate::{header::Fields, page_map::PageMap};

/// Counts the payload pages a page map accounts for.
pub fn count_pages(page_map: PageMap<'_>) -> usize {
    page_map.map(|entry| entry.real_pages()).sum()
}

/// The human-readable identity of a volume.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeSummary {
    pub volume_index: u16,
    pub volume_total: u16,
    pub directory_name: String,
    pub label: String,
}

impl From<&Fields> for VolumeSummary {
    fn from(fields: &Fields) -> Self {
        Self {
            volume_index: fields.volume_index,
            volume_total: fields.volume_total,
            directory_name: fields.directory_name(),
            label: fields.label.to_lossy(),
        }
    }
}

impl fmt::Display for VolumeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Vol {:02} of {:02}", self.volume_index, self.volume_total)?;
        writeln!(f, "Dir {}", self.directory_name)?;
        write!(f, "{}", self.label)
    }
}

/// A [`VolumeSummary`] plus the number of pages the volume carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeReport {
    pub summary: VolumeSummary,
    pub pages: usize,
}

impl fmt::Display for VolumeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary)?;
        write!(f, "{} pages", self.pages)
    }
}
