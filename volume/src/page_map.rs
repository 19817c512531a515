// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The page map: the part of a volume header that says where each payload page goes.
//!
//! The map is a run of 36-byte entries. Each entry holds 8 signed page numbers followed by an
//! unsigned count. Payload pages are stored in the same order as the non-empty slots.

use std::iter::FusedIterator;

use serde::Deserialize;

use crate::codec::Deserializer;

/// The number of slots in one page map entry.
pub const SLOTS_PER_ENTRY: usize = 8;

/// The encoded size of one page map entry.
pub const ENTRY_SIZE: usize = SLOTS_PER_ENTRY * 4 + 4;

/// The raw slot value of an empty slot.
const SKIP: i32 = -1;

/// A page map entry as it appears on the wire.
#[derive(Debug, Deserialize)]
struct RawEntry {
    slots: [i32; SLOTS_PER_ENTRY],
    count: u32,
}

/// The destination of one payload page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// This volume does not carry a page for this slot.
    Skip,
    /// The next payload page belongs at this page of the image.
    Page(i32),
}

impl From<i32> for Slot {
    fn from(raw: i32) -> Self {
        if raw == SKIP {
            Self::Skip
        } else {
            Self::Page(raw)
        }
    }
}

impl Slot {
    pub fn page(self) -> Option<i32> {
        match self {
            Self::Skip => None,
            Self::Page(page) => Some(page),
        }
    }
}

/// One decoded page map entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageMapEntry {
    pub slots: [Slot; SLOTS_PER_ENTRY],
    /// Nonzero for every entry that is produced; zero marks the end of a short volume.
    pub count: u32,
}

impl From<RawEntry> for PageMapEntry {
    fn from(raw: RawEntry) -> Self {
        Self {
            slots: raw.slots.map(Slot::from),
            count: raw.count,
        }
    }
}

impl PageMapEntry {
    /// The destination pages of this entry's payload pages, in payload order.
    pub fn pages(&self) -> impl '_ + Iterator<Item = i32> {
        self.slots.iter().filter_map(|slot| slot.page())
    }

    /// The number of payload pages this entry accounts for.
    pub fn real_pages(&self) -> usize {
        self.pages().count()
    }
}

impl<'a> PageMap<'a> {
    /// Decodes the page map held in `bytes`, stopping once about `max_pages` slots have been
    /// produced.
    ///
    /// The bound is checked before each entry, so when `max_pages` is not a multiple of
    /// [`SLOTS_PER_ENTRY`] the final entry overshoots it.
    pub fn new(bytes: &'a [u8], max_pages: usize) -> Self {
        Self {
            de: Deserializer::from_bytes(bytes),
            max_pages,
            produced: 0,
            is_done: false,
        }
    }
}

/// A lazy decoder of page map entries.
#[derive(Debug)]
pub struct PageMap<'a> {
    de: Deserializer<'a>,
    max_pages: usize,
    produced: usize,
    is_done: bool,
}

impl<'a> PageMap<'a> {
    /// Flattens the remaining entries into their slots.
    pub fn slots(self) -> impl 'a + Iterator<Item = Slot> {
        self.flat_map(|entry| entry.slots)
    }
}

impl Iterator for PageMap<'_> {
    type Item = PageMapEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_done {
            return None;
        }
        if self.produced >= self.max_pages {
            tracing::debug!("page map reached {} slots", self.produced);
            self.is_done = true;

            return None;
        }

        let raw = match RawEntry::deserialize(&mut self.de) {
            Ok(it) => it,
            Err(e) => {
                tracing::warn!(
                    "page map runs off the end of the header after {} slots: {}",
                    self.produced,
                    e,
                );
                self.is_done = true;

                return None;
            }
        };

        if raw.count == 0 {
            // Short volume.
            tracing::debug!("page map ends after {} slots", self.produced);
            self.is_done = true;

            return None;
        }
        self.produced += SLOTS_PER_ENTRY;

        Some(raw.into())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_done {
            (0, Some(0))
        } else {
            (0, Some(self.de.remaining() / ENTRY_SIZE))
        }
    }
}

impl FusedIterator for PageMap<'_> {}
