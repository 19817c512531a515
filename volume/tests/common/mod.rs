// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use winch_volume::{HEADER_SIZE, PAGE_SIZE};

/// Builds the bytes of a backup volume.
#[derive(Clone, Debug)]
pub struct VolumeBuilder {
    volume_index: u16,
    volume_total: u16,
    directory_name: [u8; 16],
    label: [u8; 50],
    entries: Vec<([i32; 8], u32)>,
    payload: Vec<[u8; PAGE_SIZE]>,
}

impl Default for VolumeBuilder {
    fn default() -> Self {
        let mut directory_name = [b' '; 16];
        directory_name[..4].copy_from_slice(b"SYS'");

        Self {
            volume_index: 1,
            volume_total: 1,
            directory_name,
            label: [0; 50],
            entries: Vec::new(),
            payload: Vec::new(),
        }
    }
}

impl VolumeBuilder {
    pub fn index(mut self, index: u16, total: u16) -> Self {
        self.volume_index = index;
        self.volume_total = total;
        self
    }

    pub fn directory_name(mut self, raw: [u8; 16]) -> Self {
        self.directory_name = raw;
        self
    }

    pub fn label(mut self, text: &str) -> Self {
        self.label = [0; 50];
        self.label[..text.len()].copy_from_slice(text.as_bytes());
        self
    }

    /// Adds a page map entry with a nonzero count.
    pub fn entry(mut self, slots: [i32; 8]) -> Self {
        self.entries.push((slots, 1));
        self
    }

    /// Adds the zero-count entry that ends a short volume.
    pub fn end(mut self) -> Self {
        self.entries.push(([-1; 8], 0));
        self
    }

    /// Adds a payload page filled with `fill`.
    pub fn page(mut self, fill: u8) -> Self {
        self.payload.push([fill; PAGE_SIZE]);
        self
    }

    /// Adds a payload page for every nonempty slot so far, each filled with its destination page
    /// number plus `salt`.
    pub fn pages_for_slots(mut self, salt: u8) -> Self {
        let fills: Vec<u8> = self
            .entries
            .iter()
            .filter(|(_, count)| *count != 0)
            .flat_map(|(slots, _)| slots.iter().copied())
            .filter(|slot| *slot != -1)
            .map(|slot| (slot as u8).wrapping_add(salt))
            .collect();
        for fill in fills {
            self = self.page(fill);
        }

        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![0; HEADER_SIZE];
        bytes[0..2].copy_from_slice(&self.volume_index.to_be_bytes());
        bytes[2..18].copy_from_slice(&self.directory_name);
        bytes[18..68].copy_from_slice(&self.label);
        bytes[68..70].copy_from_slice(&self.volume_total.to_be_bytes());

        let mut offset = 76;
        for (slots, count) in &self.entries {
            for slot in slots {
                bytes[offset..offset + 4].copy_from_slice(&slot.to_be_bytes());
                offset += 4;
            }
            bytes[offset..offset + 4].copy_from_slice(&count.to_be_bytes());
            offset += 4;
        }

        for page in &self.payload {
            bytes.extend_from_slice(page);
        }

        bytes
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();

        path
    }
}

/// Returns page `page` of `image`, or `None` if the image is too short to hold it.
pub fn image_page(image: &[u8], page: usize) -> Option<&[u8]> {
    image.get(page * PAGE_SIZE..(page + 1) * PAGE_SIZE)
}
