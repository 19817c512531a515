// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    fs::{self, File},
    io::Read,
    path::Path,
};

use derivative::Derivative;
use serde::Deserialize;

use crate::{
    codec::{self, TextField},
    page_map::PageMap,
    Error,
    FLOPPY_PAGES,
    HEADER_SIZE,
    PAGE_SIZE,
};

/// The offset of the page map within the header.
pub const PAGE_MAP_OFFSET: usize = 76;

/// The metadata at the start of a volume header.
///
/// Fields are decoded in declaration order, so this struct doubles as the layout table of the
/// first [`PAGE_MAP_OFFSET`] bytes.
#[derive(Clone, Derivative, Deserialize)]
#[derivative(Debug)]
pub struct Fields {
    /// The 1-based position of this volume within its backup set.
    pub volume_index: u16,
    pub directory_name: TextField<16>,
    pub label: TextField<50>,
    /// The number of volumes in the backup set.
    pub volume_total: u16,
    #[derivative(Debug = "ignore")]
    _reserved: [u8; 6],
}

impl Fields {
    /// The directory name, which is stored apostrophe-terminated.
    pub fn directory_name(&self) -> String {
        self.directory_name.to_apostrophe_terminated()
    }
}

impl Header {
    /// Parses a header from the first [`HEADER_SIZE`] bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let bytes = bytes.get(..HEADER_SIZE).ok_or(Error::InvalidVolume)?;
        let mut buf = Box::new([0; HEADER_SIZE]);
        buf.copy_from_slice(bytes);

        Self::from_boxed(buf)
    }

    pub fn from_boxed(bytes: Box<[u8; HEADER_SIZE]>) -> Result<Self, Error> {
        let fields: Fields = codec::decode(&bytes[..], 0).map_err(Error::Deserialize)?;
        tracing::debug!("header fields: {:?}", fields);

        Ok(Self { bytes, fields })
    }
}

/// The header of a backup volume.
pub struct Header {
    bytes: Box<[u8; HEADER_SIZE]>,
    fields: Fields,
}

impl Header {
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// The bytes in front of the page map.
    pub fn metadata_bytes(&self) -> &[u8] {
        &self.bytes[..PAGE_MAP_OFFSET]
    }

    /// Starts decoding the page map, producing at most (about) `max_pages` slots.
    pub fn page_map(&self, max_pages: usize) -> PageMap<'_> {
        PageMap::new(&self.bytes[PAGE_MAP_OFFSET..], max_pages)
    }
}

impl Volume<File> {
    /// Opens the volume at `path` and reads its header.
    ///
    /// For regular files, the number of payload pages is bounded by the file size. Anything else is
    /// assumed to be a floppy drive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let meta = fs::metadata(path).map_err(Error::VolumeOpen)?;

        let max_pages = if meta.is_file() {
            let len = meta.len();
            if len < HEADER_SIZE as u64 {
                return Err(Error::InvalidVolume);
            }

            usize::try_from((len - HEADER_SIZE as u64) / PAGE_SIZE as u64)
                .unwrap_or(usize::MAX)
        } else {
            // The header indicates where a short floppy ends, so this never reads beyond it.
            FLOPPY_PAGES
        };
        tracing::debug!("{}: max_pages = {}", path.display(), max_pages);

        let file = File::open(path).map_err(Error::VolumeOpen)?;

        Self::from_reader(file, max_pages)
    }
}

impl<R: Read> Volume<R> {
    /// Reads the header from `reader`, leaving it positioned at the first payload page.
    pub fn from_reader(mut reader: R, max_pages: usize) -> Result<Self, Error> {
        let mut bytes = Box::new([0; HEADER_SIZE]);
        reader.read_exact(&mut bytes[..]).map_err(Error::VolumeRead)?;
        let header = Header::from_boxed(bytes)?;

        Ok(Self { header, reader, max_pages })
    }
}

/// An opened volume whose header has been read.
pub struct Volume<R> {
    header: Header,
    reader: R,
    max_pages: usize,
}

impl<R> Volume<R> {
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The most payload pages this volume can carry.
    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn page_map(&self) -> PageMap<'_> {
        self.header.page_map(self.max_pages)
    }

    /// Splits the volume into its header and the payload reader.
    pub fn parts_mut(&mut self) -> (&Header, &mut R) {
        (&self.header, &mut self.reader)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn header_bytes() -> Vec<u8> {
        let mut bytes = vec![0; HEADER_SIZE];
        bytes[0..2].copy_from_slice(&3u16.to_be_bytes());
        bytes[2..18].copy_from_slice(b"USERS'          ");
        bytes[18..24].copy_from_slice(b"BACKUP");
        bytes[68..70].copy_from_slice(&7u16.to_be_bytes());

        bytes
    }

    #[test]
    fn fields_are_decoded_at_their_offsets() {
        let header = Header::from_slice(&header_bytes()).unwrap();
        let fields = header.fields();

        assert_eq!(fields.volume_index, 3);
        assert_eq!(fields.volume_total, 7);
        assert_eq!(fields.directory_name(), "USERS");
        assert_eq!(fields.label.to_lossy(), "BACKUP");
        assert_eq!(header.metadata_bytes().len(), PAGE_MAP_OFFSET);
    }

    #[test]
    fn short_header_is_invalid() {
        let bytes = vec![0; HEADER_SIZE - 1];

        assert!(matches!(Header::from_slice(&bytes), Err(Error::InvalidVolume)));
    }

    #[test]
    fn short_reader_is_a_read_error() {
        let reader = Cursor::new(vec![0; 100]);

        assert!(matches!(Volume::from_reader(reader, 8), Err(Error::VolumeRead(_))));
    }

    #[test]
    fn reader_is_left_after_header() {
        let mut bytes = header_bytes();
        bytes.extend_from_slice(&[0xaa; PAGE_SIZE]);
        let mut volume = Volume::from_reader(Cursor::new(bytes), 1).unwrap();
        let (_, reader) = volume.parts_mut();

        assert_eq!(reader.position(), HEADER_SIZE as u64);
    }
}
