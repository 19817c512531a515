// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::Path,
};

use crate::{header::Volume, Error, HEADER_SIZE, PAGE_SIZE};

impl Image<File> {
    /// Opens the image at `path` for update, creating it first if it does not exist.
    ///
    /// An existing image is never truncated; pages that no volume writes keep their contents.
    pub fn open_or_create(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();

        if fs::metadata(path).is_err() {
            tracing::info!("creating image {}", path.display());

            let file = create_options()
                .open(path)
                .map_err(|source| Error::ImageCreate { path: path.to_path_buf(), source })?;

            return Ok(Self::new(file));
        }

        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| Error::ImageOpen { path: path.to_path_buf(), source })?;

        Ok(Self::new(file))
    }
}

#[cfg(unix)]
fn create_options() -> OpenOptions {
    use std::os::unix::fs::OpenOptionsExt as _;

    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(0o666);

    options
}

#[cfg(not(unix))]
fn create_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true).create(true);

    options
}

impl<W> Image<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }
}

/// A filesystem image addressed in pages of [`PAGE_SIZE`] bytes.
#[derive(Debug)]
pub struct Image<W> {
    inner: W,
}

impl<W> Image<W> {
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Seek> Image<W> {
    /// Writes `data` as page `page` of the image.
    pub fn place(&mut self, page: i32, data: &[u8; PAGE_SIZE]) -> Result<(), Error> {
        let offset = u64::try_from(page)
            .map(|page| page * PAGE_SIZE as u64)
            .map_err(|_| Error::ImageSeek {
                page,
                source: io::Error::new(io::ErrorKind::InvalidInput, "negative page number"),
            })?;

        let pos = self
            .inner
            .seek(SeekFrom::Start(offset))
            .map_err(|source| Error::ImageSeek { page, source })?;
        if pos != offset {
            return Err(Error::ImageSeek {
                page,
                source: io::Error::new(io::ErrorKind::Other, "seek landed at the wrong offset"),
            });
        }

        self.inner
            .write_all(data)
            .map_err(|source| Error::ImageWrite { page, source })
    }
}

/// What [`merge`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub pages_written: usize,
}

/// Scatters the payload pages of `volume` into `image`.
///
/// Payload pages are read in order, one for each nonempty slot of the page map. Empty slots
/// neither consume payload nor touch the image. The first failure ends the merge; pages placed
/// before it stay placed.
pub fn merge<R, W>(volume: &mut Volume<R>, image: &mut Image<W>) -> Result<MergeStats, Error>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let max_pages = volume.max_pages();
    let (header, reader) = volume.parts_mut();

    reader
        .seek(SeekFrom::Start(HEADER_SIZE as u64))
        .map_err(Error::VolumeRead)?;

    let mut stats = MergeStats::default();
    let mut data = [0; PAGE_SIZE];
    for entry in header.page_map(max_pages) {
        for page in entry.pages() {
            reader.read_exact(&mut data).map_err(Error::VolumeRead)?;
            image.place(page, &data)?;
            tracing::trace!("placed page {}", page);

            stats.pages_written += 1;
        }
    }
    tracing::debug!("merged {} pages", stats.pages_written);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// A volume with one payload page per entry of `pages`, filled with the page's position in the
    /// payload.
    fn volume(slots: &[i32], payload_pages: usize) -> Volume<Cursor<Vec<u8>>> {
        let mut bytes = vec![0; HEADER_SIZE];
        let mut offset = 76;
        for chunk in slots.chunks(8) {
            for i in 0..8 {
                let slot = chunk.get(i).copied().unwrap_or(-1);
                bytes[offset..offset + 4].copy_from_slice(&slot.to_be_bytes());
                offset += 4;
            }
            bytes[offset..offset + 4].copy_from_slice(&1u32.to_be_bytes());
            offset += 4;
        }
        for i in 0..payload_pages {
            bytes.extend_from_slice(&[i as u8 + 1; PAGE_SIZE]);
        }

        Volume::from_reader(Cursor::new(bytes), payload_pages).unwrap()
    }

    #[test]
    fn pages_land_at_their_offsets() {
        let mut volume = volume(&[2, -1, 0], 2);
        let mut image = Image::new(Cursor::new(Vec::new()));

        let stats = merge(&mut volume, &mut image).unwrap();
        let out = image.into_inner().into_inner();

        assert_eq!(stats.pages_written, 2);
        assert_eq!(out.len(), 3 * PAGE_SIZE);
        assert!(out[..PAGE_SIZE].iter().all(|it| *it == 2));
        assert!(out[PAGE_SIZE..2 * PAGE_SIZE].iter().all(|it| *it == 0));
        assert!(out[2 * PAGE_SIZE..].iter().all(|it| *it == 1));
    }

    #[test]
    fn skips_touch_nothing() {
        let mut volume = volume(&[-1; 8], 1);
        let mut image = Image::new(Cursor::new(vec![7; PAGE_SIZE]));

        let stats = merge(&mut volume, &mut image).unwrap();

        assert_eq!(stats.pages_written, 0);
        assert_eq!(image.into_inner().into_inner(), vec![7; PAGE_SIZE]);
    }

    #[test]
    fn truncated_payload_is_a_read_error() {
        let mut volume = volume(&[0, 1], 1);
        let mut image = Image::new(Cursor::new(Vec::new()));

        assert!(matches!(merge(&mut volume, &mut image), Err(Error::VolumeRead(_))));
        // The first page was placed before the failure.
        assert_eq!(image.into_inner().into_inner().len(), PAGE_SIZE);
    }

    #[test]
    fn negative_page_is_a_seek_error() {
        let mut image = Image::new(Cursor::new(Vec::new()));

        assert!(matches!(
            image.place(-2, &[0; PAGE_SIZE]),
            Err(Error::ImageSeek { page: -2, .. }),
        ));
    }
}
