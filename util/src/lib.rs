// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io;

/// Writes one row of a hex dump: the offset, the bytes in hex, and their printable ASCII.
pub fn dump_hex(w: &mut impl io::Write, offset: usize, bytes: &[u8]) -> io::Result<()> {
    writeln!(
        w,
        "{:08x}   {}   {}",
        offset,
        bytes
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect::<Vec<String>>()
            .join(" "),
        bytes
            .iter()
            .map(|byte| {
                if byte.is_ascii_graphic() {
                    char::from(*byte)
                } else {
                    '.'
                }
            })
            .collect::<String>(),
    )
}

/// Writes `bytes` as consecutive rows of `width` bytes each. The last row may be shorter.
pub fn dump_rows(w: &mut impl io::Write, bytes: &[u8], width: usize) -> io::Result<()> {
    // A zero width would never make progress.
    let width = width.max(1);
    for (i, row) in bytes.chunks(width).enumerate() {
        dump_hex(w, i * width, row)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_shows_offset_hex_and_ascii() {
        let mut out = Vec::new();
        dump_hex(&mut out, 0x4c, b"SYS'\x00").unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0000004c   53 59 53 27 00   SYS'.\n",
        );
    }

    #[test]
    fn rows_advance_offset_by_width() {
        let mut out = Vec::new();
        dump_rows(&mut out, &[0x41; 20], 16).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000   41 41"));
        assert!(lines[1].starts_with("00000010   41 41 41 41   AAAA"));
    }
}
