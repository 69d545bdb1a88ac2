use crate::{
    consts::{QOI_END_MARKER, QOI_HEADER_LEN, QOI_OP_RGB, QOI_OP_RGBA},
    decode::{
        checked_pixel_count,
        ops::{direct_small_diff, luma_diff},
        BadEofSnafu, DecodeError, OverrunSnafu, QoiDecodeContext,
    },
    utils::hash,
    Header, Rgba,
};
use alloc::vec::Vec;
use snafu::ensure;
use std::io::Read;

fn read_exact_or<R: Read>(reader: &mut R, buf: &mut [u8], eof: DecodeError) -> Result<(), DecodeError> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => eof,
        _ => DecodeError::ReadIo { source: e },
    })
}

impl QoiDecodeContext {
    /// Decodes a QOI image from a reader, appending the pixels to `w`.
    ///
    /// Returns the parsed header, if successful. Reads exactly the bytes the
    /// stream consists of (header, operations, end marker) and never probes
    /// past the end marker, so the reader can carry trailing data.
    ///
    /// Every operation is read individually; wrap slow readers in a
    /// `std::io::BufReader`.
    pub fn decode<R: Read>(reader: R, w: &mut Vec<Rgba>) -> Result<Header, DecodeError> {
        let mut state = QoiDecodeContext::new();
        state.decode_with_state(reader, w)
    }

    /// Decodes a QOI image from a reader, with the given state as starting
    /// state.
    pub fn decode_with_state<R: Read>(
        &mut self,
        mut reader: R,
        w: &mut Vec<Rgba>,
    ) -> Result<Header, DecodeError> {
        let mut header_buf = [0; QOI_HEADER_LEN];
        read_exact_or(&mut reader, &mut header_buf, DecodeError::ShortHeader)?;
        let header = Header::parse(&header_buf)?;
        let pixel_count = checked_pixel_count(&header)?;

        let start = w.len();
        w.reserve(pixel_count);

        match self.decode_pixels(reader, pixel_count, w) {
            Ok(()) => Ok(header),
            Err(e) => {
                w.truncate(start);
                Err(e)
            }
        }
    }

    fn decode_pixels<R: Read>(
        &mut self,
        mut reader: R,
        pixel_count: usize,
        w: &mut Vec<Rgba>,
    ) -> Result<(), DecodeError> {
        let mut remaining = pixel_count;
        while remaining > 0 {
            let mut tag = [0; 1];
            read_exact_or(&mut reader, &mut tag, DecodeError::TruncatedStream)?;
            let byte = tag[0];
            let op = byte >> 6;

            let pixel = if op == 0b00 {
                let pixel = self.arr[usize::from(byte)];
                self.prev = pixel;
                w.push(pixel);
                remaining -= 1;
                continue;
            } else if op == 0b11 {
                // full-byte tags before the 2-bit run tag
                if byte == QOI_OP_RGB {
                    let mut rgb = [0; 3];
                    read_exact_or(&mut reader, &mut rgb, DecodeError::TruncatedStream)?;
                    Rgba::new(rgb[0], rgb[1], rgb[2], self.prev.a)
                } else if byte == QOI_OP_RGBA {
                    let mut rgba = [0; 4];
                    read_exact_or(&mut reader, &mut rgba, DecodeError::TruncatedStream)?;
                    Rgba::new(rgba[0], rgba[1], rgba[2], rgba[3])
                } else {
                    let count = usize::from(byte & 0b0011_1111) + 1;
                    ensure!(count <= remaining, OverrunSnafu { run: count, remaining });

                    w.extend(core::iter::repeat(self.prev).take(count));
                    remaining -= count;
                    continue;
                }
            } else if op == 0b01 {
                direct_small_diff(self.prev, byte)
            } else {
                let mut second = [0; 1];
                read_exact_or(&mut reader, &mut second, DecodeError::TruncatedStream)?;
                luma_diff(self.prev, byte, second[0])
            };

            self.arr[usize::from(hash(pixel))] = pixel;
            self.prev = pixel;
            w.push(pixel);
            remaining -= 1;
        }

        let mut end = [0; QOI_END_MARKER.len()];
        read_exact_or(&mut reader, &mut end, DecodeError::TruncatedStream)?;
        ensure!(end == QOI_END_MARKER, BadEofSnafu);

        Ok(())
    }
}
