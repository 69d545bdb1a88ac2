use crate::{
    consts::{QOI_END_MARKER, QOI_HEADER_LEN, QOI_MAGIC, QOI_OP_RGB, QOI_OP_RGBA},
    decode::ops::{direct_small_diff, luma_diff},
    utils::{hash, unlikely},
    Channels, Colorspace, Header, Rgba,
};
use byteorder::{BigEndian, ByteOrder};
use snafu::{ensure, OptionExt, Snafu};

pub(crate) mod ops;

#[cfg(feature = "alloc")]
mod alloc_api;

#[cfg(feature = "std")]
mod std_api;

/// Decoder state: the previous pixel and the color array.
///
/// A fresh context decodes one stream; reusing a context via the
/// `*_with_state` entry points continues from the state the previous call
/// left behind, which only makes sense for streams that were encoded against
/// that same state.
pub struct QoiDecodeContext {
    pub prev: Rgba,
    pub arr: [Rgba; 64],
}

impl QoiDecodeContext {
    pub const fn new() -> Self {
        Self {
            prev: Rgba::START,
            arr: [Rgba::ZERO; 64],
        }
    }
}

impl Default for QoiDecodeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Snafu)]
pub enum DecodeError {
    #[snafu(display("input ended before the 14-byte header was complete"))]
    ShortHeader,
    #[snafu(display("stream does not start with the \"qoif\" magic"))]
    BadMagic,
    #[snafu(display("invalid channels value {channels}, expected 3 or 4"))]
    BadChannels { channels: u8 },
    #[snafu(display("invalid colorspace value {colorspace}, expected 0 or 1"))]
    BadColorspace { colorspace: u8 },
    #[snafu(display("invalid image dimensions {width}x{height}"))]
    BadDimensions { width: u32, height: u32 },
    #[snafu(display("output buffer holds {len} pixels, image has {pixel_count}"))]
    OutputTooSmall { len: usize, pixel_count: u64 },
    #[snafu(display("stream ended before the image was complete"))]
    TruncatedStream,
    #[snafu(display("run of {run} pixels overruns the {remaining} pixels left in the image"))]
    Overrun { run: usize, remaining: usize },
    #[snafu(display("stream does not end with the 8-byte end marker"))]
    BadEof,
    #[cfg(feature = "std")]
    #[snafu(display("failed to read from the input"))]
    ReadIo { source: std::io::Error },
}

impl Header {
    /// Parses and validates the fixed 14-byte stream header.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        ensure!(data.len() >= QOI_HEADER_LEN, ShortHeaderSnafu);
        ensure!(&data[..4] == QOI_MAGIC, BadMagicSnafu);

        let width = BigEndian::read_u32(&data[4..8]);
        let height = BigEndian::read_u32(&data[8..12]);
        ensure!(width > 0 && height > 0, BadDimensionsSnafu { width, height });

        let channels =
            Channels::from_byte(data[12]).context(BadChannelsSnafu { channels: data[12] })?;
        let colorspace = Colorspace::from_byte(data[13])
            .context(BadColorspaceSnafu { colorspace: data[13] })?;

        Ok(Self {
            width,
            height,
            channels,
            colorspace,
        })
    }
}

/// The pixel count as a `usize`, rejecting images whose decoded size cannot
/// be addressed on this platform. Checked before any allocation.
pub(crate) fn checked_pixel_count(header: &Header) -> Result<usize, DecodeError> {
    usize::try_from(header.pixel_count())
        .ok()
        .filter(|count| count.checked_mul(core::mem::size_of::<Rgba>()).is_some())
        .context(BadDimensionsSnafu {
            width: header.width,
            height: header.height,
        })
}

impl QoiDecodeContext {
    /// Decodes a QOI image into a pixel buffer.
    ///
    /// The buffer must hold at least `width * height` pixels; on success the
    /// image occupies its prefix and the parsed header is returned. On error
    /// the buffer contents are unspecified.
    pub fn decode_to_slice(data: &[u8], output: &mut [Rgba]) -> Result<Header, DecodeError> {
        let mut state = QoiDecodeContext::new();
        state.decode_to_slice_with_state(data, output)
    }

    /// Decodes a QOI image into a pixel buffer, with the given state as
    /// starting state.
    pub fn decode_to_slice_with_state(
        &mut self,
        data: &[u8],
        output: &mut [Rgba],
    ) -> Result<Header, DecodeError> {
        let header = Header::parse(data)?;
        let pixel_count = checked_pixel_count(&header)?;
        ensure!(
            output.len() >= pixel_count,
            OutputTooSmallSnafu {
                len: output.len(),
                pixel_count: header.pixel_count(),
            }
        );

        let data = &data[QOI_HEADER_LEN..];
        let mut input_idx = 0;
        let mut next = || -> Result<u8, DecodeError> {
            let b = data.get(input_idx).copied().context(TruncatedStreamSnafu)?;
            input_idx += 1;
            Ok(b)
        };

        let mut output_idx = 0;
        while output_idx < pixel_count {
            let byte = next()?;
            let op = byte >> 6;

            let pixel = if op == 0b00 {
                let pixel = self.arr[usize::from(byte)];
                self.prev = pixel;
                output[output_idx] = pixel;
                output_idx += 1;
                continue;
            } else if unlikely(op == 0b11) {
                // 0xFE and 0xFF alias into the run tag and must be matched
                // on the full byte first.
                if byte == QOI_OP_RGB {
                    Rgba::new(next()?, next()?, next()?, self.prev.a)
                } else if byte == QOI_OP_RGBA {
                    Rgba::new(next()?, next()?, next()?, next()?)
                } else {
                    let count = usize::from(byte & 0b0011_1111) + 1;
                    let remaining = pixel_count - output_idx;
                    ensure!(count <= remaining, OverrunSnafu { run: count, remaining });

                    output[output_idx..output_idx + count].fill(self.prev);
                    output_idx += count;

                    // the previous pixel is already in the array
                    continue;
                }
            } else if op == 0b01 {
                direct_small_diff(self.prev, byte)
            } else {
                luma_diff(self.prev, byte, next()?)
            };

            self.arr[usize::from(hash(pixel))] = pixel;
            self.prev = pixel;
            output[output_idx] = pixel;
            output_idx += 1;
        }

        // Exactly the end marker must remain.
        let rest = &data[input_idx..];
        ensure!(rest.len() >= QOI_END_MARKER.len(), TruncatedStreamSnafu);
        ensure!(rest == QOI_END_MARKER, BadEofSnafu);

        Ok(header)
    }
}
