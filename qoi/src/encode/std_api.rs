use crate::{
    consts::{
        QOI_END_MARKER, QOI_MAX_RUN, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA, QOI_OP_RGB,
        QOI_OP_RGBA, QOI_OP_RUN,
    },
    encode::QoiEncodeContext,
    utils::{diff8, hash},
    Channels, Header, Rgba,
};
use snafu::{ensure, ResultExt, Snafu};
use std::io::Write;

#[derive(Debug, Snafu)]
pub enum EncodeError {
    #[snafu(display(
        "specified image dimensions don't match the number of pixels: {width} * {height} == {} pixels, but {pixel_count} pixels were given",
        width * height
    ))]
    InvalidDimensions {
        width: u64,
        height: u64,
        pixel_count: usize,
    },
    #[snafu(display("image dimensions must be non-zero"))]
    EmptyImage,
    #[snafu(display("3-channel image contains pixels that are not fully opaque"))]
    TranslucentRgb,
    WriteIo {
        source: std::io::Error,
    },
}

/// What to do when a 3-channel header is paired with pixels whose alpha is
/// not 255 everywhere.
///
/// The channel count is informational on the wire, so such a stream would
/// decode fine, but writing it out loses the promise the header makes about
/// the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlphaPolicy {
    /// Refuse to encode, returning [`EncodeError::TranslucentRgb`].
    #[default]
    Reject,
    /// Rewrite the header to four channels and keep the alpha data.
    Upgrade,
}

impl QoiEncodeContext {
    /// Encodes an image to a writer, rejecting 3-channel headers over
    /// translucent pixels.
    pub fn encode<W: Write>(header: &Header, pixels: &[Rgba], w: W) -> Result<(), EncodeError> {
        let mut ctx = QoiEncodeContext::new();
        ctx.encode_with_state(header, pixels, AlphaPolicy::default(), w)
    }

    /// Encodes an image to a writer with an explicit [`AlphaPolicy`].
    pub fn encode_with_policy<W: Write>(
        header: &Header,
        pixels: &[Rgba],
        policy: AlphaPolicy,
        w: W,
    ) -> Result<(), EncodeError> {
        let mut ctx = QoiEncodeContext::new();
        ctx.encode_with_state(header, pixels, policy, w)
    }

    /// Writes the 14-byte stream header.
    pub fn encode_header<W: Write>(header: &Header, mut w: W) -> Result<(), EncodeError> {
        w.write_all(&header.to_bytes()).context(WriteIoSnafu)
    }

    /// Encodes an image to a writer, with the given state as starting state.
    pub fn encode_with_state<W: Write>(
        &mut self,
        header: &Header,
        pixels: &[Rgba],
        policy: AlphaPolicy,
        mut w: W,
    ) -> Result<(), EncodeError> {
        ensure!(header.width > 0 && header.height > 0, EmptyImageSnafu);
        ensure!(
            header.pixel_count() == pixels.len() as u64,
            InvalidDimensionsSnafu {
                width: u64::from(header.width),
                height: u64::from(header.height),
                pixel_count: pixels.len(),
            }
        );

        let mut header = *header;
        if header.channels == Channels::Rgb && pixels.iter().any(|p| p.a != 255) {
            match policy {
                AlphaPolicy::Reject => return TranslucentRgbSnafu.fail(),
                AlphaPolicy::Upgrade => header.channels = Channels::Rgba,
            }
        }

        Self::encode_header(&header, &mut w)?;
        self.encode_pixels(pixels, w)?;

        Ok(())
    }

    /// Encodes a pixel sequence plus the end marker, without a header.
    pub fn encode_pixels<W: Write>(&mut self, pixels: &[Rgba], mut w: W) -> Result<(), EncodeError> {
        macro_rules! w {
            ($bytes:expr) => {
                w.write_all($bytes).context(WriteIoSnafu)
            };
        }

        let mut pixels = pixels.iter();

        loop {
            let Some(&pixel) = pixels.next() else {
                break;
            };

            if pixel == self.prev {
                let slice = pixels.as_slice();
                let repeats = slice.iter().take_while(|&&p| p == self.prev).count();
                pixels = slice[repeats..].iter();

                // account for initial `pixel` from above
                let count = repeats + 1;

                let full_runs = count / QOI_MAX_RUN;
                let rest = count % QOI_MAX_RUN;
                for _ in 0..full_runs {
                    w!(&[QOI_OP_RUN | (QOI_MAX_RUN - 1) as u8])?;
                }
                if rest > 0 {
                    w!(&[QOI_OP_RUN | (rest - 1) as u8])?;
                }

                // already same as prev and already in the color array
                continue;
            }

            let hash = hash(pixel);
            let index = usize::from(hash);

            if self.arr[index] == pixel {
                w!(&[QOI_OP_INDEX | hash])?;
                self.prev = pixel;
                // the slot already holds this pixel, no rewrite
                continue;
            }

            if pixel.a == self.prev.a {
                let (r_diff, g_diff, b_diff) = (
                    diff8(pixel.r, self.prev.r),
                    diff8(pixel.g, self.prev.g),
                    diff8(pixel.b, self.prev.b),
                );

                if matches!((r_diff, g_diff, b_diff), (-2..=1, -2..=1, -2..=1)) {
                    let mut b = QOI_OP_DIFF;
                    b |= ((r_diff + 2) << 4) as u8;
                    b |= ((g_diff + 2) << 2) as u8;
                    b |= (b_diff + 2) as u8;

                    w!(&[b])?;
                } else {
                    let rg_diff = r_diff.wrapping_sub(g_diff);
                    let bg_diff = b_diff.wrapping_sub(g_diff);

                    if matches!((rg_diff, g_diff, bg_diff), (-8..=7, -32..=31, -8..=7)) {
                        let bytes = [
                            QOI_OP_LUMA | (g_diff + 32) as u8,
                            ((rg_diff + 8) as u8) << 4 | (bg_diff + 8) as u8,
                        ];

                        w!(&bytes)?;
                    } else {
                        w!(&[QOI_OP_RGB, pixel.r, pixel.g, pixel.b])?;
                    }
                }
            } else {
                w!(&[QOI_OP_RGBA, pixel.r, pixel.g, pixel.b, pixel.a])?;
            }

            self.arr[index] = pixel;
            self.prev = pixel;
        }

        w!(&QOI_END_MARKER)?;

        Ok(())
    }
}
