use crate::{
    consts::{
        QOI_END_MARKER, QOI_MAX_RUN, QOI_OP_DIFF, QOI_OP_INDEX, QOI_OP_LUMA, QOI_OP_RGB,
        QOI_OP_RGBA, QOI_OP_RUN,
    },
    utils::{diff8, hash},
    Header, Rgba,
};
use alloc::vec::Vec;

#[cfg(feature = "std")]
mod std_api;
#[cfg(feature = "std")]
pub use std_api::*;

/// Encoder state: the previous pixel and the color array.
#[derive(Debug, Clone, Copy)]
pub struct QoiEncodeContext {
    pub prev: Rgba,
    pub arr: [Rgba; 64],
}

impl QoiEncodeContext {
    pub const fn new() -> Self {
        Self {
            prev: Rgba::START,
            arr: [Rgba::ZERO; 64],
        }
    }
}

impl Default for QoiEncodeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QoiEncodeContext {
    /// Encodes an image into `w`.
    ///
    /// Returns `false` without touching `w` when the header dimensions are
    /// zero or do not match the number of pixels. The header's channel count
    /// is written out as given; see the `std` API for the alpha policy
    /// handling.
    pub fn encode_to_vec(header: &Header, pixels: &[Rgba], w: &mut Vec<u8>) -> bool {
        let mut state = QoiEncodeContext::new();
        state.encode_to_vec_with_state(header, pixels, w)
    }

    /// Encodes an image into `w`, with the given state as starting state.
    pub fn encode_to_vec_with_state(
        &mut self,
        header: &Header,
        pixels: &[Rgba],
        w: &mut Vec<u8>,
    ) -> bool {
        if header.width == 0 || header.height == 0 {
            return false;
        }
        if header.pixel_count() != pixels.len() as u64 {
            return false;
        }

        w.extend_from_slice(&header.to_bytes());

        let mut pixels = pixels.iter();

        loop {
            let Some(&pixel) = pixels.next() else {
                break;
            };

            if pixel == self.prev {
                let slice = pixels.as_slice();
                let repeats = slice.iter().take_while(|&&p| p == self.prev).count();
                pixels = slice[repeats..].iter();

                // initial pixel
                let count = repeats + 1;

                let full_runs = count / QOI_MAX_RUN;
                let rest = count % QOI_MAX_RUN;
                for _ in 0..full_runs {
                    w.push(QOI_OP_RUN | (QOI_MAX_RUN - 1) as u8);
                }
                if rest > 0 {
                    w.push(QOI_OP_RUN | (rest - 1) as u8);
                }

                // already same as prev, already in arr
                continue;
            }

            let hash = hash(pixel);
            let index = usize::from(hash);

            if self.arr[index] == pixel {
                w.push(QOI_OP_INDEX | hash);
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
                    w.push(b);
                } else {
                    let rg_diff = r_diff.wrapping_sub(g_diff);
                    let bg_diff = b_diff.wrapping_sub(g_diff);

                    if matches!((rg_diff, g_diff, bg_diff), (-8..=7, -32..=31, -8..=7)) {
                        let bytes = [
                            QOI_OP_LUMA | (g_diff + 32) as u8,
                            ((rg_diff + 8) as u8) << 4 | (bg_diff + 8) as u8,
                        ];
                        w.extend_from_slice(&bytes);
                    } else {
                        w.extend_from_slice(&[QOI_OP_RGB, pixel.r, pixel.g, pixel.b]);
                    }
                }
            } else {
                w.extend_from_slice(&[QOI_OP_RGBA, pixel.r, pixel.g, pixel.b, pixel.a]);
            }

            self.arr[index] = pixel;
            self.prev = pixel;
        }

        w.extend_from_slice(&QOI_END_MARKER);

        true
    }
}
