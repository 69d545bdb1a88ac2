//! Encoder and decoder for the [QOI image format](https://qoiformat.org/).
//!
//! QOI ("Quite OK Image") is a byte-aligned lossless format for 24-bit RGB
//! and 32-bit RGBA raster images. A stream is a fixed 14-byte header, a
//! sequence of variable-length operations, and an 8-byte end marker. Each
//! operation either spells out a pixel in full, repeats the previous pixel,
//! references a recently seen color, or describes the pixel as a small
//! difference from the previous one.
//!
//! # Color array
//!
//! Both sides of the codec keep a 64-entry array of recently seen pixels,
//! indexed by a pixel hash (see [`consts::QOI_OP_INDEX`]). The array and the
//! "previous pixel" evolve identically during encoding and decoding; any
//! divergence corrupts the rest of the stream, so every update rule here is
//! part of the wire format.
//!
//! # Alpha
//!
//! Pixels are non-premultiplied RGBA. The alpha channel is tracked during
//! decoding regardless of the channel count declared in the header; a
//! 3-channel header only describes the source data, it does not change the
//! decoding rules.
//!
//! # Example
//!
//! ```rust
//! use qoi::{decode::QoiDecodeContext, encode::QoiEncodeContext};
//! use qoi::{Channels, Colorspace, Header, Rgba};
//!
//! let header = Header {
//!     width: 2,
//!     height: 1,
//!     channels: Channels::Rgba,
//!     colorspace: Colorspace::Srgb,
//! };
//! let pixels = [Rgba::new(10, 20, 30, 255), Rgba::new(10, 20, 30, 255)];
//!
//! let mut encoded = Vec::new();
//! QoiEncodeContext::encode(&header, &pixels, &mut encoded).unwrap();
//!
//! let mut decoded = Vec::new();
//! let parsed = QoiDecodeContext::decode(encoded.as_slice(), &mut decoded).unwrap();
//! assert_eq!(parsed, header);
//! assert_eq!(decoded, pixels);
//! ```
//!
//! # Stream format
//!
//! See [consts] for the different operation types.
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "alloc")]
pub mod encode;

pub mod decode;
mod utils;

pub use decode::QoiDecodeContext;
#[cfg(feature = "alloc")]
pub use encode::QoiEncodeContext;

use byteorder::{BigEndian, ByteOrder};
use consts::{QOI_HEADER_LEN, QOI_MAGIC};

/// A non-premultiplied RGBA pixel. Equality is componentwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    /// Empty color array slots hold transparent black.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);
    /// The implied pixel before the first one of the stream.
    pub const START: Self = Self::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Channel count declared in the header.
///
/// Purely informational on the wire: a 3-channel stream is decoded with the
/// same rules as a 4-channel one.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channels {
    Rgb = 3,
    #[default]
    Rgba = 4,
}

impl Channels {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            3 => Some(Self::Rgb),
            4 => Some(Self::Rgba),
            _ => None,
        }
    }
}

/// Colorspace declared in the header. Transported, never interpreted.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Colorspace {
    /// sRGB channels with a linear alpha channel.
    #[default]
    Srgb = 0,
    /// All channels linear.
    Linear = 1,
}

impl Colorspace {
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Srgb),
            1 => Some(Self::Linear),
            _ => None,
        }
    }
}

/// The parsed 14-byte header of a QOI stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub width: u32,
    pub height: u32,
    pub channels: Channels,
    pub colorspace: Colorspace,
}

impl Header {
    /// Number of pixels the stream describes.
    pub const fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Serializes the header into its wire layout: magic, big-endian width,
    /// big-endian height, channels, colorspace.
    pub fn to_bytes(&self) -> [u8; QOI_HEADER_LEN] {
        let mut bytes = [0; QOI_HEADER_LEN];
        bytes[..4].copy_from_slice(QOI_MAGIC);
        BigEndian::write_u32(&mut bytes[4..8], self.width);
        BigEndian::write_u32(&mut bytes[8..12], self.height);
        bytes[12] = self.channels as u8;
        bytes[13] = self.colorspace as u8;
        bytes
    }
}

pub mod consts {
    /// The 4-byte magic at the start of every stream.
    pub const QOI_MAGIC: &[u8; 4] = b"qoif";

    /// Size of the fixed stream header, in bytes.
    pub const QOI_HEADER_LEN: usize = 14;

    /// Every stream ends with seven zero bytes followed by a single 0x01.
    pub const QOI_END_MARKER: [u8; 8] = [0, 0, 0, 0, 0, 0, 0, 1];

    /// Longest run a single [`QOI_OP_RUN`] byte can describe.
    pub const QOI_MAX_RUN: usize = 62;

    /// Re-emit a pixel from the color array.
    ///
    /// ```plain
    /// .- QOI_OP_INDEX ----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  0  0 |     index       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b00
    /// - 6-bit index into the color array: 0..63
    /// - The index is the pixel hash `(3r + 5g + 7b + 11a) % 64`, with the
    ///   products and sums wrapping at 8 bits before the final reduction.
    /// - The array slot is *not* rewritten when this operation is emitted or
    ///   consumed; it already holds the referenced pixel.
    /// - A valid encoder must not issue 2 or more consecutive QOI_OP_INDEX
    ///   chunks to the same index. QOI_OP_RUN should be used instead.
    pub const QOI_OP_INDEX: u8 = 0b0000_0000;

    /// Calculate a pixel based on a 2-bit difference from the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_DIFF -----------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----+-----+-----|
    /// |  0  1 |  dr |  dg |  db |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b01
    /// - 2-bit red, green and blue channel differences from the previous
    ///   pixel between -2..1, stored with a bias of 2
    /// - Differences wrap around: 255 + 1 is 0, 0 - 2 is 254
    /// - The alpha channel is carried over from the previous pixel
    pub const QOI_OP_DIFF: u8 = 0b0100_0000;

    /// Calculate a pixel based on a 6-bit green-channel difference from the
    /// previous pixel, and differences to the green-channel difference for
    /// red and blue.
    ///
    /// ```plain
    /// .- QOI_OP_LUMA -------------------------------------.
    /// |         Byte[0]         |         Byte[1]         |
    /// |  7  6  5  4  3  2  1  0 |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------+-------------+-----------|
    /// |  1  0 |   green diff    |   dr - dg   |  db - dg  |
    /// `---------------------------------------------------`
    /// ```
    ///
    /// - 2-bit tag b10
    /// - 6-bit green channel difference from the previous pixel (`-32..31`),
    ///   stored with a bias of 32
    /// - 4-bit red/blue channel differences minus the green channel
    ///   difference (`-8..7`), stored with a bias of 8
    /// - All differences wrap around at 8 bits
    /// - The alpha channel is carried over from the previous pixel
    pub const QOI_OP_LUMA: u8 = 0b1000_0000;

    /// Repeats the previous pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RUN ------------.
    /// |         Byte[0]         |
    /// |  7  6  5  4  3  2  1  0 |
    /// |-------+-----------------|
    /// |  1  1 |       run       |
    /// `-------------------------`
    /// ```
    ///
    /// - 2-bit tag b11
    /// - 6-bit run-length repeating the previous pixel: 1..62
    /// - The run-length is stored with a bias of -1. Note that the
    ///   run-lengths 63 and 64 (`b111110` and `b111111`) are illegal as they
    ///   are occupied by the QOI_OP_RGB and QOI_OP_RGBA tags; a decoder must
    ///   match those two full bytes before classifying on the 2-bit tag.
    pub const QOI_OP_RUN: u8 = 0b1100_0000;

    /// Emits a full RGB pixel, keeping the previous alpha.
    ///
    /// ```plain
    /// .- QOI_OP_RGB --------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] |  Byte[3]  |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  |  7 .. 0   |
    /// |-------------------------+---------+---------+-----------|
    /// |  1  1  1  1  1  1  1  0 |   red   |  green  |   blue    |
    /// `---------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111110
    /// - The alpha channel is carried over from the previous pixel
    pub const QOI_OP_RGB: u8 = 0b1111_1110;

    /// Emits a full RGBA pixel.
    ///
    /// ```plain
    /// .- QOI_OP_RGBA -------------------------------------------------.
    /// |         Byte[0]         | Byte[1] | Byte[2] | Byte[3] | B[4]  |
    /// |  7  6  5  4  3  2  1  0 | 7 .. 0  | 7 .. 0  | 7 .. 0  | 7..0  |
    /// |-------------------------+---------+---------+---------+-------|
    /// |  1  1  1  1  1  1  1  1 |   red   |  green  |  blue   | alpha |
    /// `---------------------------------------------------------------`
    /// ```
    ///
    /// - 8-bit tag b11111111
    pub const QOI_OP_RGBA: u8 = 0b1111_1111;
}
