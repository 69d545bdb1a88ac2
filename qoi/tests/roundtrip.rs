use qoi::{decode::QoiDecodeContext, encode::QoiEncodeContext};
use qoi::{Channels, Colorspace, Header, Rgba};

fn header(width: u32, height: u32, channels: Channels) -> Header {
    Header {
        width,
        height,
        channels,
        colorspace: Colorspace::Srgb,
    }
}

fn xorshift(state: &mut u32) -> u32 {
    *state ^= *state << 13;
    *state ^= *state >> 17;
    *state ^= *state << 5;
    *state
}

fn test_images() -> Vec<(&'static str, Header, Vec<Rgba>)> {
    let mut images = Vec::new();

    images.push((
        "single",
        header(1, 1, Channels::Rgb),
        vec![Rgba::new(190, 20, 60, 255)],
    ));

    // smooth ramps, mostly diff/luma operations
    let (w, h) = (64, 48);
    let gradient = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            Rgba::new((x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8, 255)
        })
        .collect();
    images.push(("gradient", header(w as u32, h as u32, Channels::Rgb), gradient));

    // flat stretches well past the 62-pixel run limit
    let mut flat = vec![Rgba::new(17, 34, 51, 255); 200];
    flat.extend(vec![Rgba::new(17, 34, 68, 255); 56]);
    flat.extend(vec![Rgba::START; 128]);
    images.push(("flat", header(96, 4, Channels::Rgb), flat));

    // a small palette revisited in blocks, exercising the color array
    let palette = [
        Rgba::new(230, 25, 75, 255),
        Rgba::new(60, 180, 75, 255),
        Rgba::new(255, 225, 25, 255),
        Rgba::new(0, 130, 200, 255),
        Rgba::new(245, 130, 48, 192),
        Rgba::new(145, 30, 180, 128),
    ];
    let tiles = (0..30 * 30)
        .map(|i| palette[(i / 5 + i / 90) % palette.len()])
        .collect();
    images.push(("tiles", header(30, 30, Channels::Rgba), tiles));

    // pseudo-random noise, mostly full rgb/rgba operations
    let mut state = 0x2545_f491;
    let noise = (0..50 * 40)
        .map(|_| {
            let bits = xorshift(&mut state);
            let [r, g, b, a] = bits.to_le_bytes();
            Rgba::new(r, g, b, a | 0x80)
        })
        .collect();
    images.push(("noise", header(50, 40, Channels::Rgba), noise));

    // alpha flips between opaque and translucent on every scanline
    let stripes = (0..32 * 16)
        .map(|i| {
            let y = i / 32;
            let a = if y % 2 == 0 { 255 } else { 64 };
            Rgba::new(200, (y * 3) as u8, 10, a)
        })
        .collect();
    images.push(("stripes", header(32, 16, Channels::Rgba), stripes));

    images
}

/// Hands out one byte per read call, so nothing decodes from a single
/// buffered gulp.
struct DripReader<'a>(&'a [u8]);

impl std::io::Read for DripReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.0.len().min(buf.len()).min(1);
        buf[..n].copy_from_slice(&self.0[..n]);
        self.0 = &self.0[n..];
        Ok(n)
    }
}

#[test]
fn roundtrip() {
    for (name, header, pixels) in test_images() {
        let mut encoded = Vec::new();
        assert!(
            QoiEncodeContext::encode_to_vec(&header, &pixels, &mut encoded),
            "{name}: encode_to_vec rejected the image"
        );

        let mut encoded2 = Vec::new();
        QoiEncodeContext::encode(&header, &pixels, &mut encoded2).unwrap();
        assert_eq!(encoded, encoded2, "{name}: encoding mismatch");

        let mut decoded = Vec::new();
        let decoded_header = QoiDecodeContext::decode_to_vec(&encoded, &mut decoded).unwrap();
        assert_eq!(header, decoded_header, "{name}: header mismatch");
        assert_eq!(pixels, decoded, "{name}: vec decoding failed");

        let mut slice_decoded = vec![Rgba::ZERO; pixels.len()];
        QoiDecodeContext::decode_to_slice(&encoded, &mut slice_decoded).unwrap();
        assert_eq!(pixels, slice_decoded, "{name}: slice decoding failed");

        let mut reader_decoded = Vec::new();
        QoiDecodeContext::decode(encoded.as_slice(), &mut reader_decoded).unwrap();
        assert_eq!(pixels, reader_decoded, "{name}: reader decoding failed");

        let mut drip_decoded = Vec::new();
        QoiDecodeContext::decode(DripReader(&encoded), &mut drip_decoded).unwrap();
        assert_eq!(pixels, drip_decoded, "{name}: drip-fed decoding failed");
    }
}

#[test]
fn reencoding_is_byte_identical() {
    for (name, header, pixels) in test_images() {
        let mut encoded = Vec::new();
        assert!(QoiEncodeContext::encode_to_vec(&header, &pixels, &mut encoded));

        let mut decoded = Vec::new();
        let decoded_header = QoiDecodeContext::decode_to_vec(&encoded, &mut decoded).unwrap();

        let mut reencoded = Vec::new();
        assert!(QoiEncodeContext::encode_to_vec(&decoded_header, &decoded, &mut reencoded));
        assert_eq!(encoded, reencoded, "{name}: re-encoding mismatch");
    }
}

#[test]
fn encoder_and_decoder_state_agree() {
    for (name, header, pixels) in test_images() {
        let mut encoder = QoiEncodeContext::new();
        let mut encoded = Vec::new();
        assert!(encoder.encode_to_vec_with_state(&header, &pixels, &mut encoded));

        let mut decoder = QoiDecodeContext::new();
        let mut decoded = Vec::new();
        decoder.decode_to_vec_with_state(&encoded, &mut decoded).unwrap();

        assert_eq!(encoder.prev, decoder.prev, "{name}: previous pixel diverged");
        assert_eq!(encoder.arr, decoder.arr, "{name}: color array diverged");
    }
}

#[test]
fn decode_leaves_trailing_reader_data_untouched() {
    let header = header(1, 1, Channels::Rgb);
    let mut encoded = Vec::new();
    assert!(QoiEncodeContext::encode_to_vec(&header, &[Rgba::new(128, 0, 0, 255)], &mut encoded));
    encoded.extend_from_slice(b"tail");

    let mut reader = encoded.as_slice();
    let mut pixels = Vec::new();
    QoiDecodeContext::decode(&mut reader, &mut pixels).unwrap();
    assert_eq!(reader, b"tail");
}
