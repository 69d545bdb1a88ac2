use argh::FromArgs;
use image::{ImageFormat, RgbImage, RgbaImage};
use qoi::{decode::QoiDecodeContext, encode::QoiEncodeContext};
use qoi::{Channels, Colorspace, Header, Rgba};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    str::FromStr,
};

/// QOI cli encoder and decoder.
#[derive(FromArgs)]
struct Cli {
    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Encode(Encode),
    Decode(Decode),
}

#[derive(Debug)]
enum Format {
    Png,
    Jpg,
    Bmp,
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        #[rustfmt::skip]
        let Some(format) = s.eq_ignore_ascii_case("png").then_some(Format::Png)
               .or_else(|| s.eq_ignore_ascii_case("jpg").then_some(Format::Jpg))
               .or_else(|| s.eq_ignore_ascii_case("bmp").then_some(Format::Bmp))
        else { return Err("invalid string"); };

        Ok(format)
    }
}

impl From<&Format> for ImageFormat {
    fn from(format: &Format) -> Self {
        match format {
            Format::Png => ImageFormat::Png,
            Format::Jpg => ImageFormat::Jpeg,
            Format::Bmp => ImageFormat::Bmp,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Cli { command } = argh::from_env();

    match command {
        Command::Encode(options) => encode(options),
        Command::Decode(options) => decode(options),
    }
}

/// Encodes an image as QOI.
#[derive(FromArgs)]
#[argh(subcommand, name = "encode")]
struct Encode {
    /// input format, optional (png, jpg, bmp); guessed when omitted
    #[argh(option)]
    format: Option<Format>,

    /// the input file; a PNG, JPG, or BMP
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

fn encode(options: Encode) -> Result<(), Box<dyn std::error::Error>> {
    let Encode {
        format,
        input,
        output,
    } = options;

    let image = match format {
        Some(format) => image::io::Reader::with_format(
            BufReader::new(File::open(&input)?),
            ImageFormat::from(&format),
        )
        .decode()?,
        None => image::io::Reader::open(&input)?
            .with_guessed_format()?
            .decode()?,
    };

    let width = image.width();
    let height = image.height();

    println!("Encoding {width}x{height} image");

    let channels = if image.color().has_alpha() {
        Channels::Rgba
    } else {
        Channels::Rgb
    };

    let pixels = image
        .into_rgba8()
        .pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            Rgba::new(r, g, b, a)
        })
        .collect::<Vec<_>>();

    let header = Header {
        width,
        height,
        channels,
        colorspace: Colorspace::Srgb,
    };

    let mut w = BufWriter::new(File::create(&output)?);
    QoiEncodeContext::encode(&header, &pixels, &mut w)?;
    w.flush()?;

    println!("Written {width}x{height} image to `{output}`");

    Ok(())
}

/// Decodes a QOI image.
#[derive(FromArgs)]
#[argh(subcommand, name = "decode")]
struct Decode {
    /// output format, optional (png, jpg, bmp); guessed from the output
    /// extension when omitted
    #[argh(option)]
    format: Option<Format>,

    /// the input file
    #[argh(positional)]
    input: String,
    /// the output file
    #[argh(positional)]
    output: String,
}

fn decode(options: Decode) -> Result<(), Box<dyn std::error::Error>> {
    let Decode {
        format,
        input,
        output,
    } = options;

    println!("Decoding `{input}`");

    let mut pixels = Vec::new();
    let header = QoiDecodeContext::decode(BufReader::new(File::open(&input)?), &mut pixels)?;
    let Header { width, height, .. } = header;

    match header.channels {
        Channels::Rgb => {
            let raw = pixels
                .iter()
                .flat_map(|p| [p.r, p.g, p.b])
                .collect::<Vec<_>>();
            let image = RgbImage::from_vec(width, height, raw).ok_or("failed to create image")?;
            match format {
                Some(format) => image.save_with_format(&output, ImageFormat::from(&format))?,
                None => image.save(&output)?,
            }
        }
        Channels::Rgba => {
            let raw = pixels
                .iter()
                .flat_map(|p| [p.r, p.g, p.b, p.a])
                .collect::<Vec<_>>();
            let image = RgbaImage::from_vec(width, height, raw).ok_or("failed to create image")?;
            match format {
                Some(format) => image.save_with_format(&output, ImageFormat::from(&format))?,
                None => image.save(&output)?,
            }
        }
    }

    println!("Written {width}x{height} image to `{output}`");

    Ok(())
}
