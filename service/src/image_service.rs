use crate::domain::dimension::{within_limits, Dimension};
use crate::domain::error::PipelineError;
use crate::domain::error::PipelineError::{Decode, Encode, Resize, TooLarge};
use crate::domain::variant::VariantSpec;
use fast_image_resize::{FilterType, ResizeAlg, ResizeError, ResizeOptions, Resizer};
use image::{DynamicImage, ImageError, ImageFormat, ImageReader, Rgba};
use std::io::Cursor;
use tracing::{debug, warn};

/// Lanczos3, cropping the source around its centre when the aspect ratio changes.
fn resize_options() -> ResizeOptions {
    ResizeOptions::new()
        .resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3))
        .fit_into_destination(Some((0.5, 0.5)))
}

/// Decode `bytes`, trusting the magic bytes over the key's extension.
pub fn decode_image(
    bytes: &[u8],
    fallback: Option<ImageFormat>,
) -> Result<(DynamicImage, ImageFormat), PipelineError> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| Decode(format!("failed to guess format: {err}")))?;

    let format = match (reader.format(), fallback) {
        (Some(format), _) => format,
        (None, Some(format)) => {
            warn!("Could not guess format, defaulting to {format:?}");
            reader.set_format(format);
            format
        }
        (None, None) => return Err(Decode("unknown image format".to_string())),
    };

    let image = reader
        .decode()
        .map_err(|err| Decode(format!("{format:?} decode failed: {err}")))?;
    debug!("Decoded {}x{} {format:?}", image.width(), image.height());
    Ok((image, format))
}

/// Resize an image based on a provided `Dimension`.
pub fn resize_image(
    src_image: &DynamicImage,
    dimension: Dimension,
) -> Result<DynamicImage, ResizeError> {
    let (new_width, new_height) = dimension.target(src_image.width(), src_image.height());
    let mut dst_image = DynamicImage::new(new_width, new_height, src_image.color());
    let mut resizer = Resizer::new();
    resizer.resize(src_image, &mut dst_image, &resize_options())?;
    Ok(dst_image)
}

/// Destination-in against a flat fill: the image survives wherever it has
/// alpha coverage, and fully uncovered pixels take the fill.
pub fn composite_destination_in(image: DynamicImage, fill: Rgba<u8>) -> DynamicImage {
    let mut canvas = image.into_rgba8();
    canvas
        .pixels_mut()
        .filter(|pixel| pixel[3] == 0)
        .for_each(|pixel| *pixel = fill);
    DynamicImage::ImageRgba8(canvas)
}

/// Encode in `format`. JPEG carries no alpha so it is flattened to RGB first.
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => image.to_rgb8().write_to(&mut buffer, format)?,
        _ => image.write_to(&mut buffer, format)?,
    }
    Ok(buffer.into_inner())
}

/// Produce the encoded bytes of one variant.
pub fn render_variant(
    source: &DynamicImage,
    format: ImageFormat,
    variant: &VariantSpec,
) -> Result<Vec<u8>, PipelineError> {
    let (width, height) = variant.dimension.target(source.width(), source.height());
    if !within_limits(width, height) {
        return Err(TooLarge {
            variant: variant.name,
            width,
            height,
        });
    }
    let resized = resize_image(source, variant.dimension).map_err(|source| Resize {
        variant: variant.name,
        source,
    })?;
    let composed = match variant.background {
        Some(fill) => composite_destination_in(resized, fill),
        None => resized,
    };
    let body = encode_image(&composed, format).map_err(|source| Encode {
        variant: variant.name,
        source,
    })?;
    debug!(
        "Rendered {} {}x{} ({} bytes)",
        variant.name,
        composed.width(),
        composed.height(),
        body.len()
    );
    Ok(body)
}
