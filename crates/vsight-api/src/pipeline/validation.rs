//! Request shape validation: image count, format and size.

use std::io::Cursor;

use image::ImageFormat;
use vsight_engine_client::{ImageBuffer, ImagePayload};

use super::context::{RequestContext, RequestKind};
use super::error::{PipelineError, PipelineResult};
use super::options::ensure_absolute_url;

pub const MAX_IMAGES: usize = 6;

/// Minimum full-frame alarm image size (width, height).
pub const ALARM_MIN_DIMENSIONS: (u32, u32) = (320, 240);

pub fn validate_images(ctx: &RequestContext) -> PipelineResult<()> {
    let count = ctx.images.len();
    if count == 0 || count > MAX_IMAGES {
        return Err(PipelineError::invalid(format!(
            "Between 1 and {} images are required, got {}",
            MAX_IMAGES, count
        )));
    }

    match &ctx.images {
        ImagePayload::Urls(urls) => {
            for url in urls {
                ensure_absolute_url(url, ctx.kind.url_field())?;
            }
        }
        ImagePayload::Buffers(buffers) => {
            let min = match ctx.kind {
                RequestKind::Alarm => Some(ALARM_MIN_DIMENSIONS),
                RequestKind::Chip => ctx.chip_target.and_then(|target| target.min_dimensions()),
            };
            for buffer in buffers {
                check_jpeg(buffer, min)?;
            }
        }
    }
    Ok(())
}

/// Decode the JPEG header and enforce the minimum size.
fn check_jpeg(buffer: &ImageBuffer, min: Option<(u32, u32)>) -> PipelineResult<()> {
    let not_jpeg = || PipelineError::invalid(format!("Image '{}' is not a valid JPEG", buffer.filename));

    let reader = image::io::Reader::new(Cursor::new(&buffer.data[..]))
        .with_guessed_format()
        .map_err(|_| not_jpeg())?;
    if reader.format() != Some(ImageFormat::Jpeg) {
        return Err(not_jpeg());
    }
    let (width, height) = reader.into_dimensions().map_err(|_| not_jpeg())?;

    if let Some((min_width, min_height)) = min {
        if width < min_width || height < min_height {
            return Err(PipelineError::invalid(format!(
                "Image '{}' is {}x{}, minimum is {}x{}",
                buffer.filename, width, height, min_width, min_height
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{alarm_context, chip_context, jpeg, png};
    use serde_json::json;
    use vsight_models::ChipTarget;

    #[test]
    fn test_alarm_accepts_large_jpeg() {
        let mut ctx = alarm_context(json!({}));
        ctx.images = ImagePayload::Buffers(vec![jpeg(640, 480)]);
        validate_images(&ctx).unwrap();
    }

    #[test]
    fn test_alarm_rejects_small_jpeg() {
        let mut ctx = alarm_context(json!({}));
        ctx.images = ImagePayload::Buffers(vec![jpeg(320, 200)]);
        let err = validate_images(&ctx).unwrap_err();
        assert!(err.to_string().contains("minimum is 320x240"));
    }

    #[test]
    fn test_rejects_non_jpeg() {
        let mut ctx = alarm_context(json!({}));
        ctx.images = ImagePayload::Buffers(vec![png(640, 480)]);
        assert!(validate_images(&ctx).unwrap_err().to_string().contains("not a valid JPEG"));

        ctx.images = ImagePayload::Buffers(vec![ImageBuffer::jpeg("junk.jpg", b"not an image".to_vec())]);
        assert!(validate_images(&ctx).is_err());
    }

    #[test]
    fn test_image_count_limits() {
        let mut ctx = alarm_context(json!({}));
        ctx.images = ImagePayload::Buffers(Vec::new());
        assert!(validate_images(&ctx).is_err());

        ctx.images = ImagePayload::Buffers((0..7).map(|_| jpeg(320, 240)).collect());
        assert!(validate_images(&ctx).unwrap_err().to_string().contains("got 7"));

        ctx.images = ImagePayload::Buffers((0..6).map(|_| jpeg(320, 240)).collect());
        validate_images(&ctx).unwrap();
    }

    #[test]
    fn test_chip_minimums_follow_target() {
        let mut ctx = chip_context(json!({}));
        ctx.chip_target = Some(ChipTarget::Person);
        ctx.images = ImagePayload::Buffers(vec![jpeg(40, 100)]);
        validate_images(&ctx).unwrap();

        ctx.images = ImagePayload::Buffers(vec![jpeg(100, 60)]);
        assert!(validate_images(&ctx).is_err());

        ctx.chip_target = Some(ChipTarget::Gun);
        ctx.images = ImagePayload::Buffers(vec![jpeg(35, 35)]);
        validate_images(&ctx).unwrap();

        ctx.chip_target = Some(ChipTarget::Lpr);
        assert!(validate_images(&ctx).is_err());

        ctx.chip_target = Some(ChipTarget::Face);
        ctx.images = ImagePayload::Buffers(vec![jpeg(8, 8)]);
        validate_images(&ctx).unwrap();
    }

    #[test]
    fn test_urls_must_be_absolute() {
        let mut ctx = chip_context(json!({}));
        ctx.images = ImagePayload::Urls(vec!["chips/1.jpg".into()]);
        let err = validate_images(&ctx).unwrap_err();
        assert!(err.to_string().contains("chipUrls"));

        ctx.images = ImagePayload::Urls(vec!["https://cdn.example.com/chips/1.jpg".into()]);
        validate_images(&ctx).unwrap();
    }
}
