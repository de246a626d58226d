use crate::error::AppError;
use base64::Engine;
use listing_submission::CapturedImage;

/// Turns a captured image into a `data:` URL for the preview strip
pub fn image_to_data_url(image: &CapturedImage) -> Result<String, AppError> {
    let mime = image.content_type().ok_or_else(|| {
        AppError::ImageProcessing(format!("Image {} is not a JPEG or PNG", image.local_id))
    })?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    Ok(format!("data:{};base64,{}", mime, b64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use listing_submission::LocalImageId;

    #[test]
    fn test_png_preview() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
        let url = image_to_data_url(&CapturedImage::new(LocalImageId(1), bytes)).unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let result = image_to_data_url(&CapturedImage::new(LocalImageId(2), b"GIF89a".to_vec()));
        assert!(matches!(result, Err(AppError::ImageProcessing(_))));
    }
}
