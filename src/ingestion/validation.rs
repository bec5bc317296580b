use crate::error::ApiError;

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Reject empty, oversized, or non-whitelisted uploads before anything else
/// touches the bytes.
pub fn validate_image_upload(mime_type: &str, data: &[u8], max_bytes: usize) -> Result<(), ApiError> {
    if data.is_empty() {
        return Err(ApiError::InvalidInput("Image is empty".to_string()));
    }

    if data.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge { max_bytes });
    }

    if !ALLOWED_MIME_TYPES.contains(&mime_type) {
        return Err(ApiError::UnsupportedMediaType(
            "Only JPG, PNG, WEBP allowed".to_string(),
        ));
    }

    Ok(())
}

/// Verify the bytes actually decode as an image. Catches files renamed to an
/// allowed extension that a provider would choke on.
pub fn probe_decode(data: &[u8]) -> Result<(), ApiError> {
    use image::ImageReader;
    use std::io::Cursor;

    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ApiError::InvalidInput(format!("Unreadable image data: {}", e)))?
        .decode()
        .map_err(|e| ApiError::InvalidInput(format!("Image failed to decode: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 10 * 1024 * 1024;

    #[test]
    fn test_allowed_mime_types() {
        let data = vec![0u8; 100];
        assert!(validate_image_upload("image/jpeg", &data, MAX).is_ok());
        assert!(validate_image_upload("image/png", &data, MAX).is_ok());
        assert!(validate_image_upload("image/webp", &data, MAX).is_ok());
    }

    #[test]
    fn test_rejects_unsupported_mime_type() {
        let data = vec![0u8; 100];
        let err = validate_image_upload("image/gif", &data, MAX).unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let data = vec![0u8; MAX + 1];
        let err = validate_image_upload("image/jpeg", &data, MAX).unwrap_err();
        match err {
            ApiError::PayloadTooLarge { max_bytes } => assert_eq!(max_bytes, MAX),
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
        // Error message mentions the configured limit
        let err = validate_image_upload("image/jpeg", &data, MAX).unwrap_err();
        assert!(err.to_string().contains(&MAX.to_string()));
    }

    #[test]
    fn test_rejects_empty_payload() {
        let err = validate_image_upload("image/jpeg", &[], MAX).unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[test]
    fn test_probe_decode_rejects_garbage() {
        assert!(probe_decode(b"definitely not an image").is_err());
    }

    #[test]
    fn test_probe_decode_accepts_real_png() {
        // 1x1 white pixel, encoded through the image crate itself
        let mut buf = std::io::Cursor::new(Vec::new());
        let img = image::RgbImage::from_pixel(1, 1, image::Rgb([255, 255, 255]));
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        assert!(probe_decode(buf.get_ref()).is_ok());
    }
}
