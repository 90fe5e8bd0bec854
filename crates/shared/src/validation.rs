//! Common validation utilities.

use validator::ValidationError;

use crate::image::DataUrl;

/// Highest zoom level the map widget accepts.
const MAX_ZOOM: f64 = 22.0;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a map zoom level (0 to 22).
pub fn validate_zoom(zoom: f64) -> Result<(), ValidationError> {
    if (0.0..=MAX_ZOOM).contains(&zoom) {
        Ok(())
    } else {
        let mut err = ValidationError::new("zoom_range");
        err.message = Some("Zoom must be between 0 and 22".into());
        Err(err)
    }
}

/// Validates that a string is a base64 image data URL.
pub fn validate_image_data_url(value: &str) -> Result<(), ValidationError> {
    match DataUrl::parse(value) {
        Ok(url) if url.is_image() => Ok(()),
        Ok(_) => {
            let mut err = ValidationError::new("image_mime");
            err.message = Some("Data URL must carry an image MIME type".into());
            Err(err)
        }
        Err(_) => {
            let mut err = ValidationError::new("image_data_url");
            err.message = Some("Image must be a base64 data URL".into());
            Err(err)
        }
    }
}

/// Validates that a string contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Latitude tests
    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.1).is_err());
        assert!(validate_latitude(-90.1).is_err());
    }

    #[test]
    fn test_validate_latitude_error_message() {
        let err = validate_latitude(100.0).unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Latitude must be between -90 and 90"
        );
    }

    // Longitude tests
    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(105.8542).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.1).is_err());
    }

    #[test]
    fn test_validate_zoom() {
        assert!(validate_zoom(14.0).is_ok());
        assert!(validate_zoom(0.0).is_ok());
        assert!(validate_zoom(22.0).is_ok());
        assert!(validate_zoom(-1.0).is_err());
        assert!(validate_zoom(23.0).is_err());
    }

    // Image tests
    #[test]
    fn test_validate_image_data_url() {
        assert!(validate_image_data_url("data:image/png;base64,iVBORw0KGgo=").is_ok());
    }

    #[test]
    fn test_validate_image_data_url_rejects_http_url() {
        let err = validate_image_data_url("https://example.com/a.png").unwrap_err();
        assert_eq!(
            err.message.unwrap().to_string(),
            "Image must be a base64 data URL"
        );
    }

    #[test]
    fn test_validate_image_data_url_rejects_text() {
        let err = validate_image_data_url("data:text/plain;base64,aGk=").unwrap_err();
        assert_eq!(err.code, "image_mime");
    }

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("Linh").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }
}
