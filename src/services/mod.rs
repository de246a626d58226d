use crate::config::AppConfig;
use crate::error::AppError;
use listing_submission::{
    AndroidPickerConfig, CaptureSession, HttpListingApi, PlatformImageSource, SubmissionAssembler,
};
use std::sync::Arc;

/// Backend client, submission pipeline and image source shared by all screens
#[derive(Clone)]
pub struct AppServices {
    pub api: Arc<HttpListingApi>,
    pub assembler: SubmissionAssembler<HttpListingApi>,
    pub images: Arc<PlatformImageSource>,
    config: Arc<AppConfig>,
}

impl PartialEq for AppServices {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.api, &other.api)
    }
}

impl AppServices {
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let api = Arc::new(HttpListingApi::new(&config.api)?);
        log::info!("Using PlantSwap backend at {}", config.api.base_url);

        Ok(Self {
            assembler: SubmissionAssembler::new(Arc::clone(&api), config.submission()),
            api,
            images: Arc::new(PlatformImageSource::new(AndroidPickerConfig::default())),
            config: Arc::new(config),
        })
    }

    pub fn new_capture_session(&self) -> CaptureSession {
        CaptureSession::new(self.config.capture())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_follow_config() {
        let mut config = AppConfig::default();
        config.upload.max_gallery_selection = 2;

        let services = AppServices::from_config(config).unwrap();
        assert_eq!(services.new_capture_session().max_gallery_selection(), 2);
        assert!(services == services.clone());
    }

    #[test]
    fn test_bad_base_url_is_an_api_error() {
        let mut config = AppConfig::default();
        config.api.base_url = "::".to_string();

        let result = AppServices::from_config(config);
        assert!(matches!(result, Err(AppError::Api(_))));
    }
}
