use listing_submission::{ApiError, CaptureError, PickerError, SubmitError};
use std::fmt;

/// Central error types for the PlantSwap app
#[derive(Debug)]
pub enum AppError {
    /// Backend request failed
    Api(ApiError),
    /// Camera or gallery failure
    Capture(CaptureError),
    /// Submitting a listing failed
    Submit(SubmitError),
    /// Preview rendering error
    ImageProcessing(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Api(e) => write!(f, "API error: {}", e),
            AppError::Capture(e) => write!(f, "Capture error: {}", e),
            AppError::Submit(e) => write!(f, "Submission error: {}", e),
            AppError::ImageProcessing(msg) => write!(f, "Image processing error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

// Conversions from other error types
impl From<ApiError> for AppError {
    fn from(e: ApiError) -> Self {
        AppError::Api(e)
    }
}

impl From<CaptureError> for AppError {
    fn from(e: CaptureError) -> Self {
        AppError::Capture(e)
    }
}

impl From<SubmitError> for AppError {
    fn from(e: SubmitError) -> Self {
        AppError::Submit(e)
    }
}

/// User-friendly error messages for the UI
impl AppError {
    pub fn user_message(&self) -> String {
        match self {
            AppError::Api(ApiError::Network(_)) => {
                "Could not reach the server. Please check your connection.".to_string()
            }
            AppError::Api(_) => "The server could not handle the request.".to_string(),
            AppError::Capture(CaptureError::PermissionDenied(reason)) => {
                format!("Permission required: {}", reason)
            }
            AppError::Capture(CaptureError::Picker(PickerError::PlatformNotSupported(_))) => {
                "Camera and gallery are only available on Android.".to_string()
            }
            AppError::Capture(e) => e.to_string(),
            AppError::Submit(SubmitError::ValidationFailed(violations)) => violations
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            AppError::Submit(SubmitError::SubmissionAlreadyInProgress) => {
                "This listing is already being submitted.".to_string()
            }
            AppError::Submit(SubmitError::UploadFailed { failures, .. }) => format!(
                "{} image(s) could not be uploaded. Please try again.",
                failures.len()
            ),
            AppError::Submit(SubmitError::ListingCreationFailed { .. }) => {
                "Your images were uploaded but the listing could not be created. Please try again."
                    .to_string()
            }
            AppError::Submit(SubmitError::Cancelled { .. }) => "Submission cancelled.".to_string(),
            AppError::ImageProcessing(_) => "Error processing image.".to_string(),
        }
    }
}
