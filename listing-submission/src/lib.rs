//! # Listing Submission
//!
//! Everything needed to turn photos of a plant into a listing on the
//! PlantSwap backend, independent of the UI:
//! - Listing drafts with ordered images and validation
//! - Capture sessions for camera shots and gallery selections
//! - The submission pipeline (bounded parallel uploads, then listing creation)
//! - The REST client for the backend
//!
//! ## Platform Separation
//!
//! Camera and gallery access go through the [`ImageSource`] trait. The
//! Android implementation talks to the host activity over JNI; everywhere
//! else it reports `PlatformNotSupported`.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use listing_submission::{ApiConfig, HttpListingApi, ListingDraft, SubmissionAssembler};
//! use std::sync::Arc;
//!
//! let api = Arc::new(HttpListingApi::new(&ApiConfig::default())?);
//! let assembler = SubmissionAssembler::new(api, Default::default());
//!
//! let mut draft = ListingDraft::new();
//! draft.set_title("Monstera cutting");
//! // ... capture images into the draft ...
//! let listing = assembler.submit(&draft).await?;
//! ```

pub mod api;
pub mod capture;
pub mod models;
pub mod picker;
pub mod submission;

pub use api::{ApiConfig, ApiError, CreateListingRequest, HttpListingApi, ListingApi};
pub use capture::{CaptureConfig, CaptureError, CaptureMode, CaptureNotice, CaptureSession};
pub use models::{
    is_submittable, violations, CapturedImage, ImageId, Listing, ListingDraft, ListingId,
    ListingType, LocalImageId, SubmittedListing, Violation, MAX_IMAGE_BYTES,
};
pub use picker::{AndroidPickerConfig, ImageSource, PickedImage, PickerError, PlatformImageSource};
pub use submission::{
    CancelHandle, Submission, SubmissionAssembler, SubmissionConfig, SubmitError, UploadFailure,
};
