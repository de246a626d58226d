//! Capture session: feeds camera shots and gallery selections into a draft
//!
//! Every image gets the next value of a counter that starts at 1 and is
//! never reset while the session lives, so ids stay unique across removals.
//! The counter also skips past the highest id already in the draft, which
//! matters for drafts restored from storage.

use crate::models::{CapturedImage, ListingDraft, LocalImageId};
use crate::picker::{ImageSource, PickedImage, PickerError};

/// Whether the camera or the gallery picker is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    #[default]
    Idle,
    Capturing,
}

/// Configuration for a capture session
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound for one gallery multi-select
    pub max_gallery_selection: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_gallery_selection: 5,
        }
    }
}

/// Message the UI shows after a capture attempt went wrong
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureNotice {
    PermissionDenied(String),
    Failed(String),
}

impl std::fmt::Display for CaptureNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureNotice::PermissionDenied(reason) => write!(f, "Permission denied: {}", reason),
            CaptureNotice::Failed(msg) => write!(f, "Could not get the picture: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    PermissionDenied(String),
    Picker(PickerError),
    SelectionTooLarge { selected: usize, max: usize },
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            CaptureError::Picker(e) => write!(f, "Picker error: {}", e),
            CaptureError::SelectionTooLarge { selected, max } => write!(
                f,
                "{} images selected, at most {} allowed",
                selected, max
            ),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug, Clone)]
pub struct CaptureSession {
    config: CaptureConfig,
    next_id: u32,
    mode: CaptureMode,
    notice: Option<CaptureNotice>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureConfig::default())
    }
}

impl CaptureSession {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            next_id: 1,
            mode: CaptureMode::Idle,
            notice: None,
        }
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn is_capturing(&self) -> bool {
        self.mode == CaptureMode::Capturing
    }

    pub fn max_gallery_selection(&self) -> usize {
        self.config.max_gallery_selection
    }

    pub fn notice(&self) -> Option<&CaptureNotice> {
        self.notice.as_ref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Marks the camera or the gallery picker as open
    pub fn start_capture(&mut self) {
        self.notice = None;
        self.mode = CaptureMode::Capturing;
    }

    /// Leaves the camera surface without taking a picture
    pub fn cancel_capture(&mut self) {
        self.mode = CaptureMode::Idle;
    }

    /// Ends the current capture attempt; the draft is left untouched
    pub fn on_permission_denied(&mut self, reason: impl Into<String>) -> CaptureError {
        let reason = reason.into();
        log::warn!("Permission denied: {}", reason);
        self.mode = CaptureMode::Idle;
        self.notice = Some(CaptureNotice::PermissionDenied(reason.clone()));
        CaptureError::PermissionDenied(reason)
    }

    /// Moves the counter past every id the draft already holds
    fn skip_taken_ids(&mut self, draft: &ListingDraft) {
        if let Some(last) = draft.last_local_id() {
            self.next_id = self.next_id.max(last.0.saturating_add(1));
        }
    }

    fn allocate_id(&mut self) -> LocalImageId {
        let id = LocalImageId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Ends the current capture attempt after the camera or picker failed
    pub fn on_picker_error(&mut self, err: PickerError) -> CaptureError {
        self.mode = CaptureMode::Idle;
        match err {
            PickerError::PermissionDenied(reason) => self.on_permission_denied(reason),
            PickerError::Cancelled(msg) => {
                log::debug!("Capture cancelled: {}", msg);
                CaptureError::Picker(PickerError::Cancelled(msg))
            }
            other => {
                log::error!("Capture failed: {}", other);
                self.notice = Some(CaptureNotice::Failed(other.to_string()));
                CaptureError::Picker(other)
            }
        }
    }

    /// Appends the photo the camera delivered and returns to the form
    pub fn on_camera_capture(&mut self, draft: &mut ListingDraft, bytes: Vec<u8>) -> LocalImageId {
        self.skip_taken_ids(draft);
        let id = self.allocate_id();
        draft.append(CapturedImage::new(id, bytes));
        self.mode = CaptureMode::Idle;
        log::debug!("Captured image {} from camera", id);
        id
    }

    /// Appends a gallery selection in input order.
    ///
    /// The selection is applied completely or not at all: one failed item or
    /// a selection above the configured maximum leaves the draft unchanged.
    pub fn on_gallery_selection<I>(
        &mut self,
        draft: &mut ListingDraft,
        items: I,
    ) -> Result<Vec<LocalImageId>, CaptureError>
    where
        I: IntoIterator<Item = PickedImage>,
    {
        self.mode = CaptureMode::Idle;
        let mut selected = Vec::new();
        for item in items {
            match item {
                Ok(bytes) => selected.push(bytes),
                Err(e) => return Err(self.on_picker_error(e)),
            }
        }

        let max = self.config.max_gallery_selection;
        if selected.len() > max {
            return Err(CaptureError::SelectionTooLarge {
                selected: selected.len(),
                max,
            });
        }

        self.skip_taken_ids(draft);
        let ids: Vec<LocalImageId> = selected
            .into_iter()
            .map(|bytes| {
                let id = self.allocate_id();
                draft.append(CapturedImage::new(id, bytes));
                id
            })
            .collect();

        log::debug!("Added {} images from gallery", ids.len());
        Ok(ids)
    }

    /// Applies what the camera returned. `Ok(None)` means it was closed
    /// without a picture.
    pub fn on_camera_result(
        &mut self,
        draft: &mut ListingDraft,
        result: Result<Option<Vec<u8>>, PickerError>,
    ) -> Result<Option<LocalImageId>, CaptureError> {
        match result {
            Ok(Some(bytes)) => Ok(Some(self.on_camera_capture(draft, bytes))),
            Ok(None) => {
                self.cancel_capture();
                Ok(None)
            }
            Err(e) => Err(self.on_picker_error(e)),
        }
    }

    pub fn on_gallery_result(
        &mut self,
        draft: &mut ListingDraft,
        result: Result<Vec<PickedImage>, PickerError>,
    ) -> Result<Vec<LocalImageId>, CaptureError> {
        match result {
            Ok(items) => self.on_gallery_selection(draft, items),
            Err(e) => Err(self.on_picker_error(e)),
        }
    }

    /// Removes one image; removing an unknown id is not an error
    pub fn remove(&mut self, draft: &mut ListingDraft, local_id: LocalImageId) -> bool {
        draft.remove_by_id(local_id).is_some()
    }

    /// Runs one camera capture against `source`
    pub async fn capture_with<S: ImageSource>(
        &mut self,
        source: &S,
        draft: &mut ListingDraft,
    ) -> Result<Option<LocalImageId>, CaptureError> {
        self.start_capture();
        let result = source.capture().await;
        self.on_camera_result(draft, result)
    }

    /// Runs one gallery multi-select against `source`
    pub async fn pick_with<S: ImageSource>(
        &mut self,
        source: &S,
        draft: &mut ListingDraft,
    ) -> Result<Vec<LocalImageId>, CaptureError> {
        self.start_capture();
        let result = source.pick(self.config.max_gallery_selection).await;
        self.on_gallery_result(draft, result)
    }
}
