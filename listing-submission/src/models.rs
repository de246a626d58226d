use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Largest image the backend accepts per upload (10 MiB)
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Session-scoped identifier of a captured image, assigned before upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalImageId(pub u32);

impl std::fmt::Display for LocalImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier the backend assigns to an uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub Uuid);

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier the backend assigns to a created listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub Uuid);

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListingType {
    #[default]
    Selling,
    Buying,
}

impl ListingType {
    pub fn display_name(&self) -> &str {
        match self {
            ListingType::Selling => "Selling",
            ListingType::Buying => "Buying",
        }
    }

    /// Flip between selling and buying (the "Buying?" switch)
    pub fn toggled(self) -> Self {
        match self {
            ListingType::Selling => ListingType::Buying,
            ListingType::Buying => ListingType::Selling,
        }
    }
}

/// An image captured from the camera or picked from the gallery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub local_id: LocalImageId,
    pub bytes: Arc<[u8]>,
}

impl CapturedImage {
    pub fn new(local_id: LocalImageId, bytes: Vec<u8>) -> Self {
        Self {
            local_id,
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// MIME type sniffed from the encoded bytes; only formats the backend accepts
    pub fn content_type(&self) -> Option<&'static str> {
        match image::guess_format(&self.bytes).ok()? {
            image::ImageFormat::Jpeg => Some("image/jpeg"),
            image::ImageFormat::Png => Some("image/png"),
            _ => None,
        }
    }

    /// File name sent along with the multipart upload
    pub fn file_name(&self) -> String {
        let ext = match self.content_type() {
            Some("image/png") => "png",
            _ => "jpg",
        };
        format!("image-{}.{}", self.local_id.0, ext)
    }
}

/// In-flight marker of a draft.
///
/// Cloning a draft yields a new instance that is not submitting, so
/// `Clone` hands out a fresh flag instead of sharing this one.
#[derive(Debug, Default)]
pub(crate) struct SubmissionFlag(Arc<AtomicBool>);

impl SubmissionFlag {
    /// Marks the draft as submitting; `None` if it already was
    pub(crate) fn try_acquire(&self) -> Option<SubmissionGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionGuard(Arc::clone(&self.0)))
    }

    fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

impl Clone for SubmissionFlag {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl PartialEq for SubmissionFlag {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// Releases the draft's in-flight marker when the submission ends
#[derive(Debug)]
pub(crate) struct SubmissionGuard(Arc<AtomicBool>);

impl Drop for SubmissionGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A listing being composed locally, not yet submitted
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub tradeable: bool,
    pub listing_type: ListingType,
    #[serde(deserialize_with = "images_by_local_id")]
    images: IndexMap<LocalImageId, CapturedImage>,
    thumbnail: Option<LocalImageId>,
    #[serde(skip)]
    submission: SubmissionFlag,
}

/// Re-keys deserialized images by their own `local_id`, so the map key can
/// never disagree with the image it points to. Later duplicates are dropped.
fn images_by_local_id<'de, D>(
    deserializer: D,
) -> Result<IndexMap<LocalImageId, CapturedImage>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let stored = IndexMap::<LocalImageId, CapturedImage>::deserialize(deserializer)?;
    let mut images = IndexMap::with_capacity(stored.len());
    for (key, image) in stored {
        if key != image.local_id {
            log::warn!("Draft image stored under {} claims id {}", key, image.local_id);
        }
        if images.contains_key(&image.local_id) {
            log::warn!("Dropping duplicate draft image {}", image.local_id);
            continue;
        }
        images.insert(image.local_id, image);
    }
    Ok(images)
}

impl ListingDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_tradeable(&mut self, tradeable: bool) {
        self.tradeable = tradeable;
    }

    pub fn set_listing_type(&mut self, listing_type: ListingType) {
        self.listing_type = listing_type;
    }

    /// Appends an image at the end. Returns false if the id is already taken.
    pub fn append(&mut self, image: CapturedImage) -> bool {
        if self.images.contains_key(&image.local_id) {
            log::warn!("Image {} is already part of the draft", image.local_id);
            return false;
        }
        self.images.insert(image.local_id, image);
        true
    }

    /// Removes an image if present; unknown ids are ignored
    pub fn remove_by_id(&mut self, local_id: LocalImageId) -> Option<CapturedImage> {
        let removed = self.images.shift_remove(&local_id);
        if removed.is_some() && self.thumbnail == Some(local_id) {
            self.thumbnail = None;
        }
        removed
    }

    /// Images in capture order
    pub fn images(&self) -> impl ExactSizeIterator<Item = &CapturedImage> {
        self.images.values()
    }

    pub fn image(&self, local_id: LocalImageId) -> Option<&CapturedImage> {
        self.images.get(&local_id)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Highest local id held by the draft
    pub fn last_local_id(&self) -> Option<LocalImageId> {
        self.images.keys().max().copied()
    }

    /// Chooses the thumbnail. Returns false if the image is not in the draft.
    pub fn set_thumbnail(&mut self, local_id: LocalImageId) -> bool {
        if !self.images.contains_key(&local_id) {
            return false;
        }
        self.thumbnail = Some(local_id);
        true
    }

    pub fn clear_thumbnail(&mut self) {
        self.thumbnail = None;
    }

    pub fn thumbnail(&self) -> Option<LocalImageId> {
        self.thumbnail
    }

    /// Whether a submission of this draft instance is running
    pub fn is_submitting(&self) -> bool {
        self.submission.is_set()
    }

    pub(crate) fn submission_flag(&self) -> &SubmissionFlag {
        &self.submission
    }
}

/// A constraint a draft violates, reported so the UI can point at the field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    EmptyTitle,
    NoImages,
    ImageTooLarge { local_id: LocalImageId, size: usize },
    UnsupportedImageFormat { local_id: LocalImageId },
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Violation::EmptyTitle => write!(f, "A title is required"),
            Violation::NoImages => write!(f, "Add at least one picture"),
            Violation::ImageTooLarge { local_id, size } => write!(
                f,
                "Picture {} is too large ({} bytes, at most {} allowed)",
                local_id, size, MAX_IMAGE_BYTES
            ),
            Violation::UnsupportedImageFormat { local_id } => {
                write!(f, "Picture {} is not a JPEG or PNG image", local_id)
            }
        }
    }
}

/// Lists every constraint the draft violates, in field order
pub fn violations(draft: &ListingDraft) -> Vec<Violation> {
    let mut violations = Vec::new();

    if draft.title.trim().is_empty() {
        violations.push(Violation::EmptyTitle);
    }

    if draft.images.is_empty() {
        violations.push(Violation::NoImages);
    }

    for image in draft.images() {
        if image.size() > MAX_IMAGE_BYTES {
            violations.push(Violation::ImageTooLarge {
                local_id: image.local_id,
                size: image.size(),
            });
        }
        if image.content_type().is_none() {
            violations.push(Violation::UnsupportedImageFormat {
                local_id: image.local_id,
            });
        }
    }

    violations
}

pub fn is_submittable(draft: &ListingDraft) -> bool {
    violations(draft).is_empty()
}

/// Outcome of a successful submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedListing {
    pub remote_id: ListingId,
    pub image_remote_ids: Vec<ImageId>,
    pub thumbnail: Option<ImageId>,
}

/// A listing as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub insertion_date: NaiveDateTime,
    pub author: Uuid,
    pub listing_type: ListingType,
    pub thumbnail: ImageId,
    pub tradeable: bool,
    #[serde(default)]
    pub identified_plant: Option<Uuid>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn jpeg_bytes(tag: u8) -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, tag]
    }

    pub(crate) fn png_bytes(tag: u8) -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n', 0x00, tag]
    }

    fn draft_with_images(title: &str, count: u32) -> ListingDraft {
        let mut draft = ListingDraft::new();
        draft.set_title(title);
        for id in 1..=count {
            draft.append(CapturedImage::new(LocalImageId(id), jpeg_bytes(id as u8)));
        }
        draft
    }

    #[test]
    fn test_new_draft_defaults() {
        let draft = ListingDraft::new();
        assert!(draft.title.is_empty());
        assert!(!draft.tradeable);
        assert_eq!(draft.listing_type, ListingType::Selling);
        assert_eq!(draft.image_count(), 0);
        assert_eq!(draft.thumbnail(), None);
    }

    #[test]
    fn test_blank_title_is_never_submittable() {
        for title in ["", "   ", "\t\n"] {
            let mut draft = draft_with_images(title, 2);
            draft.set_tradeable(true);
            draft.set_description("Healthy cutting");
            assert!(!is_submittable(&draft));
            assert!(violations(&draft).contains(&Violation::EmptyTitle));
        }
    }

    #[test]
    fn test_draft_without_images_is_rejected() {
        let draft = draft_with_images("Monstera cutting", 0);
        assert_eq!(violations(&draft), vec![Violation::NoImages]);
    }

    #[test]
    fn test_all_violations_are_reported() {
        let mut draft = ListingDraft::new();
        draft.append(CapturedImage::new(LocalImageId(1), b"GIF89a".to_vec()));
        let mut oversized = jpeg_bytes(2);
        oversized.resize(MAX_IMAGE_BYTES + 1, 0);
        draft.append(CapturedImage::new(LocalImageId(2), oversized));

        let found = violations(&draft);
        assert_eq!(found.len(), 3);
        assert_eq!(found[0], Violation::EmptyTitle);
        assert!(found.contains(&Violation::UnsupportedImageFormat {
            local_id: LocalImageId(1)
        }));
        assert!(found.contains(&Violation::ImageTooLarge {
            local_id: LocalImageId(2),
            size: MAX_IMAGE_BYTES + 1
        }));
    }

    #[test]
    fn test_valid_draft_is_submittable() {
        let draft = draft_with_images("Monstera cutting", 2);
        assert!(is_submittable(&draft));
    }

    #[test]
    fn test_content_type_sniffing() {
        let jpeg = CapturedImage::new(LocalImageId(1), jpeg_bytes(0));
        let png = CapturedImage::new(LocalImageId(2), png_bytes(0));
        assert_eq!(jpeg.content_type(), Some("image/jpeg"));
        assert_eq!(png.content_type(), Some("image/png"));
        assert_eq!(png.file_name(), "image-2.png");
    }

    #[test]
    fn test_remove_keeps_order_and_clears_thumbnail() {
        let mut draft = draft_with_images("Fern", 3);
        assert!(draft.set_thumbnail(LocalImageId(2)));

        assert!(draft.remove_by_id(LocalImageId(2)).is_some());
        assert!(draft.remove_by_id(LocalImageId(2)).is_none());

        let ids: Vec<_> = draft.images().map(|i| i.local_id).collect();
        assert_eq!(ids, vec![LocalImageId(1), LocalImageId(3)]);
        assert_eq!(draft.thumbnail(), None);
    }

    #[test]
    fn test_thumbnail_must_be_in_draft() {
        let mut draft = draft_with_images("Fern", 1);
        assert!(!draft.set_thumbnail(LocalImageId(9)));
        assert_eq!(draft.thumbnail(), None);
    }

    #[test]
    fn test_append_rejects_duplicate_id() {
        let mut draft = draft_with_images("Fern", 1);
        assert!(!draft.append(CapturedImage::new(LocalImageId(1), png_bytes(7))));
        assert_eq!(draft.image_count(), 1);
        assert_eq!(
            draft.image(LocalImageId(1)).and_then(|i| i.content_type()),
            Some("image/jpeg")
        );
    }

    #[test]
    fn test_clone_is_not_submitting() {
        let draft = draft_with_images("Fern", 1);
        let _guard = draft.submission_flag().try_acquire().unwrap();
        assert!(draft.is_submitting());
        assert!(draft.submission_flag().try_acquire().is_none());

        let copy = draft.clone();
        assert!(!copy.is_submitting());
        assert_eq!(copy, draft);
    }

    #[test]
    fn test_guard_releases_flag() {
        let draft = draft_with_images("Fern", 1);
        {
            let _guard = draft.submission_flag().try_acquire().unwrap();
            assert!(draft.is_submitting());
        }
        assert!(!draft.is_submitting());
    }

    #[test]
    fn test_draft_serializes_images_in_order() {
        let mut draft = draft_with_images("Fern", 3);
        draft.remove_by_id(LocalImageId(1));
        let json = serde_json::to_string(&draft).unwrap();
        let restored: ListingDraft = serde_json::from_str(&json).unwrap();
        let ids: Vec<_> = restored.images().map(|i| i.local_id).collect();
        assert_eq!(ids, vec![LocalImageId(2), LocalImageId(3)]);
        assert_eq!(restored.title, "Fern");
    }

    #[test]
    fn test_restored_images_are_keyed_by_their_own_id() {
        let bytes = |b: Vec<u8>| serde_json::to_string(&b).unwrap();
        let json = format!(
            r#"{{
                "title": "Fern",
                "description": "",
                "tradeable": false,
                "listing_type": "Selling",
                "images": {{
                    "7": {{ "local_id": 2, "bytes": {} }},
                    "9": {{ "local_id": 2, "bytes": {} }},
                    "3": {{ "local_id": 3, "bytes": {} }}
                }},
                "thumbnail": null
            }}"#,
            bytes(jpeg_bytes(2)),
            bytes(jpeg_bytes(9)),
            bytes(png_bytes(3)),
        );

        let mut restored: ListingDraft = serde_json::from_str(&json).unwrap();

        let ids: Vec<_> = restored.images().map(|i| i.local_id).collect();
        assert_eq!(ids, vec![LocalImageId(2), LocalImageId(3)]);
        assert!(restored.image(LocalImageId(7)).is_none());
        assert_eq!(restored.image(LocalImageId(2)).map(|i| i.bytes.to_vec()), Some(jpeg_bytes(2)));
        assert!(restored.remove_by_id(LocalImageId(2)).is_some());
        assert_eq!(restored.image_count(), 1);
        assert_eq!(restored.last_local_id(), Some(LocalImageId(3)));
    }

    #[test]
    fn test_listing_type_toggle() {
        assert_eq!(ListingType::Selling.toggled(), ListingType::Buying);
        assert_eq!(ListingType::Buying.toggled(), ListingType::Selling);
    }
}
