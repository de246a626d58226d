//! Submission assembler: turns a draft into image uploads plus one
//! create-listing call.
//!
//! Uploads run in a bounded `JoinSet`; results are put back into draft order
//! before the listing is created. The listing is only created when every
//! upload succeeded.

use crate::api::{ApiError, CreateListingRequest, ListingApi};
use crate::models::{
    violations, CapturedImage, ImageId, ListingDraft, ListingType, LocalImageId,
    SubmissionGuard, SubmittedListing, Violation,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinSet;

/// Configuration for the submission pipeline
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub max_concurrent_uploads: usize,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_uploads: 3,
        }
    }
}

/// An image whose upload failed
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub local_id: LocalImageId,
    pub cause: ApiError,
}

/// Errors that can occur while submitting a draft
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitError {
    ValidationFailed(Vec<Violation>),
    SubmissionAlreadyInProgress,
    /// No listing was created. `orphaned_image_ids` finished uploading
    /// before the failure was noticed.
    UploadFailed {
        failures: Vec<UploadFailure>,
        orphaned_image_ids: Vec<ImageId>,
    },
    /// Every image is on the server but the listing does not exist
    ListingCreationFailed {
        uploaded_image_ids: Vec<ImageId>,
        cause: ApiError,
    },
    Cancelled {
        orphaned_image_ids: Vec<ImageId>,
    },
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::ValidationFailed(violations) => {
                write!(f, "Validation failed: ")?;
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", v)?;
                }
                Ok(())
            }
            SubmitError::SubmissionAlreadyInProgress => {
                write!(f, "This listing is already being submitted")
            }
            SubmitError::UploadFailed { failures, .. } => {
                write!(f, "Upload failed for image(s)")?;
                for failure in failures {
                    write!(f, " {} ({})", failure.local_id, failure.cause)?;
                }
                Ok(())
            }
            SubmitError::ListingCreationFailed {
                uploaded_image_ids,
                cause,
            } => write!(
                f,
                "Listing creation failed after {} images uploaded: {}",
                uploaded_image_ids.len(),
                cause
            ),
            SubmitError::Cancelled { .. } => write!(f, "Submission cancelled"),
        }
    }
}

impl std::error::Error for SubmitError {}

impl SubmitError {
    /// Images left on the server without a listing referencing them
    pub fn orphaned_image_ids(&self) -> &[ImageId] {
        match self {
            SubmitError::UploadFailed {
                orphaned_image_ids, ..
            }
            | SubmitError::Cancelled { orphaned_image_ids } => orphaned_image_ids,
            SubmitError::ListingCreationFailed {
                uploaded_image_ids, ..
            } => uploaded_image_ids,
            SubmitError::ValidationFailed(_) | SubmitError::SubmissionAlreadyInProgress => &[],
        }
    }
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cooperative cancellation of a running submission.
///
/// Cancelling stops new uploads and aborts running ones; uploads that
/// already finished stay on the server.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<CancelState>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancelled.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.cancelled.load(Ordering::Acquire)
    }

    async fn cancelled(&self) {
        loop {
            let notified = self.0.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Immutable copy of the draft taken when the submission starts
#[derive(Debug, Clone)]
struct DraftSnapshot {
    title: String,
    description: String,
    tradeable: bool,
    listing_type: ListingType,
    images: Vec<CapturedImage>,
    thumbnail: Option<LocalImageId>,
}

impl DraftSnapshot {
    fn of(draft: &ListingDraft) -> Self {
        Self {
            title: draft.title.trim().to_string(),
            description: draft.description.clone(),
            tradeable: draft.tradeable,
            listing_type: draft.listing_type,
            images: draft.images().cloned().collect(),
            thumbnail: draft.thumbnail(),
        }
    }

    /// Remote id of the chosen thumbnail, falling back to the first image
    fn thumbnail_of(&self, image_ids: &[ImageId]) -> Option<ImageId> {
        let chosen = self
            .thumbnail
            .and_then(|local| self.images.iter().position(|i| i.local_id == local));
        image_ids.get(chosen.unwrap_or(0)).copied()
    }
}

/// Validates drafts and starts their submissions
pub struct SubmissionAssembler<A> {
    api: Arc<A>,
    config: SubmissionConfig,
}

impl<A> Clone for SubmissionAssembler<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            config: self.config.clone(),
        }
    }
}

impl<A: ListingApi + 'static> SubmissionAssembler<A> {
    pub fn new(api: Arc<A>, config: SubmissionConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    /// Checks the draft and snapshots it.
    ///
    /// Fails without touching the network if the draft is already being
    /// submitted or violates a constraint. The returned submission keeps the
    /// draft marked as submitting until it finishes or is dropped.
    pub fn begin(&self, draft: &ListingDraft) -> Result<Submission<A>, SubmitError> {
        let guard = draft
            .submission_flag()
            .try_acquire()
            .ok_or(SubmitError::SubmissionAlreadyInProgress)?;

        let violations = violations(draft);
        if !violations.is_empty() {
            log::debug!("Draft rejected: {:?}", violations);
            return Err(SubmitError::ValidationFailed(violations));
        }

        Ok(Submission {
            api: Arc::clone(&self.api),
            snapshot: DraftSnapshot::of(draft),
            max_concurrent_uploads: self.config.max_concurrent_uploads.max(1),
            cancel: CancelHandle::default(),
            _guard: guard,
        })
    }

    /// Submits the draft and waits for the result
    pub async fn submit(&self, draft: &ListingDraft) -> Result<SubmittedListing, SubmitError> {
        self.begin(draft)?.run().await
    }
}

/// A started submission of one draft snapshot
pub struct Submission<A> {
    api: Arc<A>,
    snapshot: DraftSnapshot,
    max_concurrent_uploads: usize,
    cancel: CancelHandle,
    _guard: SubmissionGuard,
}

impl<A: ListingApi + 'static> Submission<A> {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn image_count(&self) -> usize {
        self.snapshot.images.len()
    }

    /// Uploads all images, then creates the listing
    pub async fn run(self) -> Result<SubmittedListing, SubmitError> {
        log::info!(
            "Submitting listing '{}' with {} images",
            self.snapshot.title,
            self.snapshot.images.len()
        );

        let image_ids = self.upload_all().await?;

        if self.cancel.is_cancelled() {
            log::info!("Submission cancelled after all uploads finished");
            return Err(SubmitError::Cancelled {
                orphaned_image_ids: image_ids,
            });
        }

        let Some(thumbnail) = self.snapshot.thumbnail_of(&image_ids) else {
            return Err(SubmitError::ValidationFailed(vec![Violation::NoImages]));
        };

        let request = CreateListingRequest {
            title: self.snapshot.title.clone(),
            description: self.snapshot.description.clone(),
            listing_type: self.snapshot.listing_type,
            pictures: image_ids.clone(),
            thumbnail,
            tradeable: self.snapshot.tradeable,
        };

        match self.api.create_listing(&request).await {
            Ok(listing) => Ok(SubmittedListing {
                remote_id: listing.id,
                image_remote_ids: image_ids,
                thumbnail: Some(thumbnail),
            }),
            Err(cause) => {
                log::error!(
                    "Listing creation failed, {} uploaded images orphaned: {}",
                    image_ids.len(),
                    cause
                );
                Err(SubmitError::ListingCreationFailed {
                    uploaded_image_ids: image_ids,
                    cause,
                })
            }
        }
    }

    /// Uploads the snapshot's images with at most `max_concurrent_uploads`
    /// in flight and returns their remote ids in draft order
    async fn upload_all(&self) -> Result<Vec<ImageId>, SubmitError> {
        let total = self.snapshot.images.len();
        let mut uploaded: Vec<Option<ImageId>> = vec![None; total];
        let mut failures: Vec<(usize, UploadFailure)> = Vec::new();
        let mut cancelled = false;

        let mut pending = self.snapshot.images.iter().cloned().enumerate();
        let mut join_set = JoinSet::new();

        loop {
            while failures.is_empty() && !cancelled && join_set.len() < self.max_concurrent_uploads
            {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                let Some((index, image)) = pending.next() else {
                    break;
                };
                let api = Arc::clone(&self.api);
                join_set.spawn(async move {
                    let result = api.upload_image(&image).await;
                    (index, image.local_id, result)
                });
            }

            if join_set.is_empty() {
                break;
            }

            let joined = tokio::select! {
                joined = join_set.join_next() => joined,
                _ = self.cancel.cancelled(), if !cancelled => {
                    log::info!("Submission cancelled, aborting {} running uploads", join_set.len());
                    cancelled = true;
                    join_set.abort_all();
                    continue;
                }
            };

            match joined {
                Some(Ok((index, _, Ok(image_id)))) => uploaded[index] = Some(image_id),
                Some(Ok((index, local_id, Err(cause)))) => {
                    log::error!("Upload of image {} failed: {}", local_id, cause);
                    if failures.is_empty() {
                        join_set.abort_all();
                    }
                    failures.push((index, UploadFailure { local_id, cause }));
                }
                Some(Err(e)) if e.is_cancelled() => {}
                Some(Err(e)) => std::panic::resume_unwind(e.into_panic()),
                None => break,
            }
        }

        let finished: Vec<ImageId> = uploaded.iter().flatten().copied().collect();

        if !failures.is_empty() {
            failures.sort_by_key(|(index, _)| *index);
            return Err(SubmitError::UploadFailed {
                failures: failures.into_iter().map(|(_, f)| f).collect(),
                orphaned_image_ids: finished,
            });
        }

        match uploaded.into_iter().collect::<Option<Vec<ImageId>>>() {
            Some(ids) => {
                log::debug!("All {} images uploaded", ids.len());
                Ok(ids)
            }
            None => Err(SubmitError::Cancelled {
                orphaned_image_ids: finished,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::jpeg_bytes;
    use crate::models::{Listing, ListingId};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    fn image_id(n: u128) -> ImageId {
        ImageId(Uuid::from_u128(n))
    }

    /// In-memory backend with per-image latency and failures
    #[derive(Default)]
    struct FakeApi {
        remote_ids: HashMap<LocalImageId, ImageId>,
        delays: HashMap<LocalImageId, Duration>,
        failing: HashSet<LocalImageId>,
        listing_id: u128,
        fail_create: bool,
        started: Mutex<Vec<LocalImageId>>,
        completed: Mutex<Vec<LocalImageId>>,
        created: Mutex<Vec<CreateListingRequest>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeApi {
        fn with_images(ids: &[(u32, u128)]) -> Self {
            Self {
                remote_ids: ids
                    .iter()
                    .map(|(local, remote)| (LocalImageId(*local), image_id(*remote)))
                    .collect(),
                listing_id: 55,
                ..Self::default()
            }
        }

        fn delay(mut self, local: u32, millis: u64) -> Self {
            self.delays
                .insert(LocalImageId(local), Duration::from_millis(millis));
            self
        }

        fn failing(mut self, local: u32) -> Self {
            self.failing.insert(LocalImageId(local));
            self
        }

        fn started(&self) -> Vec<u32> {
            self.started.lock().unwrap().iter().map(|i| i.0).collect()
        }

        fn completed(&self) -> Vec<u32> {
            self.completed.lock().unwrap().iter().map(|i| i.0).collect()
        }

        fn created(&self) -> Vec<CreateListingRequest> {
            self.created.lock().unwrap().clone()
        }
    }

    impl ListingApi for FakeApi {
        async fn upload_image(&self, image: &CapturedImage) -> Result<ImageId, ApiError> {
            self.started.lock().unwrap().push(image.local_id);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delays.get(&image.local_id) {
                tokio::time::sleep(*delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.completed.lock().unwrap().push(image.local_id);

            if self.failing.contains(&image.local_id) {
                return Err(ApiError::Status {
                    status: 500,
                    body: "Couldn't upload image".to_string(),
                });
            }
            self.remote_ids
                .get(&image.local_id)
                .copied()
                .ok_or_else(|| ApiError::Decode("unknown image".to_string()))
        }

        async fn create_listing(
            &self,
            request: &CreateListingRequest,
        ) -> Result<Listing, ApiError> {
            self.created.lock().unwrap().push(request.clone());
            if self.fail_create {
                return Err(ApiError::Status {
                    status: 500,
                    body: "Error while creating listing".to_string(),
                });
            }
            Ok(Listing {
                id: ListingId(Uuid::from_u128(self.listing_id)),
                title: request.title.clone(),
                description: request.description.clone(),
                insertion_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                    .and_then(|d| d.and_hms_opt(12, 0, 0))
                    .unwrap(),
                author: Uuid::nil(),
                listing_type: request.listing_type,
                thumbnail: request.thumbnail,
                tradeable: request.tradeable,
                identified_plant: None,
            })
        }

        async fn list_listings(&self) -> Result<Vec<Listing>, ApiError> {
            Ok(Vec::new())
        }

        async fn get_listing(&self, _id: ListingId) -> Result<Option<Listing>, ApiError> {
            Ok(None)
        }
    }

    fn monstera_draft(images: u32) -> ListingDraft {
        let mut draft = ListingDraft::new();
        draft.set_title("Monstera cutting");
        draft.set_tradeable(true);
        draft.set_listing_type(ListingType::Selling);
        for id in 1..=images {
            draft.append(CapturedImage::new(LocalImageId(id), jpeg_bytes(id as u8)));
        }
        draft
    }

    fn assembler(api: FakeApi, max_concurrent_uploads: usize) -> SubmissionAssembler<FakeApi> {
        SubmissionAssembler::new(
            Arc::new(api),
            SubmissionConfig {
                max_concurrent_uploads,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_submits_monstera_listing() {
        let assembler = assembler(FakeApi::with_images(&[(1, 101), (2, 102)]), 3);
        let draft = monstera_draft(2);

        let submitted = assembler.submit(&draft).await.unwrap();

        assert_eq!(
            submitted,
            SubmittedListing {
                remote_id: ListingId(Uuid::from_u128(55)),
                image_remote_ids: vec![image_id(101), image_id(102)],
                thumbnail: Some(image_id(101)),
            }
        );

        let created = assembler.api().created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "Monstera cutting");
        assert_eq!(created[0].pictures, vec![image_id(101), image_id(102)]);
        assert_eq!(created[0].thumbnail, image_id(101));
        assert!(created[0].tradeable);
        assert_eq!(created[0].listing_type, ListingType::Selling);
        assert!(!draft.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_uploads_keep_draft_order() {
        let api = FakeApi::with_images(&[(1, 1), (2, 2), (3, 3)])
            .delay(1, 20)
            .delay(2, 30)
            .delay(3, 10);
        let assembler = assembler(api, 3);

        let submitted = assembler.submit(&monstera_draft(3)).await.unwrap();

        assert_eq!(assembler.api().completed(), vec![3, 1, 2]);
        assert_eq!(
            submitted.image_remote_ids,
            vec![image_id(1), image_id(2), image_id(3)]
        );
        assert_eq!(assembler.api().created()[0].pictures, submitted.image_remote_ids);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_pool_is_bounded() {
        let mut api = FakeApi::with_images(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5), (6, 6)]);
        for id in 1..=6 {
            api = api.delay(id, 10);
        }
        let assembler = assembler(api, 3);

        assembler.submit(&monstera_draft(6)).await.unwrap();

        assert_eq!(assembler.api().max_in_flight.load(Ordering::SeqCst), 3);
        assert_eq!(assembler.api().started(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_skips_creation() {
        let api = FakeApi::with_images(&[(1, 101), (2, 102)])
            .delay(1, 10)
            .delay(2, 20)
            .failing(2);
        let assembler = assembler(api, 3);

        let err = assembler.submit(&monstera_draft(2)).await.unwrap_err();

        match err {
            SubmitError::UploadFailed {
                failures,
                orphaned_image_ids,
            } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].local_id, LocalImageId(2));
                assert_eq!(orphaned_image_ids, vec![image_id(101)]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(assembler.api().created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_upload_stops_remaining_uploads() {
        let api = FakeApi::with_images(&[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)])
            .failing(1)
            .delay(2, 50);
        let assembler = assembler(api, 2);

        let err = assembler.submit(&monstera_draft(5)).await.unwrap_err();

        assert!(matches!(err, SubmitError::UploadFailed { .. }));
        assert!(err.orphaned_image_ids().is_empty());
        assert_eq!(assembler.api().started(), vec![1, 2]);
        assert_eq!(assembler.api().completed(), vec![1]);
        assert!(assembler.api().created().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_failure_reports_uploaded_images() {
        let mut api = FakeApi::with_images(&[(1, 201), (2, 202)]);
        api.fail_create = true;
        let assembler = assembler(api, 3);
        let draft = monstera_draft(2);

        let err = assembler.submit(&draft).await.unwrap_err();

        match &err {
            SubmitError::ListingCreationFailed {
                uploaded_image_ids,
                cause,
            } => {
                assert_eq!(uploaded_image_ids, &vec![image_id(201), image_id(202)]);
                assert!(matches!(cause, ApiError::Status { status: 500, .. }));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("after 2 images uploaded"));
        assert!(!draft.is_submitting());
    }

    #[tokio::test]
    async fn test_invalid_draft_never_reaches_network() {
        let assembler = assembler(FakeApi::with_images(&[(1, 1)]), 3);
        let mut draft = monstera_draft(1);
        draft.set_title("   ");

        let err = assembler.submit(&draft).await.unwrap_err();

        assert_eq!(err, SubmitError::ValidationFailed(vec![Violation::EmptyTitle]));
        assert!(assembler.api().started().is_empty());
        assert!(assembler.api().created().is_empty());
        assert!(!draft.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_is_rejected_while_running() {
        let api = FakeApi::with_images(&[(1, 1), (2, 2)])
            .delay(1, 10)
            .delay(2, 10);
        let assembler = assembler(api, 3);
        let draft = monstera_draft(2);

        let first = assembler.begin(&draft).unwrap();
        assert!(draft.is_submitting());

        let second = assembler.submit(&draft).await;
        assert_eq!(second, Err(SubmitError::SubmissionAlreadyInProgress));
        assert!(assembler.api().started().is_empty());

        let running = tokio::spawn(first.run());
        tokio::task::yield_now().await;
        assert!(matches!(
            assembler.begin(&draft),
            Err(SubmitError::SubmissionAlreadyInProgress)
        ));

        running.await.unwrap().unwrap();
        assert!(!draft.is_submitting());
        assert_eq!(assembler.api().created().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_ignores_later_draft_edits() {
        let assembler = assembler(FakeApi::with_images(&[(1, 1), (2, 2), (3, 3)]), 3);
        let mut draft = monstera_draft(2);

        let submission = assembler.begin(&draft).unwrap();
        draft.remove_by_id(LocalImageId(1));
        draft.append(CapturedImage::new(LocalImageId(3), jpeg_bytes(3)));
        draft.set_title("Something else");

        let submitted = submission.run().await.unwrap();

        assert_eq!(submitted.image_remote_ids, vec![image_id(1), image_id(2)]);
        assert_eq!(assembler.api().created()[0].title, "Monstera cutting");
    }

    #[tokio::test(start_paused = true)]
    async fn test_chosen_thumbnail_is_used() {
        let assembler = assembler(FakeApi::with_images(&[(1, 101), (2, 102), (3, 103)]), 3);
        let mut draft = monstera_draft(3);
        assert!(draft.set_thumbnail(LocalImageId(3)));

        let submitted = assembler.submit(&draft).await.unwrap();

        assert_eq!(submitted.thumbnail, Some(image_id(103)));
        assert_eq!(assembler.api().created()[0].thumbnail, image_id(103));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_further_uploads() {
        let mut api = FakeApi::with_images(&[(1, 1), (2, 2), (3, 3), (4, 4)]);
        for id in 1..=4 {
            api = api.delay(id, 10);
        }
        let assembler = assembler(api, 1);
        let draft = monstera_draft(4);

        let submission = assembler.begin(&draft).unwrap();
        let cancel = submission.cancel_handle();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(15)).await;
            cancel.cancel();
        });

        let err = submission.run().await.unwrap_err();

        assert_eq!(
            err,
            SubmitError::Cancelled {
                orphaned_image_ids: vec![image_id(1)]
            }
        );
        assert_eq!(assembler.api().started(), vec![1, 2]);
        assert_eq!(assembler.api().completed(), vec![1]);
        assert!(assembler.api().created().is_empty());
        assert!(!draft.is_submitting());
    }

    #[tokio::test]
    async fn test_cancel_before_run_uploads_nothing() {
        let assembler = assembler(FakeApi::with_images(&[(1, 1)]), 3);
        let draft = monstera_draft(1);

        let submission = assembler.begin(&draft).unwrap();
        submission.cancel_handle().cancel();
        let err = submission.run().await.unwrap_err();

        assert!(matches!(err, SubmitError::Cancelled { .. }));
        assert!(err.orphaned_image_ids().is_empty());
        assert!(assembler.api().started().is_empty());
    }
}
