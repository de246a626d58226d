use super::image_strip::ImageStrip;
use crate::error::AppError;
use crate::services::AppServices;
use crate::Screen;
use dioxus::prelude::*;
use listing_submission::{
    violations, CancelHandle, CaptureError, CaptureNotice, ImageSource, ListingDraft, ListingType,
};

const LABEL_STYLE: &str =
    "display: block; margin-bottom: 6px; font-weight: 600; color: #333; font-size: 14px;";

#[component]
pub fn CreateListingScreen(on_navigate: EventHandler<Screen>) -> Element {
    let services = use_context::<AppServices>();
    let mut draft = use_signal(ListingDraft::new);
    let mut session = use_signal(|| services.new_capture_session());
    // Some while a submission is running
    let mut running = use_signal(|| None::<CancelHandle>);
    let mut error = use_signal(|| None::<String>);

    let submitting = running.read().is_some();
    let capturing = session.read().is_capturing();
    let problems = violations(&draft.read());
    let notice = session.read().notice().cloned();
    let listing_type = draft.read().listing_type;

    let assembler = services.assembler.clone();
    let submit = move |_: MouseEvent| {
        error.set(None);
        let submission = match assembler.begin(&draft.read()) {
            Ok(submission) => submission,
            Err(e) => {
                error.set(Some(AppError::from(e).user_message()));
                return;
            }
        };
        running.set(Some(submission.cancel_handle()));

        spawn(async move {
            let result = submission.run().await;
            running.set(None);
            match result {
                Ok(listing) => {
                    log::info!(
                        "Listing {} created with {} images",
                        listing.remote_id,
                        listing.image_remote_ids.len()
                    );
                    draft.set(ListingDraft::new());
                    on_navigate.call(Screen::Listing(listing.remote_id));
                }
                Err(e) => {
                    if !e.orphaned_image_ids().is_empty() {
                        log::warn!(
                            "{} uploaded images are not referenced by any listing",
                            e.orphaned_image_ids().len()
                        );
                    }
                    error.set(Some(AppError::from(e).user_message()));
                }
            }
        });
    };

    let images = services.images.clone();
    let take_photo = move |_: MouseEvent| {
        error.set(None);
        session.write().start_capture();
        let images = images.clone();
        spawn(async move {
            let result = images.capture().await;
            let outcome = session.write().on_camera_result(&mut draft.write(), result);
            if let Ok(Some(id)) = outcome {
                log::debug!("Photo {} added to draft", id);
            }
        });
    };

    let images = services.images.clone();
    let pick_photos = move |_: MouseEvent| {
        error.set(None);
        session.write().start_capture();
        let max = session.read().max_gallery_selection();
        let images = images.clone();
        spawn(async move {
            let result = images.pick(max).await;
            let outcome = session.write().on_gallery_result(&mut draft.write(), result);
            if let Err(e @ CaptureError::SelectionTooLarge { .. }) = outcome {
                error.set(Some(AppError::from(e).user_message()));
            }
        });
    };

    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",

            h1 { style: "color: #2e7d32; font-size: 24px; font-weight: 700; margin: 0 0 24px 0;",
                "🌱 New listing"
            }

            if let Some(err) = error() {
                div { style: "background: #fee; border: 1px solid #fcc; color: #c33; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px; white-space: pre-line;",
                    "⚠️ {err}"
                }
            }

            match notice {
                Some(denied @ CaptureNotice::PermissionDenied(_)) => rsx! {
                    div { style: "background: #fff3e0; border: 1px solid #ffcc80; color: #e65100; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px;",
                        "🔒 {denied}"
                    }
                },
                Some(failed @ CaptureNotice::Failed(_)) => rsx! {
                    div { style: "background: #fee; border: 1px solid #fcc; color: #c33; padding: 12px; margin-bottom: 16px; border-radius: 8px; font-size: 14px;",
                        "⚠️ {failed}"
                    }
                },
                None => rsx! {},
            }

            div { class: "card",

                div { style: "margin-bottom: 20px;",
                    label { style: LABEL_STYLE, "Title *" }
                    input {
                        r#type: "text",
                        class: "input",
                        placeholder: "e.g. Monstera cutting",
                        value: draft.read().title.clone(),
                        disabled: submitting,
                        oninput: move |e| draft.write().set_title(e.value()),
                    }
                }

                div { style: "margin-bottom: 20px;",
                    label { style: LABEL_STYLE, "Description" }
                    textarea {
                        class: "input",
                        rows: "4",
                        value: draft.read().description.clone(),
                        disabled: submitting,
                        oninput: move |e| draft.write().set_description(e.value()),
                    }
                }

                div { style: "display: flex; gap: 24px; margin-bottom: 20px;",
                    label { style: "display: flex; align-items: center; gap: 8px; font-size: 14px;",
                        input {
                            r#type: "checkbox",
                            checked: draft.read().tradeable,
                            disabled: submitting,
                            onchange: move |e| draft.write().set_tradeable(e.checked()),
                        }
                        "Tradeable"
                    }
                    label { style: "display: flex; align-items: center; gap: 8px; font-size: 14px;",
                        input {
                            r#type: "checkbox",
                            checked: listing_type == ListingType::Buying,
                            disabled: submitting,
                            onchange: move |e| {
                                let listing_type = if e.checked() {
                                    ListingType::Buying
                                } else {
                                    ListingType::Selling
                                };
                                draft.write().set_listing_type(listing_type);
                            },
                        }
                        "Buying?"
                    }
                }

                div { style: "margin-bottom: 20px;",
                    label { style: LABEL_STYLE, "Photos ({draft.read().image_count()})" }
                    ImageStrip { draft, session, disabled: submitting }

                    div { style: "display: flex; gap: 8px; margin-top: 12px;",
                        button {
                            class: "btn-secondary",
                            style: "flex: 1; padding: 10px; font-size: 14px;",
                            disabled: submitting || capturing,
                            onclick: take_photo,
                            if capturing { "⏳ Waiting…" } else { "📷 Camera" }
                        }
                        button {
                            class: "btn-secondary",
                            style: "flex: 1; padding: 10px; font-size: 14px;",
                            disabled: submitting || capturing,
                            onclick: pick_photos,
                            "🖼️ Gallery"
                        }
                    }
                }

                if !problems.is_empty() {
                    ul { style: "color: #666; font-size: 13px; margin: 0 0 16px 0; padding-left: 20px;",
                        for problem in problems.iter() {
                            li { "{problem}" }
                        }
                    }
                }

                if submitting {
                    div { style: "display: flex; gap: 8px;",
                        div { style: "flex: 1; padding: 12px; text-align: center; color: #2e7d32;",
                            "⏳ Uploading…"
                        }
                        button {
                            class: "btn-secondary",
                            style: "padding: 12px 16px;",
                            onclick: move |_| {
                                if let Some(handle) = running.read().as_ref() {
                                    log::info!("Cancelling submission");
                                    handle.cancel();
                                }
                            },
                            "Cancel"
                        }
                    }
                } else {
                    button {
                        class: "btn-primary",
                        style: "width: 100%; padding: 12px; font-size: 16px;",
                        disabled: !problems.is_empty(),
                        onclick: submit,
                        "✅ Publish listing"
                    }
                }
            }
        }
    }
}
