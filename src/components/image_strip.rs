use crate::image_processing::image_to_data_url;
use dioxus::prelude::*;
use listing_submission::{CaptureSession, ListingDraft, LocalImageId};

/// Captured images of a draft in order, with remove and thumbnail buttons
#[component]
pub fn ImageStrip(
    draft: Signal<ListingDraft>,
    session: Signal<CaptureSession>,
    disabled: bool,
) -> Element {
    let (items, thumbnail) = {
        let d = draft.read();
        let thumbnail = d
            .thumbnail()
            .or_else(|| d.images().next().map(|image| image.local_id));
        let items: Vec<(LocalImageId, Option<String>)> = d
            .images()
            .map(|image| match image_to_data_url(image) {
                Ok(url) => (image.local_id, Some(url)),
                Err(e) => {
                    log::warn!("No preview for image {}: {}", image.local_id, e);
                    (image.local_id, None)
                }
            })
            .collect();
        (items, thumbnail)
    };

    if items.is_empty() {
        return rsx! {
            div { style: "width: 100%; height: 120px; border: 2px dashed #ccc; border-radius: 8px; display: flex; align-items: center; justify-content: center; color: #999; font-size: 14px;",
                "No photos yet"
            }
        };
    }

    rsx! {
        div { style: "display: flex; gap: 8px; overflow-x: auto; padding-bottom: 4px;",
            for (id, preview) in items {
                div {
                    key: "{id.0}",
                    style: if thumbnail == Some(id) {
                        "flex: 0 0 auto; width: 96px; border: 3px solid #2e7d32; border-radius: 8px; overflow: hidden; background: #fff;"
                    } else {
                        "flex: 0 0 auto; width: 96px; border: 3px solid transparent; border-radius: 8px; overflow: hidden; background: #fff;"
                    },

                    if let Some(url) = preview {
                        img { src: "{url}", style: "width: 96px; height: 96px; object-fit: cover; display: block;" }
                    } else {
                        div { style: "width: 96px; height: 96px; background: #ddd; display: flex; align-items: center; justify-content: center; font-size: 32px;",
                            "📷"
                        }
                    }

                    div { style: "display: flex;",
                        button {
                            style: "flex: 1; padding: 4px; border: none; background: #f0f0f0; cursor: pointer;",
                            title: "Use as thumbnail",
                            disabled,
                            onclick: move |_| {
                                draft.write().set_thumbnail(id);
                            },
                            if thumbnail == Some(id) { "★" } else { "☆" }
                        }
                        button {
                            style: "flex: 1; padding: 4px; border: none; background: #f0f0f0; cursor: pointer;",
                            title: "Remove",
                            disabled,
                            onclick: move |_| {
                                session.write().remove(&mut draft.write(), id);
                            },
                            "🗑️"
                        }
                    }
                }
            }
        }
    }
}
