use crate::error::AppError;
use crate::services::AppServices;
use crate::Screen;
use dioxus::prelude::*;
use listing_submission::{ListingApi, ListingId};

#[component]
pub fn ListingScreen(listing_id: ListingId, on_navigate: EventHandler<Screen>) -> Element {
    let services = use_context::<AppServices>();
    let listing = use_resource(use_reactive!(|(listing_id,)| {
        let api = services.api.clone();
        async move { api.get_listing(listing_id).await }
    }));

    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",

            div { style: "display: flex; align-items: center; margin-bottom: 24px;",
                button {
                    class: "btn-secondary",
                    style: "margin-right: 12px; padding: 8px 16px;",
                    onclick: move |_| on_navigate.call(Screen::Discover),
                    "← Back"
                }
            }

            match &*listing.read_unchecked() {
                None => rsx! {
                    div { style: "padding: 24px; text-align: center; color: #666;", "⏳ Loading…" }
                },
                Some(Err(e)) => {
                    let message = AppError::from(e.clone()).user_message();
                    rsx! {
                        div { style: "background: #fee; border: 1px solid #fcc; color: #c33; padding: 12px; border-radius: 8px; font-size: 14px;",
                            "⚠️ {message}"
                        }
                    }
                }
                Some(Ok(None)) => rsx! {
                    div { style: "padding: 24px; text-align: center; color: #999;",
                        "Listing {listing_id} was not found."
                    }
                },
                Some(Ok(Some(listing))) => rsx! {
                    div { class: "card",
                        h1 { style: "color: #2e7d32; font-size: 24px; font-weight: 700; margin: 0 0 8px 0;",
                            "{listing.title}"
                        }
                        div { style: "font-size: 13px; color: #666; margin-bottom: 16px;",
                            "{listing.listing_type.display_name()}"
                            if listing.tradeable { " · tradeable" }
                            " · "
                            {listing.insertion_date.format("%Y-%m-%d %H:%M").to_string()}
                        }
                        if !listing.description.is_empty() {
                            p { style: "font-size: 15px; color: #333; white-space: pre-line;",
                                "{listing.description}"
                            }
                        }
                    }
                },
            }
        }
    }
}
