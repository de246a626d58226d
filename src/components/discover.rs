use crate::error::AppError;
use crate::services::AppServices;
use crate::Screen;
use dioxus::prelude::*;
use listing_submission::{ListingApi, ListingType};

#[component]
pub fn DiscoverScreen(on_navigate: EventHandler<Screen>) -> Element {
    let services = use_context::<AppServices>();
    let mut listings = use_resource(move || {
        let api = services.api.clone();
        async move {
            api.list_listings()
                .await
                .inspect_err(|e| log::warn!("Loading listings failed: {}", e))
        }
    });

    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",

            // Header
            div { style: "display: flex; justify-content: space-between; align-items: center; margin-bottom: 12px; padding-top: 8px;",
                h1 { style: "color: #2e7d32; margin: 0; font-size: 24px; font-weight: 700;",
                    "🔍 Discover"
                }
                button {
                    class: "btn-secondary",
                    style: "padding: 8px 12px;",
                    onclick: move |_| listings.restart(),
                    "🔄"
                }
            }

            match &*listings.read_unchecked() {
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
                Some(Ok(list)) if list.is_empty() => rsx! {
                    div { style: "padding: 24px; text-align: center; color: #999;", "No listings yet" }
                },
                Some(Ok(list)) => rsx! {
                    for listing in list.iter().rev() {
                        div {
                            key: "{listing.id}",
                            class: "card",
                            style: "margin-bottom: 12px; cursor: pointer;",
                            onclick: {
                                let id = listing.id;
                                move |_| on_navigate.call(Screen::Listing(id))
                            },
                            div { style: "display: flex; justify-content: space-between; align-items: center;",
                                div { style: "font-size: 16px; font-weight: 600; color: #333;", "{listing.title}" }
                                span {
                                    style: if listing.listing_type == ListingType::Buying {
                                        "font-size: 12px; padding: 2px 8px; border-radius: 12px; background: #e3f2fd; color: #0066cc;"
                                    } else {
                                        "font-size: 12px; padding: 2px 8px; border-radius: 12px; background: #e8f5e9; color: #2e7d32;"
                                    },
                                    "{listing.listing_type.display_name()}"
                                }
                            }
                            div { style: "font-size: 12px; color: #999; margin-top: 4px;",
                                {listing.insertion_date.format("%Y-%m-%d %H:%M").to_string()}
                                if listing.tradeable { " · tradeable" }
                            }
                        }
                    }
                },
            }
        }
    }
}
