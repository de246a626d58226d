use dioxus::prelude::*;

mod components;
mod config;
mod error;
mod image_processing;
mod services;

use components::{AboutScreen, CreateListingScreen, DiscoverScreen, ListingScreen, NavigationBar};
use config::AppConfig;
use listing_submission::ListingId;
use services::AppServices;

fn main() {
    init_logging();
    dioxus::launch(App);
}

fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("plantswap"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            eprintln!("Logger already initialised: {}", e);
        }
    }
}

/// Screen navigation for the app
#[derive(Clone, PartialEq, Debug)]
pub enum Screen {
    Discover,
    CreateListing,
    About,
    Listing(ListingId),
}

#[component]
fn App() -> Element {
    let services = use_hook(|| {
        AppServices::from_config(AppConfig::load()).map_err(|e| {
            log::error!("Failed to start: {}", e);
            e.user_message()
        })
    });

    match services {
        Ok(services) => rsx! {
            Shell { services }
        },
        Err(message) => rsx! {
            div { style: "padding: 24px; font-family: sans-serif; color: #c33;",
                "⚠️ {message}"
            }
        },
    }
}

#[component]
fn Shell(services: AppServices) -> Element {
    use_context_provider(|| services.clone());
    let mut current_screen = use_signal(|| Screen::CreateListing);

    rsx! {
        div { style: "display: flex; flex-direction: column; height: 100vh; font-family: sans-serif;",

            // Main Content
            div { style: "flex: 1; overflow-y: auto;",
                match current_screen() {
                    Screen::Discover => rsx! {
                        DiscoverScreen { on_navigate: move |s| current_screen.set(s) }
                    },
                    Screen::CreateListing => rsx! {
                        CreateListingScreen { on_navigate: move |s| current_screen.set(s) }
                    },
                    Screen::About => rsx! {
                        AboutScreen {}
                    },
                    Screen::Listing(id) => rsx! {
                        ListingScreen { listing_id: id, on_navigate: move |s| current_screen.set(s) }
                    },
                }
            }

            // Bottom Navigation Bar
            NavigationBar {
                current_screen: current_screen(),
                on_navigate: move |screen| current_screen.set(screen),
            }
        }
    }
}
