use crate::Screen;
use dioxus::prelude::*;

const TAB_STYLE: &str = "flex: 1; padding: 12px; margin: 0 5px; border: none; border-radius: 8px; cursor: pointer; font-size: 14px; text-align: center;";

fn tab_style(active: bool) -> String {
    if active {
        format!("{} background: #2e7d32; color: #ffffff;", TAB_STYLE)
    } else {
        format!("{} background: #ffffff; color: #333;", TAB_STYLE)
    }
}

#[component]
pub fn NavigationBar(current_screen: Screen, on_navigate: EventHandler<Screen>) -> Element {
    let nav_style = "display: flex; justify-content: space-around; padding: 10px; background: #f0f0f0; border-top: 1px solid #ddd;";

    rsx! {
        div {
            style: "{nav_style}",

            button {
                style: tab_style(matches!(current_screen, Screen::Discover | Screen::Listing(_))),
                onclick: move |_| on_navigate.call(Screen::Discover),
                "🔍 Discover"
            }

            button {
                style: tab_style(matches!(current_screen, Screen::CreateListing)),
                onclick: move |_| on_navigate.call(Screen::CreateListing),
                "🌱 New listing"
            }

            button {
                style: tab_style(matches!(current_screen, Screen::About)),
                onclick: move |_| on_navigate.call(Screen::About),
                "ℹ️ About"
            }
        }
    }
}
