use dioxus::prelude::*;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[component]
pub fn AboutScreen() -> Element {
    rsx! {
        div { style: "padding: 16px; max-width: 600px; margin: 0 auto; min-height: 100vh; background: #f5f5f5;",
            h1 { style: "color: #2e7d32; font-size: 24px; font-weight: 700; margin: 0 0 16px 0;",
                "ℹ️ About PlantSwap"
            }
            div { class: "card",
                p { style: "font-size: 15px; color: #333;",
                    "PlantSwap lets you offer plants and cuttings or find the ones you are looking for."
                }
                p { style: "font-size: 13px; color: #666;",
                    "Version {VERSION}"
                }
            }
        }
    }
}
