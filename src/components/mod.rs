mod about;
mod create_listing;
mod discover;
mod image_strip;
mod listing_detail;
mod navigation;

pub use about::AboutScreen;
pub use create_listing::CreateListingScreen;
pub use discover::DiscoverScreen;
pub use listing_detail::ListingScreen;
pub use navigation::NavigationBar;
