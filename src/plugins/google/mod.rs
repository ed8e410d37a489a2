pub mod ads;
pub mod analytics;
pub mod client;
pub mod search_console;

pub use ads::GoogleAds;
pub use analytics::GoogleAnalytics4;
pub use search_console::GoogleSearchConsole;
