pub mod format;
pub mod telegram;

pub use format::format_listing;
pub use telegram::{Notifier, TelegramNotifier};
