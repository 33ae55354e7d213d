pub mod cloudinary;
pub mod db;
pub mod google;
pub mod telegram;

pub use cloudinary::CloudinaryAdapter;
pub use db::DbAdapter;
pub use google::GoogleIdentityAdapter;
pub use telegram::TelegramAdapter;
