pub mod config;
pub mod error;
pub mod logging;
pub mod notifications;
pub mod session;

pub use config::{PriceFeedEntry, StarterConfig, TokenEntry};
pub use error::{ErrorCategory, UserFacing};
pub use notifications::{Notice, NoticeCenter, NoticeVariant};
pub use session::IdentitySession;
