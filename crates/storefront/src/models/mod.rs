//! Types the storefront keeps in the session and renders as JSON.

pub mod session;
pub mod view;

pub use session::{Flash, FlashKind};
pub use view::{CartView, View};
