//! Overlay primitives mounted by the notifier. Page content itself is server-rendered.

pub mod alert;
pub mod button;
pub mod card;

pub use alert::*;
pub use button::*;
pub use card::*;
