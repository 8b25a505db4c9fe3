//! Board definition loading

pub mod layout;

pub use layout::{generate, LayoutLoader};
