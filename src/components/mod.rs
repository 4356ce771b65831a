// ABOUTME: UI components: addressable screen elements and the main layout

pub mod layout;
pub mod page;

pub use layout::LayoutComponent;
pub use page::{Button, Element, InputField, Label, Page};
