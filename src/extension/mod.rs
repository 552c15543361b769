//! Composite metadata / extension codec (§4.2, component 3 of the core).
pub mod composite_metadata;
pub mod extension_item;
pub mod mime;

pub use composite_metadata::{CompositeMetadata, CompositeMetadataEntry, Mime};
pub use extension_item::ExtensionItem;
