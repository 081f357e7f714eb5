pub mod category;
pub mod item;
pub mod source;

pub use category::{Category, CategoryFilter};
pub use item::CanonicalItem;
pub use source::{AdapterKind, SourceDescriptor};
