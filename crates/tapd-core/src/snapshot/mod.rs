//! UI snapshot canonicalization
//!
//! Two structurally incompatible accessibility dumps (a nested JSON
//! object graph on iOS, attribute-laden XML on Android) become one
//! canonical element model with stable per-snapshot ref handles.
//!
//! # Components
//! - `ios` / `android`: pure per-platform parsers producing pre-canonical
//!   elements in visit order
//! - `builder`: ref assignment, tree rendering, snapshot metadata

mod android;
mod builder;
mod ios;

pub use android::parse_android_dump;
pub use builder::{build_snapshot, render_tree};
pub use ios::parse_ios_dump;
