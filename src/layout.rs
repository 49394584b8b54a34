//! Layout compiler
//!
//! A layout file describes, section by section, the rectangles of a form that hold
//! data. This module reads such a file ([`source`]), parses the `rows`/`columns`
//! grammar ([`range`]) and compiles everything into a [`Layout`] of
//! [`GroupDescriptor`]s ([`compiler`]).
//!
//! ```text
//! [Items]
//! kind = table
//! page = 1
//! up-left = 40,300
//! down-right = 560,700
//! rows = R01-20
//! columns = Code :120: Desc :420: Qty(int) :480: Price(float)
//! group = Items
//! result = row_dict(Items)
//! stop-at = Code==TOTAL
//! ```

pub mod compiler;
pub mod descriptor;
pub mod kind;
pub mod range;
pub mod source;

pub use compiler::{compile_layout, compile_section, Compiled, Layout};
pub use descriptor::{
    BBox, FieldDescriptor, GroupDescriptor, GroupKind, Priority, ResultShape, Trigger,
};
pub use kind::FieldKind;
pub use source::{LayoutSource, Section};
