//! Dimension hierarchies of an OLAP cube outline and the member-selection language used to pick
//! members out of them.
//!
//! A [`Dimension`] is built once per refresh from the engine's traversal stream by a
//! [`DimensionBuilder`]; [`MemberExpander`] turns selection strings such as `"Product.Level0"` or
//! `["Market.Children", "-East"]` into ordered member lists.

mod builder;
mod error;
mod expand;
mod model;
mod native;
mod outline;
mod relations;
pub mod spec;

pub use crate::builder::DimensionBuilder;
pub use crate::error::{OutlineError, OutlineResult};
pub use crate::expand::{ExpandOptions, MemberExpander};
pub use crate::model::{
    Consolidation, Dimension, DimensionInfo, DimensionStorage, DimensionTag, Member, MemberId,
    ShareOption,
};
pub use crate::native::{MemberQueryRow, MemberRecord, MemberSource, NativeError, NativeResult};
pub use crate::outline::Outline;
pub use crate::relations::{Depth, Relation};
