//! Cube data extraction.
//!
//! An [`ExtractSpec`] names member selections per dimension. [`AxisAssigner`] places the
//! dimensions on query axes, [`ResolvedExtract::resolve`] expands the selections against the
//! cube's [`Outline`](cube_outline::Outline), and [`QueryCompiler`] renders MDX, calc-script or
//! report-script text. MDX result grids are turned into delimited rows by [`ResultDecoder`].
//!
//! [`extract`] runs the whole pipeline against a [`CubeSession`].

mod axis;
mod calc;
mod compiler;
mod config;
mod decoder;
mod error;
mod extract;
mod mdx;
mod report;
mod session;
mod spec;
mod writer;

pub use crate::axis::{Axis, AxisAssigner, AxisAssignment, AxisPlan, ResolvedExtract};
pub use crate::compiler::{
    check_backend, CompiledQuery, PartitionChunk, PerformanceWarning, QueryCompiler, QueryPlan,
};
pub use crate::config::{Backend, ExtractOptions, HeaderStyle, PartitionOptions};
pub use crate::decoder::{DecodeOptions, Field, OutputRow, ResultDecoder, RowKind};
pub use crate::error::{ExtractError, ExtractResult};
pub use crate::extract::{extract, plan_extract};
pub use crate::session::{
    Cell, CubeSession, GridAxis, GridGuard, QueryDialect, QueryResponse, ResultGrid,
};
pub use crate::spec::{AxisSpec, DimensionSelection, ExtractSpec, FlatSpec};
pub use crate::writer::{format_field, write_query_file, RowWriter};
