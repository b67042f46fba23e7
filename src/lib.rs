//! Core library for the fabric-recon command line application.
//!
//! Collected fabric object-class tables (one workbook sheet per class) are
//! reconciled into derived relational tables. DNs are decomposed into key
//! fields by [`dn`], compact port and node ranges are expanded by [`range`],
//! raw tables are normalized by [`normalize`] and combined by [`join`]. The
//! fixed output workbooks are assembled in [`pipeline`], while [`analysis`]
//! and [`merge`] orchestrate workbook IO through [`io`].

pub mod analysis;
pub mod config;
pub mod dn;
pub mod error;
pub mod io;
pub mod join;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod range;
pub mod subnet;

pub use error::{RangeError, Result, ToolError};
