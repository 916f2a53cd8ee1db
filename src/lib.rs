//! Core library for the lca-sheets command line application.
//!
//! The library turns spreadsheet process definitions into parameters and
//! activities of an LCA modelling framework. Workbook and database adapters
//! live under [`lca::sheets::io`], the sheet and parameter representations in
//! [`lca::sheets::model`], the framework seam in [`lca::sheets::framework`],
//! and the builders (`params`, `activities`, `foreground`) are driven by
//! [`lca::sheets::pipeline`].

pub mod lca;

pub use lca::sheets::{
    IngestError, Result, activities, error, expr, foreground, framework, io, model, outcome,
    params, pipeline, registry, resolve,
};
