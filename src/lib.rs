//! Core library for the garden-tools command line application.
//!
//! The library reconciles a local gardening diary with a remote table. IO
//! adapters (diary snapshot, remote cache file, table service client) live
//! under [`garden::tools::io`], data representations inside
//! [`garden::tools::model`], tag decoding in [`garden::tools::tag`], the diff
//! and apply logic in [`garden::tools::reconcile`], and run orchestration
//! under [`garden::tools::sync`].

pub mod garden;

pub use garden::tools::{
    Result, ToolError, catalogue, config, error, fetch, io, logging, model, reconcile, sync, tag,
};
