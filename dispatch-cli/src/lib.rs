//! Branch dispatch board engine
//!
//! Reads the partner dispatch workbooks from the branch NAS, stores one
//! snapshot per date sheet and serves raw or integrated views of them.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod export;
pub mod share;
pub mod workbook;
