//! SQL-to-document-query compatibility layer.

pub mod ast;
mod lexer;
mod parser;
mod shim;

pub use shim::{QueryResult, SqlShim};
