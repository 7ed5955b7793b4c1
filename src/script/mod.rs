//! Extraction-script compiler and interpreter
//!
//! A script is a short line-oriented program describing how to condense a
//! decoded beacon frame into one fingerprint string. The [`Compiler`] turns
//! the script text into an [`ExecutableTree`], which is built once and then
//! evaluated read-only against every captured frame.

pub mod compiler;
pub mod tree;

pub use compiler::Compiler;
pub use tree::{ExecutableTree, FunctionKind, Node};
