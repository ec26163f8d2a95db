//! Generic syntax tree handed to analysis rules.
//!
//! The tree is produced by a conversion step over the compiler's native
//! tree. Nodes keep an optional [`NativeRef`] back to the native node they
//! were built from; the conversion does not always provide one, which is why
//! the bridge carries a locator that recovers it from the enclosing scopes.

pub mod ast;

pub use ast::{AstNode, FileAst, Meta, NativeRef};

#[cfg(test)]
mod tests;
