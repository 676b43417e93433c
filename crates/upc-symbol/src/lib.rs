//! Upgrade Precheck Symbol System
//!
//! Lowers Go source files into a small expression model and resolves named
//! constants to literal values.
//!
//! # Overview
//!
//! - **GoSource**: declarations, composite literals and struct tags of one file,
//!   produced by tree-sitter or, when the file does not parse, by a lexical scanner
//! - **Expr**: the lowered expression model shared by both parse paths
//! - **SymbolTable**: frozen `name → literal` map built once per source tree
//!
//! # Example
//!
//! ```rust
//! use upc_symbol::{GoSource, Literal, SymbolTableBuilder};
//!
//! let source = GoSource::parse(r#"
//! package vardef
//!
//! const (
//!     TiDBEnableFoo = "tidb_enable_foo"
//!     DefMaxChunk   = 1024
//! )
//! "#);
//!
//! let mut builder = SymbolTableBuilder::new();
//! builder.add_source(&source);
//! let table = builder.build();
//!
//! assert_eq!(table.lookup("DefMaxChunk"), Some(&Literal::Int(1024)));
//! assert!(table.lookup("Missing").is_none());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod expr;
mod go;
mod scan;
pub mod source;
pub mod table;

// Re-exports
pub use error::{SymbolError, SymbolResult};
pub use expr::{CompositeLiteral, Expr, Field, Literal, DEFAULT_FORMATTING_CALLS};
pub use source::{GoSource, ParseMode, StructTags, ValueDecl};
pub use table::{SymbolTable, SymbolTableBuilder};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for symbol operations
    pub use crate::{
        CompositeLiteral, Expr, Field, GoSource, Literal, ParseMode, SymbolTable,
        SymbolTableBuilder,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
