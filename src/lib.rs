//! # arrayvault
//!
//! Marshals native values into named, typed arrays of a hierarchical
//! container and back:
//! - Scalars of every fixed-width numeric kind
//! - Sequences, optionally reshaped into multi-dimensional arrays
//! - Records with nested records and variable-length sequence fields
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Archive                               │
//! │            (container lifecycle, put / get)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Marshaler  │          │ Unmarshaler │
//!   │ (put path)  │          │ (get path)  │
//!   └──────┬──────┘          └──────┬──────┘
//!          │   ObjectNode trees     │
//!          └────────────┬───────────┘
//!                       ▼
//!               ┌──────────────┐
//!               │  ArrayStore  │
//!               │ (MemoryStore │──► container file
//!               │   + handles) │
//!               └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use arrayvault::{record, Archive};
//!
//! record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Reading {
//!         pub station: i32,
//!         pub samples: Vec<f64>,
//!     }
//! }
//!
//! let archive = Archive::in_memory();
//! let reading = Reading { station: 7, samples: vec![0.5, 1.5] };
//! archive.put("reading", &reading).unwrap();
//!
//! let mut out = Reading::default();
//! archive.get("reading", &mut out).unwrap();
//! assert_eq!(out, reading);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod types;
pub mod value;
pub mod record;
pub mod object;
pub mod store;
pub mod marshal;
pub mod archive;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{MarshalError, Result};
pub use config::{Config, OpenMode};
pub use types::{type_map, ElementType, Kind, TypeClass, TypeDescriptor};
pub use value::{Marshal, Target, Unmarshal, View};
pub use store::{ArrayStore, MemoryStore};
pub use marshal::{Marshaler, Unmarshaler};
pub use archive::Archive;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of arrayvault
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
