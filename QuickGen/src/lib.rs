//! # QuickGen
//!
//! Batch conversion between CodeWalker XML and packed GTA V resources.
//!
//! - `*.rel.xml` → `*.rel` (and back)
//! - `*.ymt.pso.xml` → `*.ymt` (and back)
//!
//! The codecs themselves live in the external `CodeWalker.Core` component,
//! reached through [`cwbridge`]. This crate finds the component, walks the
//! source tree, and drives one [`AssetCodec`](cwbridge::codec::AssetCodec)
//! call per file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use cwbridge::prelude::*;
//! use quickgen::pipeline::{self, BatchRequest};
//!
//! let bridge = LibraryBridge::open("/opt/codewalker")?;
//! let codec = NativeCodec::bind(&bridge)?;
//!
//! let request = BatchRequest {
//!     conversion: Conversion::new(AssetFormat::Rel, Direction::ToBinary),
//!     source_dir: "xml/".into(),
//!     target_dir: "out/".into(),
//! };
//! let report = pipeline::run(&codec, &request, |_| {})?;
//! println!("{} converted, {} failed", report.converted.len(), report.failed.len());
//! # Ok::<(), quickgen::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `quickgen` command-line binary

pub mod config;
pub mod error;
pub mod pipeline;

// Re-exports for convenience
pub use error::{Error, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
