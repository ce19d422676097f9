//! # CwBridge
//!
//! Runtime bridge to the `CodeWalker.Core` component, the external library
//! that implements the REL and YMT codecs. Nothing is linked at build time:
//! the component is located and loaded from a configured directory, its
//! types and members are looked up by name, and the conversions are driven
//! through the typed wrappers in [`invoker`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use cwbridge::prelude::*;
//!
//! let bridge = LibraryBridge::open("/opt/codewalker")?;
//! let codec = NativeCodec::bind(&bridge)?;
//!
//! let document = XmlDocument::parse(&std::fs::read_to_string("dlc.rel.xml")?)?;
//! let packed = codec.xml_to_binary(AssetFormat::Rel, &document)?;
//! std::fs::write("dlc.rel", packed)?;
//! # Ok::<(), cwbridge::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`resolver`] - allow-listed loading of the component's sibling dependencies
//! - [`bridge`] - verification, loading, and type lookup
//! - [`invoker`] - typed member calls and owned component objects
//! - [`codec`] - the four conversions behind the [`AssetCodec`](codec::AssetCodec) trait

pub mod abi;
pub mod bridge;
pub mod codec;
pub mod error;
pub mod invoker;
pub mod resolver;
pub mod xml;

// Re-exports for convenience
pub use error::{Error, PathProblem, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::bridge::{
        COMPONENT_NAME, LibraryBridge, NamedType, component_file_name, inspect_path, verify_path,
    };
    pub use crate::codec::{AssetCodec, AssetFormat, Conversion, Direction, NativeCodec};
    pub use crate::error::{Error, PathProblem, Result};
    pub use crate::resolver::{AllowList, DependencyResolver};
    pub use crate::xml::XmlDocument;
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
