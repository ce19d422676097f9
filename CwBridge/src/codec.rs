//! REL and YMT conversions on top of the bridge
//!
//! [`AssetCodec`] is the seam the conversion pipeline drives.
//! [`NativeCodec`] implements it by calling into `CodeWalker.Core`; every
//! member it needs is resolved once, in [`NativeCodec::bind`].
#![allow(unsafe_code)]

use std::fmt;

use crate::abi::{ConstructFn, EmitFn, FromXmlFn, LastErrorFn, LoadFn, ReleaseFn};
use crate::bridge::{LibraryBridge, NamedType, qualified_name};
use crate::error::{Error, Result};
use crate::invoker::{self, Diagnostics, Instance, Member};
use crate::xml::XmlDocument;

/// Member names shared by both resource types.
const CONSTRUCTOR: &str = "new";
const RELEASE: &str = "free";
const LOAD: &str = "Load";
const SAVE: &str = "Save";
const RENDER: &str = "GetXml";

/// Type and member carrying diagnostics for failed calls.
const INTEROP_TYPE: &str = "Interop";
const LAST_ERROR: &str = "LastError";

/// The two packed resource formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// Relationship resource (`.rel`).
    Rel,
    /// Meta template (`.ymt`), via its PSO XML projection.
    Ymt,
}

impl AssetFormat {
    /// All supported formats.
    pub const ALL: [Self; 2] = [Self::Rel, Self::Ymt];

    /// Get the short name of this format
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Rel => "rel",
            Self::Ymt => "ymt",
        }
    }

    /// Suffix of packed files.
    #[must_use]
    pub fn binary_suffix(self) -> &'static str {
        match self {
            Self::Rel => ".rel",
            Self::Ymt => ".ymt",
        }
    }

    /// Suffix of XML files; always the binary suffix plus [`xml_projection`](Self::xml_projection).
    #[must_use]
    pub fn xml_suffix(self) -> &'static str {
        match self {
            Self::Rel => ".rel.xml",
            Self::Ymt => ".ymt.pso.xml",
        }
    }

    /// What turns a binary file name into its XML file name.
    #[must_use]
    pub fn xml_projection(self) -> &'static str {
        match self {
            Self::Rel => ".xml",
            Self::Ymt => ".pso.xml",
        }
    }

    /// Resource type (`new`, `Load`, `Save`, `free`).
    #[must_use]
    pub fn resource_type(self) -> &'static str {
        match self {
            Self::Rel => "GameFiles.RelFile",
            Self::Ymt => "GameFiles.PsoFile",
        }
    }

    /// Type holding the static XML factory.
    #[must_use]
    pub fn parser_type(self) -> &'static str {
        match self {
            Self::Rel => "GameFiles.XmlRel",
            Self::Ymt => "GameFiles.XmlPso",
        }
    }

    /// Name of the static XML factory.
    #[must_use]
    pub fn parser_member(self) -> &'static str {
        match self {
            Self::Rel => "GetRel",
            Self::Ymt => "GetPso",
        }
    }

    /// Type holding the static XML renderer.
    #[must_use]
    pub fn renderer_type(self) -> &'static str {
        match self {
            Self::Rel => "GameFiles.RelXml",
            Self::Ymt => "GameFiles.PsoXml",
        }
    }
}

impl fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which way a conversion goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// XML source → packed binary.
    ToBinary,
    /// Packed binary → XML.
    ToXml,
}

/// One of the four named conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conversion {
    pub format: AssetFormat,
    pub direction: Direction,
}

impl Conversion {
    #[must_use]
    pub fn new(format: AssetFormat, direction: Direction) -> Self {
        Self { format, direction }
    }

    /// Suffix of the files this conversion consumes.
    #[must_use]
    pub fn source_suffix(self) -> &'static str {
        match self.direction {
            Direction::ToBinary => self.format.xml_suffix(),
            Direction::ToXml => self.format.binary_suffix(),
        }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::ToBinary => write!(f, "XML -> {}", self.format.as_str().to_uppercase()),
            Direction::ToXml => write!(f, "{} -> XML", self.format.as_str().to_uppercase()),
        }
    }
}

/// The operations the conversion pipeline needs from a codec.
pub trait AssetCodec {
    /// Confirm `conversion` can be performed at all.
    ///
    /// Called once per batch before any file is touched; an error here is
    /// about the codec, never about an input file.
    fn check(&self, conversion: Conversion) -> Result<()>;

    /// Parse-and-pack: XML document → packed bytes.
    fn xml_to_binary(&self, format: AssetFormat, document: &XmlDocument) -> Result<Vec<u8>>;

    /// Load-and-render: packed bytes → XML text.
    fn binary_to_xml(&self, format: AssetFormat, data: &[u8]) -> Result<String>;
}

/// Resolved members for one format.
#[derive(Debug)]
struct FormatBindings<'lib> {
    from_xml: Member<'lib, FromXmlFn>,
    save: Member<'lib, EmitFn>,
    release: Option<Member<'lib, ReleaseFn>>,
    reader: std::result::Result<ReaderBindings<'lib>, MissingSurface>,
}

/// Members only the binary → XML direction uses.
#[derive(Debug)]
struct ReaderBindings<'lib> {
    construct: Member<'lib, ConstructFn>,
    load: Member<'lib, LoadFn>,
    render: Member<'lib, EmitFn>,
}

/// First member found missing while binding an optional surface.
#[derive(Debug, Clone)]
enum MissingSurface {
    Type(String),
    Member { type_name: String, member: String },
}

impl From<&MissingSurface> for Error {
    fn from(missing: &MissingSurface) -> Self {
        match missing.clone() {
            MissingSurface::Type(type_name) => Error::TypeNotFound { type_name },
            MissingSurface::Member { type_name, member } => {
                Error::MemberNotFound { type_name, member }
            }
        }
    }
}

impl From<Error> for MissingSurface {
    fn from(err: Error) -> Self {
        match err {
            Error::MemberNotFound { type_name, member } => Self::Member { type_name, member },
            Error::TypeNotFound { type_name } => Self::Type(type_name),
            other => Self::Type(other.to_string()),
        }
    }
}

impl<'lib> FormatBindings<'lib> {
    fn bind(bridge: &'lib LibraryBridge, format: AssetFormat) -> Result<Self> {
        let resource = bridge.require_type(format.resource_type())?;
        let parser = bridge.require_type(format.parser_type())?;

        // SAFETY: each member is resolved with the signature the component
        // contract assigns to it (see `crate::abi`).
        let (from_xml, save, release) = unsafe {
            (
                parser.require_member::<FromXmlFn>(format.parser_member())?,
                resource.require_member::<EmitFn>(SAVE)?,
                resource.member::<ReleaseFn>(RELEASE),
            )
        };
        if release.is_none() {
            tracing::debug!(
                "{} has no {RELEASE} member; instances stay with the component",
                resource.full_name()
            );
        }

        let reader = ReaderBindings::bind(bridge, &resource, format).map_err(MissingSurface::from);
        if let Err(missing) = &reader {
            tracing::debug!("{format} -> XML unavailable: {}", Error::from(missing));
        }

        Ok(Self {
            from_xml,
            save,
            release,
            reader,
        })
    }
}

impl<'lib> ReaderBindings<'lib> {
    fn bind(
        bridge: &'lib LibraryBridge,
        resource: &NamedType<'lib>,
        format: AssetFormat,
    ) -> Result<Self> {
        let renderer = bridge.require_type(format.renderer_type())?;
        // SAFETY: signatures per the component contract.
        unsafe {
            Ok(Self {
                construct: resource.require_member::<ConstructFn>(CONSTRUCTOR)?,
                load: resource.require_member::<LoadFn>(LOAD)?,
                render: renderer.require_member::<EmitFn>(RENDER)?,
            })
        }
    }
}

/// [`AssetCodec`] backed by the loaded `CodeWalker.Core` component.
#[derive(Debug)]
pub struct NativeCodec<'lib> {
    rel: FormatBindings<'lib>,
    ymt: FormatBindings<'lib>,
    diagnostics: Diagnostics<'lib>,
}

impl<'lib> NativeCodec<'lib> {
    /// Resolve every member the conversions use.
    ///
    /// # Errors
    /// `TypeNotFound` / `MemberNotFound` if the XML → binary surface of
    /// either format is missing. The binary → XML surface is optional here
    /// and reported by [`AssetCodec::check`] instead.
    pub fn bind(bridge: &'lib LibraryBridge) -> Result<Self> {
        let rel = FormatBindings::bind(bridge, AssetFormat::Rel)?;
        let ymt = FormatBindings::bind(bridge, AssetFormat::Ymt)?;

        let last_error = bridge
            .lookup_type(INTEROP_TYPE)
            // SAFETY: signature per the component contract.
            .and_then(|interop| unsafe { interop.member::<LastErrorFn>(LAST_ERROR) });

        tracing::info!("Bound {} from {}", qualified_name("GameFiles"), bridge.root().display());
        Ok(Self {
            rel,
            ymt,
            diagnostics: Diagnostics::new(last_error),
        })
    }

    fn bindings(&self, format: AssetFormat) -> &FormatBindings<'lib> {
        match format {
            AssetFormat::Rel => &self.rel,
            AssetFormat::Ymt => &self.ymt,
        }
    }

    fn reader(&self, format: AssetFormat) -> Result<&ReaderBindings<'lib>> {
        self.bindings(format).reader.as_ref().map_err(Error::from)
    }

    /// Parse a document into a resource object.
    pub fn parse_from_xml(&self, format: AssetFormat, document: &XmlDocument) -> Result<Instance<'lib>> {
        let bindings = self.bindings(format);
        invoker::parse_from_xml(
            &bindings.from_xml,
            document,
            format.resource_type(),
            bindings.release.as_ref(),
            &self.diagnostics,
        )
    }

    /// Construct an empty resource object and load packed bytes into it.
    pub fn load(&self, format: AssetFormat, data: &[u8]) -> Result<Instance<'lib>> {
        let bindings = self.bindings(format);
        let reader = self.reader(format)?;
        let mut instance =
            invoker::construct(&reader.construct, bindings.release.as_ref(), &self.diagnostics)?;
        instance.load(&reader.load, data, &self.diagnostics)?;
        Ok(instance)
    }

    /// Serialize a resource object to packed bytes.
    pub fn serialize(&self, format: AssetFormat, instance: &Instance<'lib>) -> Result<Vec<u8>> {
        instance.serialize(&self.bindings(format).save, &self.diagnostics)
    }

    /// Render a resource object as XML text.
    pub fn render_to_xml(&self, format: AssetFormat, instance: &Instance<'lib>) -> Result<String> {
        let reader = self.reader(format)?;
        invoker::render_to_xml(&reader.render, instance, &self.diagnostics)
    }
}

impl AssetCodec for NativeCodec<'_> {
    fn check(&self, conversion: Conversion) -> Result<()> {
        match conversion.direction {
            Direction::ToBinary => Ok(()),
            Direction::ToXml => self.reader(conversion.format).map(|_| ()),
        }
    }

    fn xml_to_binary(&self, format: AssetFormat, document: &XmlDocument) -> Result<Vec<u8>> {
        let instance = self.parse_from_xml(format, document)?;
        self.serialize(format, &instance)
    }

    fn binary_to_xml(&self, format: AssetFormat, data: &[u8]) -> Result<String> {
        let instance = self.load(format, data)?;
        self.render_to_xml(format, &instance)
    }
}
