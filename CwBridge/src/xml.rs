//! XML documents handed to the component's factories
//!
//! The component receives document text, but only after it has been parsed
//! here: a file that is not well-formed XML is rejected as a per-file error
//! before any foreign code runs.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};

const BOM: char = '\u{feff}';
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// A parsed, well-formed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    text: String,
    root: Option<String>,
}

impl XmlDocument {
    /// Parse `content`.
    ///
    /// Empty (or whitespace-only) content yields the empty document.
    /// Anything else must have exactly one root element with balanced tags.
    pub fn parse(content: &str) -> Result<Self> {
        let text = content.strip_prefix(BOM).unwrap_or(content);
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }

        let root = scan_root(text)?;
        Ok(Self {
            text: text.to_string(),
            root: Some(root),
        })
    }

    /// Parse raw file bytes.
    ///
    /// UTF-16 text is recognised by its byte order mark; everything else is
    /// read as UTF-8.
    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        let text = if let Some(rest) = data.strip_prefix(&UTF16_LE_BOM) {
            decode_utf16(rest, u16::from_le_bytes)?
        } else if let Some(rest) = data.strip_prefix(&UTF16_BE_BOM) {
            decode_utf16(rest, u16::from_be_bytes)?
        } else {
            String::from_utf8(data.to_vec())?
        };
        Self::parse(&text)
    }

    /// The document with no content.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            root: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Name of the root element (`Dat151`, `CMapTypes`, ...).
    #[must_use]
    pub fn root_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// Document text, without a byte order mark.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Walk the whole document, returning the root element's name.
fn scan_root(text: &str) -> Result<String> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(false);

    let mut root: Option<String> = None;
    let mut depth: usize = 0;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| Error::MalformedXml(format!("{e} at byte {position}")))?;
        match event {
            Event::Start(e) => {
                if depth == 0 {
                    open_root(&mut root, e.name().as_ref(), position)?;
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if depth == 0 {
                    open_root(&mut root, e.name().as_ref(), position)?;
                }
            }
            Event::End(_) => {
                // Mismatched names are caught by the reader itself.
                depth = depth.saturating_sub(1);
            }
            Event::Text(e) if depth == 0 => {
                if !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(Error::MalformedXml(format!(
                        "text outside the root element at byte {position}"
                    )));
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err(Error::MalformedXml(format!(
                    "CDATA outside the root element at byte {position}"
                )));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 {
        return Err(Error::MalformedXml(format!(
            "unexpected end of document: {depth} element(s) left open"
        )));
    }
    root.ok_or_else(|| Error::MalformedXml("root element is missing".to_string()))
}

fn decode_utf16(data: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if data.len() % 2 != 0 {
        return Err(Error::MalformedXml(format!(
            "UTF-16 text has an odd length ({} bytes)",
            data.len()
        )));
    }
    let units: Vec<u16> = data.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect();
    String::from_utf16(&units).map_err(|e| Error::MalformedXml(format!("invalid UTF-16 text: {e}")))
}

fn open_root(root: &mut Option<String>, name: &[u8], position: usize) -> Result<()> {
    if let Some(existing) = root {
        return Err(Error::MalformedXml(format!(
            "second root element after <{existing}> at byte {position}"
        )));
    }
    *root = Some(String::from_utf8_lossy(name).into_owned());
    Ok(())
}
