//! Conversion jobs: one source file, one output file

use std::fs;
use std::path::{Path, PathBuf};

use cwbridge::codec::{AssetCodec, Conversion, Direction};
use cwbridge::xml::XmlDocument;

use super::discovery::has_suffix;

/// Output file name for `file_name` under `conversion`
///
/// XML → binary drops the XML projection (`a.rel.xml` → `a.rel`,
/// `x.ymt.pso.xml` → `x.ymt`); binary → XML appends it. Returns `None` if
/// the file is not one `conversion` consumes.
pub fn output_name(conversion: Conversion, file_name: &str) -> Option<String> {
    if !has_suffix(file_name, conversion.source_suffix()) {
        return None;
    }

    let projection = conversion.format.xml_projection();
    match conversion.direction {
        Direction::ToBinary => Some(file_name[..file_name.len() - projection.len()].to_string()),
        Direction::ToXml => Some(format!("{file_name}{projection}")),
    }
}

/// One unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub conversion: Conversion,
    /// File being converted
    pub source: PathBuf,
    /// File being written, directly under the target directory
    pub target: PathBuf,
    /// Output file name, used to report the job
    pub name: String,
}

impl ConversionJob {
    /// Plan the job for `source`, or `None` if `conversion` does not apply to it.
    pub fn new(conversion: Conversion, source: PathBuf, target_dir: &Path) -> Option<Self> {
        let file_name = source.file_name()?.to_str()?;
        let name = output_name(conversion, file_name)?;
        Some(Self {
            conversion,
            target: target_dir.join(&name),
            source,
            name,
        })
    }

    /// Read, convert, and write.
    ///
    /// # Errors
    /// Whatever the read, the codec, or the write reports; see
    /// [`cwbridge::Error::is_fatal`] for which of those end a batch.
    pub fn run<C: AssetCodec + ?Sized>(&self, codec: &C) -> cwbridge::Result<()> {
        let format = self.conversion.format;
        let data = fs::read(&self.source)?;

        match self.conversion.direction {
            Direction::ToBinary => {
                let document = XmlDocument::parse_bytes(&data)?;
                tracing::debug!(
                    "Parsed {} (root: {})",
                    self.source.display(),
                    document.root_name().unwrap_or("<empty>")
                );
                let packed = codec.xml_to_binary(format, &document)?;
                fs::write(&self.target, packed)?;
            }
            Direction::ToXml => {
                let xml = codec.binary_to_xml(format, &data)?;
                fs::write(&self.target, xml)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwbridge::codec::AssetFormat;
    use pretty_assertions::assert_eq;

    fn conversion(format: AssetFormat, direction: Direction) -> Conversion {
        Conversion::new(format, direction)
    }

    #[test]
    fn test_output_name_to_binary() {
        let to_rel = conversion(AssetFormat::Rel, Direction::ToBinary);
        assert_eq!(output_name(to_rel, "dlc_heist.rel.xml").as_deref(), Some("dlc_heist.rel"));
        assert_eq!(output_name(to_rel, "Amb.REL.XML").as_deref(), Some("Amb.REL"));
        assert_eq!(output_name(to_rel, "dlc_heist.rel"), None);

        let to_ymt = conversion(AssetFormat::Ymt, Direction::ToBinary);
        assert_eq!(output_name(to_ymt, "mp_m_freemode.ymt.pso.xml").as_deref(), Some("mp_m_freemode.ymt"));
        assert_eq!(output_name(to_ymt, "mp_m_freemode.ymt.xml"), None);
    }

    #[test]
    fn test_output_name_to_xml() {
        let from_rel = conversion(AssetFormat::Rel, Direction::ToXml);
        assert_eq!(output_name(from_rel, "dlc_heist.rel").as_deref(), Some("dlc_heist.rel.xml"));
        assert_eq!(output_name(from_rel, "dlc_heist.rel.xml"), None);

        let from_ymt = conversion(AssetFormat::Ymt, Direction::ToXml);
        assert_eq!(output_name(from_ymt, "x.ymt").as_deref(), Some("x.ymt.pso.xml"));
    }

    #[test]
    fn test_job_is_flat_under_target() {
        let job = ConversionJob::new(
            conversion(AssetFormat::Ymt, Direction::ToBinary),
            PathBuf::from("/src/peds/deep/x.ymt.pso.xml"),
            Path::new("/out"),
        )
        .unwrap();
        assert_eq!(job.target, PathBuf::from("/out/x.ymt"));
        assert_eq!(job.name, "x.ymt");
    }
}
