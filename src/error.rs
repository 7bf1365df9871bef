//! Error types for 3MF color import
//!
//! All errors carry an error code for categorization.
//!
//! # Error Codes
//!
//! Error codes follow the pattern: `E<category><number>`
//!
//! Categories:
//! - **E1xxx**: I/O and archive errors
//! - **E2xxx**: XML syntax errors
//! - **E3xxx**: Model and metadata content errors
//! - **E4xxx**: Configuration errors
//! - **E5xxx**: Import control
//!
//! Color resolution never produces an error: unknown filament segments,
//! unresolved filament indices and unpainted triangles all fall back to the
//! magenta sentinel color.

use std::io;
use thiserror::Error;

/// Result type for import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when importing a 3MF package
#[derive(Error, Debug)]
pub enum Error {
    /// IO error occurred while reading the file
    ///
    /// **Error Code**: E1001
    ///
    /// **Common Causes**:
    /// - File not found
    /// - Insufficient permissions
    /// - Disk read error
    #[error("[E1001] I/O error: {0}")]
    Io(#[from] io::Error),

    /// ZIP archive error
    ///
    /// **Error Code**: E1002
    ///
    /// **Common Causes**:
    /// - Corrupted ZIP file
    /// - Missing ZIP signature (not a 3MF package at all)
    /// - Truncated archive
    #[error("[E1002] ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Expected entry is absent from the archive
    ///
    /// **Error Code**: E1003
    ///
    /// Fatal for model entries. The optional `Metadata/slice_info.config`
    /// entry never raises this; its absence yields an empty filament map.
    #[error("[E1003] Missing required file: {0}")]
    MissingFile(String),

    /// Entry name pattern could not be compiled
    ///
    /// **Error Code**: E1004
    #[error("[E1004] Invalid entry pattern: {0}")]
    InvalidPattern(String),

    /// XML parsing error
    ///
    /// **Error Code**: E2001
    #[error("[E2001] XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute syntax error
    ///
    /// **Error Code**: E2002
    #[error("[E2002] XML attribute error: {0}")]
    XmlAttr(String),

    /// Structurally unacceptable XML document
    ///
    /// **Error Code**: E2003
    ///
    /// **Common Causes**:
    /// - Invalid UTF-8 in element or attribute names
    /// - DTD declarations
    #[error("[E2003] Invalid XML structure: {0}")]
    InvalidXml(String),

    /// Required geometry is missing or not numeric
    ///
    /// **Error Code**: E3001
    ///
    /// **Common Causes**:
    /// - `vertex` without x, y or z
    /// - `triangle` without v1, v2 or v3
    /// - Non-numeric or non-finite coordinate values
    /// - Triangle vertex index outside the object's vertex list
    /// - Malformed `color` inside a legacy `colorgroup`
    #[error("[E3001] Malformed model: {0}")]
    MalformedModel(String),

    /// Slicing metadata could not be interpreted
    ///
    /// **Error Code**: E3002
    ///
    /// **Common Causes**:
    /// - `filament` element whose `color` is not `#RRGGBB`
    /// - `filament` element without `id` or `color`
    ///
    /// **Suggestions**:
    /// - Use `MetadataPolicy::Lenient` to continue with an empty filament map
    #[error("[E3002] Malformed metadata: {0}")]
    MalformedMetadata(String),

    /// Import configuration out of range
    ///
    /// **Error Code**: E4001
    #[error("[E4001] Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Import was cancelled through its cancel token
    ///
    /// **Error Code**: E5001
    #[error("[E5001] Import cancelled")]
    Cancelled,
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlAttr(format!("Attribute parsing failed: {}", err))
    }
}

impl Error {
    /// Create a MalformedModel error for a missing required attribute
    ///
    /// # Example
    /// ```ignore
    /// Error::missing_attribute("vertex", "x")
    /// ```
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Error::MalformedModel(format!(
            "Element '<{}>' is missing required attribute '{}'",
            element, attribute
        ))
    }

    /// Create a MalformedModel error for an attribute that failed to parse as a number
    pub fn invalid_number(element: &str, attribute: &str, value: &str) -> Self {
        Error::MalformedModel(format!(
            "Element '<{}>' attribute '{}' is not a valid number (got '{}')",
            element, attribute, value
        ))
    }

    /// Whether the error belongs to the I/O category (E1001/E1002)
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Zip(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_in_messages() {
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "test"));
        assert!(io_err.to_string().contains("[E1001]"));

        let missing_file = Error::MissingFile("3D/3dmodel.model".to_string());
        assert!(missing_file.to_string().contains("[E1003]"));

        let model = Error::MalformedModel("bad".to_string());
        assert!(model.to_string().contains("[E3001]"));

        let metadata = Error::MalformedMetadata("bad".to_string());
        assert!(metadata.to_string().contains("[E3002]"));

        assert!(Error::Cancelled.to_string().contains("[E5001]"));
    }

    #[test]
    fn test_missing_attribute_helper() {
        let err = Error::missing_attribute("triangle", "v2");
        assert!(matches!(err, Error::MalformedModel(_)));
        assert!(err.to_string().contains("Element '<triangle>'"));
        assert!(err.to_string().contains("'v2'"));
    }

    #[test]
    fn test_invalid_number_helper() {
        let err = Error::invalid_number("vertex", "x", "abc");
        assert!(err.to_string().contains("'abc'"));
        assert!(err.to_string().contains("[E3001]"));
    }

    #[test]
    fn test_is_io() {
        assert!(Error::Io(io::Error::other("x")).is_io());
        assert!(!Error::MissingFile("x".into()).is_io());
    }
}
