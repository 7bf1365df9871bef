//! Slicing metadata parsing
//!
//! `Metadata/slice_info.config` lists the filaments of a print:
//!
//! ```xml
//! <config>
//!   <plate>
//!     <filament id="1" type="PLA" color="#FFFFFF" used_m="0.42" used_g="1.26"/>
//!   </plate>
//! </config>
//! ```

use crate::color::{FilamentColors, Rgb};
use crate::error::{Error, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{get_local_name, parse_attributes, reject_dtd};

/// Build the filament index to color map from a slice info document
///
/// Every `filament` element, wherever it sits, contributes its `id` and
/// `color`. A later element with the same id replaces an earlier one.
/// Anything that keeps a filament from being read fails with
/// [`Error::MalformedMetadata`].
pub fn parse_slice_info(config: &[u8]) -> Result<FilamentColors> {
    reject_dtd(config).map_err(|e| Error::MalformedMetadata(e.to_string()))?;

    let mut reader = Reader::from_reader(config);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut colors = FilamentColors::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::MalformedMetadata(e.to_string()))?;
                if get_local_name(name_str) == "filament" {
                    let (id, color) = parse_filament(e)?;
                    colors.insert(id, color);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::MalformedMetadata(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(colors)
}

/// Read `id` and `color` from one filament element
fn parse_filament(e: &BytesStart) -> Result<(String, Rgb)> {
    let attrs = parse_attributes(e).map_err(|e| Error::MalformedMetadata(e.to_string()))?;
    let id = attrs.get("id").ok_or_else(|| {
        Error::MalformedMetadata("filament element missing 'id' attribute".to_string())
    })?;
    let color_str = attrs.get("color").ok_or_else(|| {
        Error::MalformedMetadata(format!("filament {} missing 'color' attribute", id))
    })?;

    let color = parse_filament_color(id, color_str)?;
    Ok((id.clone(), color))
}

/// Filament colors are strictly `#RRGGBB`
fn parse_filament_color(id: &str, color_str: &str) -> Result<Rgb> {
    let invalid = || {
        Error::MalformedMetadata(format!(
            "filament {} has invalid color '{}', expected #RRGGBB",
            id, color_str
        ))
    };

    let hex = color_str.strip_prefix('#').unwrap_or(color_str);
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
    };
    Ok(Rgb::from_u8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filaments() {
        let xml = r##"<?xml version="1.0" encoding="UTF-8"?>
<config>
  <header><header_item key="X-BBL-Client-Type" value="slicer"/></header>
  <plate>
    <metadata key="index" value="1"/>
    <filament id="1" type="PLA" color="#FF0000" used_m="1.2"/>
    <filament id="4" type="PETG" color="#00ff80"/>
  </plate>
</config>"##;
        let colors = parse_slice_info(xml.as_bytes()).unwrap();
        assert_eq!(colors.len(), 2);
        assert_eq!(colors.get("1"), Some(Rgb::from_u8(255, 0, 0)));
        assert_eq!(colors.color_for(4), Rgb::from_u8(0, 255, 128));
    }

    #[test]
    fn test_empty_config() {
        let colors = parse_slice_info(b"<config/>").unwrap();
        assert!(colors.is_empty());
    }

    #[test]
    fn test_bad_hex() {
        let xml = r##"<config><filament id="1" color="#GG0000"/></config>"##;
        let err = parse_slice_info(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MalformedMetadata(_)));
        assert!(err.to_string().contains("#GG0000"));

        for color in ["#+F+F+F", "#-10000"] {
            let xml = format!(r##"<config><filament id="1" color="{}"/></config>"##, color);
            assert!(
                matches!(parse_slice_info(xml.as_bytes()), Err(Error::MalformedMetadata(_))),
                "{} should be rejected",
                color
            );
        }
    }

    #[test]
    fn test_rgba_is_rejected() {
        let xml = r##"<config><filament id="1" color="#FF0000FF"/></config>"##;
        assert!(matches!(
            parse_slice_info(xml.as_bytes()),
            Err(Error::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_missing_attributes() {
        let no_id = r##"<config><filament color="#FF0000"/></config>"##;
        assert!(matches!(
            parse_slice_info(no_id.as_bytes()),
            Err(Error::MalformedMetadata(_))
        ));
        let no_color = r##"<config><filament id="2"/></config>"##;
        assert!(matches!(
            parse_slice_info(no_color.as_bytes()),
            Err(Error::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_broken_xml() {
        assert!(matches!(
            parse_slice_info(b"<config><plate></config>"),
            Err(Error::MalformedMetadata(_))
        ));
    }
}
