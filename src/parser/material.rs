//! Legacy color group parsing
//!
//! Plain 3MF producers color faces through `<colorgroup>` resources whose
//! `<color>` children are referenced by triangle `pid`/`p1`.

use crate::color::{Rgb, parse_hex_color};
use crate::error::{Error, Result};
use crate::model::ColorGroup;
use quick_xml::events::BytesStart;

use super::parse_attributes;

/// Parse colorgroup start and return an empty group
pub(super) fn parse_colorgroup_start(e: &BytesStart) -> Result<ColorGroup> {
    let attrs = parse_attributes(e)?;
    let id_str = attrs
        .get("id")
        .ok_or_else(|| Error::missing_attribute("colorgroup", "id"))?;
    let id = id_str
        .trim()
        .parse::<usize>()
        .map_err(|_| Error::invalid_number("colorgroup", "id", id_str))?;
    Ok(ColorGroup::new(id))
}

/// Parse color element
pub(super) fn parse_color_element(e: &BytesStart, colorgroup_id: usize) -> Result<Rgb> {
    let attrs = parse_attributes(e)?;
    let color_str = attrs
        .get("color")
        .ok_or_else(|| Error::missing_attribute("color", "color"))?;

    parse_hex_color(color_str).ok_or_else(|| {
        Error::MalformedModel(format!(
            "Invalid color format '{}' in colorgroup {}. \
             Colors must be in format #RRGGBB or #RRGGBBAA",
            color_str, colorgroup_id
        ))
    })
}
