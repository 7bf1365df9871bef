//! Core 3MF element parsing
//!
//! Objects, vertices and triangles. Attributes are matched by local name so
//! prefixed and unprefixed documents read the same; attributes this crate
//! does not use are ignored.

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::events::BytesStart;
use std::str::FromStr;

use super::parse_attributes;

/// Parse a numeric attribute value, reporting the element and attribute on failure
fn parse_number<T: FromStr>(element: &str, attribute: &str, value: &[u8]) -> Result<T> {
    let value_str = std::str::from_utf8(value).map_err(|e| Error::InvalidXml(e.to_string()))?;
    value_str
        .trim()
        .parse::<T>()
        .map_err(|_| Error::invalid_number(element, attribute, value_str))
}

/// Parse object element attributes
pub(super) fn parse_object(e: &BytesStart) -> Result<ParsedObject> {
    let attrs = parse_attributes(e)?;
    let optional_index = |key: &str| -> Result<Option<usize>> {
        attrs
            .get(key)
            .map(|v| parse_number("object", key, v.as_bytes()))
            .transpose()
    };

    Ok(ParsedObject {
        id: optional_index("id")?,
        name: attrs.get("name").cloned(),
        pid: optional_index("pid")?,
        pindex: optional_index("pindex")?,
        mesh: Mesh::new(),
    })
}

/// Parse vertex element attributes
pub(super) fn parse_vertex(e: &BytesStart) -> Result<Vertex3> {
    // Parse attributes directly without building a HashMap: meshes hold
    // hundreds of thousands of vertices
    let mut x_opt: Option<f64> = None;
    let mut y_opt: Option<f64> = None;
    let mut z_opt: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result?;
        match attr.key.local_name().as_ref() {
            b"x" => x_opt = Some(parse_number("vertex", "x", &attr.value)?),
            b"y" => y_opt = Some(parse_number("vertex", "y", &attr.value)?),
            b"z" => z_opt = Some(parse_number("vertex", "z", &attr.value)?),
            _ => {}
        }
    }

    let x = x_opt.ok_or_else(|| Error::missing_attribute("vertex", "x"))?;
    let y = y_opt.ok_or_else(|| Error::missing_attribute("vertex", "y"))?;
    let z = z_opt.ok_or_else(|| Error::missing_attribute("vertex", "z"))?;

    // Reject NaN and Infinity
    for (axis, value) in [("x", x), ("y", y), ("z", z)] {
        if !value.is_finite() {
            return Err(Error::MalformedModel(format!(
                "Vertex {} coordinate must be finite (got {})",
                axis, value
            )));
        }
    }

    Ok(Vertex3::new(x, y, z))
}

/// Parse triangle element attributes
pub(super) fn parse_triangle(e: &BytesStart) -> Result<Triangle> {
    let mut v1_opt: Option<usize> = None;
    let mut v2_opt: Option<usize> = None;
    let mut v3_opt: Option<usize> = None;
    let mut triangle = Triangle::default();

    for attr_result in e.attributes() {
        let attr = attr_result?;
        match attr.key.local_name().as_ref() {
            b"v1" => v1_opt = Some(parse_number("triangle", "v1", &attr.value)?),
            b"v2" => v2_opt = Some(parse_number("triangle", "v2", &attr.value)?),
            b"v3" => v3_opt = Some(parse_number("triangle", "v3", &attr.value)?),
            b"pid" => triangle.pid = Some(parse_number("triangle", "pid", &attr.value)?),
            b"p1" => triangle.p1 = Some(parse_number("triangle", "p1", &attr.value)?),
            b"paint_color" => {
                let code = std::str::from_utf8(&attr.value)
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;
                triangle.paint_color = Some(code.to_string());
            }
            _ => {}
        }
    }

    triangle.v1 = v1_opt.ok_or_else(|| Error::missing_attribute("triangle", "v1"))?;
    triangle.v2 = v2_opt.ok_or_else(|| Error::missing_attribute("triangle", "v2"))?;
    triangle.v3 = v3_opt.ok_or_else(|| Error::missing_attribute("triangle", "v3"))?;

    Ok(triangle)
}
