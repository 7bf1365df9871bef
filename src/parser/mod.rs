//! XML parsing for 3MF model entries and slicing metadata

mod core;
mod material;
mod metadata;

use crate::error::{Error, Result};
use crate::model::*;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use tracing::{debug, warn};

use self::core::{parse_object, parse_triangle, parse_vertex};
use self::material::{parse_color_element, parse_colorgroup_start};

pub use metadata::parse_slice_info;

/// Default buffer capacity for XML parsing (4KB)
const XML_BUFFER_CAPACITY: usize = 4096;

/// Number of leading bytes scanned for a DOCTYPE declaration
const DTD_SCAN_LEN: usize = 2000;

/// Extract local name from potentially namespaced XML element name
///
/// # Examples
///
/// - `"m:colorgroup"` returns `"colorgroup"`
/// - `"object"` returns `"object"`
pub(crate) fn get_local_name(name_str: &str) -> &str {
    if let Some(pos) = name_str.rfind(':') {
        &name_str[pos + 1..]
    } else {
        name_str
    }
}

/// Collect an element's attributes keyed by local name
pub(crate) fn parse_attributes(e: &BytesStart) -> Result<HashMap<String, String>> {
    let mut attrs = HashMap::with_capacity(8);

    for attr in e.attributes() {
        let attr = attr?;
        let key =
            std::str::from_utf8(attr.key.as_ref()).map_err(|e| Error::InvalidXml(e.to_string()))?;
        let value =
            std::str::from_utf8(&attr.value).map_err(|e| Error::InvalidXml(e.to_string()))?;

        attrs.insert(get_local_name(key).to_string(), value.to_string());
    }

    Ok(attrs)
}

/// Reject documents carrying a DOCTYPE declaration
///
/// DTDs enable XML external entity expansion.
pub(crate) fn reject_dtd(xml: &[u8]) -> Result<()> {
    let head = &xml[..xml.len().min(DTD_SCAN_LEN)];
    let found = head
        .windows(b"<!doctype".len())
        .any(|w| w.eq_ignore_ascii_case(b"<!doctype"));
    if found {
        return Err(Error::InvalidXml(
            "DTD declarations are not allowed in 3MF files for security reasons".to_string(),
        ));
    }
    Ok(())
}

/// Parse one 3MF model document
///
/// Every `<object>` that has a `<mesh>` becomes a [`ParsedObject`], in
/// document order. Objects that only hold components are skipped. Legacy
/// `<colorgroup>` resources are collected alongside.
///
/// Missing or non-numeric `vertex` coordinates and `triangle` indices, and
/// triangle indices outside the object's vertex list, fail with
/// [`Error::MalformedModel`]. Unknown attributes are ignored.
pub fn parse_model(xml: &[u8]) -> Result<ParsedModel> {
    reject_dtd(xml)?;

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut model = ParsedModel::default();
    let mut buf = Vec::with_capacity(XML_BUFFER_CAPACITY);

    let mut current_object: Option<ParsedObject> = None;
    let mut current_mesh: Option<Mesh> = None;
    let mut object_has_mesh = false;
    let mut in_vertices = false;
    let mut in_triangles = false;
    let mut current_colorgroup: Option<ColorGroup> = None;

    loop {
        let event_result = reader.read_event_into(&mut buf);
        let is_empty_element = matches!(&event_result, Ok(Event::Empty(_)));

        match event_result {
            Ok(Event::DocType(_)) => {
                return Err(Error::InvalidXml(
                    "DTD declarations are not allowed in 3MF files for security reasons"
                        .to_string(),
                ));
            }
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;

                match get_local_name(name_str) {
                    "object" => {
                        let object = parse_object(e)?;
                        if is_empty_element {
                            skip_meshless(&object);
                        } else {
                            current_object = Some(object);
                            object_has_mesh = false;
                        }
                    }
                    "mesh" if current_object.is_some() => {
                        object_has_mesh = true;
                        if is_empty_element {
                            finish_mesh(&mut current_object, Mesh::new())?;
                        } else {
                            current_mesh = Some(Mesh::new());
                        }
                    }
                    "vertices" if current_mesh.is_some() => in_vertices = !is_empty_element,
                    "triangles" if current_mesh.is_some() => in_triangles = !is_empty_element,
                    "vertex" if in_vertices => {
                        if let Some(ref mut mesh) = current_mesh {
                            mesh.vertices.push(parse_vertex(e)?);
                        }
                    }
                    "triangle" if in_triangles => {
                        if let Some(ref mut mesh) = current_mesh {
                            mesh.triangles.push(parse_triangle(e)?);
                        }
                    }
                    "colorgroup" => {
                        let group = parse_colorgroup_start(e)?;
                        if is_empty_element {
                            model.color_groups.push(group);
                        } else {
                            current_colorgroup = Some(group);
                        }
                    }
                    "color" => {
                        if let Some(ref mut group) = current_colorgroup {
                            let color = parse_color_element(e, group.id)?;
                            group.colors.push(color);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(ref e)) => {
                let name = e.name();
                let name_str = std::str::from_utf8(name.as_ref())
                    .map_err(|e| Error::InvalidXml(e.to_string()))?;

                match get_local_name(name_str) {
                    "vertices" => in_vertices = false,
                    "triangles" => in_triangles = false,
                    "mesh" => {
                        if let Some(mesh) = current_mesh.take() {
                            finish_mesh(&mut current_object, mesh)?;
                        }
                    }
                    "object" => {
                        if let Some(object) = current_object.take() {
                            if object_has_mesh {
                                debug!(
                                    id = ?object.id,
                                    vertices = object.mesh.vertices.len(),
                                    triangles = object.mesh.triangles.len(),
                                    "parsed object"
                                );
                                model.objects.push(object);
                            } else {
                                skip_meshless(&object);
                            }
                        }
                    }
                    "colorgroup" => {
                        if let Some(group) = current_colorgroup.take() {
                            model.color_groups.push(group);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(model)
}

fn skip_meshless(object: &ParsedObject) {
    warn!(id = ?object.id, "skipping object without a mesh");
}

/// Attach a completed mesh to the open object after checking its indices
fn finish_mesh(object: &mut Option<ParsedObject>, mesh: Mesh) -> Result<()> {
    let Some(object) = object else {
        return Ok(());
    };

    if let Some((triangle, index)) = mesh.out_of_range_index() {
        return Err(Error::MalformedModel(format!(
            "Triangle {} of object {} references vertex {} but the mesh has {} vertices",
            triangle,
            object.id.map_or_else(|| "<unnamed>".to_string(), |id| id.to_string()),
            index,
            mesh.vertices.len()
        )));
    }

    object.mesh = mesh;
    Ok(())
}
