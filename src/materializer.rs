//! Widget materialization with lopdf
//!
//! Applies a region list to a document: each region is clamped into its
//! page, styled by field type and added as an AcroForm widget. A region that
//! cannot be placed is recorded and skipped; the rest of the batch still goes
//! through.

use crate::classifier::FieldType;
use crate::extractor::get_number;
use crate::fragment::Bounds;
use crate::regions::FieldRegion;
use crate::FormFillError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use std::collections::BTreeMap;

/// Field flag bits (PDF 32000-1, 12.7.4.2.1)
const FLAG_NO_TOGGLE_TO_OFF: i64 = 1 << 14;
const FLAG_RADIO: i64 = 1 << 15;

/// Annotation flag: print
const ANNOT_PRINT: i64 = 4;

/// Options for widget materialization
#[derive(Debug, Clone)]
pub struct MaterializeOptions {
    /// Maximum number of error messages kept in the report
    pub max_error_samples: usize,
    /// Page size used when a page has no MediaBox (US Letter)
    pub default_page_size: (f32, f32),
    /// Font resource name used in default appearances
    pub font_resource: String,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self {
            max_error_samples: 10,
            default_page_size: (612.0, 792.0),
            font_resource: "Helv".to_string(),
        }
    }
}

/// A region that could not be placed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionError {
    pub region_id: u32,
    pub name: String,
    pub message: String,
}

/// Outcome of applying a region list to a document
#[derive(Debug, Clone)]
pub struct MaterializeReport {
    pub success_count: usize,
    pub error_count: usize,
    /// First `max_error_samples` errors
    pub errors: Vec<RegionError>,
    /// The serialized document with widgets
    pub pdf: Vec<u8>,
}

/// Border and background colors (RGB, 0..1)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetStyle {
    pub border: [f32; 3],
    pub background: [f32; 3],
}

/// Visual style for a field type
pub fn style_for(field_type: FieldType) -> WidgetStyle {
    match field_type {
        FieldType::Signature => WidgetStyle {
            border: [0.0, 0.0, 1.0],
            background: [0.9, 0.94, 1.0],
        },
        FieldType::Currency => WidgetStyle {
            border: [0.0, 0.6, 0.0],
            background: [0.92, 1.0, 0.92],
        },
        FieldType::Date => WidgetStyle {
            border: [0.5, 0.0, 0.5],
            background: [0.97, 0.92, 1.0],
        },
        _ => WidgetStyle {
            border: [0.5, 0.5, 0.5],
            background: [1.0, 1.0, 1.0],
        },
    }
}

/// Fit a region into `page_box`; `None` when nothing is left
pub fn clamp_to_page(region: &FieldRegion, page_box: &Bounds) -> Option<Bounds> {
    let x0 = region.x.max(page_box.x0);
    let y0 = region.y.max(page_box.y0);
    let x1 = (region.x + region.width).min(page_box.x1);
    let y1 = (region.y + region.height).min(page_box.y1);

    if x1 > x0 && y1 > y0 {
        Some(Bounds { x0, y0, x1, y1 })
    } else {
        None
    }
}

/// Add one widget per region to the document in `pdf`
pub fn materialize(
    pdf: &[u8],
    regions: &[FieldRegion],
    options: &MaterializeOptions,
) -> Result<MaterializeReport, FormFillError> {
    let mut doc = Document::load_mem(pdf)?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(FormFillError::Encrypted);
    }

    let pages = doc.get_pages();
    let mut fields = Vec::with_capacity(regions.len());
    let mut errors = Vec::new();
    let mut error_count = 0;

    for region in regions {
        match place_region(&mut doc, &pages, region, options) {
            Ok(field_id) => fields.push(field_id),
            Err(message) => {
                log::warn!("field {} ({}) not placed: {}", region.id, region.name, message);
                error_count += 1;
                if errors.len() < options.max_error_samples {
                    errors.push(RegionError {
                        region_id: region.id,
                        name: region.name.clone(),
                        message,
                    });
                }
            }
        }
    }

    if !fields.is_empty() {
        register_fields(&mut doc, &fields, options)?;
    }

    let mut out = Vec::new();
    doc.save_to(&mut out)?;

    log::info!("placed {} widgets, {} failed", fields.len(), error_count);

    Ok(MaterializeReport {
        success_count: fields.len(),
        error_count,
        errors,
        pdf: out,
    })
}

/// Create the widget for one region; returns the field's object id
fn place_region(
    doc: &mut Document,
    pages: &BTreeMap<u32, ObjectId>,
    region: &FieldRegion,
    options: &MaterializeOptions,
) -> Result<ObjectId, String> {
    let page_id = *pages
        .get(&(region.page + 1))
        .ok_or_else(|| format!("page {} does not exist", region.page))?;

    let page_box = page_media_box(doc, page_id).unwrap_or_else(|| {
        let (w, h) = options.default_page_size;
        Bounds::new(0.0, 0.0, w, h)
    });
    let rect = clamp_to_page(region, &page_box).ok_or_else(|| {
        format!(
            "rectangle ({}, {}, {}x{}) lies outside page {}",
            region.x, region.y, region.width, region.height, region.page
        )
    })?;

    let style = style_for(region.field_type);
    let (field_id, widget_id) = match region.field_type {
        FieldType::Checkbox => {
            let widget = checkbox_widget(doc, region, &rect, &style, page_id);
            let id = doc.add_object(widget);
            (id, id)
        }
        FieldType::Radio => {
            let parent_id = doc.new_object_id();
            let kid = radio_widget(doc, &rect, &style, page_id, parent_id);
            let kid_id = doc.add_object(kid);
            doc.objects.insert(
                parent_id,
                Object::Dictionary(dictionary! {
                    "FT" => "Btn",
                    "T" => Object::string_literal(region.name.as_str()),
                    "Ff" => FLAG_RADIO | FLAG_NO_TOGGLE_TO_OFF,
                    "V" => "Off",
                    "Kids" => vec![Object::Reference(kid_id)],
                }),
            );
            (parent_id, kid_id)
        }
        _ => {
            let id = doc.add_object(text_widget(region, &rect, &style, page_id, options));
            (id, id)
        }
    };

    append_refs(doc, page_id, b"Annots", &[widget_id]).map_err(|e| e.to_string())?;
    Ok(field_id)
}

fn rect_array(rect: &Bounds) -> Vec<Object> {
    vec![
        Object::Real(rect.x0),
        Object::Real(rect.y0),
        Object::Real(rect.x1),
        Object::Real(rect.y1),
    ]
}

fn color_array(rgb: &[f32; 3]) -> Vec<Object> {
    rgb.iter().map(|&c| Object::Real(c)).collect()
}

fn appearance_characteristics(style: &WidgetStyle, caption: Option<&str>) -> Dictionary {
    let mut mk = dictionary! {
        "BC" => color_array(&style.border),
        "BG" => color_array(&style.background),
    };
    if let Some(caption) = caption {
        mk.set("CA", Object::string_literal(caption));
    }
    mk
}

fn text_widget(
    region: &FieldRegion,
    rect: &Bounds,
    style: &WidgetStyle,
    page_id: ObjectId,
    options: &MaterializeOptions,
) -> Dictionary {
    // Auto-size (0) when the line is too short for the source font
    let font_size = if rect.height() >= region.font_size { region.font_size } else { 0.0 };

    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal(region.name.as_str()),
        "TU" => Object::string_literal(region.context.before.as_str()),
        "Rect" => rect_array(rect),
        "P" => page_id,
        "F" => ANNOT_PRINT,
        "DA" => Object::string_literal(format!("/{} {} Tf 0 g", options.font_resource, font_size)),
        "MK" => appearance_characteristics(style, None),
        "BS" => dictionary! { "W" => 1_i64, "S" => "S" },
    }
}

/// Appearance stream for a toggle widget; `mark` draws the on state
fn toggle_appearance(doc: &mut Document, rect: &Bounds, style: &WidgetStyle, mark: bool) -> ObjectId {
    let (w, h) = (rect.width(), rect.height());
    let [br, bg, bb] = style.border;
    let mut ops = format!("q {} {} {} RG 1 w 0.5 0.5 {} {} re S Q\n", br, bg, bb, w - 1.0, h - 1.0);
    if mark {
        let inset = w.min(h) * 0.2;
        ops.push_str(&format!(
            "q 0 g 1.5 w {i} {i} m {x} {y} l S {i} {y} m {x} {i} l S Q\n",
            i = inset,
            x = w - inset,
            y = h - inset
        ));
    }

    let stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![Object::Real(0.0), Object::Real(0.0), Object::Real(w), Object::Real(h)],
        },
        ops.into_bytes(),
    );
    doc.add_object(stream)
}

fn checkbox_widget(
    doc: &mut Document,
    region: &FieldRegion,
    rect: &Bounds,
    style: &WidgetStyle,
    page_id: ObjectId,
) -> Dictionary {
    let on = toggle_appearance(doc, rect, style, true);
    let off = toggle_appearance(doc, rect, style, false);

    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal(region.name.as_str()),
        "Rect" => rect_array(rect),
        "P" => page_id,
        "F" => ANNOT_PRINT,
        "V" => "Off",
        "AS" => "Off",
        "MK" => appearance_characteristics(style, Some("4")),
        "AP" => dictionary! {
            "N" => dictionary! { "Yes" => on, "Off" => off },
        },
    }
}

/// The single default option of a radio group
fn radio_widget(
    doc: &mut Document,
    rect: &Bounds,
    style: &WidgetStyle,
    page_id: ObjectId,
    parent_id: ObjectId,
) -> Dictionary {
    let on = toggle_appearance(doc, rect, style, true);
    let off = toggle_appearance(doc, rect, style, false);

    dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "Parent" => parent_id,
        "Rect" => rect_array(rect),
        "P" => page_id,
        "F" => ANNOT_PRINT,
        "AS" => "Off",
        "MK" => appearance_characteristics(style, Some("l")),
        "AP" => dictionary! {
            "N" => dictionary! { "Choice1" => on, "Off" => off },
        },
    }
}

/// Resolve a page's MediaBox, following inherited values up the page tree
fn page_media_box(doc: &Document, page_id: ObjectId) -> Option<Bounds> {
    let mut current = Some(page_id);
    let mut depth = 0;

    while let Some(id) = current {
        let dict = doc.get_dictionary(id).ok()?;
        if let Ok(obj) = dict.get(b"MediaBox") {
            let obj = match obj {
                Object::Reference(r) => doc.get_object(*r).ok()?,
                other => other,
            };
            let values: Vec<f32> = obj.as_array().ok()?.iter().filter_map(get_number).collect();
            return match values.as_slice() {
                [x0, y0, x1, y1] => Some(Bounds::new(*x0, *y0, *x1, *y1)),
                _ => None,
            };
        }

        depth += 1;
        if depth > 32 {
            break;
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

/// Append references to an array entry of a dictionary, creating it if
/// needed. The array may be stored inline or as an indirect object.
fn append_refs(
    doc: &mut Document,
    owner: ObjectId,
    key: &[u8],
    ids: &[ObjectId],
) -> Result<(), lopdf::Error> {
    let refs: Vec<Object> = ids.iter().map(|&id| Object::Reference(id)).collect();

    let indirect = match doc.get_dictionary(owner)?.get(key) {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    if let Some(array_id) = indirect {
        if let Ok(array) = doc.get_object_mut(array_id).and_then(|o| o.as_array_mut()) {
            array.extend(refs);
            return Ok(());
        }
    }

    let dict = doc.get_dictionary_mut(owner)?;
    if let Ok(Object::Array(array)) = dict.get_mut(key) {
        array.extend(refs);
        return Ok(());
    }
    dict.set(key, refs);
    Ok(())
}

/// Make sure the catalog has an AcroForm and list the new fields in it
fn register_fields(
    doc: &mut Document,
    fields: &[ObjectId],
    options: &MaterializeOptions,
) -> Result<(), FormFillError> {
    let root_id = doc.trailer.get(b"Root").and_then(Object::as_reference)?;

    let existing = doc.get_dictionary(root_id)?.get(b"AcroForm").ok().cloned();
    let acroform_id = match existing {
        Some(Object::Reference(id)) => id,
        other => {
            let dict = match other {
                Some(Object::Dictionary(dict)) => dict,
                _ => Dictionary::new(),
            };
            let id = doc.add_object(dict);
            doc.get_dictionary_mut(root_id)?.set("AcroForm", id);
            id
        }
    };

    append_refs(doc, acroform_id, b"Fields", fields)?;

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let acroform = doc.get_dictionary_mut(acroform_id)?;
    acroform.set("NeedAppearances", true);
    if acroform.get(b"DA").is_err() {
        acroform.set(
            "DA",
            Object::string_literal(format!("/{} 0 Tf 0 g", options.font_resource)),
        );
    }
    if acroform.get(b"DR").is_err() {
        acroform.set(
            "DR",
            dictionary! {
                "Font" => dictionary! { options.font_resource.as_str() => font_id },
            },
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::FieldContext;

    fn ints(values: &[i64]) -> Vec<Object> {
        values.iter().map(|&v| Object::Integer(v)).collect()
    }

    fn test_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..page_count {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
            });
            kids.push(Object::Reference(page_id));
        }
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => ints(&[0, 0, 612, 792]),
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("failed to save test PDF");
        buf
    }

    fn region(id: u32, page: u32, x: f32, y: f32, field_type: FieldType) -> FieldRegion {
        FieldRegion {
            id,
            name: format!("{}_{}", field_type, id),
            page,
            x,
            y,
            width: 100.0,
            height: 14.0,
            field_type,
            font_size: 12.0,
            context: FieldContext::default(),
        }
    }

    fn annot_count(doc: &Document, page: u32) -> usize {
        let page_id = doc.get_pages()[&page];
        doc.get_dictionary(page_id)
            .unwrap()
            .get(b"Annots")
            .and_then(Object::as_array)
            .map(|a| a.len())
            .unwrap_or(0)
    }

    #[test]
    fn test_clamp_inside() {
        let page = Bounds::new(0.0, 0.0, 612.0, 792.0);
        let r = region(1, 0, 100.0, 700.0, FieldType::Text);
        assert_eq!(clamp_to_page(&r, &page), Some(Bounds::new(100.0, 700.0, 200.0, 714.0)));
    }

    #[test]
    fn test_clamp_overflowing_edge() {
        let page = Bounds::new(0.0, 0.0, 612.0, 792.0);
        let r = region(1, 0, 560.0, 785.0, FieldType::Text);
        assert_eq!(clamp_to_page(&r, &page), Some(Bounds::new(560.0, 785.0, 612.0, 792.0)));
    }

    #[test]
    fn test_clamp_outside() {
        let page = Bounds::new(0.0, 0.0, 612.0, 792.0);
        let r = region(1, 0, 700.0, 100.0, FieldType::Text);
        assert_eq!(clamp_to_page(&r, &page), None);
    }

    #[test]
    fn test_styles_by_type() {
        assert_eq!(style_for(FieldType::Signature).border, [0.0, 0.0, 1.0]);
        assert_eq!(style_for(FieldType::Currency).border, [0.0, 0.6, 0.0]);
        assert_eq!(style_for(FieldType::Date).border, [0.5, 0.0, 0.5]);
        assert_eq!(style_for(FieldType::Email), style_for(FieldType::Text));
    }

    #[test]
    fn test_materialize_all_kinds() {
        let pdf = test_pdf(2);
        let regions = vec![
            region(1, 0, 100.0, 700.0, FieldType::Signature),
            region(2, 0, 100.0, 650.0, FieldType::Checkbox),
            region(3, 1, 100.0, 600.0, FieldType::Radio),
        ];
        let report = materialize(&pdf, &regions, &MaterializeOptions::default()).unwrap();
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 0);

        let doc = Document::load_mem(&report.pdf).unwrap();
        assert_eq!(annot_count(&doc, 1), 2);
        assert_eq!(annot_count(&doc, 2), 1);

        let root_id = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
        let acroform_id = doc
            .get_dictionary(root_id)
            .unwrap()
            .get(b"AcroForm")
            .and_then(Object::as_reference)
            .unwrap();
        let acroform = doc.get_dictionary(acroform_id).unwrap();
        assert_eq!(acroform.get(b"Fields").and_then(Object::as_array).unwrap().len(), 3);
    }

    #[test]
    fn test_bad_regions_do_not_abort_batch() {
        let pdf = test_pdf(1);
        let regions = vec![
            region(1, 0, 100.0, 700.0, FieldType::Text),
            region(2, 5, 100.0, 700.0, FieldType::Text),
            region(3, 0, 5000.0, 700.0, FieldType::Date),
            region(4, 0, 100.0, 600.0, FieldType::Currency),
        ];
        let report = materialize(&pdf, &regions, &MaterializeOptions::default()).unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 2);
        assert_eq!(report.errors[0].region_id, 2);
        assert!(report.errors[0].message.contains("does not exist"));
        assert_eq!(report.errors[1].region_id, 3);
    }

    #[test]
    fn test_error_samples_capped() {
        let pdf = test_pdf(1);
        let regions: Vec<FieldRegion> = (1..=5)
            .map(|i| region(i, 9, 100.0, 700.0, FieldType::Text))
            .collect();
        let options = MaterializeOptions {
            max_error_samples: 2,
            ..MaterializeOptions::default()
        };
        let report = materialize(&pdf, &regions, &options).unwrap();
        assert_eq!(report.error_count, 5);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.success_count, 0);
    }

    #[test]
    fn test_garbage_input_is_parse_error() {
        let result = materialize(b"not a pdf", &[], &MaterializeOptions::default());
        assert!(matches!(result, Err(FormFillError::Parse(_))));
    }
}
