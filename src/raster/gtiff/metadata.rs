//! GDAL_METADATA tag contents
//!
//! ```xml
//! <GDALMetadata>
//!   <Item name="PROCESS_HISTORY">...</Item>
//!   <Item name="STATISTICS" sample="0">...</Item>
//!   <Item name="SCALE" sample="0" role="scale">0.5</Item>
//! </GDALMetadata>
//! ```

use std::io::Cursor;

use log::warn;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::GeorefResult;
use crate::raster::Dataset;

const ROOT: &str = "GDALMetadata";
const ITEM: &str = "Item";

/// One `Item` element
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetadataItem {
    pub name: String,
    pub value: String,
    /// 0-based band, `None` for dataset items
    pub sample: Option<usize>,
    pub role: Option<String>,
}

/// Serialize dataset and band metadata, scale and offset
///
/// Returns `None` when there is nothing to store.
pub fn to_xml(dataset: &Dataset) -> GeorefResult<Option<String>> {
    let mut items: Vec<MetadataItem> = dataset.metadata.iter()
        .map(|(name, value)| MetadataItem { name: name.clone(), value: value.clone(), sample: None, role: None })
        .collect();

    for (index, band) in dataset.bands().iter().enumerate() {
        for (name, value) in &band.metadata {
            items.push(MetadataItem { name: name.clone(), value: value.clone(), sample: Some(index), role: None });
        }
        if let Some(scale) = band.scale {
            items.push(MetadataItem {
                name: "SCALE".to_string(), value: scale.to_string(), sample: Some(index), role: Some("scale".to_string()),
            });
        }
        if let Some(offset) = band.offset {
            items.push(MetadataItem {
                name: "OFFSET".to_string(), value: offset.to_string(), sample: Some(index), role: Some("offset".to_string()),
            });
        }
    }

    if items.is_empty() {
        return Ok(None);
    }

    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Start(BytesStart::new(ROOT)))?;
    for item in &items {
        let mut element = BytesStart::new(ITEM);
        element.push_attribute(("name", item.name.as_str()));
        let sample = item.sample.map(|s| s.to_string());
        if let Some(sample) = &sample {
            element.push_attribute(("sample", sample.as_str()));
        }
        if let Some(role) = &item.role {
            element.push_attribute(("role", role.as_str()));
        }
        writer.write_event(Event::Start(element))?;
        writer.write_event(Event::Text(BytesText::new(&item.value)))?;
        writer.write_event(Event::End(BytesEnd::new(ITEM)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(ROOT)))?;

    let bytes = writer.into_inner().into_inner();
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Parse the items of a GDAL_METADATA document
pub fn parse_items(xml: &str) -> GeorefResult<Vec<MetadataItem>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current: Option<MetadataItem> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == ITEM.as_bytes() => {
                let mut item = MetadataItem::default();
                for attribute in e.attributes() {
                    let attribute = attribute.map_err(quick_xml::Error::from)?;
                    let value = attribute.unescape_value()?.into_owned();
                    match attribute.key.as_ref() {
                        b"name" => item.name = value,
                        b"sample" => item.sample = value.parse().ok(),
                        b"role" => item.role = Some(value),
                        _ => {}
                    }
                }
                current = Some(item);
            }
            Event::Empty(e) if e.name().as_ref() == ITEM.as_bytes() => {
                warn!("Skipping empty metadata item");
            }
            Event::Text(text) => {
                if let Some(item) = current.as_mut() {
                    item.value.push_str(&text.unescape()?);
                }
            }
            Event::End(e) if e.name().as_ref() == ITEM.as_bytes() => {
                if let Some(item) = current.take() {
                    items.push(item);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(items)
}

/// Apply parsed items to a dataset
pub fn apply(dataset: &mut Dataset, items: Vec<MetadataItem>) {
    for item in items {
        match item.sample {
            None => dataset.set_metadata_item(&item.name, &item.value),
            Some(index) => {
                let band = match dataset.band_mut(index) {
                    Some(band) => band,
                    None => {
                        warn!("Metadata item {} refers to missing band {}", item.name, index + 1);
                        continue;
                    }
                };
                match item.role.as_deref() {
                    Some("scale") => band.scale = item.value.trim().parse().ok(),
                    Some("offset") => band.offset = item.value.trim().parse().ok(),
                    _ => {
                        band.metadata.insert(item.name, item.value);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;

    #[test]
    fn test_items_survive_xml() {
        let mut dataset = Dataset::new(2, 2, 2, DataType::Byte);
        dataset.set_metadata_item("PROCESS_HISTORY", "<History><Process name=\"a\"/></History>");
        dataset.band_mut(1).unwrap().scale = Some(0.5);
        dataset.band_mut(0).unwrap().metadata.insert("UNITS".to_string(), "m & cm".to_string());

        let xml = to_xml(&dataset).unwrap().unwrap();
        let items = parse_items(&xml).unwrap();
        assert_eq!(items.len(), 3);

        let mut copy = Dataset::new(2, 2, 2, DataType::Byte);
        apply(&mut copy, items);
        assert_eq!(copy.metadata_item("PROCESS_HISTORY"), dataset.metadata_item("PROCESS_HISTORY"));
        assert_eq!(copy.band(1).unwrap().scale, Some(0.5));
        assert_eq!(copy.band(0).unwrap().metadata.get("UNITS").map(String::as_str), Some("m & cm"));
    }

    #[test]
    fn test_nothing_to_store() {
        let dataset = Dataset::new(2, 2, 1, DataType::Byte);
        assert!(to_xml(&dataset).unwrap().is_none());
    }
}
