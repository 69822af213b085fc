//! Process parameter XML
//!
//! The parameters of a georeference or reprojection run are stored in the
//! output dataset metadata under `PROCESS_HISTORY`:
//!
//! ```xml
//! <proceso nombre="Georreferenciacion">
//!   <parametro nombre="transformacion">Polynomial</parametro>
//!   <parametro nombre="orden">1</parametro>
//!   <subset><ul x="0" y="0"/><lr x="512" y="512"/></subset>
//! </proceso>
//! ```

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::coordinate::{Coordinates, Subset};
use crate::errors::{GeorefError, GeorefResult};
use crate::raster::Dataset;

/// Metadata key of the history document
pub const PROCESS_HISTORY: &str = "PROCESS_HISTORY";

pub const GEOREFERENCE_PROCESS: &str = "Georreferenciacion";
pub const REPROJECTION_PROCESS: &str = "Reproyeccion";

/// Parameter names
pub mod keys {
    pub const TRANSFORMATION: &str = "transformacion";
    pub const ORDER: &str = "orden";
    pub const GCP_FILE: &str = "archivo_gcp";
    pub const PIXELS: &str = "pixeles";
    pub const LINES: &str = "lineas";
    pub const PIXEL_WIDTH: &str = "ancho_pixel";
    pub const PIXEL_HEIGHT: &str = "alto_pixel";
    pub const TARGET_SRS: &str = "srs_destino";
    pub const RMSE: &str = "rmse";
}

const PROCESS: &str = "proceso";
const PARAMETER: &str = "parametro";
const NAME: &str = "nombre";
const SUBSET: &str = "subset";

/// Named parameters of one process run
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessHistory {
    pub name: String,
    parameters: Vec<(String, String)>,
    pub subset: Option<Subset>,
}

impl ProcessHistory {
    pub fn new(name: &str) -> Self {
        ProcessHistory { name: name.to_string(), ..Default::default() }
    }

    /// Set a parameter, keeping the position of an existing one
    pub fn set(&mut self, key: &str, value: impl ToString) -> &mut Self {
        let value = value.to_string();
        match self.parameters.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.parameters.push((key.to_string(), value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.parameters.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }

    pub fn to_xml(&self) -> GeorefResult<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        let mut root = BytesStart::new(PROCESS);
        root.push_attribute((NAME, self.name.as_str()));
        writer.write_event(Event::Start(root))?;

        for (key, value) in &self.parameters {
            let mut element = BytesStart::new(PARAMETER);
            element.push_attribute((NAME, key.as_str()));
            writer.write_event(Event::Start(element))?;
            writer.write_event(Event::Text(BytesText::new(value)))?;
            writer.write_event(Event::End(BytesEnd::new(PARAMETER)))?;
        }

        if let Some(subset) = &self.subset {
            writer.write_event(Event::Start(BytesStart::new(SUBSET)))?;
            for (tag, corner) in [("ul", subset.ul), ("lr", subset.lr)] {
                let (x, y) = (corner.x.to_string(), corner.y.to_string());
                let mut element = BytesStart::new(tag);
                element.push_attribute(("x", x.as_str()));
                element.push_attribute(("y", y.as_str()));
                writer.write_event(Event::Empty(element))?;
            }
            writer.write_event(Event::End(BytesEnd::new(SUBSET)))?;
        }

        writer.write_event(Event::End(BytesEnd::new(PROCESS)))?;
        let bytes = writer.into_inner().into_inner();
        String::from_utf8(bytes).map_err(|e| GeorefError::Xml(e.to_string()))
    }

    pub fn from_xml(xml: &str) -> GeorefResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut history = ProcessHistory::default();
        let mut found_root = false;
        let mut current_key: Option<String> = None;
        let mut current_value = String::new();
        let mut ul: Option<Coordinates> = None;
        let mut lr: Option<Coordinates> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"proceso" => {
                        found_root = true;
                        history.name = attribute(&e, NAME)?.unwrap_or_default();
                    }
                    b"parametro" => {
                        current_key = attribute(&e, NAME)?;
                        current_value.clear();
                    }
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"ul" => ul = Some(corner(&e)?),
                    b"lr" => lr = Some(corner(&e)?),
                    b"parametro" => {
                        if let Some(key) = attribute(&e, NAME)? {
                            history.set(&key, "");
                        }
                    }
                    _ => {}
                },
                Event::Text(text) => {
                    if current_key.is_some() {
                        current_value.push_str(&text.unescape()?);
                    }
                }
                Event::End(e) if e.name().as_ref() == PARAMETER.as_bytes() => {
                    if let Some(key) = current_key.take() {
                        history.set(&key, &current_value);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !found_root {
            return Err(GeorefError::Xml(format!("Missing <{}> element", PROCESS)));
        }
        if let (Some(ul), Some(lr)) = (ul, lr) {
            history.subset = Some(Subset::new(ul, lr));
        }
        Ok(history)
    }

    /// Store the document in the dataset metadata
    pub fn attach(&self, dataset: &mut Dataset) -> GeorefResult<()> {
        let xml = self.to_xml()?;
        dataset.set_metadata_item(PROCESS_HISTORY, &xml);
        Ok(())
    }

    /// History stored in a dataset, if any
    pub fn from_dataset(dataset: &Dataset) -> Option<GeorefResult<Self>> {
        dataset.metadata_item(PROCESS_HISTORY).map(Self::from_xml)
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> GeorefResult<Option<String>> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        if attribute.key.as_ref() == name.as_bytes() {
            return Ok(Some(attribute.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn corner(element: &BytesStart<'_>) -> GeorefResult<Coordinates> {
    let value = |name: &str| -> GeorefResult<f64> {
        let text = attribute(element, name)?
            .ok_or_else(|| GeorefError::Xml(format!("Subset corner without {}", name)))?;
        text.trim().parse().map_err(|_| GeorefError::Xml(format!("Invalid subset coordinate '{}'", text)))
    };
    Ok(Coordinates::new(value("x")?, value("y")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::DataType;

    #[test]
    fn test_history_document() {
        let mut history = ProcessHistory::new(GEOREFERENCE_PROCESS);
        history.set(keys::TRANSFORMATION, "Polynomial")
            .set(keys::ORDER, 2)
            .set(keys::GCP_FILE, "points <a&b>.gcp")
            .set(keys::PIXEL_WIDTH, 0.25);
        history.subset = Some(Subset::from_corners(0.0, 0.0, 512.0, 256.5));

        let xml = history.to_xml().unwrap();
        assert!(xml.starts_with("<proceso nombre=\"Georreferenciacion\">"));
        assert!(xml.contains("<parametro nombre=\"orden\">2</parametro>"));

        let parsed = ProcessHistory::from_xml(&xml).unwrap();
        assert_eq!(parsed, history);
        assert_eq!(parsed.get(keys::GCP_FILE), Some("points <a&b>.gcp"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut history = ProcessHistory::new(REPROJECTION_PROCESS);
        history.set(keys::PIXELS, 10).set(keys::LINES, 20).set(keys::PIXELS, 30);
        assert_eq!(history.parameters()[0], ("pixeles".to_string(), "30".to_string()));
        assert_eq!(history.parameters().len(), 2);
    }

    #[test]
    fn test_attach_to_dataset() {
        let mut dataset = Dataset::new(1, 1, 1, DataType::Byte);
        assert!(ProcessHistory::from_dataset(&dataset).is_none());
        ProcessHistory::new(REPROJECTION_PROCESS).attach(&mut dataset).unwrap();
        let parsed = ProcessHistory::from_dataset(&dataset).unwrap().unwrap();
        assert_eq!(parsed.name, REPROJECTION_PROCESS);
        assert!(ProcessHistory::from_xml("<otro/>").is_err());
    }
}
