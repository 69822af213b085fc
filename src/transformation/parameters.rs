//! Named parameter bag consumed by the transformation factory

use std::collections::HashMap;

use crate::gcp::GroundControlPoint;

/// Parameter keys recognized by the factory
pub mod keys {
    /// WKT of the source spatial reference
    pub const SR_WKT_IN: &str = "SRWktIn";
    /// WKT of the destination spatial reference
    pub const SR_WKT_OUT: &str = "SRWktOut";
    /// Control points for fitted transformations
    pub const GCPS: &str = "Gcps";
    /// Polynomial order
    pub const ORDER: &str = "Order";
}

/// A single parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Text value (WKT strings, names)
    Text(String),
    /// Integer value (orders, counts)
    Integer(i64),
    /// Control point list
    Gcps(Vec<GroundControlPoint>),
}

/// Key/value collection handed to `TransformationFactory::create`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterCollection {
    values: HashMap<String, ParameterValue>,
}

impl ParameterCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        ParameterCollection::default()
    }

    /// Set a value, replacing any previous one under the same key
    pub fn add_value(&mut self, key: &str, value: ParameterValue) -> &mut Self {
        self.values.insert(key.to_string(), value);
        self
    }

    /// Text value stored under `key`
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(ParameterValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer value stored under `key`
    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(ParameterValue::Integer(v)) => Some(*v),
            _ => None,
        }
    }

    /// Control points stored under `key`
    pub fn gcps(&self, key: &str) -> Option<&[GroundControlPoint]> {
        match self.values.get(key) {
            Some(ParameterValue::Gcps(points)) => Some(points.as_slice()),
            _ => None,
        }
    }

    /// Whether a value exists under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}
