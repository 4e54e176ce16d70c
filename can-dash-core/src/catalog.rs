//! Signal catalog
//!
//! A static name → descriptor table built once from the loaded signal
//! database. The dashboard uses it for display ranges and units; the signal
//! store uses its name set to size its slots.

use crate::signals::SignalDatabase;
use serde::Serialize;
use std::collections::BTreeMap;

/// Display-oriented description of one signal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalDescriptor {
    pub name: String,
    /// Advisory lower bound of the physical value
    pub minimum: f64,
    /// Advisory upper bound of the physical value
    pub maximum: f64,
    pub unit: Option<String>,
    pub comment: Option<String>,
}

/// Immutable name → descriptor table
#[derive(Debug, Clone, Default)]
pub struct SignalCatalog {
    descriptors: BTreeMap<String, SignalDescriptor>,
}

impl SignalCatalog {
    /// Build the catalog from every signal of every message in the database
    ///
    /// A signal name defined by several messages keeps the last definition
    /// loaded.
    pub fn from_database(db: &SignalDatabase) -> Self {
        let descriptors = db
            .messages()
            .flat_map(|msg| msg.signals.iter())
            .map(|sig| {
                (
                    sig.name.clone(),
                    SignalDescriptor {
                        name: sig.name.clone(),
                        minimum: sig.min,
                        maximum: sig.max,
                        unit: sig.unit.clone(),
                        comment: sig.comment.clone(),
                    },
                )
            })
            .collect();

        Self { descriptors }
    }

    pub fn get(&self, name: &str) -> Option<&SignalDescriptor> {
        self.descriptors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.descriptors.contains_key(name)
    }

    /// All signal names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignalDescriptor> {
        self.descriptors.values()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::database::tests::{message, signal};

    #[test]
    fn test_catalog_from_database() {
        let mut db = SignalDatabase::new();
        let mut speed = signal("speed_average_non_driven", 0, 16, 0.015625);
        speed.unit = Some("km/h".to_string());
        speed.max = 1023.984375;
        db.add_message(message(0x3E9, "Wheel_Speeds", vec![speed]));
        db.add_message(message(
            0x1E5,
            "Chassis",
            vec![signal("steering_wheel_angle", 0, 16, 0.0625)],
        ));

        let catalog = SignalCatalog::from_database(&db);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("steering_wheel_angle"));

        let desc = catalog.get("speed_average_non_driven").unwrap();
        assert_eq!(desc.unit.as_deref(), Some("km/h"));
        assert_eq!(desc.minimum, 0.0);
        assert_eq!(desc.maximum, 1023.984375);

        let names: Vec<&str> = catalog.names().collect();
        assert_eq!(names, vec!["speed_average_non_driven", "steering_wheel_angle"]);
    }

    #[test]
    fn test_duplicate_name_keeps_last_loaded() {
        let mut db = SignalDatabase::new();
        let mut first = signal("fuel_level_percent", 0, 8, 0.5);
        first.max = 127.5;
        let mut second = signal("fuel_level_percent", 0, 8, 1.0);
        second.max = 100.0;
        // Higher identifier loaded first
        db.add_message(message(0x200, "Fuel_Raw", vec![first]));
        db.add_message(message(0x100, "Fuel_Scaled", vec![second]));

        let catalog = SignalCatalog::from_database(&db);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("fuel_level_percent").unwrap().maximum, 100.0);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = SignalCatalog::from_database(&SignalDatabase::new());
        assert!(catalog.is_empty());
        assert!(catalog.get("anything").is_none());
    }
}
