use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// An address as typed by the requester, optionally pinned on a map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

impl Place {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            coordinates: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        if self.address.trim().is_empty() {
            return false;
        }

        match &self.coordinates {
            Some(coordinates) => coordinates.is_valid(),
            None => true,
        }
    }
}

#[test]
fn place_requires_address_and_sane_coordinates() {
    assert!(Place::new("Terminal 2, Arrivals").is_valid());
    assert!(!Place::new("   ").is_valid());

    let place = Place {
        address: "Somewhere".into(),
        coordinates: Some(Coordinates {
            lat: 123.0,
            lng: 0.0,
        }),
    };
    assert!(!place.is_valid());
}
