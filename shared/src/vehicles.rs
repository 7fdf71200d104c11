use serde::{Deserialize, Serialize};

use crate::model::{Vehicle, VehicleCategory, VehicleId};

const CATALOG: &[(&str, &str, &str, VehicleCategory)] = &[
    ("ather-450x", "450X", "Ather", VehicleCategory::TwoWheeler),
    ("ola-s1-pro", "S1 Pro", "Ola", VehicleCategory::TwoWheeler),
    ("tvs-iqube", "iQube", "TVS", VehicleCategory::TwoWheeler),
    ("bajaj-chetak", "Chetak", "Bajaj", VehicleCategory::TwoWheeler),
    ("tata-nexon-ev", "Nexon EV", "Tata", VehicleCategory::FourWheeler),
    ("mg-zs-ev", "ZS EV", "MG", VehicleCategory::FourWheeler),
    ("hyundai-kona", "Kona Electric", "Hyundai", VehicleCategory::FourWheeler),
    ("mahindra-xuv400", "XUV400", "Mahindra", VehicleCategory::FourWheeler),
    ("olectra-k9", "K9 Bus", "Olectra", VehicleCategory::EightWheeler),
    ("tata-ultra-ev", "Ultra EV", "Tata", VehicleCategory::EightWheeler),
    ("eicher-pro-2049", "Pro 2049 EV", "Eicher", VehicleCategory::EightWheeler),
];

/// Every vehicle the dashboard offers for selection.
#[must_use]
pub fn catalog() -> Vec<Vehicle> {
    CATALOG
        .iter()
        .map(|&(id, name, brand, category)| Vehicle {
            id: VehicleId::new(id),
            name: name.to_string(),
            brand: brand.to_string(),
            category,
            image: format!("/vehicles/{id}.png"),
        })
        .collect()
}

#[must_use]
pub fn find(id: &VehicleId) -> Option<Vehicle> {
    catalog().into_iter().find(|v| &v.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleFilter {
    #[default]
    All,
    Only(VehicleCategory),
}

impl VehicleFilter {
    #[must_use]
    pub fn matches(self, vehicle: &Vehicle) -> bool {
        match self {
            Self::All => true,
            Self::Only(category) => vehicle.category == category,
        }
    }

    #[must_use]
    pub fn apply(self, vehicles: Vec<Vehicle>) -> Vec<Vehicle> {
        vehicles.into_iter().filter(|v| self.matches(v)).collect()
    }
}
