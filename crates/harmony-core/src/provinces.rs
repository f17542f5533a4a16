use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Province {
    pub id: &'static str,
    pub name: &'static str,
    /// Provincial capital, used for weather lookups and as a map fallback.
    pub latitude: f64,
    pub longitude: f64,
}

pub const PROVINCES: &[Province] = &[
    Province {
        id: "jakarta",
        name: "DKI Jakarta",
        latitude: -6.2088,
        longitude: 106.8456,
    },
    Province {
        id: "jabar",
        name: "Jawa Barat",
        latitude: -6.9175,
        longitude: 107.6191,
    },
    Province {
        id: "jateng",
        name: "Jawa Tengah",
        latitude: -6.9667,
        longitude: 110.4167,
    },
    Province {
        id: "yogya",
        name: "DI Yogyakarta",
        latitude: -7.7956,
        longitude: 110.3695,
    },
    Province {
        id: "jatim",
        name: "Jawa Timur",
        latitude: -7.2575,
        longitude: 112.7521,
    },
    Province {
        id: "bali",
        name: "Bali",
        latitude: -8.6705,
        longitude: 115.2126,
    },
    Province {
        id: "banten",
        name: "Banten",
        latitude: -6.1200,
        longitude: 106.1503,
    },
    Province {
        id: "sumut",
        name: "Sumatera Utara",
        latitude: 3.5952,
        longitude: 98.6722,
    },
    Province {
        id: "sumbar",
        name: "Sumatera Barat",
        latitude: -0.9471,
        longitude: 100.4172,
    },
    Province {
        id: "sulsel",
        name: "Sulawesi Selatan",
        latitude: -5.1477,
        longitude: 119.4327,
    },
    Province {
        id: "kaltim",
        name: "Kalimantan Timur",
        latitude: -0.5022,
        longitude: 117.1536,
    },
    Province {
        id: "papua",
        name: "Papua",
        latitude: -2.5337,
        longitude: 140.7181,
    },
];

#[must_use]
pub fn find_province(id: &str) -> Option<&'static Province> {
    PROVINCES.iter().find(|p| p.id == id)
}
