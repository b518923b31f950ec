use serde::Deserialize;

/// Raw body of a car create or update request. Enumerated attributes arrive
/// as plain strings so that an unknown value is reported per field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CarInput {
    pub serial_number: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub drive_type: Option<String>,
    pub color: Option<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub mileage: Option<i64>,
    pub fuel_type: Option<String>,
    pub transmission: Option<String>,
    pub engine: Option<String>,
    pub seats: Option<i64>,
    pub doors: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CarFilter {
    pub status: Option<String>,
}
