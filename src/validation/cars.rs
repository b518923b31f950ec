use time::OffsetDateTime;
use uuid::Uuid;

use super::{max_chars, one_of, optional, required, FieldErrors};
use crate::cars::dto::CarInput;
use crate::error::AppResult;
use crate::model::{CarStatus, DriveType, EngineType, FuelType, TransmissionType};
use crate::store::Store;

/// First year a production automobile existed.
pub const MIN_CAR_YEAR: i64 = 1886;
/// Largest value a DECIMAL(10,2) price column holds.
pub const MAX_PRICE: f64 = 99_999_999.99;

#[derive(Debug, Clone, PartialEq)]
pub struct CarDraft {
    pub serial_number: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub drive_type: Option<DriveType>,
    pub color: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub mileage: i64,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<TransmissionType>,
    pub engine: Option<EngineType>,
    pub seats: i32,
    pub doors: i32,
    pub status: CarStatus,
}

fn bounded_int(
    errors: &mut FieldErrors,
    field: &str,
    value: Option<i64>,
    min: i64,
    max: i64,
) -> Option<i64> {
    let Some(v) = value else {
        errors.add(field, format!("The {} field is required.", field));
        return None;
    };
    if v < min {
        errors.add(field, format!("The {} field must be at least {}.", field, min));
        return None;
    }
    if v > max {
        errors.add(
            field,
            format!("The {} field must not be greater than {}.", field, max),
        );
        return None;
    }
    Some(v)
}

/// Checks every car rule that does not need the store. `current_year` bounds
/// `year` to `[1886, current_year + 1]`.
pub fn validate_car_fields(input: &CarInput, current_year: i32) -> Result<CarDraft, FieldErrors> {
    let mut errors = FieldErrors::default();

    let serial_number = required(&mut errors, "serial_number", input.serial_number.as_deref())
        .filter(|s| max_chars(&mut errors, "serial_number", s, 255));
    let brand = required(&mut errors, "brand", input.brand.as_deref())
        .filter(|b| max_chars(&mut errors, "brand", b, 255));
    let model = required(&mut errors, "model", input.model.as_deref())
        .filter(|m| max_chars(&mut errors, "model", m, 255));

    let year = bounded_int(
        &mut errors,
        "year",
        input.year,
        MIN_CAR_YEAR,
        i64::from(current_year) + 1,
    );

    let price = match input.price {
        None => {
            errors.add("price", "The price field is required.");
            None
        }
        Some(p) if !p.is_finite() => {
            errors.add("price", "The price field must be a number.");
            None
        }
        Some(p) if p < 0.0 => {
            errors.add("price", "The price field must be at least 0.");
            None
        }
        Some(p) if p > MAX_PRICE => {
            errors.add(
                "price",
                format!("The price field must not be greater than {}.", MAX_PRICE),
            );
            None
        }
        Some(p) => Some(p),
    };

    let mileage = bounded_int(&mut errors, "mileage", input.mileage, 0, i64::from(i32::MAX));
    let seats = bounded_int(&mut errors, "seats", input.seats, 1, 99);
    let doors = bounded_int(&mut errors, "doors", input.doors, 1, 99);

    let status = required(&mut errors, "status", input.status.as_deref())
        .and_then(|s| one_of::<CarStatus>(&mut errors, "status", s));

    let drive_type = optional(input.drive_type.as_deref())
        .and_then(|d| one_of::<DriveType>(&mut errors, "drive_type", d));
    let fuel_type = optional(input.fuel_type.as_deref())
        .and_then(|f| one_of::<FuelType>(&mut errors, "fuel_type", f));
    let transmission = optional(input.transmission.as_deref())
        .and_then(|t| one_of::<TransmissionType>(&mut errors, "transmission", t));
    let engine = optional(input.engine.as_deref())
        .and_then(|e| one_of::<EngineType>(&mut errors, "engine", e));

    let color = optional(input.color.as_deref())
        .filter(|c| max_chars(&mut errors, "color", c, 255))
        .map(str::to_string);
    let image = optional(input.image.as_deref())
        .filter(|i| max_chars(&mut errors, "image", i, 255))
        .map(str::to_string);

    match (
        serial_number,
        brand,
        model,
        year,
        price,
        mileage,
        seats,
        doors,
        status,
    ) {
        (
            Some(serial_number),
            Some(brand),
            Some(model),
            Some(year),
            Some(price),
            Some(mileage),
            Some(seats),
            Some(doors),
            Some(status),
        ) if errors.is_empty() => Ok(CarDraft {
            serial_number: serial_number.to_string(),
            brand: brand.to_string(),
            model: model.to_string(),
            year: year as i32,
            drive_type,
            color,
            image,
            price,
            mileage,
            fuel_type,
            transmission,
            engine,
            seats: seats as i32,
            doors: doors as i32,
            status,
        }),
        _ => Err(errors),
    }
}

/// Full car rule set: field rules plus serial number uniqueness, which
/// ignores the car being updated.
pub async fn validate_car(
    store: &dyn Store,
    input: &CarInput,
    current: Option<Uuid>,
) -> AppResult<CarDraft> {
    let current_year = OffsetDateTime::now_utc().year();
    let fields = validate_car_fields(input, current_year);

    let serial = input
        .serial_number
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let taken = match serial {
        Some(s) => store.serial_taken(s, current).await?,
        None => false,
    };

    match (fields, taken) {
        (Ok(draft), false) => Ok(draft),
        (Ok(_), true) => {
            let mut errors = FieldErrors::default();
            errors.add("serial_number", "The serial number has already been taken.");
            Err(errors.into())
        }
        (Err(mut errors), taken) => {
            if taken {
                errors.add("serial_number", "The serial number has already been taken.");
            }
            Err(errors.into())
        }
    }
}
