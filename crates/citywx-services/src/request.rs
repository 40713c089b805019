//! Inbound request validation for the city summary endpoint.

use std::collections::BTreeMap;
use std::fmt;

use citywx_core::WeatherError;
use serde::Serialize;

pub const CITY_MIN_CHARS: usize = 2;
pub const CITY_MAX_CHARS: usize = 80;

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    pub message: String,
    pub errors: BTreeMap<String, Vec<String>>,
}

impl FieldErrors {
    fn new() -> Self {
        Self {
            message: "Invalid request data.".to_string(),
            errors: BTreeMap::new(),
        }
    }

    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded for `field`.
    pub fn for_field(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for (field, messages) in &self.errors {
            write!(f, " {}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

impl From<FieldErrors> for WeatherError {
    fn from(errors: FieldErrors) -> Self {
        WeatherError::invalid_input(errors.to_string())
    }
}

/// A validated city query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityQuery {
    city: String,
}

impl CityQuery {
    /// Validate an optional raw `city` parameter.
    ///
    /// # Errors
    /// Returns every failed rule for the `city` field.
    pub fn parse(raw: Option<&str>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let city = raw.map(str::trim).unwrap_or_default();

        if city.is_empty() {
            errors.add("city", "City parameter is required.");
            return Err(errors);
        }

        let len = city.chars().count();
        if len < CITY_MIN_CHARS {
            errors.add(
                "city",
                format!("City name must be at least {} characters long.", CITY_MIN_CHARS),
            );
        } else if len > CITY_MAX_CHARS {
            errors.add(
                "city",
                format!("City name cannot be longer than {} characters.", CITY_MAX_CHARS),
            );
        }

        if !city
            .chars()
            .all(|c| c.is_alphabetic() || c.is_whitespace() || c == '-')
        {
            errors.add("city", "City name contains invalid characters.");
        }

        if errors.is_empty() {
            Ok(Self {
                city: city.to_string(),
            })
        } else {
            Err(errors)
        }
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn into_city(self) -> String {
        self.city
    }
}
