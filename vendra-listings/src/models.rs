use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use vendra_shared::schema::{favorites, projects, properties};

const OPERATIONS: [&str; 2] = ["venta", "alquiler"];
const PROPERTY_STATUSES: [&str; 4] = ["available", "reserved", "sold", "rented"];
const PROJECT_STATUSES: [&str; 3] = ["planning", "construction", "completed"];
const CURRENCIES: [&str; 2] = ["USD", "PEN"];
const MAX_IMAGES: usize = 20;

fn one_of(value: &str, allowed: &[&str], code: &'static str) -> Result<(), ValidationError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(code))
    }
}

fn validate_operation(value: &str) -> Result<(), ValidationError> {
    one_of(value, &OPERATIONS, "operation")
}

fn validate_property_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, &PROPERTY_STATUSES, "property_status")
}

fn validate_project_status(value: &str) -> Result<(), ValidationError> {
    one_of(value, &PROJECT_STATUSES, "project_status")
}

fn validate_currency(value: &str) -> Result<(), ValidationError> {
    one_of(value, &CURRENCIES, "currency")
}

fn validate_media(urls: &[String]) -> Result<(), ValidationError> {
    if urls.len() > MAX_IMAGES {
        return Err(ValidationError::new("too_many_files"));
    }
    if urls.iter().any(|u| !(u.starts_with("http://") || u.starts_with("https://"))) {
        return Err(ValidationError::new("media_url"));
    }
    Ok(())
}

// --- Property ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = properties)]
pub struct Property {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: i64,
    pub currency: String,
    pub operation: String,
    pub property_type: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_m2: Option<f64>,
    pub images: Vec<String>,
    pub status: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize, Validate)]
#[diesel(table_name = properties)]
pub struct NewProperty {
    #[serde(skip_deserializing)]
    pub owner_id: Uuid,
    #[validate(length(min = 5, max = 160))]
    pub title: String,
    #[validate(length(min = 20, max = 5000))]
    pub description: String,
    #[validate(range(min = 1))]
    pub price: i64,
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub currency: String,
    #[validate(custom = "validate_operation")]
    pub operation: String,
    #[validate(length(min = 2, max = 30))]
    pub property_type: String,
    #[validate(length(min = 5, max = 500))]
    pub address: String,
    #[validate(length(min = 2, max = 100))]
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(range(min = 0, max = 100))]
    pub bedrooms: Option<i32>,
    #[validate(range(min = 0, max = 100))]
    pub bathrooms: Option<i32>,
    #[validate(range(min = 1.0))]
    pub area_m2: Option<f64>,
    #[serde(default)]
    #[validate(custom = "validate_media")]
    pub images: Vec<String>,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

#[derive(Debug, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = properties)]
pub struct UpdateProperty {
    #[validate(length(min = 5, max = 160))]
    pub title: Option<String>,
    #[validate(length(min = 20, max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price: Option<i64>,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    #[validate(custom = "validate_operation")]
    pub operation: Option<String>,
    #[validate(length(min = 2, max = 30))]
    pub property_type: Option<String>,
    #[validate(length(min = 5, max = 500))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
    pub area_m2: Option<f64>,
    #[validate(custom = "validate_media")]
    pub images: Option<Vec<String>>,
    #[validate(custom = "validate_property_status")]
    pub status: Option<String>,
    pub is_published: Option<bool>,
}

// --- Project ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = projects)]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub price_from: Option<i64>,
    pub currency: String,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub units_total: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    pub images: Vec<String>,
    pub plans: Vec<String>,
    pub status: String,
    pub is_published: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Deserialize, Validate)]
#[diesel(table_name = projects)]
pub struct NewProject {
    #[serde(skip_deserializing)]
    pub owner_id: Uuid,
    #[validate(length(min = 5, max = 160))]
    pub title: String,
    #[validate(length(min = 20, max = 5000))]
    pub description: String,
    #[validate(range(min = 1))]
    pub price_from: Option<i64>,
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub currency: String,
    #[validate(length(min = 5, max = 500))]
    pub address: String,
    #[validate(length(min = 2, max = 100))]
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[validate(range(min = 1))]
    pub units_total: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(custom = "validate_media")]
    pub images: Vec<String>,
    #[serde(default)]
    #[validate(custom = "validate_media")]
    pub plans: Vec<String>,
    #[serde(default = "default_project_status")]
    #[validate(custom = "validate_project_status")]
    pub status: String,
    #[serde(default = "default_published")]
    pub is_published: bool,
}

#[derive(Debug, AsChangeset, Deserialize, Validate, Default)]
#[diesel(table_name = projects)]
pub struct UpdateProject {
    #[validate(length(min = 5, max = 160))]
    pub title: Option<String>,
    #[validate(length(min = 20, max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1))]
    pub price_from: Option<i64>,
    #[validate(custom = "validate_currency")]
    pub currency: Option<String>,
    #[validate(length(min = 5, max = 500))]
    pub address: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub units_total: Option<i32>,
    pub delivery_date: Option<NaiveDate>,
    #[validate(custom = "validate_media")]
    pub images: Option<Vec<String>>,
    #[validate(custom = "validate_media")]
    pub plans: Option<Vec<String>>,
    #[validate(custom = "validate_project_status")]
    pub status: Option<String>,
    pub is_published: Option<bool>,
}

fn default_currency() -> String { "USD".into() }
fn default_published() -> bool { true }
fn default_project_status() -> String { "planning".into() }

// --- Favorite ---

#[derive(Debug, Insertable)]
#[diesel(table_name = favorites)]
pub struct NewFavorite {
    pub user_id: Uuid,
    pub property_id: Uuid,
}

/// Media URLs present in `before` but not in `after`.
pub fn dropped_media(before: &[String], after: &[String]) -> Vec<String> {
    before.iter().filter(|u| !after.contains(u)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property_body() -> serde_json::Value {
        serde_json::json!({
            "title": "Departamento en Miraflores",
            "description": "Tres dormitorios, vista al mar, cochera doble.",
            "price": 250000,
            "operation": "venta",
            "property_type": "departamento",
            "address": "Av. Larco 123",
            "city": "Lima",
            "images": ["http://localhost:9000/property-images/u/1.jpg"]
        })
    }

    #[test]
    fn property_defaults_are_filled() {
        let p: NewProperty = serde_json::from_value(property_body()).unwrap();
        assert_eq!(p.currency, "USD");
        assert!(p.is_published);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn owner_cannot_be_injected_from_body() {
        let mut body = property_body();
        body["owner_id"] = serde_json::json!(Uuid::now_v7());
        let p: NewProperty = serde_json::from_value(body).unwrap();
        assert_eq!(p.owner_id, Uuid::nil());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let mut body = property_body();
        body["operation"] = serde_json::json!("permuta");
        let p: NewProperty = serde_json::from_value(body).unwrap();
        assert!(p.validate().is_err());
    }

    #[test]
    fn non_http_media_is_rejected() {
        assert!(validate_media(&["javascript:alert(1)".to_string()]).is_err());
        assert!(validate_media(&vec!["https://x/y.jpg".to_string(); MAX_IMAGES + 1]).is_err());
    }

    #[test]
    fn dropped_media_lists_removed_urls() {
        let before = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let after = vec!["c".to_string(), "d".to_string()];
        assert_eq!(dropped_media(&before, &after), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn project_status_is_checked() {
        let update = UpdateProject { status: Some("demolished".into()), ..Default::default() };
        assert!(update.validate().is_err());
        let update = UpdateProject { status: Some("construction".into()), ..Default::default() };
        assert!(update.validate().is_ok());
    }
}
