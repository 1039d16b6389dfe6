use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

/// Descriptive concert record. Written by admin tooling, read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Concert {
    pub id: i64,
    pub name: String,
    pub location: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Concert {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(ValidationError::new("location", "must not be empty"));
        }
        Ok(())
    }
}

/// A sellable instance of a concert: one venue, one time slot, one unit price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ConcertSession {
    pub id: i64,
    pub concert_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: String,
    pub number_of_seats: i32,
    pub price: Decimal,
}

impl ConcertSession {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.concert_id <= 0 {
            return Err(ValidationError::new("concert_id", "must be positive"));
        }
        if self.end_time <= self.start_time {
            return Err(ValidationError::new("end_time", "must be after start_time"));
        }
        if self.venue.trim().is_empty() {
            return Err(ValidationError::new("venue", "must not be empty"));
        }
        if self.number_of_seats < 0 {
            return Err(ValidationError::new("number_of_seats", "must not be negative"));
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::new("price", "must not be negative"));
        }
        Ok(())
    }
}
