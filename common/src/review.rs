use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::UserId;
use crate::listing::ListingId;

/// Unique review identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

/// A 1-to-5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct RatingError(pub u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (1..=5).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(RatingError(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> u8 {
        r.0
    }
}

/// A buyer's review of a listing. The seller is denormalized from the
/// listing owner at write time so reviews survive listing deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub listing_id: ListingId,
    pub seller: UserId,
    pub reviewer: UserId,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("reviewer has already reviewed this listing")]
pub struct DuplicateReview;

/// Whether one reviewer may review the same listing more than once.
/// Nothing in the data model prevents it, so it is an explicit policy
/// choice rather than a silent assumption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewPolicy {
    pub allow_multiple_per_listing: bool,
}

impl ReviewPolicy {
    /// Check a prospective review against the existing set.
    pub fn check<'a>(
        &self,
        existing: impl IntoIterator<Item = &'a Review>,
        reviewer: &UserId,
        listing_id: &ListingId,
    ) -> Result<(), DuplicateReview> {
        if self.allow_multiple_per_listing {
            return Ok(());
        }
        let duplicate = existing
            .into_iter()
            .any(|r| r.reviewer == *reviewer && r.listing_id == *listing_id);
        if duplicate {
            Err(DuplicateReview)
        } else {
            Ok(())
        }
    }
}

/// Mean rating for a seller, for profile display.
pub fn average_rating<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Option<f64> {
    let mut sum = 0u32;
    let mut count = 0u32;
    for r in reviews {
        sum += r.rating.value() as u32;
        count += 1;
    }
    (count > 0).then(|| sum as f64 / count as f64)
}
