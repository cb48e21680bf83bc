use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::currency::Currency;
use crate::identity::UserId;

/// Unique listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

/// Lifecycle status of a listing. Only the owner mutates it; a "deleted"
/// listing is normally just marked `Inactive` (soft delete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Sold,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Used,
    ForParts,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Electronics,
    Furniture,
    Clothing,
    Books,
    Sports,
    Toys,
    Other(String),
}

/// A single item offered for sale by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    /// Price in cents. Invariant: > 0.
    pub price_cents: u64,
    pub currency: Currency,
    pub city: String,
    pub category: Category,
    pub condition: Condition,
    pub status: ListingStatus,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("price must be greater than zero")]
    NonPositivePrice,
    #[error("city must not be empty")]
    EmptyCity,
}

/// What a seller submits to create a listing. Validated at the boundary,
/// before any storage call is issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingDraft {
    pub title: String,
    pub description: String,
    pub price_cents: u64,
    #[serde(default)]
    pub currency: Currency,
    pub city: String,
    pub category: Category,
    pub condition: Condition,
}

impl ListingDraft {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.price_cents == 0 {
            return Err(ValidationError::NonPositivePrice);
        }
        if self.city.trim().is_empty() {
            return Err(ValidationError::EmptyCity);
        }
        Ok(())
    }

    pub fn into_listing(self, id: ListingId, owner: UserId, now: DateTime<Utc>) -> Listing {
        Listing {
            id,
            title: self.title,
            description: self.description,
            price_cents: self.price_cents,
            currency: self.currency,
            city: self.city,
            category: self.category,
            condition: self.condition,
            status: ListingStatus::Active,
            owner,
            created_at: now,
        }
    }
}

/// Hard cap on browse results.
pub const MAX_RESULTS: usize = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

impl std::str::FromStr for ListingSort {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newest" => Ok(ListingSort::Newest),
            "price_asc" => Ok(ListingSort::PriceAsc),
            "price_desc" => Ok(ListingSort::PriceDesc),
            _ => Err(()),
        }
    }
}

/// Browse filter over active listings. `q` is a case-insensitive substring
/// match against title and description.
#[derive(Debug, Clone, Default)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub city: Option<String>,
    pub min_cents: Option<u64>,
    pub max_cents: Option<u64>,
    pub sort: ListingSort,
}

impl ListingQuery {
    fn matches(&self, listing: &Listing) -> bool {
        if listing.status != ListingStatus::Active {
            return false;
        }
        if let Some(q) = &self.q {
            let q = q.to_lowercase();
            if !listing.title.to_lowercase().contains(&q)
                && !listing.description.to_lowercase().contains(&q)
            {
                return false;
            }
        }
        if let Some(city) = &self.city {
            if !listing.city.eq_ignore_ascii_case(city) {
                return false;
            }
        }
        if let Some(min) = self.min_cents {
            if listing.price_cents < min {
                return false;
            }
        }
        if let Some(max) = self.max_cents {
            if listing.price_cents > max {
                return false;
            }
        }
        true
    }

    /// Filter, sort, and cap a set of listings.
    pub fn apply(&self, listings: impl IntoIterator<Item = Listing>) -> Vec<Listing> {
        let mut hits: Vec<Listing> = listings.into_iter().filter(|l| self.matches(l)).collect();
        match self.sort {
            ListingSort::Newest => {
                hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            ListingSort::PriceAsc => {
                hits.sort_by(|a, b| a.price_cents.cmp(&b.price_cents).then(a.id.cmp(&b.id)))
            }
            ListingSort::PriceDesc => {
                hits.sort_by(|a, b| b.price_cents.cmp(&a.price_cents).then(a.id.cmp(&b.id)))
            }
        }
        hits.truncate(MAX_RESULTS);
        hits
    }
}
