use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::currency::Currency;
use crate::identity::{CurrentUser, UserId};
use crate::listing::{Listing, ListingId, ListingStatus};

/// Unique order identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

/// Buyer-facing order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
    Completed,
}

/// Seller-controlled shipping sub-state, distinct from the order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShippingStatus {
    Preparing,
    Shipped,
}

/// A snapshot line of an order. Title and unit price are frozen at order
/// creation and survive later edits or deletion of the listing; only the
/// listing reference itself may go stale (hence the `Option`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub listing_id: Option<ListingId>,
    pub title_snapshot: String,
    pub unit_price_cents: u64,
    pub quantity: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("a user cannot buy their own listing")]
    SelfPurchase,
    #[error("listing is not available for purchase")]
    ListingUnavailable,
    #[error("order has already been shipped")]
    AlreadyShipped,
    #[error("order has not been shipped yet")]
    NotShipped,
    #[error("cancellation requests are not accepted once an order is placed")]
    CancellationNotAllowed,
    #[error("actor is not a party to this order")]
    Unauthorized,
}

/// A buyer's commitment to purchase one listing.
///
/// `amount_cents` is a snapshot of the listing price at order time; it must
/// never change afterwards, whatever happens to the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub buyer: UserId,
    pub seller: UserId,
    pub listing_id: ListingId,
    pub amount_cents: u64,
    pub currency: Currency,
    pub status: OrderStatus,
    pub shipping_status: ShippingStatus,
    pub created_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Create an order for a listing, with its snapshot line item.
    ///
    /// Refused when the buyer owns the listing or the listing is not active.
    /// No partial state is produced on failure.
    pub fn place(
        id: OrderId,
        listing: &Listing,
        buyer: &CurrentUser,
        now: DateTime<Utc>,
    ) -> Result<(Order, OrderItem), OrderError> {
        if buyer.id == listing.owner {
            return Err(OrderError::SelfPurchase);
        }
        if listing.status != ListingStatus::Active {
            return Err(OrderError::ListingUnavailable);
        }
        let order = Order {
            id,
            buyer: buyer.id.clone(),
            seller: listing.owner.clone(),
            listing_id: listing.id.clone(),
            amount_cents: listing.price_cents,
            currency: listing.currency,
            status: OrderStatus::Pending,
            shipping_status: ShippingStatus::Preparing,
            created_at: now,
            shipped_at: None,
        };
        let item = OrderItem {
            listing_id: Some(listing.id.clone()),
            title_snapshot: listing.title.clone(),
            unit_price_cents: listing.price_cents,
            quantity: 1,
        };
        Ok((order, item))
    }

    /// Seller marks the order shipped. The first call stamps `shipped_at`;
    /// any further call fails and never re-stamps it.
    pub fn ship(&mut self, actor: &UserId, now: DateTime<Utc>) -> Result<(), OrderError> {
        if *actor != self.seller {
            return Err(OrderError::Unauthorized);
        }
        if self.shipping_status == ShippingStatus::Shipped {
            return Err(OrderError::AlreadyShipped);
        }
        self.shipping_status = ShippingStatus::Shipped;
        self.status = OrderStatus::Shipped;
        self.shipped_at = Some(now);
        Ok(())
    }

    /// Cancellation requests are categorically rejected once an order is
    /// placed, in every state. Hard business rule, not a gap.
    pub fn cancel(&self) -> Result<(), OrderError> {
        Err(OrderError::CancellationNotAllowed)
    }

    /// Collaborator hook for the delivered transition (admin action or a
    /// time-based job). Not actor-gated, but only a shipped order can be
    /// delivered.
    pub fn mark_delivered(&mut self) -> Result<(), OrderError> {
        if self.shipping_status != ShippingStatus::Shipped {
            return Err(OrderError::NotShipped);
        }
        self.status = OrderStatus::Delivered;
        Ok(())
    }
}

/// `?status=` filter for the caller's order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderStatusFilter {
    #[default]
    All,
    Preparing,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::str::FromStr for OrderStatusFilter {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(OrderStatusFilter::All),
            "preparing" => Ok(OrderStatusFilter::Preparing),
            "shipped" => Ok(OrderStatusFilter::Shipped),
            "delivered" => Ok(OrderStatusFilter::Delivered),
            "cancelled" => Ok(OrderStatusFilter::Cancelled),
            _ => Err(()),
        }
    }
}

impl OrderStatusFilter {
    pub fn matches(&self, order: &Order) -> bool {
        match self {
            OrderStatusFilter::All => true,
            OrderStatusFilter::Preparing => {
                order.shipping_status == ShippingStatus::Preparing
                    && order.status != OrderStatus::Cancelled
            }
            OrderStatusFilter::Shipped => order.status == OrderStatus::Shipped,
            OrderStatusFilter::Delivered => order.status == OrderStatus::Delivered,
            OrderStatusFilter::Cancelled => order.status == OrderStatus::Cancelled,
        }
    }
}
