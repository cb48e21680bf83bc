//! HTTP and WebSocket surface.

use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::{Any, CorsLayer};

use rummage_common::commission::{commission_for, CommissionBreakdown};
use rummage_common::identity::{CurrentUser, UserId};
use rummage_common::listing::{Listing, ListingDraft, ListingId, ListingQuery, ListingSort};
use rummage_common::message::{Message, MessageDraft};
use rummage_common::order::{Order, OrderId, OrderItem, OrderStatusFilter};
use rummage_common::review::{Rating, Review, ReviewId, ReviewPolicy};
use rummage_common::favorite::{Report, ReportReason};
use rummage_common::thread::{self, ThreadSummary};

use crate::auth::{current_user, verified_user};
use crate::error::ApiError;
use crate::realtime::{relevant, MessageFeed};
use crate::store::Store;

pub struct AppState {
    pub store: Store,
    pub feed: MessageFeed,
    pub review_policy: ReviewPolicy,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            store: Store::new(),
            feed: MessageFeed::new(),
            review_policy: ReviewPolicy::default(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/listings", get(search_listings_handler).post(create_listing_handler))
        .route(
            "/api/listings/{id}",
            get(get_listing_handler)
                .patch(reprice_listing_handler)
                .delete(delete_listing_handler),
        )
        .route("/api/listings/{id}/quote", get(quote_handler))
        .route("/api/listings/{id}/favorite", post(toggle_favorite_handler))
        .route("/api/listings/{id}/report", post(report_handler))
        .route(
            "/api/listings/{id}/reviews",
            get(list_reviews_handler).post(create_review_handler),
        )
        .route(
            "/api/listings/{id}/messages",
            get(conversation_handler).post(send_message_handler),
        )
        .route("/api/listings/{id}/messages/read", post(mark_read_handler))
        .route("/api/listings/{id}/messages/ws", get(messages_ws_handler))
        .route("/api/inbox", get(inbox_handler))
        .route("/api/favorites", get(list_favorites_handler))
        .route("/api/orders", get(list_orders_handler).post(create_order_handler))
        .route("/api/orders/{id}", get(get_order_handler))
        .route("/api/orders/{id}/ship", post(ship_handler))
        .route("/api/orders/{id}/cancel", post(cancel_handler))
        .route("/api/orders/{id}/deliver", post(deliver_handler))
        .layer(cors)
        .with_state(state)
}

// ── Auth ─────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginRequest {
    user_id: String,
    #[serde(default = "default_true")]
    email_verified: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
}

async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if req.user_id.trim().is_empty() {
        return Err(ApiError::Validation("user_id must not be empty".into()));
    }
    let user = CurrentUser {
        id: UserId(req.user_id),
        email_verified: req.email_verified,
    };
    let token = state.store.open_session(user);
    Ok(Json(LoginResponse { token }))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

// ── Listings ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    city: Option<String>,
    /// Price bounds in cents.
    min: Option<u64>,
    max: Option<u64>,
    sort: Option<String>,
}

async fn search_listings_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let sort = match params.sort.as_deref() {
        None => ListingSort::default(),
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::Validation(format!("unknown sort '{s}'")))?,
    };
    let query = ListingQuery {
        q: params.q,
        city: params.city,
        min_cents: params.min,
        max_cents: params.max,
        sort,
    };
    Ok(Json(state.store.search_listings(&query)))
}

async fn create_listing_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(draft): Json<ListingDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let user = verified_user(&state.store, &headers)?;
    draft.validate()?;
    let listing = state.store.insert_listing(draft, user.id);
    tracing::info!(listing = %listing.id.0, owner = %listing.owner, "listing created");
    Ok((StatusCode::CREATED, Json(listing)))
}

async fn get_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Listing>, ApiError> {
    state
        .store
        .listing(&ListingId(id))
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state.store, &headers)?;
    state.store.deactivate_listing(&ListingId(id), &user.id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct RepriceRequest {
    price_cents: u64,
}

async fn reprice_listing_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<RepriceRequest>,
) -> Result<Json<Listing>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing = state
        .store
        .reprice_listing(&ListingId(id), &user.id, req.price_cents)?;
    tracing::info!(listing = %listing.id.0, price = listing.price_cents, "listing repriced");
    Ok(Json(listing))
}

#[derive(Deserialize)]
struct QuoteParams {
    /// Price override in cents; defaults to the listing's current price.
    price: Option<u64>,
}

/// Commission preview for a listing (also the authoritative figure applied
/// when an order for it is finalized).
async fn quote_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<CommissionBreakdown>, ApiError> {
    let listing = state.store.listing(&ListingId(id)).ok_or(ApiError::NotFound)?;
    let price = params.price.unwrap_or(listing.price_cents);
    commission_for(price)
        .map(Json)
        .ok_or_else(|| ApiError::Validation("no price entered".into()))
}

// ── Orders ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateOrderRequest {
    listing_id: String,
}

#[derive(Serialize)]
struct OrderDetail {
    order: Order,
    items: Vec<OrderItem>,
}

#[derive(Serialize)]
struct OrderReceipt {
    order: Order,
    items: Vec<OrderItem>,
    commission: CommissionBreakdown,
}

async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let buyer = verified_user(&state.store, &headers)?;
    let order = state
        .store
        .place_order(&ListingId(req.listing_id), &buyer)?;
    let commission = commission_for(order.amount_cents)
        .ok_or_else(|| ApiError::Upstream("stored order with zero amount".into()))?;
    tracing::info!(order = %order.id.0, buyer = %order.buyer, "order placed");
    Ok((
        StatusCode::CREATED,
        Json(OrderReceipt {
            items: state.store.order_items(&order.id),
            commission,
            order,
        }),
    ))
}

#[derive(Deserialize)]
struct OrdersParams {
    status: Option<String>,
}

async fn list_orders_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OrdersParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let filter = match params.status.as_deref() {
        None => OrderStatusFilter::All,
        Some(s) => s
            .parse()
            .map_err(|_| ApiError::Validation(format!("unknown status '{s}'")))?,
    };
    Ok(Json(state.store.orders_for_buyer(&user.id, filter)))
}

async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<OrderDetail>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let id = OrderId(id);
    let order = state.store.order(&id).ok_or(ApiError::NotFound)?;
    // Buyer-scoped: another user's order looks like it does not exist.
    if order.buyer != user.id {
        return Err(ApiError::NotFound);
    }
    Ok(Json(OrderDetail {
        items: state.store.order_items(&id),
        order,
    }))
}

async fn ship_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let order = state
        .store
        .update_order(&OrderId(id), |o| o.ship(&user.id, Utc::now()))?;
    tracing::info!(order = %order.id.0, "order shipped");
    Ok(Json(order))
}

async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let id = OrderId(id);
    let order = state.store.order(&id).ok_or(ApiError::NotFound)?;
    if order.buyer != user.id && order.seller != user.id {
        return Err(ApiError::NotFound);
    }
    // Always refused; returning the error keeps the response idempotent.
    order.cancel()?;
    Ok(Json(order))
}

/// External collaborator hook (admin action or time-based job); not
/// actor-gated by design.
async fn deliver_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .store
        .update_order(&OrderId(id), |o| o.mark_delivered())?;
    Ok(Json(order))
}

// ── Messages ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct SendMessageRequest {
    /// Required when the sender is the listing owner (a seller can talk to
    /// any interested buyer; a buyer always talks to the owner).
    to: Option<String>,
    content: Option<String>,
    image_url: Option<String>,
}

async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing_id = ListingId(id);
    let listing = state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;

    let receiver = if user.id == listing.owner {
        UserId(req.to.ok_or_else(|| {
            ApiError::Validation("seller must name the buyer to message".into())
        })?)
    } else {
        listing.owner.clone()
    };
    let body = MessageDraft {
        content: req.content,
        image_url: req.image_url,
    }
    .into_body()?;

    let message = state
        .store
        .insert_message(listing_id, user.id, receiver, body);
    state.feed.publish(message.clone());
    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Deserialize)]
struct ThreadParams {
    /// Required when the viewer is the listing owner, to pick which buyer's
    /// thread to act on. A buyer's thread is always with the owner.
    with: Option<String>,
}

fn resolve_counterparty(
    listing: &Listing,
    viewer: &UserId,
    with: Option<String>,
) -> Result<UserId, ApiError> {
    if *viewer == listing.owner {
        with.map(UserId).ok_or_else(|| {
            ApiError::Validation("seller must name the buyer with ?with=".into())
        })
    } else {
        Ok(listing.owner.clone())
    }
}

async fn conversation_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ThreadParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Message>>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing_id = ListingId(id);
    let listing = state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;
    let counterparty = resolve_counterparty(&listing, &user.id, params.with)?;
    let raw = state
        .store
        .conversation_messages(&listing_id, &user.id, &counterparty);
    Ok(Json(thread::conversation(&raw)))
}

#[derive(Serialize)]
struct MarkReadResponse {
    updated: usize,
}

async fn mark_read_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ThreadParams>,
    headers: HeaderMap,
) -> Result<Json<MarkReadResponse>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing_id = ListingId(id);
    let listing = state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;
    let counterparty = resolve_counterparty(&listing, &user.id, params.with)?;
    let updated = state
        .store
        .mark_conversation_read(&listing_id, &user.id, &counterparty);
    Ok(Json(MarkReadResponse { updated }))
}

async fn inbox_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ThreadSummary>>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let raw = state.store.messages_for(&user.id);
    Ok(Json(thread::inbox(&raw, &user.id)))
}

#[derive(Deserialize)]
struct WsParams {
    /// Browsers cannot set headers on WebSocket upgrades, so the session
    /// token travels as a query parameter here.
    token: String,
}

async fn messages_ws_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .store
        .session(&params.token)
        .ok_or(ApiError::AuthenticationRequired)?;
    let listing_id = ListingId(id);
    let feed = state.feed.clone();
    Ok(ws.on_upgrade(move |socket| stream_conversation(socket, feed, listing_id, user.id)))
}

async fn stream_conversation(
    mut socket: WebSocket,
    feed: MessageFeed,
    listing_id: ListingId,
    viewer: UserId,
) {
    let mut rx = feed.subscribe();
    loop {
        match rx.recv().await {
            Ok(message) => {
                if !relevant(&message, &listing_id, &viewer) {
                    continue;
                }
                let payload = match serde_json::to_string(&message) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode pushed message");
                        continue;
                    }
                };
                if socket.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            // A lagged subscriber missed pushes; the client's next full
            // fetch re-converges, so just keep streaming.
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "message feed subscriber lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// ── Favorites / reports / reviews ────────────────────────────────────────

#[derive(Serialize)]
struct FavoriteResponse {
    favorited: bool,
}

async fn toggle_favorite_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<FavoriteResponse>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing_id = ListingId(id);
    state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;
    let favorited = state.store.toggle_favorite(&user.id, &listing_id);
    Ok(Json(FavoriteResponse { favorited }))
}

async fn list_favorites_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Listing>>, ApiError> {
    let user = current_user(&state.store, &headers)?;
    Ok(Json(state.store.favorites_of(&user.id)))
}

#[derive(Deserialize)]
struct ReportRequest {
    reason: ReportReason,
    detail: Option<String>,
}

async fn report_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ReportRequest>,
) -> Result<StatusCode, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing_id = ListingId(id);
    state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;
    state.store.upsert_report(Report {
        reporter: user.id,
        listing_id,
        reason: req.reason,
        detail: req.detail,
        created_at: Utc::now(),
    });
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct CreateReviewRequest {
    rating: u8,
    comment: Option<String>,
}

async fn create_review_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = current_user(&state.store, &headers)?;
    let listing_id = ListingId(id);
    let listing = state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;

    let rating = Rating::new(req.rating)?;
    let existing = state.store.reviews_for_listing(&listing_id);
    state
        .review_policy
        .check(&existing, &user.id, &listing_id)?;

    let review = state.store.insert_review(Review {
        id: ReviewId(String::new()), // assigned by the store
        listing_id,
        seller: listing.owner,
        reviewer: user.id,
        rating,
        comment: req.comment,
        created_at: Utc::now(),
    });
    Ok((StatusCode::CREATED, Json(review)))
}

async fn list_reviews_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Review>>, ApiError> {
    let listing_id = ListingId(id);
    state.store.listing(&listing_id).ok_or(ApiError::NotFound)?;
    Ok(Json(state.store.reviews_for_listing(&listing_id)))
}
