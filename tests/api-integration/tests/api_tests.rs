use rummage_api_integration::TestServer;
use serde_json::{json, Value};

#[tokio::test]
async fn health_is_ok() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .get(format!("{}/health", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn order_list_requires_authentication() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .get(format!("{}/api/orders", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn unverified_email_cannot_create_listing() {
    let server = TestServer::spawn().await;
    let token = server.login_with("mallory", false).await;
    let resp = server
        .client
        .post(format!("{}/api/listings", server.base))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Thing",
            "description": "",
            "price_cents": 1000,
            "city": "Lyon",
            "category": "Books",
            "condition": "used",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn listing_search_filters_and_sorts() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    server.create_listing(&alice, "Cheap atlas", 500).await;
    server.create_listing(&alice, "Dear atlas", 9_000).await;

    let hits: Vec<Value> = server
        .client
        .get(format!(
            "{}/api/listings?q=atlas&min=1000&sort=price_asc",
            server.base
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["title"], "Dear atlas");

    let bad_sort = server
        .client
        .get(format!("{}/api/listings?sort=sideways", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_sort.status(), 400);
}

#[tokio::test]
async fn commission_quote_uses_tier_boundary() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let listing = server.create_listing(&alice, "Piano", 100_000).await;

    let at_boundary: Value = server
        .client
        .get(format!("{}/api/listings/{listing}/quote", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(at_boundary["rate_bps"], 700);
    assert_eq!(at_boundary["commission_cents"], 7_000);
    assert_eq!(at_boundary["net_cents"], 93_000);

    let above: Value = server
        .client
        .get(format!(
            "{}/api/listings/{listing}/quote?price=100001",
            server.base
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(above["rate_bps"], 600);
}

#[tokio::test]
async fn checkout_ship_deliver_flow() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let listing = server.create_listing(&alice, "Bicycle", 35_000).await;

    // Bob buys.
    let resp = server
        .client
        .post(format!("{}/api/orders", server.base))
        .bearer_auth(&bob)
        .json(&json!({ "listing_id": listing }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let receipt: Value = resp.json().await.unwrap();
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();
    assert_eq!(receipt["order"]["amount_cents"], 35_000);
    assert_eq!(receipt["commission"]["rate_bps"], 700);
    assert_eq!(receipt["items"][0]["title_snapshot"], "Bicycle");

    // Bob sees his order with line items; Alice gets a 404 for it
    // (buyer-scoped, not-owned looks like not-found).
    let detail = server
        .client
        .get(format!("{}/api/orders/{order_id}", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 200);
    let not_owned = server
        .client
        .get(format!("{}/api/orders/{order_id}", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(not_owned.status(), 404);

    // Deliver before shipping is refused.
    let premature = server
        .client
        .post(format!("{}/api/orders/{order_id}/deliver", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(premature.status(), 409);

    // Buyer cannot ship; seller can, exactly once.
    let buyer_ship = server
        .client
        .post(format!("{}/api/orders/{order_id}/ship", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(buyer_ship.status(), 403);

    let shipped: Value = server
        .client
        .post(format!("{}/api/orders/{order_id}/ship", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let first_stamp = shipped["shipped_at"].as_str().unwrap().to_string();

    let again = server
        .client
        .post(format!("{}/api/orders/{order_id}/ship", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(again.status(), 409);

    // Delivery hook completes the order; the stamp never moved.
    let delivered: Value = server
        .client
        .post(format!("{}/api/orders/{order_id}/deliver", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(delivered["status"], "delivered");
    assert_eq!(delivered["shipped_at"].as_str().unwrap(), first_stamp);
}

#[tokio::test]
async fn self_purchase_is_refused() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let listing = server.create_listing(&alice, "Mirror", 2_000).await;

    let resp = server
        .client
        .post(format!("{}/api/orders", server.base))
        .bearer_auth(&alice)
        .json(&json!({ "listing_id": listing }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let orders: Vec<Value> = server
        .client
        .get(format!("{}/api/orders", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn cancellation_is_always_refused() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let listing = server.create_listing(&alice, "Kettle", 1_500).await;

    let receipt: Value = server
        .client
        .post(format!("{}/api/orders", server.base))
        .bearer_auth(&bob)
        .json(&json!({ "listing_id": listing }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    for token in [&bob, &alice] {
        let resp = server
            .client
            .post(format!("{}/api/orders/{order_id}/cancel", server.base))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 409);
    }

    // Still pending after shipping, same refusal.
    server
        .client
        .post(format!("{}/api/orders/{order_id}/ship", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    let resp = server
        .client
        .post(format!("{}/api/orders/{order_id}/cancel", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let detail: Value = server
        .client
        .get(format!("{}/api/orders/{order_id}", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["order"]["status"], "shipped");
}

#[tokio::test]
async fn messaging_inbox_and_read_flow() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let listing = server.create_listing(&alice, "Rug", 4_000).await;

    // Bob asks about the rug; an image message follows.
    for body in [
        json!({ "content": "Is this still available?" }),
        json!({ "image_url": "https://img.example/floor.jpg" }),
    ] {
        let resp = server
            .client
            .post(format!("{}/api/listings/{listing}/messages", server.base))
            .bearer_auth(&bob)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }

    // Text and image at once is malformed.
    let both = server
        .client
        .post(format!("{}/api/listings/{listing}/messages", server.base))
        .bearer_auth(&bob)
        .json(&json!({ "content": "hi", "image_url": "https://x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(both.status(), 400);

    // Alice's inbox shows one unread thread with Bob.
    let inbox: Vec<Value> = server
        .client
        .get(format!("{}/api/inbox", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["counterparty"], "bob");
    assert_eq!(inbox[0]["has_unread"], true);

    // Alice reads the conversation; the flag clears.
    let read: Value = server
        .client
        .post(format!(
            "{}/api/listings/{listing}/messages/read?with=bob",
            server.base
        ))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["updated"], 2);

    let inbox: Vec<Value> = server
        .client
        .get(format!("{}/api/inbox", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox[0]["has_unread"], false);

    // The conversation view is chronological for both parties.
    let thread: Vec<Value> = server
        .client
        .get(format!("{}/api/listings/{listing}/messages", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread.len(), 2);
    assert!(thread[0]["body"]["text"].is_string());
    assert!(thread[1]["body"]["image"].is_string());
}

#[tokio::test]
async fn seller_views_each_buyer_thread_separately() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let carol = server.login("carol").await;
    let listing = server.create_listing(&alice, "Bike", 12_000).await;

    for (token, text) in [(&bob, "still available?"), (&carol, "would you take less?")] {
        let resp = server
            .client
            .post(format!("{}/api/listings/{listing}/messages", server.base))
            .bearer_auth(token)
            .json(&json!({ "content": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }

    // Without naming a buyer the owner's request is rejected.
    let ambiguous = server
        .client
        .get(format!("{}/api/listings/{listing}/messages", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(ambiguous.status(), 400);

    // Each named thread holds only that buyer's messages.
    let bob_thread: Vec<Value> = server
        .client
        .get(format!(
            "{}/api/listings/{listing}/messages?with=bob",
            server.base
        ))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bob_thread.len(), 1);
    assert_eq!(bob_thread[0]["sender"], "bob");

    // Reading Bob's thread leaves Carol's inbox row unread.
    let read: Value = server
        .client
        .post(format!(
            "{}/api/listings/{listing}/messages/read?with=bob",
            server.base
        ))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(read["updated"], 1);

    let inbox: Vec<Value> = server
        .client
        .get(format!("{}/api/inbox", server.base))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox.len(), 2);
    for row in &inbox {
        let expect_unread = row["counterparty"] == "carol";
        assert_eq!(row["has_unread"], json!(expect_unread));
    }
}

#[tokio::test]
async fn owner_reprice_leaves_existing_orders_alone() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let listing = server.create_listing(&alice, "Desk", 50_000).await;

    let receipt: Value = server
        .client
        .post(format!("{}/api/orders", server.base))
        .bearer_auth(&bob)
        .json(&json!({ "listing_id": listing }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let order_id = receipt["order"]["id"].as_str().unwrap().to_string();

    // Only the owner may edit the price.
    let forbidden = server
        .client
        .patch(format!("{}/api/listings/{listing}", server.base))
        .bearer_auth(&bob)
        .json(&json!({ "price_cents": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    let repriced: Value = server
        .client
        .patch(format!("{}/api/listings/{listing}", server.base))
        .bearer_auth(&alice)
        .json(&json!({ "price_cents": 65_000 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(repriced["price_cents"], 65_000);

    // The placed order keeps its snapshot amount.
    let detail: Value = server
        .client
        .get(format!("{}/api/orders/{order_id}", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["order"]["amount_cents"], 50_000);
    assert_eq!(detail["items"][0]["unit_price_cents"], 50_000);
}

#[tokio::test]
async fn favorite_toggle_roundtrip() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let listing = server.create_listing(&alice, "Lamp", 900).await;

    let url = format!("{}/api/listings/{listing}/favorite", server.base);
    let on: Value = server
        .client
        .post(&url)
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(on["favorited"], true);

    let favorites: Vec<Value> = server
        .client
        .get(format!("{}/api/favorites", server.base))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);

    let off: Value = server
        .client
        .post(&url)
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(off["favorited"], false);
}

#[tokio::test]
async fn reviews_reject_bad_ratings_and_duplicates() {
    let server = TestServer::spawn().await;
    let alice = server.login("alice").await;
    let bob = server.login("bob").await;
    let listing = server.create_listing(&alice, "Skis", 12_000).await;
    let url = format!("{}/api/listings/{listing}/reviews", server.base);

    let out_of_range = server
        .client
        .post(&url)
        .bearer_auth(&bob)
        .json(&json!({ "rating": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), 400);

    let created = server
        .client
        .post(&url)
        .bearer_auth(&bob)
        .json(&json!({ "rating": 5, "comment": "great seller" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let review: Value = created.json().await.unwrap();
    // Seller denormalized from the listing owner at write time.
    assert_eq!(review["seller"], "alice");

    let duplicate = server
        .client
        .post(&url)
        .bearer_auth(&bob)
        .json(&json!({ "rating": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);
}
