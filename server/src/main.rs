//! Rummage marketplace server daemon.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rummage_common::currency::Currency;
use rummage_common::identity::{CurrentUser, UserId};
use rummage_common::listing::{Category, Condition, ListingDraft};
use rummage_server::AppState;

#[derive(Parser)]
#[command(name = "rummage-server", about = "Rummage marketplace server")]
struct Cli {
    /// HTTP port to listen on.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Seed a few demo users and listings (tokens are logged at startup).
    #[arg(long)]
    seed: bool,
}

fn seed_demo_data(state: &AppState) {
    let sellers = [("alice", "Lyon"), ("carol", "Paris")];
    for (name, city) in sellers {
        let token = state.store.open_session(CurrentUser::verified(name));
        tracing::info!(user = name, %token, "seeded session");

        let drafts = [
            ListingDraft {
                title: format!("{name}'s road bike"),
                description: "Ridden two summers, recently serviced".into(),
                price_cents: 350_00,
                currency: Currency::Usd,
                city: city.into(),
                category: Category::Sports,
                condition: Condition::Used,
            },
            ListingDraft {
                title: format!("{name}'s bookshelf"),
                description: "Oak, minor scratches".into(),
                price_cents: 1_200_00,
                currency: Currency::Usd,
                city: city.into(),
                category: Category::Furniture,
                condition: Condition::LikeNew,
            },
        ];
        for draft in drafts {
            let listing = state.store.insert_listing(draft, UserId(name.into()));
            tracing::info!(listing = %listing.id.0, title = %listing.title, "seeded listing");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let state = Arc::new(AppState::new());

    if cli.seed {
        seed_demo_data(&state);
    }

    let app = rummage_server::router(state);
    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "rummage-server listening");

    axum::serve(listener, app).await.context("server failed")?;
    Ok(())
}
