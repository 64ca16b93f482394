//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth::api_key_middleware};

pub mod adjustments;
pub mod api_keys;
pub mod balances;
pub mod billing;
pub mod health;
pub mod opening_balance;
pub mod periods;
pub mod reconcile;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Ledger-scoped routes behind the API key check
    let protected_routes = Router::new()
        .merge(periods::routes())
        .merge(adjustments::routes())
        .merge(balances::routes())
        .merge(opening_balance::routes())
        .merge(reconcile::routes())
        .merge(api_keys::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ));

    // Billing carries its own service-token check; health is open
    Router::new()
        .merge(health::routes())
        .merge(billing::routes())
        .merge(protected_routes)
}
