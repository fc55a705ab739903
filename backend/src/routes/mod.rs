//! Route definitions for the Print Shop ERP

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/company", company_routes(state.clone()))
        .nest("/branches", branch_routes(state.clone()))
        .nest("/users", user_routes(state.clone()))
        .nest("/roles", role_routes(state.clone()))
        .nest("/customers", customer_routes(state.clone()))
        .nest("/products", product_routes(state.clone()))
        .nest("/pricing-tiers", pricing_tier_routes(state.clone()))
        .nest("/delivery", delivery_routes(state.clone()))
        .nest("/invoices", invoice_routes(state.clone()))
        .nest("/payment-verifications", verification_routes(state.clone()))
        .nest("/production", production_routes(state.clone()))
        .nest("/reports", report_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Company profile routes (protected)
fn company_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_company).put(handlers::update_company))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Branch routes (protected)
fn branch_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_branches).post(handlers::create_branch))
        .route(
            "/:branch_id",
            get(handlers::get_branch)
                .put(handlers::update_branch)
                .delete(handlers::delete_branch),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// User management routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/:user_id",
            get(handlers::get_user).put(handlers::update_user),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Role management routes (protected)
fn role_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_roles).post(handlers::create_role))
        .route("/permissions", get(handlers::list_permissions))
        .route(
            "/:role_id",
            get(handlers::get_role)
                .put(handlers::update_role)
                .delete(handlers::delete_role),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Customer routes (protected)
fn customer_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_customers).post(handlers::create_customer))
        .route(
            "/:customer_id",
            get(handlers::get_customer)
                .put(handlers::update_customer)
                .delete(handlers::delete_customer),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product catalog routes (protected)
fn product_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/price-preview", post(handlers::price_preview))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Weight pricing tier routes (protected)
fn pricing_tier_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_tiers).post(handlers::create_tier))
        .route(
            "/:tier_id",
            get(handlers::get_tier)
                .put(handlers::update_tier)
                .delete(handlers::delete_tier),
        )
        .route("/:tier_id/status", patch(handlers::toggle_tier_status))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Delivery quote routes (protected)
fn delivery_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/quote", post(handlers::quote_delivery))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Invoice routes (protected)
fn invoice_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_invoices).post(handlers::create_invoice))
        .route("/:invoice_id", get(handlers::get_invoice))
        .route("/:invoice_id/issue", post(handlers::issue_invoice))
        .route("/:invoice_id/payments", post(handlers::record_payment))
        .route("/:invoice_id/cancel", post(handlers::cancel_invoice))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Payment verification routes (protected)
fn verification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_verifications).post(handlers::submit_verification),
        )
        .route("/:verification_id", get(handlers::get_verification))
        .route("/:verification_id/verify", post(handlers::verify_payment))
        .route("/:verification_id/reject", post(handlers::reject_payment))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Production tracking routes (protected)
fn production_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/templates",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route("/templates/:template_id", patch(handlers::update_template))
        .route("/jobs", get(handlers::list_jobs))
        .route(
            "/jobs/:invoice_id",
            get(handlers::get_job).post(handlers::create_job),
        )
        .route("/stages/:stage_id/actions", post(handlers::apply_stage_action))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Reporting routes (protected)
fn report_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(handlers::get_dashboard))
        .route("/invoices", get(handlers::export_invoices))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
