use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use domain::services::LoyaltyService;
use persistence::PgLoyaltyStore;
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, rate_limit_middleware, require_user_auth,
    security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{health, loyalty_admin, loyalty_customer, redemptions, rewards};

#[derive(Clone)]
pub struct AppState {
    pub service: LoyaltyService<PgLoyaltyStore>,
    pub pool: PgPool,
    pub jwt: Arc<JwtConfig>,
    pub config: Arc<Config>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let jwt = JwtConfig::verifier(&config.jwt.public_key, config.jwt.leeway_secs)?;
        Ok(Self::with_jwt(config, pool, jwt))
    }

    /// Uses a prepared verifier, e.g. one that can also mint test tokens.
    pub fn with_jwt(config: Config, pool: PgPool, jwt: JwtConfig) -> Self {
        let rate_limiter = (config.security.rate_limit_per_minute > 0).then(|| {
            Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
            ))
        });

        let store = PgLoyaltyStore::new(pool.clone());
        let service = LoyaltyService::new(store, config.loyalty.to_settings());

        Self {
            service,
            pool,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
            rate_limiter,
        }
    }
}

pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    Ok(build_router(AppState::new(config, pool)?))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development default
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    // Redemption endpoints are rate limited per user; auth runs first
    let redemption_routes = Router::new()
        .route(
            "/api/v1/loyalty/customer/redeem-code",
            post(loyalty_customer::redeem_code),
        )
        .route(
            "/api/v1/loyalty/customer/redeem-reward",
            post(loyalty_customer::redeem_reward),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    let protected_routes = Router::new()
        // Admin
        .route(
            "/api/v1/loyalty/admin/codes",
            post(loyalty_admin::generate_code).get(loyalty_admin::list_codes),
        )
        .route(
            "/api/v1/loyalty/admin/codes/:id/deactivate",
            patch(loyalty_admin::deactivate_code),
        )
        // Customer
        .route(
            "/api/v1/loyalty/customer/balance",
            get(loyalty_customer::get_balance),
        )
        .route(
            "/api/v1/loyalty/customer/history",
            get(loyalty_customer::get_history),
        )
        .route(
            "/api/v1/loyalty/customer/redemptions",
            get(loyalty_customer::list_redemptions),
        )
        // Owner
        .route("/api/v1/loyalty/owner/rewards", post(rewards::create_reward))
        .route(
            "/api/v1/loyalty/owner/rewards/:id",
            put(rewards::update_reward).delete(rewards::delete_reward),
        )
        .route(
            "/api/v1/loyalty/owner/restaurants/:id/rewards",
            get(rewards::list_owner_rewards),
        )
        .route(
            "/api/v1/loyalty/owner/redemptions/:id/use",
            patch(redemptions::mark_used),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    let public_routes = Router::new()
        .route(
            "/api/v1/loyalty/restaurants/:id/rewards",
            get(rewards::list_restaurant_rewards),
        )
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(redemption_routes)
        .merge(protected_routes)
        // Bottom layers run first
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}

