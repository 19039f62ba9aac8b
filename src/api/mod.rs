// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 SwipesBlue

use axum::{
    body::Body,
    extract::Request,
    http,
    middleware::{self, Next},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        middleware::{require_api_key, require_permission, require_platform},
        permissions, ApiKeyContext, INTERNAL_PLATFORM,
    },
    error::ErrorBody,
    state::AppState,
    tiers::{EntitlementRecord, FeatureValue, Tier, TierErrorBody},
    webhooks::{
        receiver::{self, receive_partner_webhook},
        DeliveryStatus, InboundEnvelope, RegisteredEndpoint, TestDeliveryResult, WebhookDelivery,
        WebhookEndpoint, WebhookEventPayload, WebhookEventType,
    },
};

pub mod health;
pub mod keys;
pub mod tiers;
pub mod webhooks;

pub fn router(state: AppState) -> Router {
    // Gates run key -> permission -> platform; later route_layers wrap earlier ones.
    let tier_routes = Router::new()
        .route("/tiers", get(tiers::list_tiers))
        .route("/tiers/check", get(tiers::check_tier))
        .route("/tiers/capacity", get(tiers::product_capacity))
        .route("/tiers/{tier}", get(tiers::get_tier))
        .route("/features/{feature}", get(tiers::feature_access))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_permission(permissions::READ_ENTITLEMENTS, req, next)
        }));

    let webhook_routes = Router::new()
        .route(
            "/webhooks",
            get(webhooks::list_webhooks).post(webhooks::register_webhook),
        )
        .route("/webhooks/{endpoint_id}/test", post(webhooks::test_webhook))
        .route(
            "/webhooks/{endpoint_id}/deactivate",
            post(webhooks::deactivate_webhook),
        )
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_permission(permissions::MANAGE_WEBHOOKS, req, next)
        }));

    let key_routes = Router::new()
        .route(
            "/api-keys",
            get(keys::list_api_keys).post(keys::provision_api_key),
        )
        .route(
            "/api-keys/{key_id}/deactivate",
            post(keys::deactivate_api_key),
        )
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_platform(INTERNAL_PLATFORM, req, next)
        }))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_permission(permissions::MANAGE_API_KEYS, req, next)
        }));

    let v1_routes = Router::new()
        .merge(tier_routes)
        .merge(webhook_routes)
        .merge(key_routes)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .route("/webhooks/partner", post(receive_partner_webhook))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &http::Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri().path(),
                    request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        tiers::list_tiers,
        tiers::check_tier,
        tiers::get_tier,
        tiers::product_capacity,
        tiers::feature_access,
        webhooks::list_webhooks,
        webhooks::register_webhook,
        webhooks::test_webhook,
        webhooks::deactivate_webhook,
        keys::list_api_keys,
        keys::provision_api_key,
        keys::deactivate_api_key,
        receiver::receive_partner_webhook
    ),
    components(
        schemas(
            ErrorBody,
            TierErrorBody,
            ApiKeyContext,
            Tier,
            FeatureValue,
            EntitlementRecord,
            tiers::TierSummary,
            tiers::TierDetail,
            tiers::TierCheckResponse,
            tiers::ProductCapacity,
            tiers::FeatureAccess,
            WebhookEventType,
            WebhookEndpoint,
            WebhookDelivery,
            DeliveryStatus,
            WebhookEventPayload,
            InboundEnvelope,
            RegisteredEndpoint,
            TestDeliveryResult,
            webhooks::RegisterWebhookRequest,
            keys::ApiKeySummary,
            keys::ProvisionApiKeyRequest,
            keys::ProvisionedApiKey,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Tiers", description = "Tier ranking and entitlements"),
        (name = "Webhooks", description = "Outbound endpoints and inbound partner events"),
        (name = "API Keys", description = "Partner credential provisioning")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ApiKey;
    use crate::storage::InMemoryApiKeyStore;
    use axum::{body::to_bytes, http::StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    const INTERNAL_TOKEN: &str = "sb_live_internal";
    const READER_TOKEN: &str = "sb_live_reader";
    const HOSTSBLUE_TOKEN: &str = "sb_live_hostsblue";
    const BUSINESS_TOKEN: &str = "sb_live_business";

    fn app() -> Router {
        let keys = [
            ApiKey::with_token(INTERNAL_TOKEN, "internal", "ops", ["*"]),
            ApiKey::with_token(READER_TOKEN, "hostsblue", "reader", ["read_transactions"]),
            ApiKey::with_token(
                HOSTSBLUE_TOKEN,
                "hostsblue",
                "hostsblue",
                ["read_entitlements", "manage_webhooks", "manage_api_keys"],
            ),
            ApiKey::with_token(
                BUSINESS_TOKEN,
                "businessblueprint",
                "bb",
                ["manage_webhooks"],
            ),
        ];
        let store = Arc::new(InMemoryApiKeyStore::with_keys(keys).unwrap());
        router(AppState::for_store(store))
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_needs_no_key() {
        let (status, body) = call(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (status, body) = call(&app(), "GET", "/api-doc/openapi.json", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/v1/tiers/{tier}"].is_object());
        assert!(body["components"]["securitySchemes"]["api_key"].is_object());
    }

    #[tokio::test]
    async fn request_id_is_generated_and_echoed() {
        let request = http::Request::builder()
            .uri("/health/live")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));

        let request = http::Request::builder()
            .uri("/health/live")
            .header("x-request-id", "req-123")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn tier_routes_are_gated() {
        let app = app();

        let (status, body) = call(&app, "GET", "/v1/tiers", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "missing_api_key");

        let (status, body) = call(&app, "GET", "/v1/tiers", Some("sb_live_nope"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "invalid_api_key");

        let (status, body) = call(&app, "GET", "/v1/tiers", Some(READER_TOKEN), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body["message"],
            "API key does not have permission: read_entitlements"
        );
    }

    #[tokio::test]
    async fn blank_authorization_header_skips_query_key() {
        let request = http::Request::builder()
            .uri(format!("/v1/tiers?api_key={HOSTSBLUE_TOKEN}"))
            .header("Authorization", "   ")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error_code"], "invalid_api_key");

        let uri = format!("/v1/tiers?api_key={HOSTSBLUE_TOKEN}");
        let (status, _) = call(&app(), "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn list_tiers_in_rank_order() {
        let (status, body) = call(&app(), "GET", "/v1/tiers", Some(HOSTSBLUE_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"tier": "Free", "rank": 0, "product_limit": 25},
                {"tier": "Growth", "rank": 1, "product_limit": 500},
                {"tier": "Scale", "rank": 2, "product_limit": null},
                {"tier": "Enterprise", "rank": 3, "product_limit": null}
            ])
        );
    }

    #[tokio::test]
    async fn check_normalizes_legacy_names() {
        let app = app();
        let (status, body) = call(
            &app,
            "GET",
            "/v1/tiers/check?current=Pro&required=Starter",
            Some(HOSTSBLUE_TOKEN),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"current": "Scale", "required": "Growth", "allowed": true})
        );

        let (_, body) = call(
            &app,
            "GET",
            "/v1/tiers/check?current=mystery&required=growth",
            Some(INTERNAL_TOKEN),
            None,
        )
        .await;
        assert_eq!(body["current"], "Free");
        assert_eq!(body["allowed"], false);
    }

    #[tokio::test]
    async fn tier_detail_includes_entitlements() {
        let (status, body) =
            call(&app(), "GET", "/v1/tiers/starter", Some(HOSTSBLUE_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "Growth");
        assert_eq!(body["rank"], 1);
        assert_eq!(body["entitlements"].as_array().unwrap().len(), 26);
    }

    async fn call_as_merchant(app: &Router, uri: &str, tier: Option<&str>) -> (StatusCode, Value) {
        let mut builder = http::Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {HOSTSBLUE_TOKEN}"));
        if let Some(tier) = tier {
            builder = builder.header("X-Merchant-Tier", tier);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn feature_access_follows_merchant_tier() {
        let app = app();

        let (status, body) =
            call_as_merchant(&app, "/v1/features/recurring_billing", Some("Free")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Upgrade Required");
        assert_eq!(body["requiredTier"], "Growth");
        assert_eq!(body["currentTier"], "Free");
        assert_eq!(
            body["message"],
            "This feature requires Growth tier or higher"
        );

        let (status, body) =
            call_as_merchant(&app, "/v1/features/recurring_billing", Some("starter")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "Growth");
        assert_eq!(body["minimum_tier"], "Growth");

        let (status, body) = call_as_merchant(&app, "/v1/features/teleportation", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Unknown feature: teleportation");
    }

    #[tokio::test]
    async fn product_capacity_enforces_plan_ceiling() {
        let app = app();

        let (status, body) = call_as_merchant(&app, "/v1/tiers/capacity?count=24", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"tier": "Free", "limit": 25, "current_count": 24, "remaining": 1})
        );

        let (status, body) = call_as_merchant(&app, "/v1/tiers/capacity?count=25", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Product limit reached");
        assert_eq!(body["currentCount"], 25);
        assert_eq!(body["limit"], 25);

        let (status, body) =
            call_as_merchant(&app, "/v1/tiers/capacity?count=9000", Some("Pro")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["limit"], Value::Null);
        assert_eq!(body["remaining"], Value::Null);
    }

    #[tokio::test]
    async fn api_keys_require_internal_platform() {
        let (status, body) =
            call(&app(), "GET", "/v1/api-keys", Some(HOSTSBLUE_TOKEN), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "platform_not_allowed");
    }

    #[tokio::test]
    async fn provision_list_and_deactivate_key() {
        let app = app();

        let (status, created) = call(
            &app,
            "POST",
            "/v1/api-keys",
            Some(INTERNAL_TOKEN),
            Some(json!({
                "platform": "swipesblue",
                "name": "storefront",
                "permissions": ["read_entitlements"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let token = created["api_key"].as_str().unwrap().to_string();
        assert!(token.starts_with("sb_live_"));
        assert!(created["api_secret"]
            .as_str()
            .unwrap()
            .starts_with("sb_secret_"));

        let (status, _) = call(&app, "GET", "/v1/tiers", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, listed) = call(&app, "GET", "/v1/api-keys", Some(INTERNAL_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed
            .iter()
            .all(|key| key.get("api_key").is_none() && key.get("api_secret").is_none()));

        let uri = format!("/v1/api-keys/{}/deactivate", created["id"].as_str().unwrap());
        let (status, body) = call(&app, "POST", &uri, Some(INTERNAL_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);

        let (status, body) = call(&app, "GET", "/v1/tiers", Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "api_key_deactivated");
    }

    #[tokio::test]
    async fn provision_validates_input() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/v1/api-keys",
            Some(INTERNAL_TOKEN),
            Some(json!({"platform": " ", "name": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "platform is required");

        let (status, _) = call(
            &app,
            "POST",
            "/v1/api-keys/unknown/deactivate",
            Some(INTERNAL_TOKEN),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn webhook_registration_is_platform_scoped() {
        let app = app();

        let (status, body) = call(
            &app,
            "POST",
            "/v1/webhooks",
            Some(BUSINESS_TOKEN),
            Some(json!({
                "platform": "hostsblue",
                "url": "https://hooks.example/hostsblue",
                "events": ["payment.success"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "platform_not_allowed");

        let (status, registered) = call(
            &app,
            "POST",
            "/v1/webhooks",
            Some(HOSTSBLUE_TOKEN),
            Some(json!({
                "url": "https://hooks.example/hostsblue",
                "events": ["payment.success", "payment.refunded"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered["endpoint"]["platform"], "hostsblue");
        assert!(registered["secret"].as_str().is_some());
        assert!(registered["endpoint"].get("secret").is_none());
        let endpoint_id = registered["endpoint"]["id"].as_str().unwrap().to_string();

        let (_, listed) = call(&app, "GET", "/v1/webhooks", Some(BUSINESS_TOKEN), None).await;
        assert_eq!(listed, json!([]));

        let (_, listed) = call(&app, "GET", "/v1/webhooks", Some(INTERNAL_TOKEN), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let uri = format!("/v1/webhooks/{endpoint_id}/deactivate");
        let (status, body) = call(&app, "POST", &uri, Some(BUSINESS_TOKEN), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "platform_not_allowed");

        let (status, body) = call(&app, "POST", &uri, Some(HOSTSBLUE_TOKEN), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);
    }

    #[tokio::test]
    async fn foreign_endpoint_is_forbidden_and_missing_is_not_found() {
        let app = app();
        let (status, registered) = call(
            &app,
            "POST",
            "/v1/webhooks",
            Some(INTERNAL_TOKEN),
            Some(json!({
                "platform": "businessblueprint",
                "url": "https://hooks.example/bb",
                "events": ["payment.success"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let endpoint_id = registered["endpoint"]["id"].as_str().unwrap().to_string();

        for action in ["test", "deactivate"] {
            let uri = format!("/v1/webhooks/{endpoint_id}/{action}");
            let (status, body) = call(&app, "POST", &uri, Some(HOSTSBLUE_TOKEN), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN, "{action}");
            assert_eq!(
                body["message"],
                "API key is not authorized for platform: businessblueprint"
            );

            let uri = format!("/v1/webhooks/missing/{action}");
            let (status, body) = call(&app, "POST", &uri, Some(HOSTSBLUE_TOKEN), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{action}");
            assert_eq!(body["message"], "Webhook endpoint not found");
        }

        let (_, listed) = call(&app, "GET", "/v1/webhooks", Some(BUSINESS_TOKEN), None).await;
        assert_eq!(listed[0]["is_active"], true);
    }

    #[tokio::test]
    async fn webhook_registration_rejects_bad_events() {
        let (status, body) = call(
            &app(),
            "POST",
            "/v1/webhooks",
            Some(HOSTSBLUE_TOKEN),
            Some(json!({
                "url": "https://hooks.example/hostsblue",
                "events": ["order.shipped"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid event types: order.shipped");
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_not_found() {
        let (status, body) = call(
            &app(),
            "POST",
            "/v1/webhooks/missing/test",
            Some(HOSTSBLUE_TOKEN),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Webhook endpoint not found");
    }

    #[tokio::test]
    async fn partner_webhook_route_is_mounted_without_key() {
        let request = http::Request::builder()
            .method("POST")
            .uri("/webhooks/partner")
            .header("X-Webhook-Signature", "00")
            .header("X-Webhook-Event", "payment.success")
            .body(Body::from("{}"))
            .unwrap();
        let response = app().oneshot(request).await.unwrap();
        // Receiver has no secret configured.
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
