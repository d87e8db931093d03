//! Triage API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Layers (outermost → innermost):
//! 1. CORS → 2. Request logging → 3. Body limit → Handler

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the triage router.
///
/// `allowed_origins` of `None` allows any origin.
pub fn triage_router(ctx: ApiContext, allowed_origins: Option<&[String]>) -> Router {
    let body_limit = ctx.max_upload_bytes;

    Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/predict/form", post(endpoints::form::predict))
        .route("/predict/text-image", post(endpoints::text_image::predict))
        .route("/predict/vision", post(endpoints::vision::predict))
        .with_state(ctx)
        .layer(
            ServiceBuilder::new()
                .layer(cors_layer(allowed_origins))
                .layer(axum::middleware::from_fn(middleware::audit::log_access))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origin = match allowed_origins {
        None => AllowOrigin::from(Any),
        Some(origins) => {
            let values: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use image::{DynamicImage, Rgb, RgbImage};
    use tower::ServiceExt;

    use crate::artifact::ArtifactStore;
    use crate::pipeline::imaging::encode_png;
    use crate::pipeline::ocr::MockOcrEngine;

    const BOUNDARY: &str = "triage-test-boundary";

    fn bundled_artifact() -> ArtifactStore {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("resources/form_model.json");
        ArtifactStore::load(&path).unwrap()
    }

    fn test_ctx(ocr_text: &str) -> ApiContext {
        ApiContext::new(bundled_artifact(), Arc::new(MockOcrEngine::new(ocr_text)))
    }

    fn app(ctx: ApiContext) -> Router {
        triage_router(ctx, None)
    }

    fn photo_png() -> Vec<u8> {
        // Strongly red, uniform in luma: high redness, blurry, no edges
        let img = RgbImage::from_fn(64, 64, |x, y| {
            Rgb([200 + ((x + y) % 2) as u8, 40, 40 + (x % 4) as u8])
        });
        encode_png(&DynamicImage::ImageRgb8(img)).unwrap()
    }

    fn multipart_body(field: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, field: &str, bytes: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(field, bytes)))
            .unwrap()
    }

    fn json_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = app(test_ctx(""))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn health_payload_is_fixed_without_model() {
        let ctx = ApiContext::without_model("missing artifact", Arc::new(MockOcrEngine::new("")));
        let response = app(ctx)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn form_prediction_returns_assessment() {
        let body = r#"{"age":60,"systolic_bp":150,"diastolic_bp":90,"cholesterol":260,"family_history":true}"#;
        let response = app(test_ctx(""))
            .oneshot(json_request("/predict/form", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["mode"], "form");
        assert_eq!(json["prediction"], "high_risk");
        assert_eq!(json["urgency"], "high");
        assert_eq!(json["hospital_readmission"], true);
        assert_eq!(
            json["top_factors"],
            serde_json::json!(["high_systolic_bp", "high_cholesterol"])
        );
    }

    #[tokio::test]
    async fn malformed_form_json_is_400() {
        let response = app(test_ctx(""))
            .oneshot(json_request("/predict/form", "{\"age\": 60,"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn out_of_range_form_is_422_with_every_field() {
        let body = r#"{"age":150,"systolic_bp":150,"diastolic_bp":10,"cholesterol":260,"family_history":false}"#;
        let response = app(test_ctx(""))
            .oneshot(json_request("/predict/form", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(json["error"]["fields"][0]["field"], "age");
        assert_eq!(json["error"]["fields"][1]["field"], "diastolic_bp");
    }

    #[tokio::test]
    async fn form_without_model_is_503() {
        let ctx = ApiContext::without_model("missing artifact", Arc::new(MockOcrEngine::new("")));
        let body = r#"{"age":40,"systolic_bp":120,"diastolic_bp":80,"cholesterol":180,"family_history":false}"#;
        let response = app(ctx)
            .oneshot(json_request("/predict/form", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["error"]["code"], "ARTIFACT_UNAVAILABLE");
    }

    #[tokio::test]
    async fn image_pathways_work_without_model() {
        let ctx = ApiContext::without_model("missing artifact", Arc::new(MockOcrEngine::new("")));
        let response = app(ctx)
            .oneshot(upload_request("/predict/vision", "file", &photo_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn text_image_without_keywords_is_low_risk() {
        let response = app(test_ctx("Follow-up visit next Tuesday"))
            .oneshot(upload_request("/predict/text-image", "file", &photo_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["mode"], "text-image");
        assert_eq!(json["prediction"], "low_risk");
        assert_eq!(json["confidence"], 0.5);
        assert_eq!(json["top_factors"], serde_json::json!(["no_keywords"]));
    }

    #[tokio::test]
    async fn text_image_with_keyword_is_medium_risk() {
        let response = app(test_ctx("Severe headache since Monday"))
            .oneshot(upload_request("/predict/text-image", "file", &photo_png()))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["prediction"], "medium_risk");
        assert_eq!(json["hospital_readmission"], false);
    }

    #[tokio::test]
    async fn vision_scores_red_photo() {
        let response = app(test_ctx(""))
            .oneshot(upload_request("/predict/vision", "file", &photo_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["mode"], "vision");
        assert_eq!(json["prediction"], "high_risk");
        assert_eq!(json["confidence"], 0.85);
        assert_eq!(json["top_factors"][0], "very_high_redness");
        assert_eq!(json["top_factors"][1], "red_dominant");
    }

    #[tokio::test]
    async fn corrupt_upload_is_input_decode() {
        let garbage = [0xDE, 0xAD, 0xBE, 0xEF].repeat(64);
        for uri in ["/predict/vision", "/predict/text-image"] {
            let response = app(test_ctx("pain"))
                .oneshot(upload_request(uri, "file", &garbage))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(response).await["error"]["code"], "INPUT_DECODE");
        }
    }

    #[tokio::test]
    async fn missing_file_field_is_400() {
        let response = app(test_ctx(""))
            .oneshot(upload_request("/predict/vision", "image", &photo_png()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert!(json["error"]["message"].as_str().unwrap().contains("'file'"));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let ctx = test_ctx("").max_upload_bytes(1024);
        let response = app(ctx)
            .oneshot(upload_request("/predict/vision", "file", &vec![0u8; 4096]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_preflight_allows_post() {
        let response = app(test_ctx(""))
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/predict/form")
                    .header("Origin", "http://dashboard.test")
                    .header("Access-Control-Request-Method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn cors_list_echoes_allowed_origin_only() {
        let origins = vec!["http://dashboard.test".to_string()];
        let router = triage_router(test_ctx(""), Some(&origins));
        let allowed = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("Origin", "http://dashboard.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            allowed.headers().get("access-control-allow-origin").unwrap(),
            "http://dashboard.test"
        );

        let denied = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("Origin", "http://evil.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(denied.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let response = app(test_ctx(""))
            .oneshot(Request::builder().uri("/predict/audio").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
