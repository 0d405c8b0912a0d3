//! Template management routes

use crate::{
    AppState,
    error::Result,
    identity::Caller,
    models::{
        ApiResponse, ListResponse, ListTemplatesQuery, ReportRequest, ReportValidationResponse,
        TemplateSummary, UsageRequest,
    },
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use reportdesk::{NarrativePrompt, Template, TemplateDraft, TemplateId, UsageStats};
use reportdesk_registry::VersionSummary;
use tracing::{debug, info};

/// Create template routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_templates).post(create_template))
        .route("/{id}", get(get_template).put(revise_template))
        .route("/{id}/versions", get(list_versions))
        .route("/{id}/versions/{version}", get(get_version))
        .route("/{id}/usage", post(record_usage))
        .route("/{id}/report/validate", post(validate_report))
        .route("/{id}/narrative", post(compose_narrative))
}

/// List templates visible to the caller
async fn list_templates(
    State(state): State<AppState>,
    Caller(user): Caller,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<Json<ListResponse<TemplateSummary>>> {
    debug!("Listing templates with query: {:?}", query);

    let filter = query.to_filter()?;
    let templates = state.registry.list_templates(&user, &filter).await?;
    let summaries = templates.into_iter().map(TemplateSummary::from).collect();

    Ok(Json(ListResponse::new(summaries)))
}

/// Create a new template from a draft
async fn create_template(
    State(state): State<AppState>,
    Caller(user): Caller,
    Json(draft): Json<TemplateDraft>,
) -> Result<impl IntoResponse> {
    info!("Creating template {:?} for {}", draft.name, user.user_id.as_ref());

    let template = state.registry.create_template(draft, &user).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(template, "Template created")),
    ))
}

/// Get the latest version of a template
async fn get_template(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Template>>> {
    debug!("Getting template: {}", id);

    let template = state
        .registry
        .get_template(&TemplateId::from(id), &user)
        .await?;
    Ok(Json(ApiResponse::new(template)))
}

/// Publish a new version of a template
async fn revise_template(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    Json(draft): Json<TemplateDraft>,
) -> Result<Json<ApiResponse<Template>>> {
    info!("Revising template {} by {}", id, user.user_id.as_ref());

    let template = state
        .registry
        .revise_template(&TemplateId::from(id), draft, &user)
        .await?;
    Ok(Json(ApiResponse::new(template)))
}

/// Version history of a template, oldest first
async fn list_versions(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Result<Json<ListResponse<VersionSummary>>> {
    let history = state
        .registry
        .version_history(&TemplateId::from(id), &user)
        .await?;
    Ok(Json(ListResponse::new(history)))
}

/// Get one specific version of a template
async fn get_version(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path((id, version)): Path<(String, u32)>,
) -> Result<Json<ApiResponse<Template>>> {
    debug!("Getting template {} version {}", id, version);

    let template = state
        .registry
        .get_version(&TemplateId::from(id), version, &user)
        .await?;
    Ok(Json(ApiResponse::new(template)))
}

/// Record a template use, with an optional completion time
async fn record_usage(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    Json(request): Json<UsageRequest>,
) -> Result<Json<ApiResponse<UsageStats>>> {
    let id = TemplateId::from(id);
    let stats = match request.completion_time {
        Some(seconds) => state.registry.update_completion_time(&id, &user, seconds).await?,
        None => state.registry.increment_usage(&id, &user).await?,
    };
    Ok(Json(ApiResponse::new(stats)))
}

/// Validate report values against the latest template version
async fn validate_report(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ApiResponse<ReportValidationResponse>>> {
    let template = state
        .registry
        .validate_report(&TemplateId::from(id), &user, &request.values)
        .await?;

    // Conditions already evaluated cleanly during validation
    let visible_fields: Vec<String> = template
        .visible_fields(&request.values)
        .map(|fields| fields.iter().map(|f| f.name.clone()).collect())
        .unwrap_or_default();

    Ok(Json(ApiResponse::new(ReportValidationResponse {
        valid: true,
        template_id: template.id.clone(),
        version: template.version,
        visible_fields,
    })))
}

/// Compose the narrative prompt for a report
async fn compose_narrative(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<String>,
    Json(request): Json<ReportRequest>,
) -> Result<Json<ApiResponse<NarrativePrompt>>> {
    let prompt = state
        .registry
        .compose_narrative(
            &TemplateId::from(id),
            &user,
            &request.values,
            &state.config.officer,
        )
        .await?;
    Ok(Json(ApiResponse::new(prompt)))
}

#[cfg(test)]
mod tests {
    use crate::{AppState, config::ServerConfig, create_router};
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use reportdesk_registry::{Registry, SqliteStorage};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn app() -> (Router, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}/test.db", dir.path().display());
        let storage = SqliteStorage::new(&url).await.unwrap();
        let mut config = ServerConfig::default();
        config.officer.name = Some("Dana Reyes".to_string());
        let state = AppState {
            registry: Arc::new(Registry::new(storage)),
            config,
        };
        (create_router(state), dir)
    }

    fn request(method: &str, uri: &str, tier: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", "officer-7")
            .header("x-department-id", "metro")
            .header("x-subscription-tier", tier)
            .header("content-type", "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn arrest_draft(label: &str) -> Value {
        json!({
            "name": "Arrest Report",
            "reportType": "arrest",
            "departmentId": "metro",
            "requiredSubscriptionTier": "premium",
            "versionLabel": label,
            "fields": [
                {"name": "suspect", "label": "Suspect", "order": 1, "required": true},
                {"name": "priorConvictions", "label": "Prior convictions", "order": 2, "type": "number"},
                {"name": "convictionDetails", "label": "Conviction details", "order": 3,
                 "type": "longtext", "required": true,
                 "showCondition": {"field": "priorConvictions", "operator": "greaterThan", "value": 0}}
            ]
        })
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(
            app,
            request("POST", "/api/templates", "enterprise", Some(arrest_draft("1.0"))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (app, _dir) = app().await;
        let id = create(&app).await;

        let (status, body) = send(&app, request("GET", &format!("/api/templates/{}", id), "premium", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Arrest Report");
        assert_eq!(body["data"]["version"], 1);
        assert_eq!(body["data"]["fields"][2]["showCondition"]["operator"], "greaterThan");

        let (status, _) = send(&app, request("GET", &format!("/api/templates/{}", id), "basic", None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, request("GET", "/api/templates/missing", "premium", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_draft_lists_issues() {
        let (app, _dir) = app().await;
        let draft = json!({"name": "Broken", "reportType": "parking", "departmentId": "metro"});

        let (status, body) = send(&app, request("POST", "/api/templates", "free", Some(draft))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["issues"][0]["path"], "reportType");
    }

    #[tokio::test]
    async fn test_missing_identity_is_unauthorized() {
        let (app, _dir) = app().await;
        let req = Request::builder()
            .uri("/api/templates")
            .body(Body::empty())
            .unwrap();

        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revisions_and_versions() {
        let (app, _dir) = app().await;
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            request("PUT", &format!("/api/templates/{}", id), "free", Some(arrest_draft("1.1"))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["version"], 2);

        let (_, body) = send(&app, request("GET", &format!("/api/templates/{}/versions", id), "premium", None)).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["data"][1]["versionLabel"], "1.1");

        let (status, body) = send(&app, request("GET", &format!("/api/templates/{}/versions/1", id), "premium", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["versionLabel"], "1.0");

        let (status, _) = send(&app, request("GET", &format!("/api/templates/{}/versions/9", id), "premium", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_usage_tracking() {
        let (app, _dir) = app().await;
        let id = create(&app).await;
        let uri = format!("/api/templates/{}/usage", id);

        send(&app, request("POST", &uri, "premium", Some(json!({"completionTime": 10.0})))).await;
        let (status, body) = send(&app, request("POST", &uri, "premium", Some(json!({"completionTime": 20.0})))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["usageCount"], 2);
        assert_eq!(body["data"]["averageCompletionTime"], 15.0);

        let (_, body) = send(&app, request("POST", &uri, "premium", Some(json!({})))).await;
        assert_eq!(body["data"]["usageCount"], 3);

        let (status, _) = send(&app, request("POST", &uri, "premium", Some(json!({"completionTime": -5.0})))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_listing_with_filters() {
        let (app, _dir) = app().await;
        create(&app).await;

        let (_, body) = send(&app, request("GET", "/api/templates?department=metro&reportType=arrest", "premium", None)).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["usageCount"], 0);

        let (_, body) = send(&app, request("GET", "/api/templates?reportType=traffic", "premium", None)).await;
        assert_eq!(body["total"], 0);

        let (status, _) = send(&app, request("GET", "/api/templates?reportType=parking", "premium", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_report_validation_and_narrative() {
        let (app, _dir) = app().await;
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            request(
                "POST",
                &format!("/api/templates/{}/report/validate", id),
                "premium",
                Some(json!({"values": {"suspect": "J. Doe", "priorConvictions": 2}})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["issues"][0]["path"], "values.convictionDetails");

        let values = json!({"values": {"suspect": "J. Doe", "priorConvictions": 0}});
        let (status, body) = send(
            &app,
            request("POST", &format!("/api/templates/{}/report/validate", id), "premium", Some(values.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["visibleFields"], json!(["suspect", "priorConvictions"]));

        let (status, body) = send(
            &app,
            request("POST", &format!("/api/templates/{}/narrative", id), "premium", Some(values)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(
            body["data"]["user"]
                .as_str()
                .unwrap()
                .contains("Reporting officer: Dana Reyes")
        );
    }
}
