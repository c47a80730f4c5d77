use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json, Router,
};
use campus_hub::{
    access::{self, ResourceView, Route, RouteDecision},
    config::AppConfig,
    error::HubError,
    models::{PrivacyLevel, Resource, ResourceDraft, ResourceType},
    query::{self, SearchFilters, RECENT_LIMIT},
    rating::{self, AverageRating, ProfileStats},
    user_models::{AuthState, Credentials, ProfileUpdate, Registration, User},
    Hub,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    campus_hub::init_tracing("campus_hub=debug,server=debug,tower_http=info");

    let config = AppConfig::from_env()?;
    let hub = Hub::open(&config)?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, data_dir = %config.data_dir.display(), "campus hub listening");

    axum::serve(listener, app(hub)).await?;
    Ok(())
}

fn app(hub: Hub) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/search", get(search))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile).patch(update_profile))
        .route("/upload", post(create_resource))
        .route("/upload/:id", put(update_resource))
        .route("/resource/:id", get(resource_detail).delete(delete_resource))
        .route("/resource/:id/reviews", post(submit_review))
        .fallback(|| async { Redirect::to("/") })
        .with_state(hub)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug)]
enum ApiError {
    Hub(HubError),
    Redirect(&'static str),
    Denied { uploader_college: String },
    Forbidden(HubError),
}

impl From<HubError> for ApiError {
    fn from(e: HubError) -> Self {
        match e {
            // Editing someone else's upload bounces back home.
            HubError::NotOwner => ApiError::Redirect("/"),
            other => ApiError::Hub(other),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Hub(HubError::Storage(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Redirect(to) => return Redirect::to(to).into_response(),
            ApiError::Denied { uploader_college } => {
                let message = format!(
                    "This resource is private and only available to students from {}",
                    uploader_college
                );
                (
                    StatusCode::FORBIDDEN,
                    json!({ "denied": true, "uploaderCollege": uploader_college, "message": message }),
                )
            }
            ApiError::Forbidden(e) => (StatusCode::FORBIDDEN, json!({ "error": e.to_string() })),
            ApiError::Hub(e) => {
                let status = match &e {
                    HubError::Validation(_) | HubError::InvalidRating(_) => StatusCode::BAD_REQUEST,
                    HubError::InvalidCredentials | HubError::Unauthenticated => StatusCode::UNAUTHORIZED,
                    HubError::EmailTaken => StatusCode::CONFLICT,
                    HubError::NotFound(_) => StatusCode::NOT_FOUND,
                    HubError::AccessDenied | HubError::NotOwner => StatusCode::FORBIDDEN,
                    HubError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                if status.is_server_error() {
                    tracing::error!(error = %e, "request failed");
                }
                (status, json!({ "error": e.to_string() }))
            }
        };
        (status, Json(body)).into_response()
    }
}

/// The caller's signed-in state, resolved from an `Authorization: Bearer` token.
/// No token, or one that is unknown or closed, means logged out.
#[derive(Debug, Clone)]
struct Session {
    token: Option<String>,
    auth: AuthState,
}

impl Session {
    fn resolve(hub: &Hub, token: Option<String>) -> Result<Self, ApiError> {
        let auth = match &token {
            Some(t) => hub.accounts.session(t)?,
            None => AuthState::logged_out(),
        };
        Ok(Self { token, auth })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    Some(token.to_string()).filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<Hub> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, hub: &Hub) -> Result<Self, Self::Rejection> {
        Session::resolve(hub, bearer_token(&parts.headers))
    }
}

/// Applies the route access table to the caller's session.
fn guard(hub: &Hub, session: &Session, route: Route) -> Result<Vec<Resource>, ApiError> {
    let resources = hub.storage.load_resources()?;
    match access::authorize(&route, &session.auth, &resources) {
        RouteDecision::Allow => Ok(resources),
        RouteDecision::Redirect(to) => Err(ApiError::Redirect(to)),
        RouteDecision::Denied { uploader_college } => Err(ApiError::Denied { uploader_college }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceCard {
    #[serde(flatten)]
    resource: Resource,
    average_rating: AverageRating,
}

impl From<Resource> for ResourceCard {
    fn from(resource: Resource) -> Self {
        let average_rating = rating::average_rating(&resource);
        Self {
            resource,
            average_rating,
        }
    }
}

fn cards(resources: Vec<Resource>) -> Vec<ResourceCard> {
    resources.into_iter().map(ResourceCard::from).collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDetail {
    #[serde(flatten)]
    card: ResourceCard,
    is_owner: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SearchParams {
    q: String,
    subject: String,
    semester: String,
    #[serde(rename = "type")]
    resource_type: String,
    privacy: String,
    sort_by: String,
}

impl SearchParams {
    fn filters(&self) -> Result<SearchFilters, HubError> {
        Ok(SearchFilters {
            subject: self.subject.clone(),
            semester: self.semester.clone(),
            resource_type: non_empty(&self.resource_type)
                .map(str::parse::<ResourceType>)
                .transpose()?,
            privacy: non_empty(&self.privacy)
                .map(str::parse::<PrivacyLevel>)
                .transpose()?,
            sort_by: self.sort_by.parse()?,
        })
    }
}

fn non_empty(s: &str) -> Option<&str> {
    Some(s).filter(|s| !s.trim().is_empty())
}

#[derive(Debug, Serialize)]
struct SignedIn {
    token: String,
    user: User,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    user: User,
    uploads: Vec<ResourceCard>,
    stats: ProfileStats,
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    rating: u8,
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DeleteParams {
    confirm: bool,
}

async fn home(State(hub): State<Hub>, session: Session) -> Result<Json<Vec<ResourceCard>>, ApiError> {
    let resources = guard(&hub, &session, Route::Home)?;
    Ok(Json(cards(query::recent_uploads(&resources, &session.auth, RECENT_LIMIT))))
}

async fn search(
    State(hub): State<Hub>,
    session: Session,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<ResourceCard>>, ApiError> {
    let resources = guard(&hub, &session, Route::Search)?;
    let filters = params.filters()?;
    Ok(Json(cards(query::search(&resources, &session.auth, &params.q, &filters))))
}

async fn register(
    State(hub): State<Hub>,
    session: Session,
    Json(form): Json<Registration>,
) -> Result<(StatusCode, Json<SignedIn>), ApiError> {
    guard(&hub, &session, Route::Register)?;
    let (user, token) = hub.accounts.register_session(form).await?;
    Ok((StatusCode::CREATED, Json(SignedIn { token, user })))
}

async fn login(
    State(hub): State<Hub>,
    session: Session,
    Json(credentials): Json<Credentials>,
) -> Result<Json<SignedIn>, ApiError> {
    guard(&hub, &session, Route::Login)?;
    let (user, token) = hub.accounts.login_session(credentials).await?;
    Ok(Json(SignedIn { token, user }))
}

async fn logout(State(hub): State<Hub>, session: Session) -> Result<StatusCode, ApiError> {
    if let Some(token) = &session.token {
        hub.accounts.close_session(token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn profile(State(hub): State<Hub>, session: Session) -> Result<Json<ProfileResponse>, ApiError> {
    let resources = guard(&hub, &session, Route::Profile)?;
    let user = session.auth.current_user().cloned().ok_or(HubError::Unauthenticated)?;
    let uploads = query::uploaded_by(&resources, &user.id);
    let stats = rating::profile_stats(&uploads);
    Ok(Json(ProfileResponse {
        user,
        uploads: cards(uploads),
        stats,
    }))
}

async fn update_profile(
    State(hub): State<Hub>,
    session: Session,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<AuthState>, ApiError> {
    guard(&hub, &session, Route::Profile)?;
    Ok(Json(hub.accounts.update_session_profile(&session.auth, update).await?))
}

async fn create_resource(
    State(hub): State<Hub>,
    session: Session,
    Json(draft): Json<ResourceDraft>,
) -> Result<(StatusCode, Json<ResourceCard>), ApiError> {
    guard(&hub, &session, Route::Upload)?;
    let resource = hub.resources.create(&session.auth, draft).await?;
    Ok((StatusCode::CREATED, Json(resource.into())))
}

async fn update_resource(
    State(hub): State<Hub>,
    session: Session,
    Path(id): Path<String>,
    Json(draft): Json<ResourceDraft>,
) -> Result<Json<ResourceCard>, ApiError> {
    guard(&hub, &session, Route::EditUpload(id.clone()))?;
    let resource = hub.resources.update(&id, &session.auth, draft).await?;
    Ok(Json(resource.into()))
}

async fn resource_detail(
    State(hub): State<Hub>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ResourceDetail>, ApiError> {
    let resources = guard(&hub, &session, Route::ResourceDetail(id.clone()))?;
    match access::view_resource(&resources, &id, &session.auth) {
        ResourceView::Found(resource) => {
            let is_owner = session
                .auth
                .current_user()
                .map_or(false, |u| resource.is_owned_by(u));
            Ok(Json(ResourceDetail {
                card: resource.into(),
                is_owner,
            }))
        }
        ResourceView::Denied { uploader_college } => Err(ApiError::Denied { uploader_college }),
        ResourceView::NotFound => Err(HubError::NotFound(id).into()),
    }
}

async fn delete_resource(
    State(hub): State<Hub>,
    session: Session,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = hub
        .resources
        .delete(&id, &session.auth, params.confirm)
        .await
        .map_err(|e| match e {
            HubError::NotOwner => ApiError::Forbidden(HubError::NotOwner),
            other => other.into(),
        })?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn submit_review(
    State(hub): State<Hub>,
    session: Session,
    Path(id): Path<String>,
    Json(review): Json<ReviewRequest>,
) -> Result<Json<ResourceCard>, ApiError> {
    guard(&hub, &session, Route::ResourceDetail(id.clone()))?;
    let resource = hub
        .resources
        .submit_review(&id, &session.auth, review.rating, review.comment)
        .await?;
    Ok(Json(resource.into()))
}
