use crate::models::{PrivacyLevel, Resource};
use crate::user_models::AuthState;

/// Public resources are visible to everyone. Private ones only to an
/// authenticated viewer from the uploader's college (exact, case-sensitive).
pub fn is_visible(resource: &Resource, viewer: &AuthState) -> bool {
    match resource.privacy {
        PrivacyLevel::Public => true,
        PrivacyLevel::Private => viewer.college() == Some(resource.uploader_college.as_str()),
    }
}

/// The visible subset, in input order.
pub fn visible<'a>(resources: &'a [Resource], viewer: &AuthState) -> Vec<&'a Resource> {
    resources.iter().filter(|r| is_visible(r, viewer)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceView {
    Found(Resource),
    /// Names the college whose students may open it.
    Denied { uploader_college: String },
    NotFound,
}

pub fn view_resource(resources: &[Resource], id: &str, viewer: &AuthState) -> ResourceView {
    match resources.iter().find(|r| r.id == id) {
        None => ResourceView::NotFound,
        Some(r) if is_visible(r, viewer) => ResourceView::Found(r.clone()),
        Some(r) => ResourceView::Denied {
            uploader_college: r.uploader_college.clone(),
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Search,
    Upload,
    EditUpload(String),
    Profile,
    ResourceDetail(String),
    Unknown,
}

impl Route {
    pub fn parse(path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Route::Home,
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["search"] => Route::Search,
            ["upload"] => Route::Upload,
            ["upload", id] => Route::EditUpload(id.to_string()),
            ["profile"] => Route::Profile,
            ["resource", id] => Route::ResourceDetail(id.to_string()),
            _ => Route::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Redirect(&'static str),
    /// Rendered as a denial page, not an error.
    Denied { uploader_college: String },
}

pub fn authorize(route: &Route, viewer: &AuthState, resources: &[Resource]) -> RouteDecision {
    let user = viewer.current_user();
    match route {
        Route::Home | Route::Search => RouteDecision::Allow,
        Route::Login | Route::Register => match user {
            Some(_) => RouteDecision::Redirect("/"),
            None => RouteDecision::Allow,
        },
        Route::Upload | Route::Profile => match user {
            Some(_) => RouteDecision::Allow,
            None => RouteDecision::Redirect("/login"),
        },
        Route::EditUpload(id) => {
            let Some(user) = user else {
                return RouteDecision::Redirect("/login");
            };
            match resources.iter().find(|r| &r.id == id) {
                Some(r) if r.is_owned_by(user) => RouteDecision::Allow,
                _ => RouteDecision::Redirect("/"),
            }
        }
        Route::ResourceDetail(id) => match view_resource(resources, id, viewer) {
            ResourceView::Denied { uploader_college } => RouteDecision::Denied { uploader_college },
            _ => RouteDecision::Allow,
        },
        Route::Unknown => RouteDecision::Redirect("/"),
    }
}
