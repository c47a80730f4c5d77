use crate::access;
use crate::error::HubError;
use crate::models::{PrivacyLevel, Resource, ResourceType};
use crate::rating::mean_rating;
use crate::user_models::AuthState;
use std::str::FromStr;

/// Number of uploads shown on the landing page.
pub const RECENT_LIMIT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Latest,
    Rating,
    Popular,
}

impl FromStr for SortBy {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "latest" => Ok(SortBy::Latest),
            "rating" => Ok(SortBy::Rating),
            "popular" => Ok(SortBy::Popular),
            other => Err(HubError::Validation(format!("Unknown sort order: {}", other))),
        }
    }
}

/// Field filters. An empty string or `None` leaves that field unfiltered.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub subject: String,
    pub semester: String,
    pub resource_type: Option<ResourceType>,
    pub privacy: Option<PrivacyLevel>,
    pub sort_by: SortBy,
}

impl SearchFilters {
    fn matches(&self, resource: &Resource) -> bool {
        let subject_ok = self.subject.is_empty()
            || resource.subject.to_lowercase().contains(&self.subject.to_lowercase());
        let semester_ok = self.semester.is_empty() || resource.semester == self.semester;
        let type_ok = self.resource_type.map_or(true, |t| resource.resource_type == t);
        let privacy_ok = self.privacy.map_or(true, |p| resource.privacy == p);

        subject_ok && semester_ok && type_ok && privacy_ok
    }
}

fn matches_text(resource: &Resource, needle: &str) -> bool {
    needle.is_empty()
        || resource.title.to_lowercase().contains(needle)
        || resource.subject.to_lowercase().contains(needle)
        || resource.tags.iter().any(|t| t.to_lowercase().contains(needle))
}

/// Access control, free text, field filters, then a stable sort. The input is left untouched.
pub fn search(
    resources: &[Resource],
    viewer: &AuthState,
    query: &str,
    filters: &SearchFilters,
) -> Vec<Resource> {
    let needle = query.to_lowercase();
    let mut results: Vec<Resource> = access::visible(resources, viewer)
        .into_iter()
        .filter(|r| matches_text(r, &needle))
        .filter(|r| filters.matches(r))
        .cloned()
        .collect();

    sort_resources(&mut results, filters.sort_by);
    results
}

/// `Vec::sort_by` is stable, so ties keep the order of the previous stage.
pub fn sort_resources(resources: &mut [Resource], sort_by: SortBy) {
    match sort_by {
        SortBy::Latest => resources.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortBy::Rating => resources.sort_by(|a, b| mean_rating(b).total_cmp(&mean_rating(a))),
        SortBy::Popular => resources.sort_by(|a, b| b.reviews.len().cmp(&a.reviews.len())),
    }
}

pub fn recent_uploads(resources: &[Resource], viewer: &AuthState, limit: usize) -> Vec<Resource> {
    let mut recent = search(resources, viewer, "", &SearchFilters::default());
    recent.truncate(limit);
    recent
}

/// A user's own uploads, in stored order. Owners always see their own resources.
pub fn uploaded_by(resources: &[Resource], user_id: &str) -> Vec<Resource> {
    resources
        .iter()
        .filter(|r| r.uploader_id == user_id)
        .cloned()
        .collect()
}
