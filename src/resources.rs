use crate::access;
use crate::config::LatencyConfig;
use crate::error::HubError;
use crate::models::{Resource, ResourceDraft, Review};
use crate::storage::Storage;
use crate::user_models::{AuthState, User};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Create, edit, delete and review resources. Each call is one full
/// read-modify-write of the resource collection; the last write wins.
pub struct ResourceService {
    storage: Arc<Storage>,
    latency: LatencyConfig,
}

impl ResourceService {
    pub fn new(storage: Arc<Storage>, latency: LatencyConfig) -> Self {
        Self { storage, latency }
    }

    pub async fn create(&self, session: &AuthState, draft: ResourceDraft) -> Result<Resource, HubError> {
        let owner = require_user(session)?;
        draft.validate()?;
        pause(self.latency.upload).await;

        let resource = Resource::new(owner, &draft);
        let created = resource.clone();
        self.storage
            .modify_resources(|resources| {
                resources.push(resource);
                Ok::<_, HubError>(())
            })
            .await?;

        info!(resource_id = %created.id, uploader_id = %owner.id, privacy = %created.privacy, "resource created");
        Ok(created)
    }

    /// Only the uploader may edit. Identity, creation time and reviews are kept.
    pub async fn update(
        &self,
        id: &str,
        session: &AuthState,
        draft: ResourceDraft,
    ) -> Result<Resource, HubError> {
        let owner = require_user(session)?;
        draft.validate()?;
        pause(self.latency.upload).await;

        let updated = self
            .storage
            .modify_resources(|resources| {
                let existing = find_mut(resources, id)?;
                if !existing.is_owned_by(owner) {
                    return Err(HubError::NotOwner);
                }
                existing.apply_draft(owner, &draft);
                Ok(existing.clone())
            })
            .await
            .inspect_err(|e| {
                if matches!(e, HubError::NotOwner) {
                    warn!(resource_id = %id, user_id = %owner.id, "edit by non-owner ignored");
                }
            })?;

        info!(resource_id = %id, "resource updated");
        Ok(updated)
    }

    /// Returns `false` without touching storage when the caller did not confirm.
    pub async fn delete(&self, id: &str, session: &AuthState, confirmed: bool) -> Result<bool, HubError> {
        let owner = require_user(session)?;
        if !confirmed {
            return Ok(false);
        }

        self.storage
            .modify_resources(|resources| {
                let existing = find_mut(resources, id)?;
                if !existing.is_owned_by(owner) {
                    return Err(HubError::NotOwner);
                }
                resources.retain(|r| r.id != id);
                Ok(())
            })
            .await?;

        info!(resource_id = %id, user_id = %owner.id, "resource deleted");
        Ok(true)
    }

    /// One review per reviewer: a repeat submission replaces the earlier one in place.
    pub async fn submit_review(
        &self,
        resource_id: &str,
        session: &AuthState,
        rating: u8,
        comment: String,
    ) -> Result<Resource, HubError> {
        let reviewer = require_user(session)?;
        if !(1..=5).contains(&rating) {
            return Err(HubError::InvalidRating(rating));
        }
        pause(self.latency.review).await;

        let review = Review::new(reviewer, rating, comment);
        let updated = self
            .storage
            .modify_resources(|resources| {
                let resource = find_mut(resources, resource_id)?;
                if !access::is_visible(resource, session) {
                    return Err(HubError::AccessDenied);
                }
                match resource.reviews.iter().position(|r| r.user_id == reviewer.id) {
                    Some(idx) => resource.reviews[idx] = review,
                    None => resource.reviews.push(review),
                }
                Ok(resource.clone())
            })
            .await?;

        info!(resource_id = %resource_id, reviewer_id = %reviewer.id, rating, "review submitted");
        Ok(updated)
    }
}

fn require_user(session: &AuthState) -> Result<&User, HubError> {
    session.current_user().ok_or(HubError::Unauthenticated)
}

fn find_mut<'a>(resources: &'a mut [Resource], id: &str) -> Result<&'a mut Resource, HubError> {
    resources
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| HubError::NotFound(id.to_string()))
}

async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrivacyLevel;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        storage: Arc<Storage>,
        service: ResourceService,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(dir.path()).unwrap());
        let service = ResourceService::new(storage.clone(), LatencyConfig::none());
        Fixture { _dir: dir, storage, service }
    }

    fn session(id: &str, college: &str) -> AuthState {
        AuthState::signed_in(&User::test_user(id, id, college))
    }

    fn draft(title: &str) -> ResourceDraft {
        ResourceDraft {
            title: title.into(),
            subject: "Algorithms".into(),
            semester: "5".into(),
            year_batch: "2025".into(),
            tags: "dp, graphs, dp".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_stamps_uploader_and_normalizes_tags() {
        let f = fixture();
        let alice = session("alice", "X College");
        let created = f.service.create(&alice, draft("DP sheet")).await.unwrap();

        assert_eq!(created.uploader_id, "alice");
        assert_eq!(created.uploader_college, "X College");
        assert_eq!(created.tags, vec!["dp", "graphs"]);
        assert!(created.reviews.is_empty());
        assert_eq!(f.storage.load_resources().unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn create_requires_a_session() {
        let f = fixture();
        let err = f.service.create(&AuthState::logged_out(), draft("x")).await.unwrap_err();
        assert!(matches!(err, HubError::Unauthenticated));
        assert!(f.storage.load_resources().unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_a_missing_year_batch() {
        let f = fixture();
        let mut incomplete = draft("DP sheet");
        incomplete.year_batch = "  ".into();
        let err = f.service.create(&session("alice", "X"), incomplete).await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all fields");
        assert!(f.storage.load_resources().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_by_non_owner_leaves_resource_unchanged() {
        let f = fixture();
        let alice = session("alice", "X College");
        let created = f.service.create(&alice, draft("Original")).await.unwrap();

        let mallory = session("mallory", "X College");
        let err = f.service.update(&created.id, &mallory, draft("Hijacked")).await.unwrap_err();
        assert!(matches!(err, HubError::NotOwner));

        let stored = f.storage.find_resource(&created.id).unwrap().unwrap();
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn update_keeps_identity_timestamp_and_reviews() {
        let f = fixture();
        let alice = session("alice", "X College");
        let created = f.service.create(&alice, draft("Original")).await.unwrap();
        f.service
            .submit_review(&created.id, &session("bob", "Y College"), 4, "useful".into())
            .await
            .unwrap();

        let mut edit = draft("Revised");
        edit.privacy = PrivacyLevel::Private;
        let updated = f.service.update(&created.id, &alice, edit).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.title, "Revised");
        assert_eq!(updated.privacy, PrivacyLevel::Private);
        assert_eq!(updated.reviews.len(), 1);
    }

    #[tokio::test]
    async fn second_review_replaces_first_in_place() {
        let f = fixture();
        let created = f.service.create(&session("alice", "X"), draft("Notes")).await.unwrap();
        let bob = session("bob", "X");
        let carol = session("carol", "X");

        f.service.submit_review(&created.id, &bob, 2, "meh".into()).await.unwrap();
        f.service.submit_review(&created.id, &carol, 5, "great".into()).await.unwrap();
        let updated = f.service.submit_review(&created.id, &bob, 4, "better now".into()).await.unwrap();

        let reviewers: Vec<&str> = updated.reviews.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(reviewers, vec!["bob", "carol"]);
        assert_eq!(updated.reviews[0].rating, 4);
        assert_eq!(updated.reviews[0].comment, "better now");
    }

    #[tokio::test]
    async fn review_rating_must_be_one_to_five() {
        let f = fixture();
        let created = f.service.create(&session("alice", "X"), draft("Notes")).await.unwrap();
        let err = f
            .service
            .submit_review(&created.id, &session("bob", "X"), 6, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::InvalidRating(6)));
    }

    #[tokio::test]
    async fn hidden_resource_cannot_be_reviewed() {
        let f = fixture();
        let mut private = draft("Private notes");
        private.privacy = PrivacyLevel::Private;
        let created = f.service.create(&session("alice", "X"), private).await.unwrap();
        let err = f
            .service
            .submit_review(&created.id, &session("bob", "Y"), 5, String::new())
            .await
            .unwrap_err();
        assert!(matches!(err, HubError::AccessDenied));
    }

    #[tokio::test]
    async fn delete_needs_confirmation_and_ownership() {
        let f = fixture();
        let alice = session("alice", "X");
        let created = f.service.create(&alice, draft("Notes")).await.unwrap();

        assert!(!f.service.delete(&created.id, &alice, false).await.unwrap());
        let err = f.service.delete(&created.id, &session("bob", "X"), true).await.unwrap_err();
        assert!(matches!(err, HubError::NotOwner));
        assert_eq!(f.storage.load_resources().unwrap().len(), 1);

        assert!(f.service.delete(&created.id, &alice, true).await.unwrap());
        assert!(f.storage.load_resources().unwrap().is_empty());
    }
}
