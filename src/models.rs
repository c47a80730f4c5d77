use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::HubError;
use crate::user_models::User;

/// Stand-in for a real object URL; no file bytes are ever stored.
pub const PLACEHOLDER_FILE_URL: &str = "#";
pub const DEFAULT_FILE_NAME: &str = "document.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResourceType {
    #[default]
    Notes,
    #[serde(rename = "Question Papers")]
    QuestionPapers,
    Solutions,
    #[serde(rename = "Project Reports")]
    ProjectReports,
    #[serde(rename = "Study Material")]
    StudyMaterial,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Notes,
        ResourceType::QuestionPapers,
        ResourceType::Solutions,
        ResourceType::ProjectReports,
        ResourceType::StudyMaterial,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResourceType::Notes => "Notes",
            ResourceType::QuestionPapers => "Question Papers",
            ResourceType::Solutions => "Solutions",
            ResourceType::ProjectReports => "Project Reports",
            ResourceType::StudyMaterial => "Study Material",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResourceType {
    type Err = HubError;

    /// Accepts the display label in any case, with spaces, dashes or underscores.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], " ");
        ResourceType::ALL
            .into_iter()
            .find(|t| t.label().to_lowercase() == wanted)
            .ok_or_else(|| HubError::Validation(format!("Unknown resource type: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrivacyLevel {
    #[default]
    Public,
    Private,
}

impl fmt::Display for PrivacyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivacyLevel::Public => f.write_str("Public"),
            PrivacyLevel::Private => f.write_str("Private"),
        }
    }
}

impl FromStr for PrivacyLevel {
    type Err = HubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(PrivacyLevel::Public),
            "private" => Ok(PrivacyLevel::Private),
            _ => Err(HubError::Validation(format!("Unknown privacy level: {}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

impl Review {
    pub fn new(reviewer: &User, rating: u8, comment: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: reviewer.id.clone(),
            user_name: reviewer.name.clone(),
            rating,
            comment,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub uploader_id: String,
    pub uploader_name: String,
    pub uploader_college: String,
    pub title: String,
    pub subject: String,
    pub semester: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub year_batch: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub privacy: PrivacyLevel,
    pub file_url: String,
    pub file_name: String,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub created_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(owner: &User, draft: &ResourceDraft) -> Self {
        let mut resource = Self {
            id: Uuid::new_v4().to_string(),
            uploader_id: String::new(),
            uploader_name: String::new(),
            uploader_college: String::new(),
            title: String::new(),
            subject: String::new(),
            semester: String::new(),
            resource_type: ResourceType::default(),
            year_batch: String::new(),
            description: String::new(),
            tags: Vec::new(),
            privacy: PrivacyLevel::default(),
            file_url: PLACEHOLDER_FILE_URL.to_string(),
            file_name: String::new(),
            reviews: Vec::new(),
            created_at: Utc::now(),
        };
        resource.apply_draft(owner, draft);
        resource
    }

    /// Overwrites every editable field. Identity, creation time and reviews are left alone.
    pub fn apply_draft(&mut self, owner: &User, draft: &ResourceDraft) {
        self.uploader_id = owner.id.clone();
        self.uploader_name = owner.name.clone();
        self.uploader_college = owner.college.clone();
        self.title = draft.title.trim().to_string();
        self.subject = draft.subject.trim().to_string();
        self.semester = draft.semester.trim().to_string();
        self.resource_type = draft.resource_type;
        self.year_batch = draft.year_batch.trim().to_string();
        self.description = draft.description.clone();
        self.tags = normalize_tags(&draft.tags);
        self.privacy = draft.privacy;
        self.file_name = if draft.file_name.trim().is_empty() {
            DEFAULT_FILE_NAME.to_string()
        } else {
            draft.file_name.trim().to_string()
        };
        self.file_url = PLACEHOLDER_FILE_URL.to_string();
    }

    pub fn is_owned_by(&self, user: &User) -> bool {
        self.uploader_id == user.id
    }
}

/// Upload form contents. `tags` is the raw comma-separated field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceDraft {
    pub title: String,
    pub subject: String,
    pub semester: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub year_batch: String,
    pub description: String,
    pub tags: String,
    pub privacy: PrivacyLevel,
    pub file_name: String,
}

impl ResourceDraft {
    pub fn validate(&self) -> Result<(), HubError> {
        let required = [&self.title, &self.subject, &self.semester, &self.year_batch];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(HubError::Validation("Please fill in all fields".to_string()));
        }
        Ok(())
    }

    /// Inverse of `Resource::apply_draft`, used to prefill an edit form.
    pub fn from_resource(resource: &Resource) -> Self {
        Self {
            title: resource.title.clone(),
            subject: resource.subject.clone(),
            semester: resource.semester.clone(),
            resource_type: resource.resource_type,
            year_batch: resource.year_batch.clone(),
            description: resource.description.clone(),
            tags: resource.tags.join(", "),
            privacy: resource.privacy,
            file_name: resource.file_name.clone(),
        }
    }
}

/// Splits on commas, trims, drops empties and later duplicates.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|seen| seen == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
