use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub college: String,
    pub branch: String,
    pub semester: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
}

impl User {
    pub fn new(form: &Registration, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            college: form.college.trim().to_string(),
            branch: form.branch.trim().to_string(),
            semester: form.semester.trim().to_string(),
            bio: None,
            profile_pic: None,
            password_hash,
        }
    }

    /// Copy safe to hand out or keep in the session entry.
    pub fn public(&self) -> Self {
        Self {
            password_hash: String::new(),
            ..self.clone()
        }
    }

    #[cfg(test)]
    pub(crate) fn test_user(id: &str, name: &str, college: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.edu", id),
            college: college.to_string(),
            branch: "CSE".to_string(),
            semester: "3".to_string(),
            bio: None,
            profile_pic: None,
            password_hash: String::new(),
        }
    }
}

#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub college: String,
    pub branch: String,
    pub semester: String,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub profile_pic: Option<String>,
}

/// The viewer's session. Passed explicitly into every operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<User>,
    pub is_authenticated: bool,
}

impl AuthState {
    pub fn logged_out() -> Self {
        Self::default()
    }

    pub fn signed_in(user: &User) -> Self {
        Self {
            user: Some(user.public()),
            is_authenticated: true,
        }
    }

    /// The user, only when the session is authenticated.
    pub fn current_user(&self) -> Option<&User> {
        if self.is_authenticated {
            self.user.as_ref()
        } else {
            None
        }
    }

    pub fn college(&self) -> Option<&str> {
        self.current_user().map(|u| u.college.as_str())
    }
}
