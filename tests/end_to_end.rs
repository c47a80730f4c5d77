//! End-to-end flows through the public services, backed by a throwaway data directory.

use anyhow::Result;
use campus_hub::{
    access::{self, ResourceView},
    config::AppConfig,
    models::{PrivacyLevel, ResourceDraft, ResourceType},
    query::{self, SearchFilters, SortBy},
    rating::{self, AverageRating},
    user_models::{Credentials, Registration},
    Hub,
};
use tempfile::TempDir;

fn student(name: &str, college: &str) -> Registration {
    Registration {
        name: name.to_string(),
        email: format!("{}@campus.test", name.to_lowercase()),
        password: format!("{}-password", name),
        college: college.to_string(),
        branch: "CSE".to_string(),
        semester: "5".to_string(),
    }
}

fn private_notes() -> ResourceDraft {
    ResourceDraft {
        title: "Compiler Design Unit 3".to_string(),
        subject: "Compiler Design".to_string(),
        semester: "5".to_string(),
        resource_type: ResourceType::Notes,
        year_batch: "2025".to_string(),
        description: "Parsing tables worked out by hand".to_string(),
        tags: "parsing, LR(1), parsing".to_string(),
        privacy: PrivacyLevel::Private,
        file_name: "unit3.pdf".to_string(),
    }
}

#[tokio::test]
async fn private_upload_is_scoped_to_the_uploaders_college() -> Result<()> {
    let dir = TempDir::new()?;
    let hub = Hub::open(&AppConfig::local(dir.path()))?;

    // A at college X uploads a private resource.
    hub.accounts.register(student("Asha", "X Institute")).await?;
    let session_a = hub.accounts.current()?;
    let uploaded = hub.resources.create(&session_a, private_notes()).await?;
    hub.accounts.logout()?;

    // B at college Y is denied.
    hub.accounts.register(student("Bilal", "Y University")).await?;
    let session_b = hub.accounts.current()?;
    let resources = hub.storage.load_resources()?;
    assert_eq!(
        access::view_resource(&resources, &uploaded.id, &session_b),
        ResourceView::Denied { uploader_college: "X Institute".to_string() }
    );
    assert!(query::search(&resources, &session_b, "", &SearchFilters::default()).is_empty());
    hub.accounts.logout()?;

    // C at college X sees exactly what A submitted.
    hub.accounts.register(student("Chen", "X Institute")).await?;
    let session_c = hub.accounts.current()?;
    let resources = hub.storage.load_resources()?;
    let ResourceView::Found(seen) = access::view_resource(&resources, &uploaded.id, &session_c) else {
        panic!("college mate should see the private resource");
    };
    assert_eq!(seen, uploaded);
    assert_eq!(seen.uploader_name, "Asha");
    assert_eq!(seen.tags, vec!["parsing", "LR(1)"]);
    assert_eq!(seen.file_name, "unit3.pdf");
    Ok(())
}

#[tokio::test]
async fn reviews_drive_rating_and_popularity() -> Result<()> {
    let dir = TempDir::new()?;
    let hub = Hub::open(&AppConfig::local(dir.path()))?;

    hub.accounts.register(student("Asha", "X Institute")).await?;
    let owner = hub.accounts.current()?;
    let mut public = private_notes();
    public.privacy = PrivacyLevel::Public;
    let quiet = hub.resources.create(&owner, public.clone()).await?;
    public.title = "Compiler Design PYQs".to_string();
    public.resource_type = ResourceType::QuestionPapers;
    let busy = hub.resources.create(&owner, public).await?;
    hub.accounts.logout()?;

    for (name, stars) in [("Ravi", 5), ("Meera", 3), ("Tom", 4)] {
        hub.accounts.register(student(name, "Z College")).await?;
        let session = hub.accounts.current()?;
        hub.resources.submit_review(&busy.id, &session, 1, "first try".into()).await?;
        hub.resources.submit_review(&busy.id, &session, stars, "changed my mind".into()).await?;
        hub.accounts.logout()?;
    }

    let resources = hub.storage.load_resources()?;
    let stored = resources.iter().find(|r| r.id == busy.id).expect("stored");
    assert_eq!(stored.reviews.len(), 3);
    assert_eq!(rating::average_rating(stored), AverageRating::Rated(4.0));
    assert_eq!(rating::average_rating(&quiet), AverageRating::New);

    let anon = hub.accounts.current()?;
    let filters = SearchFilters { sort_by: SortBy::Popular, ..Default::default() };
    let ranked = query::search(&resources, &anon, "compiler", &filters);
    let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![busy.id.as_str(), quiet.id.as_str()]);
    Ok(())
}

#[tokio::test]
async fn state_survives_reopening_the_store() -> Result<()> {
    let dir = TempDir::new()?;
    {
        let hub = Hub::open(&AppConfig::local(dir.path()))?;
        hub.accounts.register(student("Asha", "X Institute")).await?;
        let session = hub.accounts.current()?;
        hub.resources.create(&session, private_notes()).await?;
    }

    let hub = Hub::open(&AppConfig::local(dir.path()))?;
    let session = hub.accounts.current()?;
    assert_eq!(session.current_user().map(|u| u.name.as_str()), Some("Asha"));
    assert_eq!(hub.storage.load_resources()?.len(), 1);

    hub.accounts.logout()?;
    let relogin = Credentials {
        email: "asha@campus.test".to_string(),
        password: "Asha-password".to_string(),
    };
    assert_eq!(hub.accounts.login(relogin)?.college, "X Institute");
    Ok(())
}
