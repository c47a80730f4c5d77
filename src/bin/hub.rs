use anyhow::{bail, Result};
use campus_hub::{
    access::{self, ResourceView},
    config::AppConfig,
    models::{PrivacyLevel, Resource, ResourceDraft, ResourceType},
    query::{self, SearchFilters, SortBy},
    rating,
    user_models::{AuthState, Credentials, ProfileUpdate, Registration, User},
    Hub,
};
use clap::{Args, Parser, Subcommand};
use prettytable::{Cell, Row, Table};
use std::io::{self, Write};

#[derive(Parser)]
#[command(name = "hub")]
#[command(about = "Share and review notes, papers and solutions with your college", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create a new account and log in")]
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        #[arg(short, long)]
        college: String,

        #[arg(short, long)]
        branch: String,

        #[arg(short, long, default_value = "1")]
        semester: String,
    },

    #[command(about = "Log in with email and password")]
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },

    #[command(about = "Log out")]
    Logout,

    #[command(about = "Show current user")]
    Whoami,

    #[command(about = "Upload a new resource")]
    Upload(DraftArgs),

    #[command(about = "Edit one of your uploads")]
    Edit {
        #[arg(help = "Resource ID")]
        id: String,

        #[command(flatten)]
        draft: DraftArgs,
    },

    #[command(about = "Delete one of your uploads")]
    Delete {
        #[arg(help = "Resource ID")]
        id: String,

        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },

    #[command(about = "Search resources you are allowed to see")]
    Search {
        #[arg(help = "Matches title, subject or tags")]
        query: Option<String>,

        #[arg(long, default_value = "")]
        subject: String,

        #[arg(long, default_value = "")]
        semester: String,

        #[arg(short = 't', long = "type")]
        resource_type: Option<String>,

        #[arg(long)]
        privacy: Option<String>,

        #[arg(short, long, default_value = "latest", help = "latest, rating or popular")]
        sort: String,
    },

    #[command(about = "Show a resource with its reviews")]
    Show {
        #[arg(help = "Resource ID")]
        id: String,
    },

    #[command(about = "Rate and review a resource")]
    Review {
        #[arg(help = "Resource ID")]
        id: String,

        #[arg(short, long, help = "1 to 5 stars")]
        rating: u8,

        #[arg(short, long, default_value = "")]
        comment: String,
    },

    #[command(about = "Show your profile and uploads")]
    Profile,

    #[command(about = "Update your bio")]
    Bio {
        text: String,
    },
}

#[derive(Args)]
struct DraftArgs {
    #[arg(long)]
    title: String,

    #[arg(long)]
    subject: String,

    #[arg(long, default_value = "1")]
    semester: String,

    #[arg(short = 't', long = "type", default_value = "Notes")]
    resource_type: String,

    #[arg(long, help = "Year or batch label, e.g. 2024")]
    year_batch: String,

    #[arg(short, long, default_value = "")]
    description: String,

    #[arg(long, default_value = "", help = "Comma-separated tags")]
    tags: String,

    #[arg(long, default_value = "public")]
    privacy: String,

    #[arg(short, long, default_value = "")]
    file: String,
}

impl DraftArgs {
    fn into_draft(self) -> Result<ResourceDraft> {
        Ok(ResourceDraft {
            title: self.title,
            subject: self.subject,
            semester: self.semester,
            resource_type: self.resource_type.parse()?,
            year_batch: self.year_batch,
            description: self.description,
            tags: self.tags,
            privacy: self.privacy.parse()?,
            file_name: self.file,
        })
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    campus_hub::init_tracing("warn");
    let cli = Cli::parse();

    if let Err(e) = run_command(cli.command).await {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_command(command: Commands) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    // No artificial commit delay on the command line.
    config.latency = campus_hub::config::LatencyConfig::none();
    let hub = Hub::open(&config)?;
    let session = hub.accounts.current()?;

    match command {
        Commands::Register { name, email, password, college, branch, semester } => {
            let form = Registration { name, email, password, college, branch, semester };
            let user = hub.accounts.register(form).await?;
            println!("✅ Account created, you are logged in as {}", user.name);
            print_user(&user);
        }
        Commands::Login { email, password } => {
            let user = hub.accounts.login(Credentials { email, password })?;
            println!("✅ Welcome back, {}!", user.name);
        }
        Commands::Logout => {
            hub.accounts.logout()?;
            println!("✅ Logged out successfully!");
        }
        Commands::Whoami => match session.current_user() {
            Some(user) => print_user(user),
            None => println!("❌ Not logged in"),
        },
        Commands::Upload(args) => {
            let resource = hub.resources.create(&session, args.into_draft()?).await?;
            println!("✅ Uploaded '{}'", resource.title);
            println!("🆔 Resource ID: {}", resource.id);
        }
        Commands::Edit { id, draft } => {
            let resource = hub.resources.update(&id, &session, draft.into_draft()?).await?;
            println!("✅ Updated '{}'", resource.title);
        }
        Commands::Delete { id, yes } => {
            let confirmed = yes || confirm("Are you sure you want to delete this resource?")?;
            if hub.resources.delete(&id, &session, confirmed).await? {
                println!("🗑️  Resource deleted");
            } else {
                println!("❌ Delete cancelled");
            }
        }
        Commands::Search { query: text, subject, semester, resource_type, privacy, sort } => {
            let filters = SearchFilters {
                subject,
                semester,
                resource_type: resource_type.map(|t| t.parse::<ResourceType>()).transpose()?,
                privacy: privacy.map(|p| p.parse::<PrivacyLevel>()).transpose()?,
                sort_by: sort.parse::<SortBy>()?,
            };
            let resources = hub.storage.load_resources()?;
            let results = query::search(&resources, &session, text.as_deref().unwrap_or(""), &filters);
            print_table(&results);
        }
        Commands::Show { id } => {
            let resources = hub.storage.load_resources()?;
            match access::view_resource(&resources, &id, &session) {
                ResourceView::Found(resource) => print_detail(&resource),
                ResourceView::Denied { uploader_college } => {
                    println!("🔒 Access denied");
                    println!("💡 This resource is private and only available to students from {}", uploader_college);
                }
                ResourceView::NotFound => bail!("Resource not found: {}", id),
            }
        }
        Commands::Review { id, rating: stars, comment } => {
            let resource = hub.resources.submit_review(&id, &session, stars, comment).await?;
            println!("✅ Review saved");
            println!("⭐ Average rating: {}", rating::average_rating(&resource));
        }
        Commands::Profile => {
            let user = require_login(&session)?;
            let uploads = query::uploaded_by(&hub.storage.load_resources()?, &user.id);
            let stats = rating::profile_stats(&uploads);
            print_user(user);
            println!("📚 Uploads: {}", stats.uploads);
            println!("💬 Reviews received: {}", stats.reviews_received);
            println!("⭐ Average rating: {}", stats.average_rating);
            print_table(&uploads);
        }
        Commands::Bio { text } => {
            let update = ProfileUpdate { bio: Some(text), profile_pic: None };
            hub.accounts.update_profile(&session, update).await?;
            println!("✅ Bio updated");
        }
    }

    Ok(())
}

fn require_login(session: &AuthState) -> Result<&User> {
    session
        .current_user()
        .ok_or_else(|| anyhow::anyhow!("You must be logged in. Use: hub login -e <email> -p <password>"))
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("❓ {} (yes/no): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    Ok(answer == "yes" || answer == "y")
}

fn print_user(user: &User) {
    println!("👤 {} <{}>", user.name, user.email);
    println!("🏫 {} | {} | Semester {}", user.college, user.branch, user.semester);
    if let Some(bio) = &user.bio {
        println!("📝 {}", bio);
    }
}

/// First eight characters of an id, for table columns.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

fn print_table(resources: &[Resource]) {
    if resources.is_empty() {
        println!("📭 No resources found.");
        return;
    }

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("ID"),
        Cell::new("Title"),
        Cell::new("Subject"),
        Cell::new("Sem"),
        Cell::new("Type"),
        Cell::new("Privacy"),
        Cell::new("Rating"),
        Cell::new("Reviews"),
    ]));

    for r in resources {
        table.add_row(Row::new(vec![
            Cell::new(&short_id(&r.id)),
            Cell::new(&r.title),
            Cell::new(&r.subject),
            Cell::new(&r.semester),
            Cell::new(r.resource_type.label()),
            Cell::new(&r.privacy.to_string()),
            Cell::new(&rating::average_rating(r).to_string()),
            Cell::new(&r.reviews.len().to_string()),
        ]));
    }

    table.printstd();
    println!("Showing {} resources", resources.len());
}

fn print_detail(resource: &Resource) {
    println!("\n📄 {} [{} | {}]", resource.title, resource.resource_type, resource.privacy);
    println!("📘 {} | Semester {} | {}", resource.subject, resource.semester, resource.year_batch);
    println!("👤 {} ({})", resource.uploader_name, resource.uploader_college);
    println!("📎 {}", resource.file_name);
    if resource.description.is_empty() {
        println!("📝 No description provided.");
    } else {
        println!("📝 {}", resource.description);
    }
    if !resource.tags.is_empty() {
        println!("🏷️  {}", resource.tags.join(", "));
    }
    println!("⭐ {} ({} reviews)", rating::average_rating(resource), resource.reviews.len());

    let mut reviews: Vec<_> = resource.reviews.iter().collect();
    reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    for review in reviews {
        let stars: String = (1..=5).map(|i| if i <= review.rating { '★' } else { '☆' }).collect();
        println!("\n   {} {}", stars, review.user_name);
        if !review.comment.is_empty() {
            println!("   {}", review.comment);
        }
    }
    println!();
}
