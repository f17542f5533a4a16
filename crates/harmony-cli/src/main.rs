use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use harmony_core::ShopRequestStatus;
use tracing_subscriber::EnvFilter;

/// Shortest password accepted for accounts created from the command line.
const PASSWORD_MIN_LEN: usize = 6;

#[derive(Debug, Parser)]
#[command(name = "harmony-cli")]
#[command(about = "Hunger's Harmony operator command line interface")]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Load the demo catalog of shops, owners, and products
    Seed {
        /// Catalog YAML file
        #[arg(long, default_value = "config/catalog.yaml")]
        file: PathBuf,
        /// Password given to every seeded shop owner
        #[arg(long, env = "HARMONY_SEED_OWNER_PASSWORD", hide_env_values = true)]
        owner_password: String,
    },
    /// Create a superadmin, or promote and reset an existing account
    CreateSuperadmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "HARMONY_SUPERADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// List shop requests awaiting review
    PendingRequests,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("harmony-cli ready; run with --help to list commands");
        return Ok(());
    };

    let pool = harmony_db::connect_pool(&cli.database_url, harmony_db::PoolConfig::default())
        .await
        .context("failed to connect to database")?;

    match command {
        Commands::Migrate => {
            let applied = harmony_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Seed {
            file,
            owner_password,
        } => run_seed(&pool, &file, &owner_password).await?,
        Commands::CreateSuperadmin {
            name,
            email,
            password,
        } => run_create_superadmin(&pool, &name, &email, &password).await?,
        Commands::PendingRequests => run_pending_requests(&pool).await?,
    }

    Ok(())
}

fn check_password(password: &str) -> anyhow::Result<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        anyhow::bail!("password must be at least {PASSWORD_MIN_LEN} characters");
    }
    Ok(())
}

async fn hash_password(password: &str) -> anyhow::Result<String> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await??;
    Ok(hash)
}

/// Seeds the demo catalog. Shops whose hours cross midnight are loaded but
/// reported, since they will show as closed all day.
///
/// # Errors
///
/// Returns an error if the file cannot be read or validated, or if any
/// database write fails (the whole seed is rolled back).
async fn run_seed(
    pool: &sqlx::PgPool,
    file: &std::path::Path,
    owner_password: &str,
) -> anyhow::Result<()> {
    check_password(owner_password)?;
    let catalog = harmony_core::load_catalog(file)
        .with_context(|| format!("failed to load catalog from {}", file.display()))?;

    for shop in harmony_db::overnight_shops(&catalog) {
        tracing::warn!(shop, "closing time is before opening time; shop will report closed");
    }

    let hash = hash_password(owner_password).await?;
    let summary = harmony_db::seed_catalog(pool, &catalog, &hash).await?;
    tracing::info!(
        owners = summary.owners,
        shops_created = summary.shops_created,
        products_created = summary.products_created,
        "seed complete"
    );
    println!(
        "seeded {} owner(s), {} new shop(s), {} new product(s)",
        summary.owners, summary.shops_created, summary.products_created
    );
    Ok(())
}

async fn run_create_superadmin(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("name cannot be blank");
    }
    let email = harmony_core::normalize_email(email);
    if !email.contains('@') {
        anyhow::bail!("'{email}' is not a valid email address");
    }
    check_password(password)?;

    let hash = hash_password(password).await?;
    let user = harmony_db::upsert_superadmin(pool, name, &email, &hash).await?;
    tracing::info!(user_id = %user.id, "superadmin ready");
    println!("superadmin {} <{}> ({})", user.name, user.email, user.id);
    Ok(())
}

async fn run_pending_requests(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let requests = harmony_db::list_shop_requests(pool, Some(ShopRequestStatus::Pending)).await?;
    if requests.is_empty() {
        println!("no pending shop requests");
        return Ok(());
    }

    println!(
        "{:<36}  {:<16}  {:<28}  {:<30}  {:<10}",
        "ID", "SUBMITTED", "SHOP", "REQUESTER", "PROVINCE"
    );
    for listing in &requests {
        let r = &listing.request;
        println!(
            "{:<36}  {:<16}  {:<28}  {:<30}  {:<10}",
            r.id,
            r.created_at.format("%Y-%m-%d %H:%M"),
            truncate(&r.shop_name, 28),
            truncate(&listing.requester_email, 30),
            r.province.as_deref().unwrap_or("-"),
        );
    }
    println!("{} pending", requests.len());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_owned()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests;
