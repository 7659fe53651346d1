//! Operational command line interface: seeding, account issuance, and the
//! maintenance sweeps that the server otherwise runs on its scheduler.

use clap::{Parser, Subcommand};
use sqlx::PgPool;

use adscout_core::hash_api_key;

#[derive(Debug, Parser)]
#[command(name = "adscout-cli")]
#[command(about = "AdScout command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upsert the demo platform/opportunity catalog, optionally with a demo account.
    Seed {
        /// Raw API key to register for the demo account.
        #[arg(long)]
        demo_key: Option<String>,
    },
    /// Create an account for a raw API key and print its public id.
    CreateAccount {
        #[arg(long)]
        name: String,
        /// One of: starter, growth, scale, enterprise.
        #[arg(long, default_value = "starter")]
        plan: String,
        /// Raw API key to hash and store. Keep it; it cannot be recovered.
        #[arg(long)]
        api_key: String,
    },
    /// Run the stale-data sweeps once: stuck searches and unverified opportunities.
    SweepStale,
    /// Zero every account's monthly search usage.
    ResetUsage,
    /// Run pending database migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = adscout_core::load_app_config()?;
    let pool = adscout_db::connect_pool(
        &config.database_url,
        adscout_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Seed { demo_key } => seed(&pool, &config, demo_key.as_deref()).await?,
        Commands::CreateAccount {
            name,
            plan,
            api_key,
        } => create_account(&pool, &config, &name, &plan, &api_key).await?,
        Commands::SweepStale => sweep_stale(&pool, &config).await?,
        Commands::ResetUsage => {
            let accounts = adscout_db::reset_all_search_usage(&pool).await?;
            println!("reset search usage on {accounts} account(s)");
        }
        Commands::Migrate => {
            adscout_db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
    }

    Ok(())
}

async fn seed(
    pool: &PgPool,
    config: &adscout_core::AppConfig,
    demo_key: Option<&str>,
) -> anyhow::Result<()> {
    let demo_hash = demo_key.map(|key| hash_api_key(&config.api_key_hash_salt, key));
    let (platforms, opportunities) =
        adscout_db::seed::seed_demo_data(pool, demo_hash.as_deref()).await?;

    println!("seeded {platforms} platform(s) and {opportunities} opportunity(ies)");
    if demo_key.is_some() {
        println!("demo account ready; authenticate with the key you supplied");
    }
    Ok(())
}

async fn create_account(
    pool: &PgPool,
    config: &adscout_core::AppConfig,
    name: &str,
    plan: &str,
    api_key: &str,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        matches!(plan, "starter" | "growth" | "scale" | "enterprise"),
        "unknown plan '{plan}'; expected starter, growth, scale, or enterprise"
    );

    let key_hash = hash_api_key(&config.api_key_hash_salt, api_key);
    let account = adscout_db::create_account(pool, name, &key_hash, plan).await?;

    println!("created account {} on plan {}", account.public_id, account.plan);
    Ok(())
}

async fn sweep_stale(pool: &PgPool, config: &adscout_core::AppConfig) -> anyhow::Result<()> {
    let max_age = i64::try_from(config.search_stale_after_secs).unwrap_or(i64::MAX);
    let failed = adscout_db::fail_stale_searches(pool, max_age).await?;
    println!("failed {failed} stuck search(es)");

    let days = i32::try_from(config.opportunity_stale_after_days).unwrap_or(i32::MAX);
    let deactivated = adscout_db::deactivate_stale_opportunities(pool, days).await?;
    println!("deactivated {deactivated} stale opportunity(ies)");
    Ok(())
}
