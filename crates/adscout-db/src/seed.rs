//! Demo-data seeding: a small set of platforms and opportunities plus an
//! optional demo account, enough to exercise the full search flow locally.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::opportunities::NewOpportunity;
use crate::DbError;

struct SeedPlatform {
    name: &'static str,
    slug: &'static str,
    platform_type: &'static str,
    website: &'static str,
}

const SEED_PLATFORMS: &[SeedPlatform] = &[
    SeedPlatform {
        name: "Facebook Ads",
        slug: "facebook-ads",
        platform_type: "social_media",
        website: "https://business.facebook.com",
    },
    SeedPlatform {
        name: "Instagram Ads",
        slug: "instagram-ads",
        platform_type: "social_media",
        website: "https://business.instagram.com",
    },
    SeedPlatform {
        name: "TikTok Ads",
        slug: "tiktok-ads",
        platform_type: "social_media",
        website: "https://ads.tiktok.com",
    },
    SeedPlatform {
        name: "Google Ads",
        slug: "google-ads",
        platform_type: "search_engine",
        website: "https://ads.google.com",
    },
    SeedPlatform {
        name: "YouTube Ads",
        slug: "youtube-ads",
        platform_type: "video",
        website: "https://ads.youtube.com",
    },
    SeedPlatform {
        name: "LinkedIn Ads",
        slug: "linkedin-ads",
        platform_type: "social_media",
        website: "https://business.linkedin.com/marketing-solutions/ads",
    },
    SeedPlatform {
        name: "Podcorn",
        slug: "podcorn",
        platform_type: "podcast",
        website: "https://podcorn.com",
    },
    SeedPlatform {
        name: "Paved",
        slug: "paved",
        platform_type: "newsletter",
        website: "https://paved.com",
    },
];

struct SeedOpportunity {
    platform_slug: &'static str,
    title: &'static str,
    ad_type: &'static str,
    pricing_model: &'static str,
    min_budget: i64,
    max_budget: Option<i64>,
    cpm_cents: i64,
    ctr_bps: i64,
    conversion_bps: i64,
    quality_score: i32,
}

const SEED_OPPORTUNITIES: &[SeedOpportunity] = &[
    SeedOpportunity {
        platform_slug: "facebook-ads",
        title: "Feed ads - broad reach",
        ad_type: "social_feed",
        pricing_model: "auction",
        min_budget: 100,
        max_budget: None,
        cpm_cents: 1150,
        ctr_bps: 180,
        conversion_bps: 220,
        quality_score: 85,
    },
    SeedOpportunity {
        platform_slug: "instagram-ads",
        title: "Stories placement",
        ad_type: "social_story",
        pricing_model: "auction",
        min_budget: 100,
        max_budget: Some(50_000),
        cpm_cents: 950,
        ctr_bps: 240,
        conversion_bps: 150,
        quality_score: 82,
    },
    SeedOpportunity {
        platform_slug: "tiktok-ads",
        title: "In-feed video",
        ad_type: "video_feed",
        pricing_model: "auction",
        min_budget: 500,
        max_budget: None,
        cpm_cents: 620,
        ctr_bps: 310,
        conversion_bps: 90,
        quality_score: 78,
    },
    SeedOpportunity {
        platform_slug: "google-ads",
        title: "Search ads - intent keywords",
        ad_type: "search_text",
        pricing_model: "cpc",
        min_budget: 100,
        max_budget: None,
        cpm_cents: 3800,
        ctr_bps: 365,
        conversion_bps: 390,
        quality_score: 92,
    },
    SeedOpportunity {
        platform_slug: "google-ads",
        title: "Display network banners",
        ad_type: "display_banner",
        pricing_model: "cpm",
        min_budget: 250,
        max_budget: Some(100_000),
        cpm_cents: 350,
        ctr_bps: 45,
        conversion_bps: 70,
        quality_score: 74,
    },
    SeedOpportunity {
        platform_slug: "youtube-ads",
        title: "Skippable in-stream",
        ad_type: "video_instream",
        pricing_model: "cpm",
        min_budget: 1_000,
        max_budget: None,
        cpm_cents: 980,
        ctr_bps: 65,
        conversion_bps: 50,
        quality_score: 80,
    },
    SeedOpportunity {
        platform_slug: "linkedin-ads",
        title: "Sponsored content - B2B",
        ad_type: "social_feed",
        pricing_model: "cpm",
        min_budget: 1_000,
        max_budget: Some(200_000),
        cpm_cents: 3300,
        ctr_bps: 44,
        conversion_bps: 280,
        quality_score: 76,
    },
    SeedOpportunity {
        platform_slug: "podcorn",
        title: "Mid-roll host-read spot",
        ad_type: "podcast_midroll",
        pricing_model: "flat_rate",
        min_budget: 500,
        max_budget: Some(25_000),
        cpm_cents: 2500,
        ctr_bps: 0,
        conversion_bps: 120,
        quality_score: 70,
    },
    SeedOpportunity {
        platform_slug: "paved",
        title: "Newsletter sponsorship slot",
        ad_type: "newsletter_display",
        pricing_model: "flat_rate",
        min_budget: 250,
        max_budget: Some(10_000),
        cpm_cents: 2000,
        ctr_bps: 150,
        conversion_bps: 180,
        quality_score: 68,
    },
];

/// Upserts the demo platform and opportunity catalog, and creates a demo
/// account for the given API-key hash if none exists yet.
///
/// Returns `(platforms, opportunities)` processed. Idempotent: re-running
/// refreshes the same rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails.
pub async fn seed_demo_data(
    pool: &PgPool,
    demo_account_key_hash: Option<&str>,
) -> Result<(usize, usize), DbError> {
    let mut platforms = 0usize;
    for platform in SEED_PLATFORMS {
        crate::platforms::upsert_platform(
            pool,
            platform.name,
            platform.slug,
            platform.platform_type,
            Some(platform.website),
        )
        .await?;
        platforms += 1;
    }

    let mut opportunities = 0usize;
    for opp in SEED_OPPORTUNITIES {
        let platform_id: i64 =
            sqlx::query_scalar("SELECT id FROM ad_platforms WHERE slug = $1")
                .bind(opp.platform_slug)
                .fetch_one(pool)
                .await?;

        let ctr = (opp.ctr_bps > 0).then(|| Decimal::new(opp.ctr_bps, 4));
        crate::opportunities::upsert_opportunity(
            pool,
            &NewOpportunity {
                platform_id,
                title: opp.title,
                description: None,
                ad_type: opp.ad_type,
                placement: None,
                pricing_model: opp.pricing_model,
                min_budget: Some(Decimal::from(opp.min_budget)),
                max_budget: opp.max_budget.map(Decimal::from),
                cpm_estimate: Some(Decimal::new(opp.cpm_cents, 2)),
                avg_ctr: ctr,
                avg_conversion: Some(Decimal::new(opp.conversion_bps, 4)),
                quality_score: opp.quality_score,
            },
        )
        .await?;
        opportunities += 1;
    }

    if let Some(key_hash) = demo_account_key_hash {
        sqlx::query(
            "INSERT INTO accounts (name, api_key_hash, plan) \
             VALUES ('Demo Account', $1, 'growth') \
             ON CONFLICT (api_key_hash) DO NOTHING",
        )
        .bind(key_hash)
        .execute(pool)
        .await?;
    }

    Ok((platforms, opportunities))
}
