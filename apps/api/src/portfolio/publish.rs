//! Publish / unpublish transitions for the single per-user portfolio.
//!
//! The transition logic runs against a `PortfolioStore` seam (same
//! pattern as `SlugIndex`), with the Postgres implementation below.
//! Publishing allocates a slug (see `slug.rs`) and flips the record to
//! published in one upsert. The write can still lose a race for the slug
//! to a concurrent publish with the same base; the partial unique index
//! rejects that write, the store reports `SlugTaken`, and we go back to
//! the allocator for the next suffix.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::extract::AuthUser;
use crate::errors::AppError;
use crate::models::portfolio::{
    PortfolioContent, PortfolioRow, PortfolioWithResume, PublicPortfolio,
};
use crate::models::resume::ResumeRow;
use crate::portfolio::slug::{choose_slug_base, ensure_unique_slug, SlugIndex, SuffixSource};

/// Outcome of a publish write. `SlugTaken` means the uniqueness
/// constraint rejected the slug at write time — the check-then-act probe
/// lost its race and the caller should re-probe.
#[derive(Debug)]
pub enum PublishWrite {
    Written(PortfolioRow),
    SlugTaken,
}

/// Storage seam for the publish state machine. The Postgres
/// implementation backs every method with one statement; the test suite
/// substitutes an in-memory store with the same contract.
#[async_trait]
pub trait PortfolioStore: SlugIndex {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError>;

    async fn resume_owned_by(&self, owner_id: Uuid, resume_id: Uuid) -> Result<bool, AppError>;

    /// Upserts the owner's portfolio to published state under `slug`,
    /// merging any supplied content fields.
    async fn write_published(
        &self,
        owner_id: Uuid,
        slug: &str,
        content: &PortfolioContent,
    ) -> Result<PublishWrite, AppError>;

    /// Clears the published flag and timestamp, retaining the slug as a
    /// memo. `None` when the owner has no portfolio.
    async fn clear_published(&self, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError>;

    /// Resolves a slug to a portfolio only while it is published; an
    /// unpublished record's slug memo must never match.
    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<PortfolioRow>, AppError>;
}

/// Publishes the caller's portfolio, creating it if needed.
///
/// Base precedence: explicit request > stored slug > display name >
/// email local-part > "portfolio". The allocator excludes the caller's
/// own record so republishing under the current slug is a no-op rather
/// than a spurious `-1`.
pub async fn publish<S: PortfolioStore>(
    store: &S,
    owner: &AuthUser,
    desired: Option<&str>,
    content: &PortfolioContent,
    suffixes: &dyn SuffixSource,
) -> Result<PortfolioRow, AppError> {
    if let Some(resume_id) = content.featured_resume {
        if !store.resume_owned_by(owner.id, resume_id).await? {
            return Err(AppError::Validation(
                "Featured resume does not belong to the caller".to_string(),
            ));
        }
    }

    let existing = store.find_by_owner(owner.id).await?;
    let exclude = existing.as_ref().map(|p| p.id);
    let base = choose_slug_base(
        desired,
        existing.as_ref().and_then(|p| p.slug.as_deref()),
        Some(&owner.name),
        &owner.email,
        suffixes,
    );

    loop {
        let slug = ensure_unique_slug(store, &base, exclude).await?;
        match store.write_published(owner.id, &slug, content).await? {
            PublishWrite::Written(row) => {
                info!("Published portfolio for user {} at slug {slug}", owner.id);
                return Ok(row);
            }
            // Lost the check-then-act race: another publish claimed the
            // slug between our probe and the write. The store constraint
            // is the real guarantee; re-probe from the same base.
            PublishWrite::SlugTaken => continue,
        }
    }
}

/// Takes the portfolio offline. The slug stays on the row as a memo so a
/// later publish without an explicit slug lands on the same URL when it
/// is still free.
pub async fn unpublish<S: PortfolioStore>(
    store: &S,
    owner_id: Uuid,
) -> Result<PortfolioRow, AppError> {
    store
        .clear_published(owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No portfolio to unpublish".to_string()))
}

/// Unauthenticated slug resolution. Only published portfolios are visible.
pub async fn published_by_slug<S: PortfolioStore>(
    store: &S,
    slug: &str,
) -> Result<PortfolioRow, AppError> {
    store
        .find_published_by_slug(slug)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))
}

/// Postgres-backed store. The partial unique index
/// `portfolios_published_slug` is the durable uniqueness guarantee.
pub struct PgPortfolioStore<'a> {
    pub pool: &'a PgPool,
}

#[async_trait]
impl SlugIndex for PgPortfolioStore<'_> {
    async fn is_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM portfolios
                WHERE slug = $1
                  AND is_published
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(slug)
        .bind(exclude)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }
}

#[async_trait]
impl PortfolioStore for PgPortfolioStore<'_> {
    async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError> {
        find_by_owner(self.pool, owner_id).await
    }

    async fn resume_owned_by(&self, owner_id: Uuid, resume_id: Uuid) -> Result<bool, AppError> {
        resume_owned_by(self.pool, owner_id, resume_id).await
    }

    async fn write_published(
        &self,
        owner_id: Uuid,
        slug: &str,
        content: &PortfolioContent,
    ) -> Result<PublishWrite, AppError> {
        let written = sqlx::query_as::<_, PortfolioRow>(
            r#"
            INSERT INTO portfolios
                (user_id, headline, bio, social_links, skills, projects, featured_resume_id, theme,
                 slug, is_published, published_at)
            VALUES ($1, $2, $3, $4, COALESCE($5, '{}'::text[]), $6, $7, $8, $9, TRUE, now())
            ON CONFLICT (user_id) DO UPDATE SET
                headline = COALESCE($2, portfolios.headline),
                bio = COALESCE($3, portfolios.bio),
                social_links = COALESCE($4, portfolios.social_links),
                skills = COALESCE($5, portfolios.skills),
                projects = COALESCE($6, portfolios.projects),
                featured_resume_id = COALESCE($7, portfolios.featured_resume_id),
                theme = COALESCE($8, portfolios.theme),
                slug = $9,
                is_published = TRUE,
                published_at = now(),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .bind(&content.headline)
        .bind(&content.bio)
        .bind(content.social_links.clone().map(Json))
        .bind(&content.skills)
        .bind(content.projects.clone().map(Json))
        .bind(content.featured_resume)
        .bind(content.theme.clone().map(Json))
        .bind(slug)
        .fetch_one(self.pool)
        .await;

        match written {
            Ok(row) => Ok(PublishWrite::Written(row)),
            Err(e) if is_published_slug_violation(&e) => Ok(PublishWrite::SlugTaken),
            Err(e) => Err(e.into()),
        }
    }

    async fn clear_published(&self, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError> {
        Ok(sqlx::query_as::<_, PortfolioRow>(
            r#"
            UPDATE portfolios
            SET is_published = FALSE, published_at = NULL, updated_at = now()
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(owner_id)
        .fetch_optional(self.pool)
        .await?)
    }

    async fn find_published_by_slug(&self, slug: &str) -> Result<Option<PortfolioRow>, AppError> {
        Ok(
            sqlx::query_as("SELECT * FROM portfolios WHERE slug = $1 AND is_published")
                .bind(slug)
                .fetch_optional(self.pool)
                .await?,
        )
    }
}

fn is_published_slug_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => db.constraint() == Some("portfolios_published_slug"),
        _ => false,
    }
}

pub async fn find_by_owner(pool: &PgPool, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError> {
    Ok(
        sqlx::query_as::<_, PortfolioRow>("SELECT * FROM portfolios WHERE user_id = $1")
            .bind(owner_id)
            .fetch_optional(pool)
            .await?,
    )
}

async fn resume_owned_by(pool: &PgPool, owner_id: Uuid, resume_id: Uuid) -> Result<bool, AppError> {
    Ok(sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM resumes WHERE id = $1 AND user_id = $2)",
    )
    .bind(resume_id)
    .bind(owner_id)
    .fetch_one(pool)
    .await?)
}

/// Embeds the featured resume into an owner-facing response, the same
/// resolution the public lookup performs.
pub async fn with_featured_resume(
    pool: &PgPool,
    portfolio: PortfolioRow,
) -> Result<PortfolioWithResume, AppError> {
    let featured_resume = fetch_featured(pool, &portfolio).await?;
    Ok(PortfolioWithResume {
        portfolio,
        featured_resume,
    })
}

async fn fetch_featured(
    pool: &PgPool,
    portfolio: &PortfolioRow,
) -> Result<Option<ResumeRow>, AppError> {
    match portfolio.featured_resume_id {
        Some(resume_id) => Ok(sqlx::query_as("SELECT * FROM resumes WHERE id = $1")
            .bind(resume_id)
            .fetch_optional(pool)
            .await?),
        None => Ok(None),
    }
}

/// Upserts portfolio content without touching the publication state.
/// Absent fields keep their stored values.
pub async fn upsert_content(
    pool: &PgPool,
    owner_id: Uuid,
    content: &PortfolioContent,
) -> Result<PortfolioRow, AppError> {
    if let Some(resume_id) = content.featured_resume {
        if !resume_owned_by(pool, owner_id, resume_id).await? {
            return Err(AppError::Validation(
                "Featured resume does not belong to the caller".to_string(),
            ));
        }
    }

    Ok(sqlx::query_as::<_, PortfolioRow>(
        r#"
        INSERT INTO portfolios
            (user_id, headline, bio, social_links, skills, projects, featured_resume_id, theme)
        VALUES ($1, $2, $3, $4, COALESCE($5, '{}'::text[]), $6, $7, $8)
        ON CONFLICT (user_id) DO UPDATE SET
            headline = COALESCE($2, portfolios.headline),
            bio = COALESCE($3, portfolios.bio),
            social_links = COALESCE($4, portfolios.social_links),
            skills = COALESCE($5, portfolios.skills),
            projects = COALESCE($6, portfolios.projects),
            featured_resume_id = COALESCE($7, portfolios.featured_resume_id),
            theme = COALESCE($8, portfolios.theme),
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(&content.headline)
    .bind(&content.bio)
    .bind(content.social_links.clone().map(Json))
    .bind(&content.skills)
    .bind(content.projects.clone().map(Json))
    .bind(content.featured_resume)
    .bind(content.theme.clone().map(Json))
    .fetch_one(pool)
    .await?)
}

/// Unauthenticated lookup by slug, with the owner's display name and the
/// featured resume resolved.
pub async fn public_lookup(pool: &PgPool, slug: &str) -> Result<PublicPortfolio, AppError> {
    let store = PgPortfolioStore { pool };
    let portfolio = published_by_slug(&store, slug).await?;

    let owner_name: String = sqlx::query_scalar("SELECT name FROM users WHERE id = $1")
        .bind(portfolio.user_id)
        .fetch_one(pool)
        .await?;

    let featured_resume = fetch_featured(pool, &portfolio).await?;

    Ok(PublicPortfolio {
        portfolio,
        owner_name,
        featured_resume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::slug::SuffixSource;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FixedSuffix(&'static str);

    impl SuffixSource for FixedSuffix {
        fn token(&self, _len: usize) -> String {
            self.0.to_string()
        }
    }

    fn make_user(name: &str, email: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    fn make_row(owner_id: Uuid) -> PortfolioRow {
        PortfolioRow {
            id: Uuid::new_v4(),
            user_id: owner_id,
            headline: None,
            bio: None,
            social_links: None,
            skills: vec![],
            projects: None,
            featured_resume_id: None,
            theme: None,
            slug: None,
            is_published: false,
            published_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// In-memory store honoring the same contract as the Postgres
    /// implementation, including the write-time uniqueness rejection.
    /// `steal_on_write` hands the named slug to a competing published
    /// portfolio at write time, reproducing the probe/write race.
    #[derive(Default)]
    struct MemStore {
        rows: Mutex<HashMap<Uuid, PortfolioRow>>,
        steal_on_write: Mutex<Option<String>>,
    }

    impl MemStore {
        fn row(&self, owner_id: Uuid) -> Option<PortfolioRow> {
            self.rows.lock().unwrap().get(&owner_id).cloned()
        }
    }

    #[async_trait]
    impl SlugIndex for MemStore {
        async fn is_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
            Ok(self.rows.lock().unwrap().values().any(|row| {
                row.is_published && row.slug.as_deref() == Some(slug) && Some(row.id) != exclude
            }))
        }
    }

    #[async_trait]
    impl PortfolioStore for MemStore {
        async fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError> {
            Ok(self.row(owner_id))
        }

        async fn resume_owned_by(&self, _owner: Uuid, _resume: Uuid) -> Result<bool, AppError> {
            Ok(true)
        }

        async fn write_published(
            &self,
            owner_id: Uuid,
            slug: &str,
            _content: &PortfolioContent,
        ) -> Result<PublishWrite, AppError> {
            let mut rows = self.rows.lock().unwrap();

            let stolen = {
                let mut pending = self.steal_on_write.lock().unwrap();
                if pending.as_deref() == Some(slug) {
                    pending.take()
                } else {
                    None
                }
            };
            if let Some(stolen) = stolen {
                let racer = Uuid::new_v4();
                let mut row = make_row(racer);
                row.slug = Some(stolen);
                row.is_published = true;
                row.published_at = Some(Utc::now());
                rows.insert(racer, row);
                return Ok(PublishWrite::SlugTaken);
            }

            let own_id = rows.get(&owner_id).map(|r| r.id);
            let conflict = rows.values().any(|row| {
                row.is_published && row.slug.as_deref() == Some(slug) && Some(row.id) != own_id
            });
            if conflict {
                return Ok(PublishWrite::SlugTaken);
            }

            let row = rows.entry(owner_id).or_insert_with(|| make_row(owner_id));
            row.slug = Some(slug.to_string());
            row.is_published = true;
            row.published_at = Some(Utc::now());
            row.updated_at = Utc::now();
            Ok(PublishWrite::Written(row.clone()))
        }

        async fn clear_published(&self, owner_id: Uuid) -> Result<Option<PortfolioRow>, AppError> {
            let mut rows = self.rows.lock().unwrap();
            Ok(rows.get_mut(&owner_id).map(|row| {
                row.is_published = false;
                row.published_at = None;
                row.updated_at = Utc::now();
                row.clone()
            }))
        }

        async fn find_published_by_slug(&self, slug: &str) -> Result<Option<PortfolioRow>, AppError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .values()
                .find(|row| row.is_published && row.slug.as_deref() == Some(slug))
                .cloned())
        }
    }

    #[tokio::test]
    async fn first_publish_creates_record_from_name() {
        let store = MemStore::default();
        let user = make_user("Jordan Blake", "jordan@x.io");
        let suffixes = FixedSuffix("x");

        let row = publish(&store, &user, None, &PortfolioContent::default(), &suffixes)
            .await
            .unwrap();

        assert_eq!(row.slug.as_deref(), Some("jordan-blake"));
        assert!(row.is_published);
        assert!(row.published_at.is_some());
    }

    #[tokio::test]
    async fn unpublish_clears_flags_but_retains_slug() {
        let store = MemStore::default();
        let user = make_user("Jordan Blake", "jordan@x.io");
        let suffixes = FixedSuffix("x");

        publish(&store, &user, None, &PortfolioContent::default(), &suffixes)
            .await
            .unwrap();
        let row = unpublish(&store, user.id).await.unwrap();

        assert!(!row.is_published);
        assert!(row.published_at.is_none());
        assert_eq!(row.slug.as_deref(), Some("jordan-blake"));

        // republish with no explicit slug lands back on the memo
        let row = publish(&store, &user, None, &PortfolioContent::default(), &suffixes)
            .await
            .unwrap();
        assert_eq!(row.slug.as_deref(), Some("jordan-blake"));
    }

    #[tokio::test]
    async fn unpublish_without_portfolio_is_not_found() {
        let store = MemStore::default();
        let err = unpublish(&store, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn slug_memo_is_invisible_while_unpublished() {
        let store = MemStore::default();
        let user = make_user("Jordan Blake", "jordan@x.io");
        let suffixes = FixedSuffix("x");

        publish(&store, &user, None, &PortfolioContent::default(), &suffixes)
            .await
            .unwrap();
        assert!(published_by_slug(&store, "jordan-blake").await.is_ok());

        unpublish(&store, user.id).await.unwrap();

        // the row still carries the slug, but resolution must 404
        assert_eq!(
            store.row(user.id).unwrap().slug.as_deref(),
            Some("jordan-blake")
        );
        let err = published_by_slug(&store, "jordan-blake").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn publish_retries_next_suffix_when_write_loses_race() {
        let store = MemStore::default();
        let user = make_user("Jordan Blake", "jordan@x.io");
        let suffixes = FixedSuffix("x");

        // a concurrent publish grabs "jordan-blake" between our probe
        // and our write
        *store.steal_on_write.lock().unwrap() = Some("jordan-blake".to_string());

        let row = publish(&store, &user, None, &PortfolioContent::default(), &suffixes)
            .await
            .unwrap();

        assert_eq!(row.slug.as_deref(), Some("jordan-blake-1"));
        // the racer kept the base slug
        let racer = published_by_slug(&store, "jordan-blake").await.unwrap();
        assert_ne!(racer.user_id, user.id);
    }

    #[tokio::test]
    async fn republish_with_current_slug_keeps_it() {
        let store = MemStore::default();
        let user = make_user("Jordan Blake", "jordan@x.io");
        let suffixes = FixedSuffix("x");

        publish(&store, &user, None, &PortfolioContent::default(), &suffixes)
            .await
            .unwrap();
        let row = publish(
            &store,
            &user,
            Some("jordan-blake"),
            &PortfolioContent::default(),
            &suffixes,
        )
        .await
        .unwrap();

        assert_eq!(row.slug.as_deref(), Some("jordan-blake"));
    }
}
