//! Slug allocation for public portfolio URLs.
//!
//! `slugify` and the base-selection helpers are pure; uniqueness is
//! resolved against a `SlugIndex`, which in production is backed by the
//! partial unique index on `portfolios(slug) WHERE is_published`. The
//! probe loop here is a fast path only — the database index is the
//! actual guarantee, and the publish path retries on a write-time
//! unique violation.

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::errors::AppError;

/// Normalized bases shorter than this are rejected: 1–2 character slugs
/// make poor public identifiers and collide constantly.
pub const MIN_BASE_LEN: usize = 3;

const SYNTHETIC_SUFFIX_LEN: usize = 6;

/// Source of random tokens for the synthetic `portfolio-<token>` base.
/// Injected through `AppState` so tests can pin the output.
pub trait SuffixSource: Send + Sync {
    fn token(&self, len: usize) -> String;
}

/// Default production source: lowercase alphanumeric from `thread_rng`.
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn token(&self, len: usize) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(len)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect()
    }
}

/// Normalizes an arbitrary string into a URL-safe slug: lowercase, every
/// maximal run of characters outside `[a-z0-9]` collapsed to a single
/// hyphen, leading/trailing hyphens stripped. Returns `None` when nothing
/// usable remains.
pub fn slugify(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars().flat_map(|c| c.to_lowercase()) {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

/// Picks a base slug from a primary and a fallback candidate.
///
/// The primary wins only if it normalizes to at least `MIN_BASE_LEN`
/// characters. The fallback just has to normalize to something non-empty.
/// With no signal at all, synthesizes `portfolio-<token>`; collisions on
/// the synthetic token are irrelevant because uniqueness is enforced
/// downstream regardless of where the base came from.
pub fn build_slug_base(
    primary: Option<&str>,
    fallback: Option<&str>,
    suffixes: &dyn SuffixSource,
) -> String {
    if let Some(base) = primary.and_then(slugify) {
        if base.len() >= MIN_BASE_LEN {
            return base;
        }
    }
    if let Some(base) = fallback.and_then(slugify) {
        return base;
    }
    format!("portfolio-{}", suffixes.token(SYNTHETIC_SUFFIX_LEN))
}

/// Publish-time base selection. Precedence: explicit request > stored
/// slug > owner's display name, each subject to the minimum-length rule;
/// then the email local-part and the literal "portfolio" through
/// `build_slug_base`.
pub fn choose_slug_base(
    explicit: Option<&str>,
    stored: Option<&str>,
    name: Option<&str>,
    email: &str,
    suffixes: &dyn SuffixSource,
) -> String {
    for candidate in [explicit, stored, name].into_iter().flatten() {
        if let Some(base) = slugify(candidate) {
            if base.len() >= MIN_BASE_LEN {
                return base;
            }
        }
    }
    build_slug_base(email.split('@').next(), Some("portfolio"), suffixes)
}

/// Collision oracle for slug candidates. `exclude` is the id of the
/// portfolio being republished, so a record never collides with itself.
#[async_trait]
pub trait SlugIndex: Send + Sync {
    async fn is_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError>;
}

/// Linear-probes `base`, `base-1`, `base-2`, ... until a free candidate
/// turns up. The suffix space is unbounded and every candidate is
/// distinct, so this terminates; in practice collisions are rare and it
/// returns within a probe or two.
pub async fn ensure_unique_slug(
    index: &dyn SlugIndex,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String, AppError> {
    if !index.is_taken(base, exclude).await? {
        return Ok(base.to_owned());
    }
    for n in 1u64.. {
        let candidate = format!("{base}-{n}");
        if !index.is_taken(&candidate, exclude).await? {
            return Ok(candidate);
        }
    }
    unreachable!("suffix space is unbounded")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedSuffix(&'static str);

    impl SuffixSource for FixedSuffix {
        fn token(&self, _len: usize) -> String {
            self.0.to_string()
        }
    }

    /// In-memory stand-in for the published-slug index: slug -> owning
    /// portfolio id.
    struct MemIndex {
        taken: HashMap<String, Uuid>,
    }

    impl MemIndex {
        fn new(entries: &[(&str, Uuid)]) -> Self {
            MemIndex {
                taken: entries
                    .iter()
                    .map(|(s, id)| (s.to_string(), *id))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl SlugIndex for MemIndex {
        async fn is_taken(&self, slug: &str, exclude: Option<Uuid>) -> Result<bool, AppError> {
            Ok(self
                .taken
                .get(slug)
                .is_some_and(|owner| Some(*owner) != exclude))
        }
    }

    #[test]
    fn slugify_collapses_runs_and_trims() {
        assert_eq!(slugify("Jordan Blake"), Some("jordan-blake".to_string()));
        assert_eq!(slugify("  --Hello,   World!--  "), Some("hello-world".to_string()));
        assert_eq!(slugify("rust_dev@2024"), Some("rust-dev-2024".to_string()));
    }

    #[test]
    fn slugify_empty_and_symbol_only_yield_none() {
        assert_eq!(slugify(""), None);
        assert_eq!(slugify("!!! ~~~"), None);
    }

    #[test]
    fn slugify_is_idempotent() {
        for input in ["Jordan Blake", "a--b", "Hé llo", "x1-y2-z3", "---a---"] {
            let once = slugify(input).unwrap();
            assert_eq!(slugify(&once), Some(once.clone()), "input {input:?}");
        }
    }

    #[test]
    fn base_rejects_short_primary() {
        let s = FixedSuffix("abc123");
        assert_eq!(build_slug_base(Some("jb"), Some("Jordan Blake"), &s), "jordan-blake");
        // fallback is exempt from the length rule, it only has to be non-empty
        assert_eq!(build_slug_base(Some("!"), Some("ab"), &s), "ab");
    }

    #[test]
    fn base_synthesizes_when_no_signal() {
        let s = FixedSuffix("q9x4m2");
        assert_eq!(build_slug_base(None, None, &s), "portfolio-q9x4m2");
        assert_eq!(build_slug_base(Some("  "), Some("---"), &s), "portfolio-q9x4m2");
    }

    #[test]
    fn choose_base_walks_precedence_chain() {
        let s = FixedSuffix("t0k3n0");
        assert_eq!(
            choose_slug_base(Some("My Slug"), Some("old-slug"), Some("Jordan"), "j@x.io", &s),
            "my-slug"
        );
        // explicit too short -> stored slug wins
        assert_eq!(
            choose_slug_base(Some("jb"), Some("old-slug"), Some("Jordan"), "j@x.io", &s),
            "old-slug"
        );
        assert_eq!(
            choose_slug_base(None, None, Some("Jordan Blake"), "j@x.io", &s),
            "jordan-blake"
        );
        // nothing usable above the email: local-part goes through the
        // minimum-length rule, then the literal fallback
        assert_eq!(
            choose_slug_base(None, None, Some("??"), "jordan@x.io", &s),
            "jordan"
        );
        assert_eq!(choose_slug_base(None, None, None, "jb@x.io", &s), "portfolio");
    }

    #[tokio::test]
    async fn unique_slug_probes_numeric_suffixes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let index = MemIndex::new(&[("jordan-blake", a), ("jordan-blake-1", b)]);
        let slug = ensure_unique_slug(&index, "jordan-blake", None).await.unwrap();
        assert_eq!(slug, "jordan-blake-2");
    }

    #[tokio::test]
    async fn unique_slug_returns_base_when_free() {
        let index = MemIndex::new(&[]);
        let slug = ensure_unique_slug(&index, "jordan-blake", None).await.unwrap();
        assert_eq!(slug, "jordan-blake");
    }

    #[tokio::test]
    async fn republish_excludes_own_record() {
        let own = Uuid::new_v4();
        let index = MemIndex::new(&[("jordan-blake", own)]);
        // same record re-publishing with its current slug: no spurious -1
        let slug = ensure_unique_slug(&index, "jordan-blake", Some(own)).await.unwrap();
        assert_eq!(slug, "jordan-blake");
    }

    #[tokio::test]
    async fn two_owners_same_name_get_distinct_slugs() {
        let s = FixedSuffix("x");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut taken: HashMap<String, Uuid> = HashMap::new();

        // User A publishes with no explicit slug
        let base_a = choose_slug_base(None, None, Some("Jordan Blake"), "a@x.io", &s);
        let index = MemIndex { taken: taken.clone() };
        let slug_a = ensure_unique_slug(&index, &base_a, None).await.unwrap();
        assert_eq!(slug_a, "jordan-blake");
        taken.insert(slug_a.clone(), a);

        // User B, same display name
        let base_b = choose_slug_base(None, None, Some("Jordan Blake"), "b@x.io", &s);
        let index = MemIndex { taken: taken.clone() };
        let slug_b = ensure_unique_slug(&index, &base_b, None).await.unwrap();
        assert_eq!(slug_b, "jordan-blake-1");
        taken.insert(slug_b, b);

        // A unpublishes (slug leaves the published index) and republishes
        // under an explicit three-character slug
        taken.remove(&slug_a);
        let base_a2 = choose_slug_base(Some("jay"), Some("jordan-blake"), Some("Jordan Blake"), "a@x.io", &s);
        let index = MemIndex { taken: taken.clone() };
        let slug_a2 = ensure_unique_slug(&index, &base_a2, Some(a)).await.unwrap();
        assert_eq!(slug_a2, "jay");

        // B's slug is untouched; A's old slug is simply free again
        assert_eq!(taken.get("jordan-blake-1"), Some(&b));
        assert!(!taken.contains_key("jordan-blake"));
    }

    #[tokio::test]
    async fn unpublished_slug_memo_is_reused_on_republish() {
        let s = FixedSuffix("x");
        let own = Uuid::new_v4();
        // slug retained on the row but absent from the published index
        let index = MemIndex::new(&[]);
        let base = choose_slug_base(None, Some("jordan-blake"), Some("Someone Else"), "e@x.io", &s);
        assert_eq!(base, "jordan-blake");
        let slug = ensure_unique_slug(&index, &base, Some(own)).await.unwrap();
        assert_eq!(slug, "jordan-blake");
    }
}
