//! Taxonomy term resolution.
//!
//! A cell mapped to a taxonomy holds comma-separated term names. Each name
//! is resolved through an ordered chain of lookup strategies; the first hit
//! wins. Only when every strategy misses, and the taxonomy allows it, is a
//! new term created.

use crate::error::{PorygonError, Result};
use crate::store::{ContentStore, TermId, TermQuery};
use std::collections::HashMap;

/// One step of the lookup chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Existing term whose name or slug equals the candidate.
    NameOrSlug,
    /// Term whose display name equals the candidate.
    Name,
    /// Term whose slug equals the slugified candidate.
    ///
    /// Catches names such as `15` or `C++` whose stored slug differs from
    /// both the raw candidate and its display name.
    Slug,
}

/// Lookup strategies in evaluation order.
pub const LOOKUP_CHAIN: [LookupStrategy; 3] = [
    LookupStrategy::NameOrSlug,
    LookupStrategy::Name,
    LookupStrategy::Slug,
];

impl LookupStrategy {
    /// Run this strategy against the store.
    pub fn lookup<S: ContentStore + ?Sized>(
        self,
        store: &S,
        taxonomy: &str,
        name: &str,
    ) -> Result<TermLookup> {
        let found = match self {
            LookupStrategy::NameOrSlug => store.find_term(taxonomy, TermQuery::NameOrSlug(name))?,
            LookupStrategy::Name => store.find_term(taxonomy, TermQuery::Name(name))?,
            LookupStrategy::Slug => {
                let slug = slugify(name);
                if slug.is_empty() {
                    None
                } else {
                    store.find_term(taxonomy, TermQuery::Slug(&slug))?
                }
            }
        };
        Ok(found.map_or(TermLookup::NotFound, TermLookup::Found))
    }
}

/// Outcome of a term lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermLookup {
    /// The term exists.
    Found(TermId),
    /// No strategy matched.
    NotFound,
}

/// Run the full lookup chain, short-circuiting on the first hit.
pub fn lookup_term<S: ContentStore + ?Sized>(
    store: &S,
    taxonomy: &str,
    name: &str,
) -> Result<TermLookup> {
    for strategy in LOOKUP_CHAIN {
        if let TermLookup::Found(id) = strategy.lookup(store, taxonomy, name)? {
            log::debug!("term '{}' in '{}' found via {:?}: {}", name, taxonomy, strategy, id);
            return Ok(TermLookup::Found(id));
        }
    }
    Ok(TermLookup::NotFound)
}

/// Split a cell into term names: comma separated, trimmed, empties dropped.
pub fn split_term_names(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert a display name to a URL-safe slug.
///
/// Lowercases, keeps alphanumerics, and collapses every run of other
/// characters into a single `-`. Leading and trailing dashes are removed.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slug stored for a newly created term.
///
/// Falls back to the lowercased name when it has no alphanumerics at all.
pub fn term_slug(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        name.trim().to_lowercase()
    } else {
        slug
    }
}

/// Resolves term names to identifiers for one import call.
///
/// The cache is keyed by (taxonomy, name) and lives as long as the
/// resolver, so a term created for an earlier row is reused by later rows
/// rather than created again.
#[derive(Debug, Default)]
pub struct TermResolver {
    cache: HashMap<(String, String), TermId>,
    created: Vec<(String, String)>,
}

impl TermResolver {
    /// Create a resolver with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup-only resolution. Never mutates the store.
    pub fn lookup<S: ContentStore + ?Sized>(
        &mut self,
        store: &S,
        taxonomy: &str,
        name: &str,
    ) -> Result<TermLookup> {
        let key = (taxonomy.to_string(), name.to_string());
        if let Some(&id) = self.cache.get(&key) {
            return Ok(TermLookup::Found(id));
        }
        let lookup = lookup_term(store, taxonomy, name)?;
        if let TermLookup::Found(id) = lookup {
            self.cache.insert(key, id);
        }
        Ok(lookup)
    }

    /// Resolve one name, creating the term when allowed.
    pub fn resolve<S: ContentStore + ?Sized>(
        &mut self,
        store: &mut S,
        taxonomy: &str,
        name: &str,
        create_missing: bool,
    ) -> Result<TermId> {
        if let TermLookup::Found(id) = self.lookup(&*store, taxonomy, name)? {
            return Ok(id);
        }

        if !create_missing {
            return Err(PorygonError::TermNotFound {
                taxonomy: taxonomy.to_string(),
                term: name.to_string(),
            });
        }

        let id = store.create_term(taxonomy, name)?;
        log::debug!("created term '{}' in '{}': {}", name, taxonomy, id);
        self.cache
            .insert((taxonomy.to_string(), name.to_string()), id);
        self.created.push((taxonomy.to_string(), name.to_string()));
        Ok(id)
    }

    /// Resolve every name of a cell, de-duplicated by identifier.
    ///
    /// Order follows the first occurrence of each identifier.
    pub fn resolve_all<S: ContentStore + ?Sized>(
        &mut self,
        store: &mut S,
        taxonomy: &str,
        names: &[String],
        create_missing: bool,
    ) -> Result<Vec<TermId>> {
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let id = self.resolve(store, taxonomy, name, create_missing)?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Terms created through this resolver, as (taxonomy, name) pairs.
    pub fn created(&self) -> &[(String, String)] {
        &self.created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn test_split_term_names() {
        assert_eq!(
            split_term_names(" Math, Science ,,  "),
            vec!["Math".to_string(), "Science".to_string()]
        );
        assert!(split_term_names("").is_empty());
        assert!(split_term_names(" , ").is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Science Fiction"), "science-fiction");
        assert_eq!(slugify("  C++ & Rust!  "), "c-rust");
        assert_eq!(slugify("15"), "15");
        assert_eq!(slugify("Café Noir"), "café-noir");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_term_slug_falls_back_to_name() {
        assert_eq!(term_slug("!!!"), "!!!");
        assert_eq!(term_slug("Hard SF"), "hard-sf");
    }

    #[test]
    fn test_chain_falls_through_to_slug() {
        let mut store = MemoryStore::new();
        let id = store.with_term_slug("year", "Year Fifteen", "15");

        assert_eq!(
            LookupStrategy::Name.lookup(&store, "year", "15 ").unwrap(),
            TermLookup::NotFound
        );
        assert_eq!(lookup_term(&store, "year", "15 ").unwrap(), TermLookup::Found(id));
    }

    #[test]
    fn test_resolve_creates_once_and_caches() {
        let mut store = MemoryStore::new();
        let mut resolver = TermResolver::new();

        let first = resolver.resolve(&mut store, "genre", "Science", true).unwrap();
        let second = resolver.resolve(&mut store, "genre", "Science", true).unwrap();

        assert_eq!(first, second);
        assert_eq!(store.terms().len(), 1);
        assert_eq!(resolver.created().len(), 1);
    }

    #[test]
    fn test_resolve_without_create_fails() {
        let mut store = MemoryStore::new();
        let mut resolver = TermResolver::new();
        let err = resolver
            .resolve(&mut store, "genre", "Science", false)
            .unwrap_err();
        assert!(matches!(err, PorygonError::TermNotFound { .. }));
        assert!(store.terms().is_empty());
    }

    #[test]
    fn test_resolve_all_dedups_by_id() {
        let mut store = MemoryStore::new();
        let id = store.with_term("genre", "Math");
        let mut resolver = TermResolver::new();
        let names = vec!["Math".to_string(), "math".to_string(), "MATH".to_string()];

        let ids = resolver
            .resolve_all(&mut store, "genre", &names, false)
            .unwrap();
        assert_eq!(ids, vec![id]);
    }
}
