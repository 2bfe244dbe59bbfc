//! Alias lookup seam.
//!
//! Alias resolution lives in the host (doskey); the tokenizer only
//! needs "does this first token name an alias". Lookups are cached per
//! line because the tokenizer re-walks regions while the user types.

use std::collections::HashMap;

/// The alias collaborator. `lookup` returns the expansion text for a
/// name, or None when no alias exists.
pub trait AliasResolver {
    fn lookup(&self, name: &str) -> Option<String>;
}

/// Resolver with no aliases defined.
pub struct NoAliases;

impl AliasResolver for NoAliases {
    fn lookup(&self, _name: &str) -> Option<String> {
        None
    }
}

impl<F> AliasResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn lookup(&self, name: &str) -> Option<String> {
        self(name)
    }
}

/// Per-line memo over an [`AliasResolver`]. Cleared by
/// [`AliasCache::begin_line`] at the start of each edit pass.
pub struct AliasCache<'a> {
    resolver: &'a dyn AliasResolver,
    cache: HashMap<String, Option<String>>,
}

impl<'a> AliasCache<'a> {
    pub fn new(resolver: &'a dyn AliasResolver) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    pub fn begin_line(&mut self) {
        self.cache.clear();
    }

    pub fn is_alias(&mut self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&mut self, name: &str) -> Option<String> {
        if let Some(hit) = self.cache.get(name) {
            return hit.clone();
        }
        let value = self.resolver.lookup(name);
        self.cache.insert(name.to_string(), value.clone());
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn caches_lookups_per_line() {
        let calls = Cell::new(0u32);
        let resolver = |name: &str| {
            calls.set(calls.get() + 1);
            (name == "gl").then(|| "git log $*".to_string())
        };
        let mut cache = AliasCache::new(&resolver);
        assert!(cache.is_alias("gl"));
        assert!(cache.is_alias("gl"));
        assert_eq!(calls.get(), 1);
        assert!(!cache.is_alias("dir"));
        cache.begin_line();
        assert!(cache.is_alias("gl"));
        assert_eq!(calls.get(), 3);
    }
}
