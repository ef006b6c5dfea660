//! Tool descriptor cache
//!
//! Descriptors returned by `tools/list` are kept by name so `call_tool` can
//! find a tool's declared output schema without another round trip. The cache
//! is advisory: a missing entry never blocks a call, and entries are only
//! replaced by a newer listing or dropped by [`ToolDescriptorCache::invalidate`].
//!
//! Every invalidation starts a new generation. A listing records the
//! generation it started in and its pages are only accepted while that
//! generation is current, so a listing that straddles a `list_changed`
//! notification can neither resurrect stale entries nor mark the cache
//! complete.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::{debug, trace};

use syncmcp_protocol::Tool;

#[derive(Debug, Default)]
struct CacheInner {
    tools: HashMap<String, Tool>,
    populated: bool,
    generation: u64,
}

/// Thread-safe cache of tool descriptors keyed by tool name
#[derive(Debug, Default)]
pub(crate) struct ToolDescriptorCache {
    inner: RwLock<CacheInner>,
}

impl ToolDescriptorCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current generation; pass it back to [`merge`](Self::merge) and
    /// [`mark_populated`](Self::mark_populated)
    pub(crate) fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Insert descriptors listed in `generation`, replacing any with the same
    /// name. Returns `false`, leaving the cache untouched, if the cache was
    /// invalidated since.
    pub(crate) fn merge(&self, generation: u64, tools: &[Tool]) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            debug!(
                listed_in = generation,
                current = inner.generation,
                "Discarding tool descriptors from a superseded listing"
            );
            return false;
        }
        for tool in tools {
            trace!(tool = %tool.name, has_output_schema = tool.declares_output_schema(), "Caching tool descriptor");
            inner.tools.insert(tool.name.clone(), tool.clone());
        }
        true
    }

    /// Record that a complete listing started in `generation` has been
    /// merged. Returns `false` if the cache was invalidated since.
    pub(crate) fn mark_populated(&self, generation: u64) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            return false;
        }
        inner.populated = true;
        debug!(tools = inner.tools.len(), generation, "Tool descriptor cache populated");
        true
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Tool> {
        self.inner.read().tools.get(name).cloned()
    }

    /// Whether a complete listing has been merged since creation or the last
    /// invalidation
    pub(crate) fn is_populated(&self) -> bool {
        self.inner.read().populated
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().tools.len()
    }

    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every entry; the next call that needs a schema lists tools again
    pub(crate) fn invalidate(&self) {
        let mut inner = self.inner.write();
        inner.tools.clear();
        inner.populated = false;
        inner.generation = inner.generation.wrapping_add(1);
        debug!(generation = inner.generation, "Tool descriptor cache invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use syncmcp_protocol::types::ToolOutputSchema;

    #[test]
    fn test_merge_replaces_by_name() {
        let cache = ToolDescriptorCache::new();
        let generation = cache.generation();
        assert!(cache.merge(generation, &[Tool::new("calculator"), Tool::new("echo")]));
        assert_eq!(cache.len(), 2);
        assert!(!cache.lookup("calculator").unwrap().declares_output_schema());

        let schema = ToolOutputSchema::default()
            .add_property("result", json!({"type": "number"}))
            .require_property("result");
        cache.merge(generation, &[Tool::new("calculator").with_output_schema(schema)]);

        assert_eq!(cache.len(), 2);
        assert!(cache.lookup("calculator").unwrap().declares_output_schema());
        assert_eq!(cache.names(), vec!["calculator".to_string(), "echo".to_string()]);
    }

    #[test]
    fn test_populated_flag() {
        let cache = ToolDescriptorCache::new();
        assert!(!cache.is_populated());

        // A page alone does not count as a complete listing
        let generation = cache.generation();
        cache.merge(generation, &[Tool::new("a")]);
        assert!(!cache.is_populated());

        assert!(cache.mark_populated(generation));
        assert!(cache.is_populated());

        cache.invalidate();
        assert!(!cache.is_populated());
        assert_eq!(cache.len(), 0);
        assert!(cache.lookup("a").is_none());
    }

    #[test]
    fn test_listing_superseded_by_invalidation_is_discarded() {
        let cache = ToolDescriptorCache::new();
        let stale = cache.generation();
        cache.merge(stale, &[Tool::new("calculator")]);

        cache.invalidate();
        let current = cache.generation();
        assert_ne!(stale, current);

        // The rest of the old listing must not land in the new generation
        assert!(!cache.merge(stale, &[Tool::new("other")]));
        assert!(!cache.mark_populated(stale));
        assert!(!cache.is_populated());
        assert_eq!(cache.len(), 0);

        assert!(cache.merge(current, &[Tool::new("calculator")]));
        assert!(cache.mark_populated(current));
        assert_eq!(cache.names(), vec!["calculator".to_string()]);
    }
}
