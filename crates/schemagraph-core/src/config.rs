//! Graph configuration.

/// Whether derived collections are cached between reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Derived values are cached and refreshed only when a source collection changes.
    #[default]
    Enabled,
    /// Every read recomputes. For callers that mutate a graph outside the ingest path.
    Disabled,
}

/// Relation naming strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStrategy {
    /// Names derived from table and column names only; collisions are left in place.
    Simple,
    /// Like `Simple`, but colliding names get a discriminator appended.
    #[default]
    Complex,
}

impl std::str::FromStr for NamingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "simple" => Ok(NamingStrategy::Simple),
            "complex" => Ok(NamingStrategy::Complex),
            other => Err(format!("unknown naming strategy `{other}`")),
        }
    }
}

/// Whether a join table may connect a table to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelfJoinPolicy {
    /// Pairs whose two legs reference the same table are skipped.
    #[default]
    Exclude,
    /// Pairs whose two legs reference the same table produce many-to-many relations.
    Permit,
}

/// Configuration for a [`Database`](crate::Database) graph.
#[derive(Debug, Clone)]
pub struct GraphConfig {
    /// Derived value caching.
    pub cache: CacheMode,

    /// Default strategy for [`Database::named_relations`](crate::Database::named_relations).
    pub naming: NamingStrategy,

    /// Word prefixed onto the target table name when a many-to-one foreign key
    /// column carries no id suffix.
    pub relation_prefix: String,

    /// Self-referencing many-to-many policy.
    pub self_join: SelfJoinPolicy,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            cache: CacheMode::Enabled,
            naming: NamingStrategy::Complex,
            relation_prefix: "related".to_string(),
            self_join: SelfJoinPolicy::Exclude,
        }
    }
}

impl GraphConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable derived value caching.
    pub fn without_cache(mut self) -> Self {
        self.cache = CacheMode::Disabled;
        self
    }

    /// Set the cache mode.
    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    /// Set the default naming strategy.
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Set the many-to-one fallback prefix.
    pub fn with_relation_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.relation_prefix = prefix.into();
        self
    }

    /// Set the self-referencing many-to-many policy.
    pub fn with_self_join(mut self, policy: SelfJoinPolicy) -> Self {
        self.self_join = policy;
        self
    }
}
