use roster_engine::EngineConfig;

/// Where and how to open the SQLite store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite://roster.db` or `sqlite::memory:`
    pub url: String,
    pub max_connections: u32,
    /// Create the database file on first connect.
    pub create_if_missing: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://roster.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub database: DatabaseConfig,
    /// Trailing window, in days, for the recent-assignment count.
    pub history_window_days: u32,
    pub engine: EngineConfig,
    /// Buffered events per change listener before it starts lagging.
    pub notify_capacity: usize,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            history_window_days: 90,
            engine: EngineConfig::default(),
            notify_capacity: 64,
        }
    }
}

impl RosterConfig {
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database.url = url.into();
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.database.max_connections = max_connections;
        self
    }

    pub fn with_history_window_days(mut self, days: u32) -> Self {
        self.history_window_days = days;
        self
    }

    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_notify_capacity(mut self, capacity: usize) -> Self {
        self.notify_capacity = capacity;
        self
    }

    /// Single-connection in-memory store, for tests and dry runs.
    pub fn in_memory() -> Self {
        Self::default()
            .with_database_url("sqlite::memory:")
            .with_max_connections(1)
    }
}
