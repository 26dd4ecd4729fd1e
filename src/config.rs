//! Process configuration.
//!
//! One required variable — `DATABASE_URL` — and a `Default`-struct baseline
//! overlaid by optional env vars.

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string. Required; the process refuses to start
    /// without it.
    pub database_url: String,
    /// `host:port` the HTTP listener binds. Defaults to `0.0.0.0:3000`.
    pub listen_addr: String,
    /// Upper bound on concurrent Postgres connections checked out by the
    /// store's pool.
    pub pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            listen_addr: "0.0.0.0:3000".to_string(),
            pool_size: 8,
        }
    }
}

impl Config {
    /// Loads configuration from the environment. Panics if `DATABASE_URL`
    /// is unset — there is no sensible default for a connection string, and
    /// the source has nothing useful to do without a store.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        cfg.database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to the Postgres connection string");

        if let Ok(l) = std::env::var("LISTEN_ADDR") {
            cfg.listen_addr = l;
        }
        if let Ok(p) = std::env::var("DB_POOL_SIZE") {
            cfg.pool_size = p.parse().unwrap_or(8);
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_listen_addr_is_all_interfaces_port_3000() {
        assert_eq!(Config::default().listen_addr, "0.0.0.0:3000");
    }
}
