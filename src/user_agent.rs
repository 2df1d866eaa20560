//! Browser User-Agent pool used for page and asset requests.
//!
//! The image host blocks obvious bot traffic, so every request picks a
//! browser identity at random from this pool.

use rand::seq::SliceRandom;

/// Browser User-Agent strings rotated across requests.
pub(crate) const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.1 (KHTML, like Gecko) Chrome/22.0.1207.1 Safari/537.1",
    "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/536.6 (KHTML, like Gecko) Chrome/20.0.1092.0 Safari/536.6",
    "Mozilla/5.0 (Windows NT 6.2) AppleWebKit/536.6 (KHTML, like Gecko) Chrome/20.0.1090.0 Safari/536.6",
    "Mozilla/5.0 (Windows NT 6.2; WOW64) AppleWebKit/537.1 (KHTML, like Gecko) Chrome/19.77.34.5 Safari/537.1",
    "Mozilla/5.0 (Windows NT 6.0) AppleWebKit/536.5 (KHTML, like Gecko) Chrome/19.0.1084.36 Safari/536.5",
    "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/536.3 (KHTML, like Gecko) Chrome/19.0.1063.0 Safari/536.3",
];

/// Default pool as owned strings, for [`ClientConfig`](crate::download::ClientConfig).
#[must_use]
pub(crate) fn default_pool() -> Vec<String> {
    BROWSER_USER_AGENTS.iter().map(|ua| (*ua).to_string()).collect()
}

/// Picks one identity from `pool`, or the first built-in agent when empty.
#[must_use]
pub(crate) fn choose(pool: &[String]) -> &str {
    pool.choose(&mut rand::thread_rng())
        .map_or(BROWSER_USER_AGENTS[0], String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choose_returns_pool_member() {
        let pool = default_pool();
        for _ in 0..50 {
            let ua = choose(&pool);
            assert!(pool.iter().any(|p| p == ua), "unexpected UA: {ua}");
        }
    }

    #[test]
    fn test_choose_empty_pool_falls_back_to_builtin() {
        assert_eq!(choose(&[]), BROWSER_USER_AGENTS[0]);
    }

    #[test]
    fn test_single_entry_pool_is_deterministic() {
        let pool = vec!["custom-agent/1.0".to_string()];
        assert_eq!(choose(&pool), "custom-agent/1.0");
    }
}
