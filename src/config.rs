//! Settings loaded from environment variables.
//!
//! | Variable             | Default                     | Description                          |
//! |----------------------|-----------------------------|--------------------------------------|
//! | `KMC_UPLOAD_DIR`     | `./static/uploaded_images`  | Where uploads and outputs are written |
//! | `KMC_DB_PATH`        | `./kmeans_compress.sqlite`  | SQLite file holding run metadata     |
//! | `KMC_LOG_LEVEL`      | `info`                      | tracing filter string                |
//! | `KMC_MAX_ITERATIONS` | `300`                       | Lloyd iteration bound                |
//! | `KMC_TOLERANCE`      | `0.0001`                    | Convergence threshold (0-255 space)  |
//! | `KMC_SEED`           | unset                       | Fixed initialisation seed            |

use std::path::PathBuf;

use crate::quantizer::{FitOptions, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub db_path: String,
    /// Tracing filter string, e.g. `"kmeans_compress=debug,info"`
    pub log_level: String,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from the process environment, applying defaults
    /// where a variable is absent or unparseable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] over an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            upload_dir: PathBuf::from(lookup_str(&lookup, "KMC_UPLOAD_DIR", "./static/uploaded_images")),
            db_path: lookup_str(&lookup, "KMC_DB_PATH", "./kmeans_compress.sqlite"),
            log_level: lookup_str(&lookup, "KMC_LOG_LEVEL", "info"),
            max_iterations: lookup_parse(&lookup, "KMC_MAX_ITERATIONS", DEFAULT_MAX_ITERATIONS),
            tolerance: lookup_parse(&lookup, "KMC_TOLERANCE", DEFAULT_TOLERANCE),
            seed: lookup("KMC_SEED").and_then(|v| v.trim().parse().ok()),
        }
    }

    pub fn fit_options(&self) -> FitOptions {
        let options = FitOptions::new()
            .max_iterations(self.max_iterations)
            .tolerance(self.tolerance);

        match self.seed {
            Some(seed) => options.seed(seed),
            None => options,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn lookup_str<F: Fn(&str) -> Option<String>>(lookup: &F, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn lookup_parse<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_are_sane() {
        let cfg = Config::default();
        assert_eq!(cfg.upload_dir, PathBuf::from("./static/uploaded_images"));
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.max_iterations, 300);
        assert_eq!(cfg.tolerance, 1e-4);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn overrides_applied() {
        let cfg = config_with(&[
            ("KMC_UPLOAD_DIR", "/tmp/uploads"),
            ("KMC_MAX_ITERATIONS", "50"),
            ("KMC_TOLERANCE", "0.5"),
            ("KMC_SEED", "42"),
        ]);
        assert_eq!(cfg.upload_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(cfg.max_iterations, 50);
        assert_eq!(cfg.tolerance, 0.5);
        assert_eq!(cfg.seed, Some(42));

        let options = cfg.fit_options();
        assert_eq!(options.max_iterations, 50);
        assert_eq!(options.seed, Some(42));
    }

    #[test]
    fn unparseable_values_fall_back() {
        let cfg = config_with(&[("KMC_MAX_ITERATIONS", "lots"), ("KMC_SEED", "")]);
        assert_eq!(cfg.max_iterations, 300);
        assert_eq!(cfg.seed, None);
    }
}
