use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use tracing::debug;

use crate::error::{Error, Result};

/// Identity of one worker process within a shared launch manifest.
/// Computed once at start, before any later stage runs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WorkerIdentity {
    /// The 1-based ordinal selecting this worker's configuration shard,
    /// when several workers share one manifest.
    pub ordinal: Option<NonZeroUsize>,
}

/// Raw per-process inputs, as handed over by the CLI surface.
#[derive(Clone, Debug)]
pub struct ConfigResolver {
    /// Service locator; `"."` resolves the registry's default entry.
    pub service_locator: String,

    /// Serve this dependency of the located service instead of the root.
    pub service_name: Option<String>,

    /// JSON object mapping runner names to addresses.
    pub runner_map_json: Option<String>,

    /// JSON list of per-worker configuration shards.
    pub worker_env_json: Option<String>,

    /// 1-based worker ordinal.
    pub worker_ordinal: Option<usize>,
}

/// The configuration value threaded from the resolver into every later
/// stage. Nothing is written to or read back from ambient process state.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    /// Service locator to load the graph from.
    pub service_locator: String,

    /// Optional entry-point name override.
    pub service_name: Option<String>,

    /// This process's identity.
    pub identity: WorkerIdentity,

    /// Runner name to address mapping.
    pub runner_map: BTreeMap<String, String>,

    /// Key/value pairs of the selected configuration shard.
    pub env: BTreeMap<String, String>,
}

impl ConfigResolver {
    /// Resolves the process configuration. Runs exactly once, before any
    /// later stage.
    ///
    /// When both a shard list and an ordinal are given, exactly the shard
    /// at `ordinal - 1` is applied and nothing else.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfRange`] when the ordinal exceeds the shard
    /// list length, and [`Error::Configuration`] for a zero ordinal or
    /// malformed JSON in either option.
    pub fn resolve(self) -> Result<ResolvedConfig> {
        let ordinal = match self.worker_ordinal {
            Some(0) => {
                return Err(Error::Configuration(
                    "worker ordinal must be at least 1".to_string(),
                ));
            }
            Some(n) => NonZeroUsize::new(n),
            None => None,
        };

        let runner_map: BTreeMap<String, String> = match self.runner_map_json.as_deref() {
            Some(json) => serde_json::from_str(json)
                .map_err(|e| Error::Configuration(format!("malformed runner map: {e}")))?,
            None => BTreeMap::new(),
        };

        let env = match (self.worker_env_json.as_deref(), ordinal) {
            (Some(json), ordinal) => {
                let shards: Vec<BTreeMap<String, String>> = serde_json::from_str(json)
                    .map_err(|e| Error::Configuration(format!("malformed worker env list: {e}")))?;

                if let Some(ordinal) = ordinal {
                    let index = ordinal.get() - 1;
                    if index >= shards.len() {
                        return Err(Error::OutOfRange {
                            ordinal: ordinal.get(),
                            shards: shards.len(),
                        });
                    }
                    let shard = shards[index].clone();
                    debug!(
                        ordinal = ordinal.get(),
                        keys = shard.len(),
                        "selected worker configuration shard"
                    );
                    shard
                } else {
                    // A shard list without an ordinal applies to no worker.
                    BTreeMap::new()
                }
            }
            (None, _) => BTreeMap::new(),
        };

        let service_name = self.service_name.filter(|name| !name.is_empty());

        Ok(ResolvedConfig {
            service_locator: self.service_locator,
            service_name,
            identity: WorkerIdentity { ordinal },
            runner_map,
            env,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ConfigResolver {
        ConfigResolver {
            service_locator: ".".to_string(),
            service_name: None,
            runner_map_json: None,
            worker_env_json: None,
            worker_ordinal: None,
        }
    }

    #[test]
    fn selects_exactly_the_ordinals_shard() {
        let shards =
            r#"[{"A":"0"},{"A":"1","B":"x"},{"A":"2"}]"#;
        let config = ConfigResolver {
            worker_env_json: Some(shards.to_string()),
            worker_ordinal: Some(2),
            ..resolver()
        }
        .resolve()
        .unwrap();

        assert_eq!(config.env.get("A").map(String::as_str), Some("1"));
        assert_eq!(config.env.get("B").map(String::as_str), Some("x"));
        assert_eq!(config.env.len(), 2);
        assert_eq!(config.identity.ordinal.map(NonZeroUsize::get), Some(2));
    }

    #[test]
    fn ordinal_beyond_shard_list_is_out_of_range() {
        let result = ConfigResolver {
            worker_env_json: Some(r#"[{"A":"0"}]"#.to_string()),
            worker_ordinal: Some(3),
            ..resolver()
        }
        .resolve();

        assert!(matches!(
            result,
            Err(Error::OutOfRange {
                ordinal: 3,
                shards: 1
            })
        ));
    }

    #[test]
    fn ordinal_equal_to_shard_list_length_is_valid() {
        let config = ConfigResolver {
            worker_env_json: Some(r#"[{"A":"0"},{"A":"1"}]"#.to_string()),
            worker_ordinal: Some(2),
            ..resolver()
        }
        .resolve()
        .unwrap();

        assert_eq!(config.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn zero_ordinal_is_a_configuration_error() {
        let result = ConfigResolver {
            worker_ordinal: Some(0),
            ..resolver()
        }
        .resolve();

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn malformed_runner_map_is_a_configuration_error() {
        let result = ConfigResolver {
            runner_map_json: Some("{not json".to_string()),
            ..resolver()
        }
        .resolve();

        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn shard_list_without_ordinal_applies_nothing() {
        let config = ConfigResolver {
            worker_env_json: Some(r#"[{"A":"0"}]"#.to_string()),
            ..resolver()
        }
        .resolve()
        .unwrap();

        assert!(config.env.is_empty());
    }

    #[test]
    fn empty_service_name_is_no_override() {
        let config = ConfigResolver {
            service_name: Some(String::new()),
            ..resolver()
        }
        .resolve()
        .unwrap();

        assert!(config.service_name.is_none());
    }
}
