use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use helix_discovery::Discovery;
use helix_service::ServiceRegistry;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::ConfigResolver;
use crate::{Outcome, Worker};

/// Command-line arguments for a worker process.
#[derive(Parser, Debug)]
#[command(version, about = "Serves one registered service from this process", long_about = None)]
pub struct Args {
    /// Service locator; "." serves the registry's default entry.
    #[arg(default_value = ".")]
    pub service_locator: String,

    /// Serve this dependency of the located service instead of the root.
    #[arg(long, env = "HELIX_SERVICE_NAME")]
    pub service_name: Option<String>,

    /// JSON object mapping runner names to addresses.
    #[arg(long, env = "HELIX_RUNNER_MAP")]
    pub runner_map: Option<String>,

    /// JSON list of per-worker configuration shards.
    #[arg(long, env = "HELIX_WORKER_ENV")]
    pub worker_env: Option<String>,

    /// 1-based worker ordinal selecting a configuration shard.
    #[arg(long, env = "HELIX_WORKER_ID")]
    pub worker_id: Option<usize>,
}

impl Args {
    /// Converts parsed arguments into the configuration resolver input.
    #[must_use]
    pub fn into_resolver(self) -> ConfigResolver {
        ConfigResolver {
            service_locator: self.service_locator,
            service_name: self.service_name,
            runner_map_json: self.runner_map,
            worker_env_json: self.worker_env,
            worker_ordinal: self.worker_id,
        }
    }
}

/// Runs a worker process to completion: bootstraps from `args`, serves
/// until the backend returns or ctrl-c is received, and maps the result to
/// a process exit code.
///
/// A non-distributed entry service exits successfully without serving.
pub async fn run(registry: ServiceRegistry, runtime: Arc<dyn Discovery>, args: Args) -> ExitCode {
    crate::logging::init_logging();

    let worker = Worker::new(registry, runtime);
    let shutdown = CancellationToken::new();

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            signal_token.cancel();
        }
    });

    match worker.run(args.into_resolver(), &shutdown).await {
        Ok(Outcome::Served | Outcome::Cancelled) => ExitCode::SUCCESS,
        Ok(Outcome::NonDistributed) => {
            info!("nothing to serve from this process");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("worker terminated: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_defaults_to_the_registry_entry() {
        let args = Args::try_parse_from(["helix-worker"]).unwrap();
        assert_eq!(args.service_locator, ".");
        assert_eq!(args.service_name, None);
        assert_eq!(args.worker_id, None);
    }

    #[test]
    fn worker_id_parses_as_an_integer() {
        let args =
            Args::try_parse_from(["helix-worker", "pkgs.graph:Frontend", "--worker-id", "2"])
                .unwrap();
        assert_eq!(args.service_locator, "pkgs.graph:Frontend");
        assert_eq!(args.worker_id, Some(2));
    }

    #[test]
    fn non_integer_worker_id_is_rejected() {
        assert!(Args::try_parse_from(["helix-worker", "--worker-id", "two"]).is_err());
    }

    #[test]
    fn runner_map_falls_back_to_the_environment() {
        // Both parses happen while the variable is set, so this test owns
        // it for its whole duration.
        unsafe { std::env::set_var("HELIX_RUNNER_MAP", r#"{"runner":"addr"}"#) };

        let from_env = Args::try_parse_from(["helix-worker"]).unwrap();
        let from_flag = Args::try_parse_from([
            "helix-worker",
            "--runner-map",
            r#"{"runner":"other"}"#,
        ])
        .unwrap();

        unsafe { std::env::remove_var("HELIX_RUNNER_MAP") };

        assert_eq!(from_env.runner_map.as_deref(), Some(r#"{"runner":"addr"}"#));
        assert_eq!(
            from_flag.runner_map.as_deref(),
            Some(r#"{"runner":"other"}"#)
        );
    }

    #[test]
    fn into_resolver_threads_every_field() {
        let args = Args::try_parse_from([
            "helix-worker",
            "pkgs.graph:Frontend",
            "--service-name",
            "embedder",
            "--worker-env",
            r#"[{"A":"0"}]"#,
            "--worker-id",
            "1",
        ])
        .unwrap();

        let resolver = args.into_resolver();
        assert_eq!(resolver.service_locator, "pkgs.graph:Frontend");
        assert_eq!(resolver.service_name.as_deref(), Some("embedder"));
        assert_eq!(resolver.worker_env_json.as_deref(), Some(r#"[{"A":"0"}]"#));
        assert_eq!(resolver.worker_ordinal, Some(1));
    }
}
