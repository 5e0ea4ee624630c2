//! edgesign Lambda bootstrap.
//!
//! Custom-runtime entry point for the edge request signer. Each invocation
//! carries one CloudFront request; the bootstrap re-signs it for the S3
//! origin and hands it back to the platform.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_LAMBDA_RUNTIME_API` | *(set by Lambda)* | Runtime API endpoint |
//! | `ORIGIN_REGION` | `us-east-2` | Signing region |
//! | `ORIGIN_SERVICE` | `s3` | Signing service |
//! | `ORIGIN_SCHEME` | `https` | Scheme of the origin endpoint |
//! | `FAILOVER_HEADER` | `originTypeFailover` | Pass-through marker |
//! | `DEBUG_DISPATCH` | `false` | Replay signed requests for logging |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `LOG_FORMAT` | *(text)* | `json` for JSON log lines |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod credentials;
mod handler;
mod runtime;

use std::sync::Arc;

use anyhow::{Context, Result};
use edgesign_core::{ReqwestTelemetrySink, RequestSigner, SignerConfig};
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

use crate::credentials::AwsChainCredentialProvider;
use crate::handler::handle_invocation;
use crate::runtime::{ErrorReport, RuntimeClient};

/// Version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false);

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

async fn build_signer(config: SignerConfig) -> RequestSigner {
    let credentials = AwsChainCredentialProvider::load().await;
    let debug_dispatch = config.debug_dispatch;
    let signer = RequestSigner::new(config, Arc::new(credentials));

    if debug_dispatch {
        signer.with_telemetry(Arc::new(ReqwestTelemetrySink::new()))
    } else {
        signer
    }
}

/// Serve invocations until the execution environment is torn down.
async fn run(runtime: &RuntimeClient, signer: &RequestSigner) -> Result<()> {
    loop {
        let invocation = runtime
            .next_invocation()
            .await
            .context("failed to fetch next invocation")?;

        let span = info_span!("invocation", request_id = %invocation.request_id);
        async {
            let outcome = match handle_invocation(signer, &invocation.payload).await {
                Ok(body) => runtime.send_response(&invocation.request_id, body).await,
                Err(e) => {
                    error!(error = %e, error_type = e.error_type(), "invocation failed");
                    let report = ErrorReport::new(e.error_type(), e.to_string());
                    runtime.send_error(&invocation.request_id, &report).await
                }
            };
            if let Err(e) = outcome {
                warn!(error = %e, "failed to report invocation result");
            }
        }
        .instrument(span)
        .await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let runtime = RuntimeClient::from_env()?;
    let config = SignerConfig::from_env();

    if let Err(e) = init_tracing(&config.log_level) {
        let report = ErrorReport::new("InitError", format!("{e:#}"));
        runtime.send_init_error(&report).await.ok();
        return Err(e);
    }

    info!(
        region = %config.region,
        service = %config.service,
        scheme = %config.scheme,
        failover_header = %config.failover_header,
        debug_dispatch = config.debug_dispatch,
        version = VERSION,
        "starting edgesign Lambda runtime",
    );

    let signer = build_signer(config).await;
    run(&runtime, &signer).await
}
