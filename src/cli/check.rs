use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;
use tracing::{info, warn};

use extensions_bridge::normalize;
use sentinel_annotator::{format_percent, Verdict};
use sentinel_core_types::{PredictionRequest, PredictionResponse};

use crate::cli::context::CliContext;
use crate::cli::output::OutputFormat;

const PING_TEXT: &str =
    "This product exceeded my expectations. The build quality is solid and it arrived on time.";
const PING_RATING: f64 = 5.0;

#[derive(Args, Clone, Debug)]
pub struct CheckArgs {
    /// Review text to score
    #[arg(long)]
    pub text: String,

    /// Star rating in [1, 5]; out-of-range values fall back to 5
    #[arg(long, default_value_t = 5.0)]
    pub rating: f64,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    request: &'a PredictionRequest,
    response: &'a PredictionResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    verdict: Option<&'static str>,
}

/// Human-readable one-liner for a response.
pub fn describe(response: &PredictionResponse) -> String {
    match response {
        PredictionResponse::Score { score } => {
            let verdict = Verdict::from_score(*score);
            format!("{}% · {}", format_percent(*score, 2), verdict.label)
        }
        PredictionResponse::Error { error } => format!("Error: {error}"),
    }
}

pub async fn cmd_check(args: CheckArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let Some(request) = PredictionRequest::new(args.text, args.rating) else {
        bail!("Could not find review text to score");
    };
    let stack = ctx.scoring_stack()?;
    let response = normalize(stack.client.predict(&request).await);
    stack.background.shutdown().await;

    let report = CheckReport {
        request: &request,
        response: &response,
        verdict: response.score_value().map(|s| Verdict::from_score(s).label),
    };
    if !output.emit(&report)? {
        println!("{}", describe(&response));
    }
    if let Some(error) = response.error_message() {
        bail!("Scoring failed: {error}");
    }
    Ok(())
}

/// Connection test: one sample review through the full bridge.
pub async fn cmd_ping(ctx: &CliContext) -> Result<()> {
    let endpoint = ctx.config().scoring.endpoint.clone();
    let Some(request) = PredictionRequest::new(PING_TEXT, PING_RATING) else {
        bail!("sample review is empty");
    };
    let stack = ctx.scoring_stack()?;
    let response = normalize(stack.client.predict(&request).await);
    stack.background.shutdown().await;

    match &response {
        PredictionResponse::Score { score } => {
            info!(%endpoint, score = *score, "scoring service reachable");
            println!("Connected to {endpoint}: sample scored {}", describe(&response));
            Ok(())
        }
        PredictionResponse::Error { error } => {
            warn!(%endpoint, %error, "scoring service unreachable");
            bail!("Connection to {endpoint} failed: {error}")
        }
    }
}
