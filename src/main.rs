//! Course Evaluation Client CLI
//!
//! Small command-line front end over the client layer, mostly useful for
//! poking at a running backend.

use anyhow::{bail, Context};
use course_eval_client::{
    ClientConfig, FacultyService, FileStore, HttpClient, MemoryNavigator, ReviewService, Session,
};
use std::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

const DEFAULT_CONFIG: &str = "course_eval_client.yaml";
const SESSION_FILE: &str = "course_eval_session.json";

/// # Usage
/// ```bash
/// course-eval-client [config.yaml] faculties
/// course-eval-client [config.yaml] course-reviews <course-id>
/// course-eval-client [config.yaml] course-ratings <course-id>
/// ```
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .with_line_number(true)
        .init();

    if let Err(e) = run(env::args().skip(1).collect()).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(mut args: Vec<String>) -> anyhow::Result<()> {
    let config = if args.first().map(|a| a.ends_with(".yaml") || a.ends_with(".yml")).unwrap_or(false) {
        let path = args.remove(0);
        ClientConfig::from_file(&path).with_context(|| format!("loading {}", path))?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        ClientConfig::from_file(DEFAULT_CONFIG).with_context(|| format!("loading {}", DEFAULT_CONFIG))?
    } else {
        ClientConfig::default()
    };

    info!("Configuration loaded");
    info!("  - Base URL: {}", config.base_url);
    info!("  - Timeout: {} ms", config.timeout_ms);
    info!("  - Max retries: {}", config.max_retries);

    let store = Arc::new(FileStore::open(SESSION_FILE).context("opening session store")?);
    let session = Arc::new(Session::new(
        store,
        Arc::new(MemoryNavigator::default()),
        config.credential_key.clone(),
    ));
    let client = HttpClient::new(config, session)?;

    let command = args.first().map(String::as_str).unwrap_or("faculties");
    let id_arg = || -> anyhow::Result<i64> {
        args.get(1)
            .context("missing id argument")?
            .parse::<i64>()
            .context("id must be an integer")
    };

    match command {
        "faculties" => {
            for faculty in FacultyService::new(client.clone()).list().await? {
                println!("{:>5}  {}", faculty.id.unwrap_or_default(), faculty.name);
            }
        }
        "course-reviews" => {
            let course_id = id_arg()?;
            for review in ReviewService::new(client.clone()).by_course(course_id).await? {
                println!("[{}] {}", review.rating, review.content);
            }
        }
        "course-ratings" => {
            let course_id = id_arg()?;
            let ratings = ReviewService::new(client.clone()).course_ratings(course_id).await?;
            println!("{}", serde_json::to_string_pretty(&ratings)?);
        }
        other => bail!("unknown command '{}'", other),
    }

    let stats = client.metrics().get_stats();
    info!(
        "requests={} failed={} retries={} avg={:.1}ms",
        stats.total_requests,
        stats.failed_requests,
        stats.retries,
        stats.avg_request_duration_ms()
    );
    Ok(())
}
