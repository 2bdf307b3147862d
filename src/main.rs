//! CLI entry point for the dp-harvester tool.

use anyhow::{Context, Result, bail};
use clap::Parser;
use harvester_core::{
    DownloadPipeline, Endpoint, FetchLimiter, HttpClient, crawl_file_urls, listing, output,
    signature, store::ExtensionPolicy,
};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level: RUST_LOG env var > verbose flag > default (info)
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("dp-harvester starting");

    let client = HttpClient::new(&args.useragent, args.timeout, !args.validate)?;
    let endpoint = Endpoint::new(&args.protocol, &args.server, args.port);
    let limiter = FetchLimiter::new(usize::from(args.threads))?;
    let policy = ExtensionPolicy::new(&args.allow, args.download_no_ext);
    let pipeline = DownloadPipeline::new(
        client.clone(),
        limiter.clone(),
        policy,
        &args.output,
        args.randomize,
    );

    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("unable to create output directory {}", args.output.display()))?;

    // Root listing: from disk when provided, otherwise from the server.
    // A failed server fetch is the run's only fatal fetch; it leaves a
    // sentinel marker categorizing the failure for later triage.
    let datalib_body = match &args.datalib {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("unable to read listing file {}", path.display()))?,
        None => match pipeline.fetch_datalib_listing(&endpoint, &args.server).await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "unable to fetch root listing");
                output::record_discovery_failure(&args.output, &e)?;
                bail!("root listing fetch failed: {e}");
            }
        },
    };

    let entry_names = listing::extract_entry_names(&datalib_body);

    if args.use_signature_method {
        run_signature_method(&args, &pipeline, &endpoint, &entry_names).await?;
    } else {
        run_url_method(&args, &pipeline, &endpoint, &client, &limiter, &entry_names).await?;
    }

    let stats = pipeline.stats();
    info!(
        downloaded = stats.downloaded(),
        skipped = stats.skipped(),
        failed = stats.failed(),
        "harvest complete"
    );

    Ok(())
}

/// Signature method: pull signature blobs, scan them for file names, then
/// download each name via its metadata document and trusted hash.
async fn run_signature_method(
    args: &Args,
    pipeline: &DownloadPipeline,
    endpoint: &Endpoint,
    entry_names: &[String],
) -> Result<()> {
    // Signature blobs: from a prior run's directory, or from the server.
    let signature_dir = match &args.signatures {
        Some(path) => path.clone(),
        None => {
            let bar = phase_bar(1, entry_names.len() as u64, "Getting signature files");
            let dir = pipeline.fetch_signatures(endpoint, entry_names, &bar).await?;
            bar.finish();
            dir
        }
    };

    let mut blob_paths = output::walk_files(&signature_dir);
    if blob_paths.is_empty() {
        bail!("no signature files found");
    }
    if args.randomize {
        blob_paths.shuffle(&mut rand::thread_rng());
    }

    let names_list = args.output.join(format!("{}_files.txt", args.server));
    let bar = phase_bar(2, blob_paths.len() as u64, "Getting files");
    let mut total_files = 0usize;
    for blob_path in blob_paths {
        bar.inc(1);
        let data = match std::fs::read(&blob_path) {
            Ok(data) => data,
            Err(e) => {
                error!(path = %blob_path.display(), error = %e, "unable to read signature blob");
                continue;
            }
        };
        let file_names = signature::extract_file_names(&data);
        output::append_lines(&names_list, &file_names)?;
        total_files += file_names.len();

        if let Err(e) = pipeline
            .download_signature_files(endpoint, &blob_path, file_names)
            .await
        {
            error!(path = %blob_path.display(), error = %e, "abandoning signature batch");
        }
    }
    bar.finish();
    debug!(total_files, "signature scan complete");
    Ok(())
}

/// Direct-URL method: crawl the package directories for file URLs (or take
/// them from a pre-fetched list) and download each by computed hash.
async fn run_url_method(
    args: &Args,
    pipeline: &DownloadPipeline,
    endpoint: &Endpoint,
    client: &HttpClient,
    limiter: &FetchLimiter,
    entry_names: &[String],
) -> Result<()> {
    info!(
        directories = entry_names.len(),
        "found directories in the root listing"
    );

    let file_urls: Vec<String> = match &args.urls_path {
        Some(path) => {
            info!(path = %path.display(), "using provided URL file");
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("unable to read URL file {}", path.display()))?;
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(ToString::to_string)
                .collect()
        }
        None => {
            let roots: Vec<String> = entry_names
                .iter()
                .filter(|name| !name.ends_with(".INI"))
                .map(|name| endpoint.package_dir_url(name))
                .collect();

            let spinner = ProgressBar::new_spinner();
            spinner.set_message("[1/2] Getting file URLs...");
            let urls = crawl_file_urls(client.clone(), limiter.clone(), roots, spinner.clone()).await;
            spinner.finish();

            output::append_lines(
                &args.output.join(format!("{}_urls.txt", args.server)),
                &urls,
            )?;
            urls
        }
    };

    let bar = phase_bar(2, file_urls.len() as u64, "Getting files");
    pipeline.download_from_urls(file_urls, &bar).await?;
    bar.finish();
    Ok(())
}

/// Builds a phase-labelled progress bar.
fn phase_bar(phase: u8, len: u64, message: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{prefix} {bar:30} {pos}/{len} ({elapsed})")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_prefix(format!("[{phase}/2] {message}..."));
    bar
}
