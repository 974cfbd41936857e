use tracing::info;
use tracing_subscriber::EnvFilter;

use srpair::{DatasetParams, SentinelHubClient, SentinelHubConfig, TimeInterval, prepare_dataset};

use super::args::CliArgs;
use super::errors::AppError;

/// Config file (or defaults) with every explicitly passed flag applied on top.
fn resolve_params(args: &CliArgs) -> Result<DatasetParams, AppError> {
    let mut params = match &args.config {
        Some(path) => DatasetParams::from_json_file(path).map_err(|source| AppError::Config {
            path: path.display().to_string(),
            source,
        })?,
        None => DatasetParams::default(),
    };

    if let Some(v) = &args.input_dir {
        params.input_dir = v.clone();
    }
    if let Some(v) = &args.pattern {
        params.pattern = v.clone();
    }
    if let Some(v) = &args.output_dir {
        params.output_dir = v.clone();
    }
    if let Some(v) = &args.id_prefix {
        params.id_prefix = v.clone();
    }
    if let Some(v) = &args.bands {
        params.spacenet_bands = v.clone();
    }
    if args.time_from.is_some() || args.time_to.is_some() {
        params.time_interval = TimeInterval::new(
            args.time_from.unwrap_or(params.time_interval.start),
            args.time_to.unwrap_or(params.time_interval.end),
        )?;
    }
    if let Some(v) = args.max_cloud_coverage {
        params.max_cloud_coverage = v;
    }
    if let Some(v) = args.collection {
        params.collection = v;
    }
    if let Some(v) = &args.layer {
        params.layer = v.clone();
    }
    if let Some(v) = &args.remote_bands {
        params.remote_bands = v.clone();
    }
    if let Some(v) = args.resolution {
        params.remote_resolution = v;
    }
    if let Some(v) = args.mosaicking {
        params.mosaicking = v;
    }
    if let Some(v) = args.min_coverage {
        params.min_coverage = v;
    }
    if let Some(v) = args.input_size {
        params.input_size = v;
    }
    if let Some(v) = args.target_size {
        params.target_size = v;
    }
    if let Some(v) = args.resize_filter {
        params.resize_filter = v;
    }
    if let Some(v) = args.normalize {
        params.normalize = v;
    }
    if args.limit.is_some() {
        params.limit = args.limit;
    }
    params.skip_existing |= args.skip_existing;
    params.continue_on_error |= args.continue_on_error;
    if args.no_manifest {
        params.write_manifest = false;
    }

    params.validate()?;
    Ok(params)
}

fn resolve_client_config(args: &CliArgs) -> Result<SentinelHubConfig, AppError> {
    let mut config = SentinelHubConfig::default();
    config.client_id = args.client_id.clone().ok_or(AppError::MissingArgument {
        arg: "--client-id (or SH_CLIENT_ID)".to_string(),
    })?;
    config.client_secret = args.client_secret.clone().ok_or(AppError::MissingArgument {
        arg: "--client-secret (or SH_CLIENT_SECRET)".to_string(),
    })?;
    if let Some(url) = &args.sh_base_url {
        config.base_url = url.clone();
    }
    if let Some(url) = &args.sh_auth_url {
        config.auth_url = url.clone();
    }
    config.max_attempts = args.max_attempts.max(1);
    config.timeout_secs = args.timeout;
    Ok(config)
}

fn init_logging(verbose: bool) {
    if verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(args.log);

    let params = resolve_params(&args)?;
    let client_config = resolve_client_config(&args)?;
    info!("Dataset parameters: {:?}", params);
    info!("Sentinel Hub: {:?}", client_config);

    let client = SentinelHubClient::new(client_config).map_err(AppError::from)?;
    let report = prepare_dataset(&params, client).map_err(AppError::from)?;

    println!(
        "processed={} skipped={} existing={} errors={}",
        report.processed, report.skipped, report.existing, report.errors
    );
    Ok(())
}
