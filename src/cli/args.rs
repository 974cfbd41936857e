use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use srpair::{DataCollection, ImageSize, MosaickingOrder, NormalizeMode, ResizeFilter};

#[derive(Parser, Debug)]
#[command(
    name = "srpair",
    version,
    about = "Build paired input/target superresolution datasets from SpaceNet chips and Sentinel-2"
)]
pub struct CliArgs {
    /// JSON file with dataset parameters; flags below override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory containing the high-resolution chips
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Glob pattern selecting chips inside the input directory (e.g. "*.tif")
    #[arg(long)]
    pub pattern: Option<String>,

    /// Output root; pairs go to <OUTPUT_DIR>/input and <OUTPUT_DIR>/target
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Filename prefix stripped to form the sample id
    #[arg(long)]
    pub id_prefix: Option<String>,

    /// 1-based chip bands to read, comma separated (e.g. 1,2,3)
    #[arg(long, value_delimiter = ',')]
    pub bands: Option<Vec<usize>>,

    /// First day of the acquisition window (YYYY-MM-DD)
    #[arg(long)]
    pub time_from: Option<NaiveDate>,

    /// Last day of the acquisition window (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub time_to: Option<NaiveDate>,

    /// Maximum scene cloud cover as a fraction (0.0 - 1.0)
    #[arg(long)]
    pub max_cloud_coverage: Option<f64>,

    /// Sentinel Hub data collection
    #[arg(long, value_enum)]
    pub collection: Option<DataCollection>,

    /// Name the remote layer is tagged with
    #[arg(long)]
    pub layer: Option<String>,

    /// Remote bands, comma separated, in output order (e.g. B04,B03,B02)
    #[arg(long, value_delimiter = ',')]
    pub remote_bands: Option<Vec<String>>,

    /// Ground resolution of the remote image in metres per pixel
    #[arg(long)]
    pub resolution: Option<f64>,

    /// Scene ordering when several acquisitions match
    #[arg(long, value_enum)]
    pub mosaicking: Option<MosaickingOrder>,

    /// Minimum fraction of non-zero chip pixels required to keep a sample
    #[arg(long)]
    pub min_coverage: Option<f64>,

    /// Size of the low-resolution input image: WIDTHxHEIGHT or a single number
    #[arg(long)]
    pub input_size: Option<ImageSize>,

    /// Size of the high-resolution target image: WIDTHxHEIGHT or a single number
    #[arg(long)]
    pub target_size: Option<ImageSize>,

    /// Resampling filter used for both images
    #[arg(long, value_enum)]
    pub resize_filter: Option<ResizeFilter>,

    /// Min-max normalization over all bands (global) or per band
    #[arg(long, value_enum)]
    pub normalize: Option<NormalizeMode>,

    /// Process at most this many chips
    #[arg(long)]
    pub limit: Option<usize>,

    /// Skip chips whose input and target images already exist
    #[arg(long, default_value_t = false)]
    pub skip_existing: bool,

    /// Log failing chips and keep going instead of stopping at the first error
    #[arg(long, default_value_t = false)]
    pub continue_on_error: bool,

    /// Do not write manifest.json into the output directory
    #[arg(long, default_value_t = false)]
    pub no_manifest: bool,

    /// Sentinel Hub OAuth client id
    #[arg(long, env = "SH_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Sentinel Hub OAuth client secret
    #[arg(long, env = "SH_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Sentinel Hub services URL
    #[arg(long, env = "SH_BASE_URL")]
    pub sh_base_url: Option<String>,

    /// Sentinel Hub token endpoint
    #[arg(long, env = "SH_AUTH_URL")]
    pub sh_auth_url: Option<String>,

    /// Attempts per remote request (1 = no retry)
    #[arg(long, default_value_t = 1)]
    pub max_attempts: u32,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
