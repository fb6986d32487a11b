use std::path::PathBuf;

/// Spatial weights and Moran's I for shapefiles and point tables
#[derive(clap::Parser, Debug)]
#[command(name = "geomoran", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build the adjacency graph and print its diagnostics
    Weights(WeightsArgs),

    /// Run global and local Moran's I on one attribute
    Moran(MoranArgs),
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Rule {
    Queen,
    Rook,
    Distance,
    Knn,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
pub enum Islands {
    Exclude,
    Fail,
    Bridge,
}

/// Where features come from and how neighbors are defined.
#[derive(clap::Args, Debug)]
pub struct InputArgs {
    /// Input .shp file, or .csv of points
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    /// Attribute to analyze (dBase field or CSV column)
    #[arg(short, long)]
    pub field: Option<String>,

    /// Attribute used to label features in the output
    #[arg(long)]
    pub label: Option<String>,

    /// X / longitude column of a CSV input
    #[arg(long, default_value = "longitude")]
    pub x: String,

    /// Y / latitude column of a CSV input
    #[arg(long, default_value = "latitude")]
    pub y: String,

    /// EPSG code of the input coordinates (overrides .prj; required for CSV distance rules)
    #[arg(long)]
    pub epsg: Option<String>,

    /// Reproject to this EPSG code before building neighbors ("utm" picks the local zone)
    #[arg(long)]
    pub to_epsg: Option<String>,

    /// Neighbor rule
    #[arg(long, value_enum)]
    pub rule: Option<Rule>,

    /// Distance band threshold in CRS units
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Number of neighbors for the knn rule
    #[arg(short)]
    pub k: Option<usize>,

    /// Snapping tolerance for queen/rook contiguity
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// How to treat features with no neighbors
    #[arg(long, value_enum)]
    pub islands: Option<Islands>,

    /// JSON analysis config; flags given here override it
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct WeightsArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Also write per-feature neighbor lists to this JSON file
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct MoranArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Number of permutations (0 for analytical inference only)
    #[arg(short, long)]
    pub permutations: Option<usize>,

    /// Seed for reproducible permutations
    #[arg(long)]
    pub seed: Option<u64>,

    /// Significance level for cluster labels
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Binary weights instead of row-standardized
    #[arg(long)]
    pub binary: bool,

    /// Output directory for summary.json and local.csv, defaults to "."
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub output: Option<PathBuf>,
}
