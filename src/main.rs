//! Earth Timelapse CLI
//!
//! Generates a satellite timelapse GIF (and MP4 when ffmpeg is available)
//! for a named place.

use clap::{Parser, ValueEnum};
use earth_timelapse::{
    backend::EarthEngineConnector,
    cadence::TimePeriod,
    geocode::{GeocoderConfig, NominatimGeocoder},
    metrics::PipelineMetrics,
    pipeline::{
        Collaborators, ConfigError, FileConfig, Pipeline, StageOutcome, TimelapseConfig, TimelapseError,
        DEFAULT_OUTPUT, EXIT_INTERRUPTED,
    },
    transcode::{FfmpegTranscoder, Transcoder},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Timelapse cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Frequency {
    Year,
    Quarter,
    Month,
}

impl From<Frequency> for TimePeriod {
    fn from(frequency: Frequency) -> Self {
        match frequency {
            Frequency::Year => TimePeriod::Year,
            Frequency::Quarter => TimePeriod::Quarter,
            Frequency::Month => TimePeriod::Month,
        }
    }
}

/// Generate satellite timelapses.
#[derive(Debug, Parser)]
#[command(name = "earth-timelapse", version, about)]
struct Args {
    /// Place name (e.g., 'Udine, Italy')
    #[arg(long)]
    place: String,

    /// Number of years to go back
    #[arg(long, default_value_t = 20)]
    years: u32,

    /// Base name for the output files
    #[arg(long, default_value = DEFAULT_OUTPUT)]
    output: String,

    /// Directory for the output files
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Cloud project for the imagery backend
    #[arg(long, env = "EARTHENGINE_PROJECT")]
    project: Option<String>,

    /// Radius around the location in meters
    #[arg(long, default_value_t = 6000)]
    radius: u32,

    /// Timelapse frequency
    #[arg(long, value_enum, default_value_t = Frequency::Year)]
    frequency: Frequency,

    /// Width of the output GIF in pixels
    #[arg(long, default_value_t = 768)]
    width: u32,

    /// Frames per second
    #[arg(long, default_value_t = 10)]
    fps: u32,

    /// Generate vertical (9:16) video for mobile
    #[arg(long)]
    vertical: bool,

    /// TOML file with visualization, overlay and service settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write run metrics in Prometheus text format to this file
    #[arg(long)]
    metrics_out: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> Result<TimelapseConfig, TimelapseError> {
        let tuning = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        Ok(TimelapseConfig {
            place: self.place.clone(),
            years: self.years,
            output: self.output.clone(),
            output_dir: self.output_dir.clone(),
            project: self.project.clone(),
            radius_m: self.radius,
            cadence: self.frequency.into(),
            width: self.width,
            fps: self.fps,
            vertical: self.vertical,
            tuning,
        })
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Earth Timelapse v{}", earth_timelapse::VERSION);

    if let Err(e) = ctrlc::set_handler(|| {
        warn!("Interrupted; partial output may remain");
        std::process::exit(EXIT_INTERRUPTED.into());
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }

    let metrics = match PipelineMetrics::new() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&args, &metrics) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Builds the geocoding client. No lookup runs here, so failures are
/// configuration errors.
fn geocoder(config: &GeocoderConfig) -> Result<NominatimGeocoder, TimelapseError> {
    NominatimGeocoder::new(config)
        .map_err(|e| ConfigError::InvalidGeocoder(e.to_string()).into())
}

fn run(args: &Args, metrics: &PipelineMetrics) -> Result<(), TimelapseError> {
    let pipeline = Pipeline::new(args.to_config()?)?;
    let tuning = &pipeline.config().tuning;

    let transcoder = match FfmpegTranscoder::probe() {
        Ok(t) => Some(t),
        Err(e) => {
            warn!("{}; MP4 output disabled", e);
            None
        }
    };
    let geocoder = geocoder(&tuning.geocoder)?;
    let connector = EarthEngineConnector::new(tuning.backend.clone());

    let services = Collaborators {
        geocoder: &geocoder,
        connector: &connector,
        transcoder: transcoder.as_ref().map(|t| t as &dyn Transcoder),
        annotator: None,
    };

    let result = pipeline.run(&services, metrics);

    if let Some(path) = &args.metrics_out {
        match metrics.write_to(path) {
            Ok(()) => info!(path = %path.display(), "Metrics written"),
            Err(e) => warn!("{}", e),
        }
    }

    let report = result?;
    info!(
        frames = report.frames,
        width = report.grid.width,
        height = report.grid.height,
        "Timelapse saved to: {}",
        report.primary.display()
    );
    if let StageOutcome::Failed(reason) = &report.overlay {
        warn!("Timelapse has no overlay: {}", reason);
    }
    match &report.secondary {
        Some(mp4) => info!("MP4 saved to: {}", mp4.display()),
        None => info!("No MP4 produced"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let args = Args::try_parse_from(["earth-timelapse", "--place", "Udine, Italy"]).unwrap();
        let config = args.to_config().unwrap();
        assert_eq!(config.years, 20);
        assert_eq!(config.output, "timelapse");
        assert_eq!(config.radius_m, 6000);
        assert_eq!(config.cadence, TimePeriod::Year);
        assert_eq!(config.width, 768);
        assert_eq!(config.fps, 10);
        assert!(!config.vertical);
    }

    #[test]
    fn test_frequency_values() {
        let args = Args::try_parse_from(["earth-timelapse", "--place", "x", "--frequency", "quarter"]).unwrap();
        assert_eq!(TimePeriod::from(args.frequency), TimePeriod::Quarter);
        assert!(Args::try_parse_from(["earth-timelapse", "--place", "x", "--frequency", "weekly"]).is_err());
    }

    #[test]
    fn test_place_required() {
        assert!(Args::try_parse_from(["earth-timelapse"]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_config_error() {
        let args = Args::try_parse_from([
            "earth-timelapse",
            "--place",
            "x",
            "--config",
            "/nonexistent/timelapse.toml",
        ])
        .unwrap();
        let err = args.to_config().unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_geocoder_setup_failure_is_config_error() {
        let config = GeocoderConfig {
            user_agent: "earth-time-lapse-tool\nbroken".into(),
            ..Default::default()
        };
        let err = geocoder(&config).unwrap_err();
        assert!(matches!(err, TimelapseError::Config(ConfigError::InvalidGeocoder(_))));
        assert_eq!(err.exit_code(), 2);
    }
}
