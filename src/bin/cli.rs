//! CLI application for facial emotion detection.
//!
//! Usage:
//!   facemotion <image> <detector> <models>...                  # Human-readable output
//!   facemotion <image> <detector> <models>... --json           # JSON output
//!   facemotion <image> <detector> <models>... --nthetas 8      # Custom filter bank
//!
//! Model file names must start with the emotion they detect, e.g.
//! `happy_boost.bin` or `anger_tree_v1.xml`.

use std::path::PathBuf;

use clap::Parser;
use facemotion::face::crop_face;
use facemotion::{
    BoundingBox, Decision, EmotionPipeline, Error, ErrorKind, FaceLocator, PipelineConfig,
    VoteResult, VotingEnsemble,
};
use rustface::{Detector, ImageData};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "facemotion")]
#[command(author, version, about = "Detect facial emotions using boosted trees", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Face detector model path
    #[arg(required = true)]
    detector: PathBuf,

    /// Trained boosted models, named EMOTION_* (neutral, anger, contempt,
    /// disgust, fear, happy, sadness, surprise)
    #[arg(required = true, num_args = 1..)]
    models: Vec<PathBuf>,

    /// JSON file with working size and filter bank settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width the face is scaled to
    #[arg(long, allow_negative_numbers = true)]
    width: Option<i64>,

    /// Height the face is scaled to
    #[arg(long, allow_negative_numbers = true)]
    height: Option<i64>,

    /// Number of Gabor envelope widths
    #[arg(long, allow_negative_numbers = true)]
    nwidths: Option<i64>,

    /// Number of Gabor wavelengths
    #[arg(long, allow_negative_numbers = true)]
    nlambdas: Option<i64>,

    /// Number of Gabor orientations
    #[arg(long, allow_negative_numbers = true)]
    nthetas: Option<i64>,

    /// Minimum face size for detection
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    image: String,
    face: BoundingBox,
    decision: Decision,
    votes: Vec<VoteResult>,
}

/// Face locator backed by rustface, keeping the largest detection.
struct RustfaceLocator {
    detector: Box<dyn Detector>,
    last: Option<BoundingBox>,
}

impl FaceLocator for RustfaceLocator {
    fn locate(&mut self, image: &image::GrayImage) -> Option<BoundingBox> {
        let image_data = ImageData::new(image.as_raw(), image.width(), image.height());
        let faces = self.detector.detect(&image_data);
        log::debug!("detector found {} face(s)", faces.len());

        self.last = faces
            .iter()
            .map(|face| face.bbox())
            .max_by_key(|bbox| bbox.width() * bbox.height())
            .map(|bbox| {
                BoundingBox::new(
                    bbox.x() as f32,
                    bbox.y() as f32,
                    bbox.width() as f32,
                    bbox.height() as f32,
                )
            });
        self.last
    }
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(e.kind()));
    }
}

fn exit_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Io => 1,
        ErrorKind::Config => 2,
        ErrorKind::Load | ErrorKind::UnrecognizedLabel | ErrorKind::DuplicateLabel => 3,
        ErrorKind::NoFaceDetected => 4,
        ErrorKind::InvalidInput => 5,
        ErrorKind::DimensionMismatch => 6,
    }
}

/// Negative counts are taken by absolute value.
fn coerce<T: TryFrom<u64>>(name: &str, value: i64) -> facemotion::Result<T> {
    T::try_from(value.unsigned_abs())
        .map_err(|_| Error::Config(format!("{} value {} is out of range", name, value)))
}

fn build_config(args: &Args) -> facemotion::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(v) = args.width {
        config.width = coerce("width", v)?;
    }
    if let Some(v) = args.height {
        config.height = coerce("height", v)?;
    }
    if let Some(v) = args.nwidths {
        config.nwidths = coerce("nwidths", v)?;
    }
    if let Some(v) = args.nlambdas {
        config.nlambdas = coerce("nlambdas", v)?;
    }
    if let Some(v) = args.nthetas {
        config.nthetas = coerce("nthetas", v)?;
    }
    Ok(config)
}

fn run(args: &Args) -> facemotion::Result<()> {
    let config = build_config(args)?;
    log::debug!("configuration: {:?}", config);

    // Load models
    let pipeline = EmotionPipeline::from_model_paths(&config, args.models.as_slice())?;

    log::info!("loading face detector from {:?}", args.detector);
    let detector_path = args
        .detector
        .to_str()
        .ok_or_else(|| Error::Config("invalid detector path".into()))?;
    let mut detector = rustface::create_detector(detector_path).map_err(|e| {
        Error::Config(format!("failed to load face detector: {}", e))
    })?;
    detector.set_min_face_size(args.min_face_size);
    detector.set_score_thresh(2.0);
    detector.set_pyramid_scale_factor(0.8);
    detector.set_slide_window_step(4, 4);
    let mut locator = RustfaceLocator {
        detector,
        last: None,
    };

    // Load image and convert to grayscale
    log::info!("loading image {:?}", args.image);
    let img = image::open(&args.image)
        .map_err(|e| Error::InvalidInput(format!("{}: {}", args.image.display(), e)))?;
    let gray = img.to_luma8();

    let face = crop_face(&mut locator, &gray, config.width, config.height)?;
    let features = pipeline.features(&face)?;
    let votes = pipeline.ensemble().votes(&features)?;
    let decision = VotingEnsemble::decide(&votes);

    let output = Output {
        image: args.image.display().to_string(),
        face: locator.last.unwrap_or(BoundingBox::new(0.0, 0.0, 0.0, 0.0)),
        decision,
        votes,
    };

    // Generate output
    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    // Write output
    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        log::info!("output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!(
        "Face: {:.0}x{:.0} at ({:.0}, {:.0})\n",
        output.face.width, output.face.height, output.face.x, output.face.y
    ));

    s.push_str("\nVotes:\n");
    for vote in &output.votes {
        let mark = if vote.fired { "*" } else { " " };
        s.push_str(&format!(
            "  {} {:<9} {:>8.4}\n",
            mark, vote.label, vote.confidence
        ));
    }

    s.push_str(&format!(
        "\nEmotion predicted: {} with score {}",
        output.decision.label, output.decision.score
    ));

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["facemotion", "face.png", "detector.bin", "happy_boost.bin"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn coerce_takes_absolute_value() {
        assert_eq!(coerce::<u32>("width", -48).unwrap(), 48);
        assert_eq!(coerce::<u32>("width", 48).unwrap(), 48);
        assert_eq!(coerce::<usize>("nthetas", -4).unwrap(), 4);
        assert_eq!(coerce::<u32>("height", 0).unwrap(), 0);

        let err = coerce::<u32>("width", i64::MIN).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn negative_flags_become_positive_config() {
        let args = parse(&[
            "--width",
            "-64",
            "--height",
            "-40",
            "--nwidths",
            "-3",
            "--nlambdas",
            "1",
            "--nthetas",
            "-8",
        ]);
        let config = build_config(&args).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 40);
        assert_eq!(config.nwidths, 3);
        assert_eq!(config.nlambdas, 1);
        assert_eq!(config.nthetas, 8);
    }

    #[test]
    fn unset_flags_keep_defaults() {
        let config = build_config(&parse(&[])).unwrap();
        let defaults = PipelineConfig::default();
        assert_eq!(config.width, defaults.width);
        assert_eq!(config.height, defaults.height);
        assert_eq!(config.bank_shape(), defaults.bank_shape());
    }
}
