use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use vymo_core::annotation::infrastructure::label_annotator::LabelAnnotator;
use vymo_core::detection::domain::face_detector::FaceDetector;
use vymo_core::detection::infrastructure::detector_factory::{create_detector, DetectorKind};
use vymo_core::emotion::domain::emotion_classifier::EmotionClassifier;
use vymo_core::emotion::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifier;
use vymo_core::pipeline::analyze_image_use_case::AnalyzeImageUseCase;
use vymo_core::pipeline::analyze_video_use_case::AnalyzeVideoUseCase;
use vymo_core::pipeline::pipeline_logger::LogPipelineLogger;
use vymo_core::shared::constants::{
    ANNOTATED_EXTENSION, ANNOTATED_PREFIX, DEFAULT_CONFIDENCE, EMOTION_MODEL_NAME,
};
use vymo_core::shared::model_resolver;
use vymo_core::video::infrastructure::ffmpeg_backend::FfmpegBackend;

/// Face emotion recognition for images and videos.
#[derive(Parser)]
#[command(name = "vymo")]
struct Cli {
    /// Input image or video file.
    input: PathBuf,

    /// Annotated video output (videos only; defaults to annotated_<name>.mp4
    /// next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Face detector backend: yolo or blazeface.
    #[arg(long, default_value_t = DetectorKind::Yolo)]
    detector: DetectorKind,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Directory searched for model files before the user cache.
    #[arg(long, env = "VYMO_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// TrueType font for the annotation captions.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Log progress every N frames.
    #[arg(long, default_value = "50")]
    log_every: usize,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let (detector, classifier) = build_models(&cli)?;

    let json = if is_image(&cli.input) {
        let bytes = std::fs::read(&cli.input)?;
        let results = AnalyzeImageUseCase::new(detector, classifier).execute(&bytes)?;
        log::info!("{} face(s) in {}", results.len(), cli.input.display());
        serde_json::to_string_pretty(&results)?
    } else {
        let output = cli
            .output
            .clone()
            .unwrap_or_else(|| default_output(&cli.input));
        let annotator = match &cli.font {
            Some(path) => LabelAnnotator::from_font_file(path)?,
            None => LabelAnnotator::with_system_font(),
        };
        let use_case = AnalyzeVideoUseCase::new(
            detector,
            classifier,
            Arc::new(annotator),
            Arc::new(FfmpegBackend),
        );
        let mut logger = LogPipelineLogger::new(file_label(&cli.input), cli.log_every);
        let summary = use_case.execute(&cli.input, &output, &mut logger)?;
        log::info!("Annotated video written to {}", output.display());
        serde_json::to_string_pretty(&summary)?
    };

    println!("{json}");
    Ok(())
}

type Models = (Arc<dyn FaceDetector>, Arc<dyn EmotionClassifier>);

fn build_models(cli: &Cli) -> Result<Models, Box<dyn std::error::Error>> {
    let model_dir = cli.model_dir.as_deref();
    let kind = cli.detector;

    log::info!("Resolving model: {}", kind.model_name());
    let detector_path = model_resolver::resolve(
        kind.model_name(),
        kind.model_url(),
        model_dir,
        Some(Box::new(download_progress)),
    )?;
    let detector = create_detector(kind, &detector_path, cli.confidence)?;

    log::info!("Resolving model: {EMOTION_MODEL_NAME}");
    let classifier_path = model_resolver::resolve(EMOTION_MODEL_NAME, None, model_dir, None)?;
    let classifier: Arc<dyn EmotionClassifier> =
        Arc::new(OnnxEmotionClassifier::new(&classifier_path)?);

    Ok((detector, classifier))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.is_file() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if let Some(output) = &cli.output {
        if is_image(&cli.input) {
            log::warn!("--output is ignored for image input");
        } else if same_file(&cli.input, output) {
            return Err(format!(
                "Output must differ from the input: {}",
                output.display()
            )
            .into());
        }
    }
    Ok(())
}

/// Compares canonical paths when the output already exists, so `./a.mp4`
/// and `a.mp4` count as the same file.
fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Anything the `image` crate recognises by extension is treated as a still.
fn is_image(path: &Path) -> bool {
    image::ImageFormat::from_path(path).is_ok()
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    input.with_file_name(format!("{ANNOTATED_PREFIX}{stem}.{ANNOTATED_EXTENSION}"))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
    if total > 0 && downloaded >= total {
        eprintln!();
    }
}
