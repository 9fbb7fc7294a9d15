//! Stub adapters shared by unit tests across modules.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::annotation::domain::frame_annotator::{FaceAnnotation, FrameAnnotator};
use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::emotion::domain::emotion::Emotion;
use crate::emotion::domain::emotion_classifier::{ClassifyError, EmotionClassifier};
use crate::emotion::domain::emotion_scores::EmotionScores;
use crate::emotion::domain::face_patch::FacePatch;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_backend::VideoBackend;
use crate::video::domain::video_error::VideoError;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

pub fn happy_scores() -> EmotionScores {
    EmotionScores::from_pairs(&[(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)])
}

pub fn sad_scores() -> EmotionScores {
    EmotionScores::from_pairs(&[(Emotion::Sad, 0.8), (Emotion::Fear, 0.2)])
}

pub fn rgb_frame(width: u32, height: u32, index: usize) -> Frame {
    Frame::new(vec![100; (width * height * 3) as usize], width, height, 3, index)
}

/// Returns boxes keyed by frame index, or the same boxes for every frame.
pub struct FixedDetector {
    per_frame: HashMap<usize, Vec<BoundingBox>>,
    default: Vec<BoundingBox>,
}

impl FixedDetector {
    pub fn every_frame(boxes: Vec<BoundingBox>) -> Self {
        Self {
            per_frame: HashMap::new(),
            default: boxes,
        }
    }

    /// Only the listed frame indices (zero-based) have faces.
    pub fn on_frames(frames: impl IntoIterator<Item = usize>, bbox: BoundingBox) -> Self {
        Self {
            per_frame: frames.into_iter().map(|i| (i, vec![bbox])).collect(),
            default: Vec::new(),
        }
    }
}

impl FaceDetector for FixedDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectionError> {
        Ok(self
            .per_frame
            .get(&frame.index())
            .unwrap_or(&self.default)
            .clone())
    }
}

pub struct FailingDetector;

impl FaceDetector for FailingDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<BoundingBox>, DetectionError> {
        Err(DetectionError::Inference("stub failure".into()))
    }
}

/// Returns the same scores for every patch and counts invocations.
pub struct ConstClassifier {
    scores: EmotionScores,
    calls: AtomicUsize,
}

impl ConstClassifier {
    pub fn new(scores: EmotionScores) -> Self {
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmotionClassifier for ConstClassifier {
    fn classify(&self, _patch: &FacePatch) -> Result<EmotionScores, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.scores)
    }
}

/// Records what it was asked to draw.
#[derive(Default)]
pub struct RecordingAnnotator {
    pub calls: Mutex<Vec<(usize, Vec<FaceAnnotation>)>>,
}

impl FrameAnnotator for RecordingAnnotator {
    fn annotate(&self, frame: &mut Frame, faces: &[FaceAnnotation]) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((frame.index(), faces.to_vec()));
        }
    }
}

/// Shared view of what a [`StubBackend`] writer received.
#[derive(Default)]
pub struct WriterLog {
    pub frames: Vec<usize>,
    pub opened: Option<PathBuf>,
    pub closed: bool,
}

/// In-memory video backend. The reader yields clones of `frames`; the
/// writer creates an empty file at the output path so cleanup is
/// observable, then records frame indices.
pub struct StubBackend {
    frames: Vec<Frame>,
    fps: f64,
    fail_open: bool,
    fail_write_at: Option<usize>,
    pub log: Arc<Mutex<WriterLog>>,
}

impl StubBackend {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            fail_open: false,
            fail_write_at: None,
            log: Arc::new(Mutex::new(WriterLog::default())),
        }
    }

    /// `count` frames of 64x64 RGB.
    pub fn with_frames(count: usize, fps: f64) -> Self {
        Self::new((0..count).map(|i| rgb_frame(64, 64, i)).collect(), fps)
    }

    pub fn unopenable() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new(), 30.0)
        }
    }

    pub fn failing_write_at(mut self, index: usize) -> Self {
        self.fail_write_at = Some(index);
        self
    }
}

impl VideoBackend for StubBackend {
    fn reader(&self) -> Box<dyn VideoReader> {
        Box::new(StubReader {
            frames: self.frames.clone(),
            fps: self.fps,
            fail_open: self.fail_open,
        })
    }

    fn writer(&self) -> Box<dyn VideoWriter> {
        Box::new(StubWriter {
            log: Arc::clone(&self.log),
            fail_write_at: self.fail_write_at,
        })
    }
}

struct StubReader {
    frames: Vec<Frame>,
    fps: f64,
    fail_open: bool,
}

impl VideoReader for StubReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, VideoError> {
        if self.fail_open {
            return Err(VideoError::Open {
                path: path.display().to_string(),
                reason: "stub refuses to open".into(),
            });
        }
        let (width, height) = self
            .frames
            .first()
            .map_or((64, 64), |f| (f.width(), f.height()));
        Ok(VideoMetadata {
            width,
            height,
            fps: self.fps,
            total_frames: self.frames.len(),
            codec: "stub".into(),
            source_path: Some(path.to_path_buf()),
        })
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, VideoError>> + '_> {
        Box::new(self.frames.drain(..).map(Ok))
    }

    fn close(&mut self) {}
}

struct StubWriter {
    log: Arc<Mutex<WriterLog>>,
    fail_write_at: Option<usize>,
}

impl VideoWriter for StubWriter {
    fn open(&mut self, path: &Path, _metadata: &VideoMetadata) -> Result<(), VideoError> {
        std::fs::write(path, b"").map_err(|e| VideoError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        self.log.lock().unwrap().opened = Some(path.to_path_buf());
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), VideoError> {
        if self.fail_write_at == Some(frame.index()) {
            return Err(VideoError::Encode("stub write failure".into()));
        }
        self.log.lock().unwrap().frames.push(frame.index());
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}
