use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use scopeguard::ScopeGuard;

use crate::annotation::domain::frame_annotator::{FaceAnnotation, FrameAnnotator};
use crate::detection::domain::face_detector::FaceDetector;
use crate::emotion::domain::emotion_classifier::EmotionClassifier;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_backend::VideoBackend;
use crate::video::domain::video_reader::VideoReader;

use super::analysis_error::AnalysisError;
use super::emotion_tally::EmotionTally;
use super::face_analysis::{analyze_faces, FaceResult};
use super::pipeline_logger::PipelineLogger;
use super::video_summary::VideoSummary;

/// Single pass over a video: detect and classify faces per frame, draw
/// them, write every frame to the output, and summarise the emotions seen.
///
/// The use case is stateless between runs and can be shared by workers.
pub struct AnalyzeVideoUseCase {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn EmotionClassifier>,
    annotator: Arc<dyn FrameAnnotator>,
    backend: Arc<dyn VideoBackend>,
}

impl AnalyzeVideoUseCase {
    pub fn new(
        detector: Arc<dyn FaceDetector>,
        classifier: Arc<dyn EmotionClassifier>,
        annotator: Arc<dyn FrameAnnotator>,
        backend: Arc<dyn VideoBackend>,
    ) -> Self {
        Self {
            detector,
            classifier,
            annotator,
            backend,
        }
    }

    /// Analyses `input` and writes the annotated copy to `output`.
    ///
    /// On any error, including a video with no faces at all, `output` is
    /// removed before returning. The input file is never touched.
    pub fn execute(
        &self,
        input: &Path,
        output: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<VideoSummary, AnalysisError> {
        let mut reader = self.backend.reader();
        let metadata = reader
            .open(input)
            .map_err(|e| AnalysisError::CannotOpenVideo(e.to_string()))?;
        logger.info(&format!(
            "{}x{} @ {:.2} fps, {} frames",
            metadata.width, metadata.height, metadata.fps, metadata.total_frames
        ));

        let output_guard = scopeguard::guard(output.to_path_buf(), |path| {
            match std::fs::remove_file(&path) {
                Ok(()) => log::debug!("Removed partial output {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("Could not remove {}: {e}", path.display()),
            }
        });

        let result = self.run(reader.as_mut(), &metadata, output, logger);
        reader.close();
        logger.summary();

        let summary = result?;
        ScopeGuard::into_inner(output_guard);
        Ok(summary)
    }

    fn run(
        &self,
        reader: &mut dyn VideoReader,
        metadata: &VideoMetadata,
        output: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<VideoSummary, AnalysisError> {
        let mut writer = self.backend.writer();
        writer.open(output, metadata)?;

        let mut tally = EmotionTally::new();
        let mut frame_number: u64 = 0;
        for frame in reader.frames() {
            let mut frame = frame?;
            frame_number += 1;

            let t0 = Instant::now();
            let faces = analyze_faces(&frame, self.detector.as_ref(), self.classifier.as_ref())?;
            logger.timing("analyze", elapsed_ms(t0));
            logger.metric("faces", faces.len() as f64);
            tally.record_frame(frame_number, metadata.timestamp_at(frame_number), &faces);

            let t1 = Instant::now();
            self.annotator.annotate(&mut frame, &annotations(&faces));
            writer.write(&frame)?;
            logger.timing("write", elapsed_ms(t1));

            logger.progress(frame_number as usize, metadata.total_frames);
        }
        writer.close()?;

        let file_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        logger.info(&format!(
            "{} faces across {} frames",
            tally.total(),
            tally.timeline().len()
        ));
        tally.summarize(file_name)
    }
}

fn annotations(faces: &[FaceResult]) -> Vec<FaceAnnotation> {
    faces
        .iter()
        .map(|f| {
            let (emotion, score) = f.scores.top();
            FaceAnnotation {
                bbox: f.bbox,
                emotion,
                score,
            }
        })
        .collect()
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
