use std::collections::BTreeMap;

use crate::emotion::domain::emotion::Emotion;

use super::analysis_error::AnalysisError;
use super::face_analysis::FaceResult;
use super::video_summary::{TimelineEntry, VideoSummary};

/// Running per-job state: how often each label won, plus the timeline of
/// frames that had faces.
#[derive(Debug, Default)]
pub struct EmotionTally {
    counts: [u64; Emotion::COUNT],
    timeline: Vec<TimelineEntry>,
}

impl EmotionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the faces of one frame. `frame_number` is one-based and must
    /// increase between calls. Frames without faces leave no timeline entry.
    pub fn record_frame(&mut self, frame_number: u64, timestamp: f64, faces: &[FaceResult]) {
        if faces.is_empty() {
            return;
        }
        debug_assert!(
            self.timeline.last().map_or(true, |e| e.frame < frame_number),
            "frame numbers must increase"
        );

        let mut sums = [0.0f64; Emotion::COUNT];
        for face in faces {
            let (top, _) = face.scores.top();
            self.counts[top.index()] += 1;
            for (emotion, score) in face.scores.iter() {
                sums[emotion.index()] += score as f64;
            }
        }

        let n = faces.len() as f64;
        self.timeline.push(TimelineEntry {
            frame: frame_number,
            timestamp,
            emotions: Emotion::ALL
                .iter()
                .map(|e| (*e, sums[e.index()] / n))
                .collect(),
        });
    }

    /// Total faces counted so far.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn count(&self, emotion: Emotion) -> u64 {
        self.counts[emotion.index()]
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    /// Final distribution, or `NoFacesDetected` when nothing was counted.
    pub fn summarize(self, output_video: String) -> Result<VideoSummary, AnalysisError> {
        let total = self.total();
        if total == 0 {
            return Err(AnalysisError::NoFacesDetected);
        }
        let main_emotions: BTreeMap<Emotion, f64> = Emotion::ALL
            .iter()
            .filter(|e| self.counts[e.index()] > 0)
            .map(|e| (*e, self.counts[e.index()] as f64 / total as f64))
            .collect();

        Ok(VideoSummary {
            main_emotions,
            output_video,
            timeline: self.timeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::domain::emotion_scores::EmotionScores;
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;

    fn face(pairs: &[(Emotion, f32)]) -> FaceResult {
        FaceResult {
            bbox: BoundingBox::new(0, 0, 10, 10),
            scores: EmotionScores::from_pairs(pairs),
        }
    }

    #[test]
    fn test_single_face_single_frame() {
        let mut tally = EmotionTally::new();
        tally.record_frame(1, 1.0 / 30.0, &[face(&[(Emotion::Happy, 0.9), (Emotion::Neutral, 0.1)])]);

        let summary = tally.summarize("out.mp4".into()).unwrap();
        assert_eq!(summary.main_emotions.len(), 1);
        assert_relative_eq!(summary.main_emotions[&Emotion::Happy], 1.0);
        assert_eq!(summary.timeline.len(), 1);
        assert_eq!(summary.timeline[0].frame, 1);
        assert_relative_eq!(summary.timeline[0].timestamp, 1.0 / 30.0);
    }

    #[test]
    fn test_frame_average_over_faces() {
        let mut tally = EmotionTally::new();
        tally.record_frame(
            4,
            0.0,
            &[
                face(&[(Emotion::Happy, 0.8), (Emotion::Sad, 0.2)]),
                face(&[(Emotion::Happy, 0.2), (Emotion::Sad, 0.8)]),
            ],
        );
        let entry = &tally.timeline()[0];
        assert_eq!(entry.timestamp, 0.0);
        assert_relative_eq!(entry.emotions[&Emotion::Happy], 0.5, epsilon = 1e-6);
        assert_relative_eq!(entry.emotions[&Emotion::Sad], 0.5, epsilon = 1e-6);
        assert_eq!(entry.emotions[&Emotion::Fear], 0.0);
        assert_eq!(entry.emotions.len(), Emotion::COUNT);
        assert_eq!(tally.count(Emotion::Happy), 1);
        assert_eq!(tally.count(Emotion::Sad), 1);
    }

    #[test]
    fn test_frames_without_faces_are_skipped() {
        let mut tally = EmotionTally::new();
        tally.record_frame(1, 0.1, &[]);
        tally.record_frame(2, 0.2, &[face(&[(Emotion::Sad, 0.7)])]);
        tally.record_frame(3, 0.3, &[]);
        let frames: Vec<u64> = tally.timeline().iter().map(|e| e.frame).collect();
        assert_eq!(frames, vec![2]);
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let mut tally = EmotionTally::new();
        let labels = [Emotion::Happy, Emotion::Sad, Emotion::Sad, Emotion::Fear];
        for (i, label) in labels.iter().enumerate() {
            tally.record_frame(i as u64 + 1, i as f64 / 25.0, &[face(&[(*label, 0.6)])]);
        }
        assert_eq!(tally.total(), 4);
        let summary = tally.summarize("o.mp4".into()).unwrap();
        let sum: f64 = summary.main_emotions.values().sum();
        assert_relative_eq!(sum, 1.0);
        assert_relative_eq!(summary.main_emotions[&Emotion::Sad], 0.5);
        assert!(!summary.main_emotions.contains_key(&Emotion::Angry));
    }

    #[test]
    fn test_tie_counts_toward_first_label() {
        let mut tally = EmotionTally::new();
        tally.record_frame(1, 0.0, &[face(&[(Emotion::Surprise, 0.5), (Emotion::Disgust, 0.5)])]);
        assert_eq!(tally.count(Emotion::Disgust), 1);
        assert_eq!(tally.count(Emotion::Surprise), 0);
    }

    #[test]
    fn test_empty_tally_is_no_faces() {
        let tally = EmotionTally::new();
        assert!(matches!(
            tally.summarize("o.mp4".into()),
            Err(AnalysisError::NoFacesDetected)
        ));
    }
}
