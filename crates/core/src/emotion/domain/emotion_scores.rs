use super::emotion::Emotion;

/// Classifier output for one face: a score in `[0, 1]` for every label.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmotionScores {
    scores: [f32; Emotion::COUNT],
}

impl EmotionScores {
    /// Scores in canonical label order. Non-finite values become 0 and
    /// everything is clamped to `[0, 1]`.
    pub fn new(raw: [f32; Emotion::COUNT]) -> Self {
        let scores = raw.map(|s| if s.is_finite() { s.clamp(0.0, 1.0) } else { 0.0 });
        Self { scores }
    }

    /// Builds scores from a partial list; missing labels score 0.
    pub fn from_pairs(pairs: &[(Emotion, f32)]) -> Self {
        let mut raw = [0.0; Emotion::COUNT];
        for &(emotion, score) in pairs {
            raw[emotion.index()] = score;
        }
        Self::new(raw)
    }

    pub fn get(&self, emotion: Emotion) -> f32 {
        self.scores[emotion.index()]
    }

    /// All labels with their score, in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f32)> + '_ {
        Emotion::ALL.into_iter().zip(self.scores.iter().copied())
    }

    /// Highest-scoring label. Ties go to the label that comes first in
    /// canonical order.
    pub fn top(&self) -> (Emotion, f32) {
        let mut best = (Emotion::ALL[0], self.scores[0]);
        for (emotion, score) in self.iter().skip(1) {
            if score > best.1 {
                best = (emotion, score);
            }
        }
        best
    }

    /// All labels sorted by descending score. Equal scores keep canonical order.
    pub fn ranked(&self) -> Vec<(Emotion, f32)> {
        let mut ranked: Vec<_> = self.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}
