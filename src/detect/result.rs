/// Result of running detection on a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DetectionResult {
    /// Did we see someone / something of interest?
    pub presence_detected: bool,
    /// Confidence of the primary detection, 0..=1.
    pub confidence: f32,
}

impl DetectionResult {
    pub fn presence(confidence: f32) -> Self {
        Self {
            presence_detected: true,
            confidence,
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }
}
