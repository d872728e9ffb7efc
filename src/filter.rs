//! Detection filtering: confidence threshold plus class allow-list.

use crate::config::PipelineConfig;
use crate::detect::Detection;

/// Returns true when a detection clears the confidence threshold and its
/// label is on the allow-list. Pure; order of evaluation does not matter.
pub fn accept(detection: &Detection, config: &PipelineConfig) -> bool {
    detection.confidence >= config.confidence_threshold
        && config.allowed_labels.contains(detection.label.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn detection(label: &str, confidence: f32) -> Detection {
        Detection::new(
            label,
            confidence,
            BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
        )
    }

    fn config() -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.confidence_threshold = 0.55;
        config.allowed_labels = ["person", "dog"].iter().map(|s| s.to_string()).collect();
        config
    }

    #[test]
    fn threshold_is_inclusive() {
        let config = config();
        assert!(accept(&detection("person", 0.55), &config));
        assert!(!accept(&detection("person", 0.549), &config));
    }

    #[test]
    fn labels_off_the_allow_list_are_rejected() {
        let config = config();
        assert!(!accept(&detection("kite", 0.99), &config));
    }

    #[test]
    fn accept_is_idempotent() {
        let config = config();
        let d = detection("dog", 0.8);
        assert_eq!(accept(&d, &config), accept(&d, &config));
    }
}
