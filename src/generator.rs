use rand::Rng;

use crate::alerts::{AlertCategory, AlertDraft};

pub const WARNING_SAMPLE: &str = "Heatwave alert detected in Kitui region";
pub const SUCCESS_SAMPLE: &str = "NDVI levels improving in Meru";

/// Draws at or above this value produce a warning.
const WARNING_DRAW_THRESHOLD: f64 = 0.5;

/// Synthesises the live-feed alerts. Scheduling belongs to the session; the
/// generator only decides what each tick produces.
#[derive(Debug, Clone)]
pub struct AlertGenerator {
    /// Tick period in milliseconds.
    pub period_ms: u64,
    ticks: u64,
}

impl AlertGenerator {
    pub fn new(period_ms: u64) -> Self {
        AlertGenerator { period_ms, ticks: 0 }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One tick with a uniform draw from `rng`.
    pub fn on_tick(&mut self, rng: &mut impl Rng) -> AlertDraft {
        let draw: f64 = rng.random();
        self.on_tick_with_draw(draw)
    }

    /// One tick with a caller-supplied draw in [0, 1).
    pub fn on_tick_with_draw(&mut self, draw: f64) -> AlertDraft {
        self.ticks += 1;
        sample_alert(draw)
    }
}

pub fn sample_alert(draw: f64) -> AlertDraft {
    if draw >= WARNING_DRAW_THRESHOLD {
        AlertDraft::new(AlertCategory::Warning, WARNING_SAMPLE)
    } else {
        AlertDraft::new(AlertCategory::Success, SUCCESS_SAMPLE)
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    use super::*;

    #[test]
    fn high_draw_yields_warning() {
        let draft = sample_alert(0.9);
        assert_eq!(draft.category, Some(AlertCategory::Warning));
        assert_eq!(draft.message, WARNING_SAMPLE);
    }

    #[test]
    fn low_draw_yields_success() {
        let draft = sample_alert(0.1);
        assert_eq!(draft.category, Some(AlertCategory::Success));
        assert_eq!(draft.message, SUCCESS_SAMPLE);
    }

    #[test]
    fn half_is_a_warning() {
        assert_eq!(sample_alert(0.5).category, Some(AlertCategory::Warning));
    }

    #[test]
    fn drafts_leave_optional_fields_for_the_store() {
        let draft = sample_alert(0.7);
        assert!(draft.region.is_none());
        assert!(draft.severity.is_none());
    }

    #[test]
    fn tick_counter_advances() {
        let mut generator = AlertGenerator::new(15_000);
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        generator.on_tick(&mut rng);
        generator.on_tick_with_draw(0.2);
        assert_eq!(generator.ticks(), 2);
    }

    #[test]
    fn both_categories_appear_over_many_ticks() {
        let mut generator = AlertGenerator::new(15_000);
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        let drafts: Vec<AlertDraft> = (0..200).map(|_| generator.on_tick(&mut rng)).collect();
        let warnings =
            drafts.iter().filter(|d| d.category == Some(AlertCategory::Warning)).count();
        assert!(warnings > 60 && warnings < 140, "warnings = {warnings}");
    }
}
