//! Tutorial workflow state machine.
//!
//! Four guided steps for preparing a custom model + texture pair:
//! 1. introduction, 2. model upload, 3. texture upload, 4. wrap-up.
//! Progress and step gating follow the upload state.

/// Tutorial step identifiers, 1-based.
pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 4;

/// Placeholder cube spin per frame, radians.
pub const PLACEHOLDER_SPIN_STEP: f32 = 0.01;

/// State of the guided tutorial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorialFlow {
    step: u8,
    model_uploaded: bool,
    texture_uploaded: bool,
}

impl Default for TutorialFlow {
    fn default() -> Self {
        Self {
            step: FIRST_STEP,
            model_uploaded: false,
            texture_uploaded: false,
        }
    }
}

impl TutorialFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> u8 {
        self.step
    }

    pub fn model_uploaded(&self) -> bool {
        self.model_uploaded
    }

    pub fn texture_uploaded(&self) -> bool {
        self.texture_uploaded
    }

    /// Completion percentage, 0-100.
    ///
    /// Base value is the step fraction `round((step - 1) / 3 * 100)`; a model
    /// upload lifts step 2 to 67 and a texture upload lifts step 3 to 100.
    pub fn progress(&self) -> u8 {
        if self.step == 2 && self.model_uploaded {
            return 67;
        }
        if self.step == 3 && self.texture_uploaded {
            return 100;
        }
        let fraction = (self.step - 1) as f32 / (LAST_STEP - 1) as f32;
        (fraction * 100.0).round() as u8
    }

    /// Whether the current step's requirement is satisfied.
    pub fn can_proceed(&self) -> bool {
        match self.step {
            2 => self.model_uploaded,
            3 => self.texture_uploaded,
            _ => true,
        }
    }

    /// Advance to the next step if allowed. Returns the step afterwards.
    pub fn next_step(&mut self) -> u8 {
        if self.step < LAST_STEP && self.can_proceed() {
            self.step += 1;
        }
        self.step
    }

    /// Go back one step. Upload state is kept.
    pub fn previous_step(&mut self) -> u8 {
        if self.step > FIRST_STEP {
            self.step -= 1;
        }
        self.step
    }

    pub fn record_model_upload(&mut self) {
        self.model_uploaded = true;
    }

    pub fn record_texture_upload(&mut self) {
        self.texture_uploaded = true;
    }

    /// Back to step 1 with upload state cleared.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    /// Whether the placeholder cube is still shown.
    pub fn shows_placeholder(&self) -> bool {
        !self.model_uploaded
    }

    pub fn step_title(&self) -> &'static str {
        match self.step {
            1 => "Welcome",
            2 => "Upload your model",
            3 => "Upload your texture",
            _ => "All set",
        }
    }
}

impl std::fmt::Display for TutorialFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Step {}/{} ({}%)",
            self.step,
            LAST_STEP,
            self.progress()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_table() {
        let mut flow = TutorialFlow::new();
        assert_eq!(flow.progress(), 0, "step 1");

        flow.next_step();
        assert_eq!(flow.step(), 2);
        assert_eq!(flow.progress(), 33, "step 2 without model");

        flow.record_model_upload();
        assert_eq!(flow.progress(), 67, "step 2 with model");

        flow.next_step();
        assert_eq!(flow.step(), 3);
        assert_eq!(flow.progress(), 67, "step 3 without texture");

        flow.record_texture_upload();
        assert_eq!(flow.progress(), 100, "step 3 with texture");

        flow.next_step();
        assert_eq!(flow.step(), 4);
        assert_eq!(flow.progress(), 100, "step 4 is always complete");
    }

    #[test]
    fn test_step_two_gates_on_model() {
        let mut flow = TutorialFlow::new();
        flow.next_step();
        assert_eq!(flow.step(), 2);
        assert!(!flow.can_proceed());
        assert_eq!(flow.next_step(), 2, "blocked without a model upload");

        flow.record_model_upload();
        assert!(flow.can_proceed());
        assert_eq!(flow.next_step(), 3);
    }

    #[test]
    fn test_step_three_gates_on_texture() {
        let mut flow = TutorialFlow::new();
        flow.next_step();
        flow.record_model_upload();
        flow.next_step();
        assert_eq!(flow.step(), 3);
        assert_eq!(flow.next_step(), 3, "blocked without a texture upload");

        flow.record_texture_upload();
        assert_eq!(flow.next_step(), 4);
        assert_eq!(flow.next_step(), 4, "no step past the last");
    }

    #[test]
    fn test_previous_step_keeps_uploads() {
        let mut flow = TutorialFlow::new();
        flow.next_step();
        flow.record_model_upload();
        flow.next_step();
        flow.previous_step();
        assert_eq!(flow.step(), 2);
        assert!(flow.model_uploaded());
        assert_eq!(flow.progress(), 67);
        flow.previous_step();
        assert_eq!(flow.step(), 1);
        assert_eq!(flow.previous_step(), 1, "no step before the first");
    }

    #[test]
    fn test_placeholder_until_model_upload() {
        let mut flow = TutorialFlow::new();
        assert!(flow.shows_placeholder());
        flow.record_model_upload();
        assert!(!flow.shows_placeholder());
    }

    #[test]
    fn test_restart_clears_everything() {
        let mut flow = TutorialFlow::new();
        flow.next_step();
        flow.record_model_upload();
        flow.restart();
        assert_eq!(flow.step(), 1);
        assert!(!flow.model_uploaded());
        assert_eq!(flow.progress(), 0);
    }
}
