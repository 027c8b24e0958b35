//! Animation mixer seam
//!
//! A mixer owns one action per animation clip of a model. Actions are
//! addressed by their position, which matches the clip order of the model.

/// Playback state of one model's animation clips
pub trait AnimationMixer {
    /// Advance every action by `delta` seconds
    fn update(&mut self, delta: f32);
    fn action_count(&self) -> usize;
    fn play(&mut self, action: usize);
    fn is_running(&self, action: usize) -> bool;
    fn is_paused(&self, action: usize) -> bool;
    fn set_paused(&mut self, action: usize, paused: bool);

    /// Start every action (auto-play on bind)
    fn play_all(&mut self) {
        for action in 0..self.action_count() {
            self.play(action);
        }
    }

    /// Un-pause every action, restarting any that has stopped running
    fn resume_all(&mut self) {
        for action in 0..self.action_count() {
            self.set_paused(action, false);
            if !self.is_running(action) {
                self.play(action);
            }
        }
    }

    fn pause_all(&mut self) {
        for action in 0..self.action_count() {
            self.set_paused(action, true);
        }
    }

    /// Flip the paused flag of every action at once
    fn toggle_all(&mut self) {
        for action in 0..self.action_count() {
            let paused = self.is_paused(action);
            self.set_paused(action, !paused);
        }
    }

    fn paused_states(&self) -> Vec<bool> {
        (0..self.action_count()).map(|a| self.is_paused(a)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeMixer;

    #[test]
    fn test_play_all_starts_every_action() {
        let mut mixer = FakeMixer::new(3);
        mixer.play_all();
        assert!((0..3).all(|a| mixer.is_running(a)));
        assert_eq!(mixer.paused_states(), vec![false, false, false]);
    }

    #[test]
    fn test_pause_and_resume_are_idempotent() {
        let mut mixer = FakeMixer::new(2);
        mixer.play_all();

        mixer.pause_all();
        mixer.pause_all();
        assert_eq!(mixer.paused_states(), vec![true, true]);

        mixer.resume_all();
        mixer.resume_all();
        assert_eq!(mixer.paused_states(), vec![false, false]);
        assert!((0..2).all(|a| mixer.is_running(a)));
    }

    #[test]
    fn test_resume_restarts_stopped_actions() {
        let mut mixer = FakeMixer::new(2);
        assert!(!mixer.is_running(0));
        mixer.resume_all();
        assert!(mixer.is_running(0));
        assert!(mixer.is_running(1));
    }

    #[test]
    fn test_toggle_flips_every_action() {
        let mut mixer = FakeMixer::new(3);
        mixer.play_all();
        mixer.toggle_all();
        assert_eq!(mixer.paused_states(), vec![true, true, true]);
        mixer.toggle_all();
        assert_eq!(mixer.paused_states(), vec![false, false, false]);
    }

    #[test]
    fn test_empty_mixer_is_noop() {
        let mut mixer = FakeMixer::new(0);
        mixer.play_all();
        mixer.toggle_all();
        mixer.resume_all();
        assert!(mixer.paused_states().is_empty());
    }
}
