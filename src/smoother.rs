// src/smoother.rs

use crate::types::{FrameState, StateTriple, WindowAlignment};
use std::collections::{HashMap, VecDeque};

/// Trailing majority-vote smoother over state triples.
///
/// Frames are fed in order; each call votes over the last `window_size`
/// triples seen, so the window shrinks naturally at the start of a clip.
pub struct StateSmoother {
    history: VecDeque<StateTriple>,
    window_size: usize,
}

impl StateSmoother {
    /// Create a new smoother with specified window size
    ///
    /// # Arguments
    /// * `window_size` - Number of frames voting on each output (at least 1)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            history: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Push the next observed triple and return the window's majority.
    pub fn smooth(&mut self, state: StateTriple) -> StateTriple {
        self.history.push_back(state);

        // Maintain window size
        if self.history.len() > self.window_size {
            self.history.pop_front();
        }

        majority_triple(self.history.iter().copied()).unwrap_or(state)
    }
}

/// Mode over whole triples. Ties go to the most conservative triple
/// (see [`StateTriple::caution_key`]), never to map iteration order.
pub fn majority_triple<I>(window: I) -> Option<StateTriple>
where
    I: IntoIterator<Item = StateTriple>,
{
    let mut counts: HashMap<StateTriple, usize> = HashMap::new();
    for state in window {
        *counts.entry(state).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by(|(a, count_a), (b, count_b)| {
            count_a
                .cmp(count_b)
                .then_with(|| a.caution_key().cmp(&b.caution_key()))
        })
        .map(|(state, _)| state)
}

/// Smooth a whole clip. Frame indices and explanations pass through
/// untouched; only the triple is voted on.
pub fn smooth(
    sequence: &[FrameState],
    window_size: usize,
    alignment: WindowAlignment,
) -> Vec<FrameState> {
    match alignment {
        WindowAlignment::Trailing => {
            let mut smoother = StateSmoother::new(window_size);
            sequence
                .iter()
                .map(|frame| FrameState {
                    state: smoother.smooth(frame.state),
                    ..frame.clone()
                })
                .collect()
        }
        WindowAlignment::Centered => {
            // w frames: w/2 before, (w-1)/2 after; even windows lean back
            let w = window_size.max(1);
            let (before, after) = (w / 2, (w - 1) / 2);
            let last = sequence.len().saturating_sub(1);
            (0..sequence.len())
                .map(|i| {
                    let start = i.saturating_sub(before);
                    let end = (i + after).min(last);
                    let window = sequence[start..=end].iter().map(|f| f.state);
                    FrameState {
                        state: majority_triple(window).unwrap_or(sequence[i].state),
                        ..sequence[i].clone()
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Affordance, LeadState, YieldTo};

    const GO: StateTriple = StateTriple::new(Affordance::Go, YieldTo::None, LeadState::None);
    const STOP: StateTriple = StateTriple::new(Affordance::Stop, YieldTo::None, LeadState::None);
    const QUEUE: StateTriple =
        StateTriple::new(Affordance::Wait, YieldTo::Lead, LeadState::Stopped);
    const WAIT_FREE: StateTriple =
        StateTriple::new(Affordance::Wait, YieldTo::None, LeadState::None);
    const WAIT_PED: StateTriple = StateTriple::new(Affordance::Wait, YieldTo::Ped, LeadState::None);

    fn clip(states: &[StateTriple]) -> Vec<FrameState> {
        states
            .iter()
            .enumerate()
            .map(|(i, s)| FrameState {
                frame_index: i as u64 * 2,
                state: *s,
                explanation: format!("frame {}", i),
            })
            .collect()
    }

    fn triples(frames: &[FrameState]) -> Vec<StateTriple> {
        frames.iter().map(|f| f.state).collect()
    }

    #[test]
    fn test_tie_between_stop_and_go_picks_stop() {
        assert_eq!(majority_triple([GO, STOP]), Some(STOP));
        assert_eq!(majority_triple([STOP, GO]), Some(STOP));
        assert_eq!(majority_triple([GO, STOP, GO, STOP]), Some(STOP));
    }

    #[test]
    fn test_tie_prefers_active_yield() {
        assert_eq!(majority_triple([WAIT_FREE, WAIT_PED]), Some(WAIT_PED));
        assert_eq!(majority_triple([WAIT_PED, QUEUE]), Some(WAIT_PED));
    }

    #[test]
    fn test_majority_beats_caution() {
        assert_eq!(majority_triple([GO, GO, STOP]), Some(GO));
    }

    #[test]
    fn test_empty_window_has_no_majority() {
        assert_eq!(majority_triple(std::iter::empty()), None);
    }

    #[test]
    fn test_mode_is_over_whole_triples() {
        // Per-field voting would synthesize (wait, none, stopped), which
        // never occurs in the window.
        let a = StateTriple::new(Affordance::Wait, YieldTo::None, LeadState::None);
        let b = StateTriple::new(Affordance::Wait, YieldTo::Lead, LeadState::Stopped);
        let c = StateTriple::new(Affordance::Go, YieldTo::None, LeadState::Stopped);
        let voted = majority_triple([a, b, c]).unwrap();
        assert!([a, b, c].contains(&voted));
    }

    #[test]
    fn test_trailing_window_shrinks_at_start() {
        let mut smoother = StateSmoother::new(3);
        assert_eq!(smoother.smooth(GO), GO);
        // [go, queue] tie -> conservative
        assert_eq!(smoother.smooth(QUEUE), QUEUE);
        assert_eq!(smoother.smooth(GO), GO);
        assert_eq!(smoother.smooth(QUEUE), QUEUE);
        // Oldest go has left the window: [go, queue, queue]
        assert_eq!(smoother.smooth(QUEUE), QUEUE);
    }

    #[test]
    fn test_isolated_noise_removed() {
        let input = clip(&[QUEUE, QUEUE, GO, QUEUE, QUEUE, QUEUE]);
        for alignment in [WindowAlignment::Trailing, WindowAlignment::Centered] {
            let out = smooth(&input, 3, alignment);
            assert_eq!(triples(&out), vec![QUEUE; 6], "alignment {:?}", alignment);
        }
    }

    #[test]
    fn test_no_isolated_deviation_after_short_noise() {
        // Noise burst of 2 frames, window 3
        let input = clip(&[QUEUE, QUEUE, QUEUE, GO, GO, QUEUE, QUEUE, QUEUE]);
        for alignment in [WindowAlignment::Trailing, WindowAlignment::Centered] {
            let out = triples(&smooth(&input, 3, alignment));
            for i in 1..out.len() - 1 {
                let isolated = out[i] != out[i - 1] && out[i] != out[i + 1];
                assert!(!isolated, "isolated frame {} with {:?}", i, alignment);
            }
        }
    }

    #[test]
    fn test_idempotent_on_clean_input_centered() {
        let input = clip(&[GO, GO, GO, QUEUE, QUEUE, QUEUE, STOP, STOP, STOP]);
        let once = smooth(&input, 3, WindowAlignment::Centered);
        let twice = smooth(&once, 3, WindowAlignment::Centered);
        assert_eq!(once, input);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_idempotent_on_clean_input_trailing() {
        // Escalation to a more conservative state wins the 1-1 tie at the
        // start of the clip, so this clip is already stable.
        let input = clip(&[GO, STOP, STOP, STOP, STOP]);
        let once = smooth(&input, 3, WindowAlignment::Trailing);
        let twice = smooth(&once, 3, WindowAlignment::Trailing);
        assert_eq!(once, input);
        assert_eq!(twice, once);
    }

    #[test]
    fn test_trailing_lags_transitions_by_one_frame() {
        let input = clip(&[GO, GO, GO, QUEUE, QUEUE, QUEUE]);
        let out = triples(&smooth(&input, 3, WindowAlignment::Trailing));
        assert_eq!(out, vec![GO, GO, GO, GO, QUEUE, QUEUE]);
    }

    #[test]
    fn test_passes_through_indices_and_explanations() {
        let input = clip(&[QUEUE, GO, QUEUE]);
        let out = smooth(&input, 3, WindowAlignment::Centered);
        assert_eq!(out.len(), 3);
        for (before, after) in input.iter().zip(&out) {
            assert_eq!(before.frame_index, after.frame_index);
            assert_eq!(before.explanation, after.explanation);
        }
        // Frame 1 was outvoted but kept its own explanation
        assert_eq!(out[1].state, QUEUE);
        assert_eq!(out[1].explanation, "frame 1");
    }

    #[test]
    fn test_centered_shrinks_at_both_ends() {
        // Frame 0 votes over [go, stop] and the last over [stop, go]
        let input = clip(&[GO, STOP, STOP, GO]);
        let out = triples(&smooth(&input, 3, WindowAlignment::Centered));
        assert_eq!(out, vec![STOP, STOP, STOP, STOP]);
    }

    #[test]
    fn test_window_of_one_is_identity() {
        let input = clip(&[GO, STOP, QUEUE, GO]);
        for alignment in [WindowAlignment::Trailing, WindowAlignment::Centered] {
            assert_eq!(smooth(&input, 1, alignment), input);
        }
    }

    #[test]
    fn test_empty_sequence() {
        assert!(smooth(&[], 3, WindowAlignment::Trailing).is_empty());
        assert!(smooth(&[], 3, WindowAlignment::Centered).is_empty());
    }

    #[test]
    fn test_centered_even_window_spans_window_size_frames() {
        // Window 2 covers the previous frame and the current one
        let input = clip(&[STOP, GO, GO]);
        let out = triples(&smooth(&input, 2, WindowAlignment::Centered));
        assert_eq!(out, vec![STOP, STOP, GO]);
    }

    #[test]
    fn test_centered_window_of_four() {
        // Frame 2 votes over frames 0..=3, never frame 4
        let input = clip(&[GO, GO, STOP, STOP, STOP]);
        let out = triples(&smooth(&input, 4, WindowAlignment::Centered));
        assert_eq!(out[2], STOP);
        // Frame 1 votes over frames 0..=2: two go, one stop
        assert_eq!(out[1], GO);
    }
}
