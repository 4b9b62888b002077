//! crates/soul_map_core/src/quiz.rs
//!
//! The quiz state machine: sequential questions, a per-archetype tally and
//! a single winner once the last question has been answered.
//!
//! The presentation delay between questions belongs to the caller. The engine
//! only records that a transition is pending (`submit_*`) and when it ends
//! (`finish_transition`).

use crate::catalog;
use crate::domain::{ArchetypeId, Question};

/// Errors raised by misuse of the quiz engine.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("Question {question} has no option {option}")]
    UnknownOption { question: usize, option: usize },
    #[error("A quiz needs at least one question")]
    NoQuestions,
    #[error("No quiz is in progress")]
    NotInQuiz,
}

//=========================================================================================
// Score Tally
//=========================================================================================

/// Answer counts per archetype, stored in enumeration order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreTally {
    counts: [u32; ArchetypeId::ALL.len()],
}

impl ScoreTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, archetype: ArchetypeId) {
        self.counts[archetype.index()] += 1;
    }

    pub fn count(&self, archetype: ArchetypeId) -> u32 {
        self.counts[archetype.index()]
    }

    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    /// The archetype with the highest count; ties go to the earliest in
    /// enumeration order.
    pub fn winner(&self) -> ArchetypeId {
        let mut best = ArchetypeId::ALL[0];
        for candidate in ArchetypeId::ALL.into_iter().skip(1) {
            if self.count(candidate) > self.count(best) {
                best = candidate;
            }
        }
        best
    }
}

//=========================================================================================
// Quiz Engine
//=========================================================================================

/// Where the engine is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizState {
    /// Waiting for an answer to question `i`.
    Answering(usize),
    /// Question `i` was answered; waiting for the presentation delay to end.
    Transitioning(usize),
    Completed(ArchetypeId),
}

/// Result of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { question_index: usize },
    /// A transition was already pending, or the quiz is over.
    Ignored,
}

/// Result of ending a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    Next(usize),
    Completed(ArchetypeId),
    /// There was no pending transition.
    Idle,
}

/// A single quiz run. Build a fresh engine for every new run.
#[derive(Debug, Clone)]
pub struct QuizEngine {
    questions: &'static [Question],
    state: QuizState,
    tally: ScoreTally,
}

impl Default for QuizEngine {
    fn default() -> Self {
        Self {
            questions: catalog::questions(),
            state: QuizState::Answering(0),
            tally: ScoreTally::new(),
        }
    }
}

impl QuizEngine {
    /// Starts a run over the built-in question catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a run over a custom question set.
    pub fn with_questions(questions: &'static [Question]) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }
        Ok(Self {
            questions,
            state: QuizState::Answering(0),
            tally: ScoreTally::new(),
        })
    }

    pub fn state(&self) -> QuizState {
        self.state
    }

    pub fn tally(&self) -> &ScoreTally {
        &self.tally
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, QuizState::Transitioning(_))
    }

    /// The question currently on screen, if the quiz is not over.
    pub fn current_question(&self) -> Option<(usize, &'static Question)> {
        match self.state {
            QuizState::Answering(i) | QuizState::Transitioning(i) => Some((i, &self.questions[i])),
            QuizState::Completed(_) => None,
        }
    }

    /// Records an answer for the current question.
    pub fn submit_answer(&mut self, archetype: ArchetypeId) -> SubmitOutcome {
        match self.state {
            QuizState::Answering(i) => {
                self.tally.increment(archetype);
                self.state = QuizState::Transitioning(i);
                SubmitOutcome::Accepted { question_index: i }
            }
            QuizState::Transitioning(_) | QuizState::Completed(_) => SubmitOutcome::Ignored,
        }
    }

    /// Records the option at `option_index` of the current question.
    pub fn submit_option(&mut self, option_index: usize) -> Result<SubmitOutcome, QuizError> {
        let QuizState::Answering(i) = self.state else {
            return Ok(SubmitOutcome::Ignored);
        };
        let option = self.questions[i]
            .options
            .get(option_index)
            .ok_or(QuizError::UnknownOption {
                question: i,
                option: option_index,
            })?;
        Ok(self.submit_answer(option.archetype))
    }

    /// Ends the pending transition: either moves to the next question or
    /// settles the winner after the last one.
    pub fn finish_transition(&mut self) -> QuizStep {
        let QuizState::Transitioning(i) = self.state else {
            return QuizStep::Idle;
        };
        if i + 1 < self.questions.len() {
            self.state = QuizState::Answering(i + 1);
            QuizStep::Next(i + 1)
        } else {
            let winner = self.tally.winner();
            self.state = QuizState::Completed(winner);
            QuizStep::Completed(winner)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QuizOption;

    static SINGLE: [Question; 1] = [Question {
        id: 1,
        prompt: "only",
        options: &[
            QuizOption { text: "a", archetype: ArchetypeId::Healer },
            QuizOption { text: "b", archetype: ArchetypeId::Adventurer },
        ],
    }];

    fn answer_all(engine: &mut QuizEngine, answers: &[ArchetypeId]) -> Vec<QuizStep> {
        answers
            .iter()
            .map(|a| {
                assert!(matches!(engine.submit_answer(*a), SubmitOutcome::Accepted { .. }));
                engine.finish_transition()
            })
            .collect()
    }

    #[test]
    fn completes_exactly_once_after_all_questions() {
        let mut engine = QuizEngine::new();
        let n = engine.question_count();
        let steps = answer_all(&mut engine, &vec![ArchetypeId::Scavenger; n]);

        let completions = steps.iter().filter(|s| matches!(s, QuizStep::Completed(_))).count();
        assert_eq!(completions, 1);
        assert_eq!(steps.last(), Some(&QuizStep::Completed(ArchetypeId::Scavenger)));
        for (i, step) in steps[..n - 1].iter().enumerate() {
            assert_eq!(*step, QuizStep::Next(i + 1));
        }

        assert_eq!(engine.submit_answer(ArchetypeId::Healer), SubmitOutcome::Ignored);
        assert_eq!(engine.finish_transition(), QuizStep::Idle);
        assert_eq!(engine.tally().total(), n as u32);
    }

    #[test]
    fn does_not_complete_before_last_question() {
        let mut engine = QuizEngine::new();
        let n = engine.question_count();
        let steps = answer_all(&mut engine, &vec![ArchetypeId::Healer; n - 1]);
        assert!(steps.iter().all(|s| matches!(s, QuizStep::Next(_))));
        assert_eq!(engine.state(), QuizState::Answering(n - 1));
    }

    #[test]
    fn duplicate_submission_while_transitioning_counts_once() {
        let mut engine = QuizEngine::new();
        assert_eq!(
            engine.submit_answer(ArchetypeId::Adventurer),
            SubmitOutcome::Accepted { question_index: 0 }
        );
        assert_eq!(engine.submit_answer(ArchetypeId::Adventurer), SubmitOutcome::Ignored);
        assert_eq!(engine.submit_option(2), Ok(SubmitOutcome::Ignored));
        assert_eq!(engine.tally().count(ArchetypeId::Adventurer), 1);
        assert_eq!(engine.tally().total(), 1);
    }

    #[test]
    fn tie_goes_to_first_in_enumeration_order() {
        let mut tally = ScoreTally::new();
        tally.increment(ArchetypeId::Adventurer);
        tally.increment(ArchetypeId::Adventurer);
        tally.increment(ArchetypeId::Healer);
        tally.increment(ArchetypeId::Healer);
        assert_eq!(tally.winner(), ArchetypeId::Healer);

        let mut later_tie = ScoreTally::new();
        later_tie.increment(ArchetypeId::Scavenger);
        later_tie.increment(ArchetypeId::Adventurer);
        assert_eq!(later_tie.winner(), ArchetypeId::Adventurer);

        assert_eq!(ScoreTally::new().winner(), ArchetypeId::Healer);
    }

    #[test]
    fn strict_maximum_wins() {
        let mut engine = QuizEngine::new();
        use ArchetypeId::*;
        let steps = answer_all(&mut engine, &[Healer, Scavenger, Scavenger, Adventurer, Healer]);
        assert_eq!(steps.last(), Some(&QuizStep::Completed(Healer)));

        let mut engine = QuizEngine::new();
        let steps = answer_all(&mut engine, &[Healer, Scavenger, Scavenger, Adventurer, Scavenger]);
        assert_eq!(steps.last(), Some(&QuizStep::Completed(Scavenger)));
    }

    #[test]
    fn options_resolve_to_their_archetype() {
        let mut engine = QuizEngine::with_questions(&SINGLE).unwrap();
        assert_eq!(
            engine.submit_option(5),
            Err(QuizError::UnknownOption { question: 0, option: 5 })
        );
        assert_eq!(engine.state(), QuizState::Answering(0));

        assert_eq!(
            engine.submit_option(1),
            Ok(SubmitOutcome::Accepted { question_index: 0 })
        );
        assert_eq!(engine.finish_transition(), QuizStep::Completed(ArchetypeId::Adventurer));
        assert_eq!(engine.current_question(), None);
    }

    #[test]
    fn finishing_without_a_pending_transition_is_idle() {
        let mut engine = QuizEngine::new();
        assert_eq!(engine.finish_transition(), QuizStep::Idle);
        assert_eq!(engine.state(), QuizState::Answering(0));
    }

    #[test]
    fn empty_question_set_is_rejected() {
        static NONE: [Question; 0] = [];
        assert_eq!(QuizEngine::with_questions(&NONE).unwrap_err(), QuizError::NoQuestions);
    }
}
