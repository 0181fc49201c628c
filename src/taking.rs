//! Client-side quiz run: `Loading -> InProgress -> (Completed | TimeExpired) -> ResultsShown`.
//!
//! The run is a plain state machine driven by the caller: `load` with the fetched
//! quiz, user input via `select` / `next` / `previous`, and one `tick` per elapsed
//! wall-clock second. Finishing the last question and the countdown hitting zero
//! both go through the same grading step.

use std::collections::HashMap;
use std::fmt;

use crate::{
    models::{attempt::SubmitAttemptRequest, question::QuestionWithOptions, quiz::QuizDetail},
    scoring::{self, Grade},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    InProgress,
    Completed,
    TimeExpired,
    ResultsShown,
    /// The quiz could not be loaded; carries the message to display.
    Failed(String),
}

/// Why fetching the quiz failed.
#[derive(Debug, Clone)]
pub enum LoadError {
    Unauthenticated,
    Forbidden(String),
    NotFound,
    Network(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Unauthenticated => write!(f, "Please log in to access this quiz."),
            LoadError::Forbidden(message) => write!(f, "{message}"),
            LoadError::NotFound => write!(f, "Quiz not found."),
            LoadError::Network(_) => write!(f, "Failed to load quiz. Please try again later."),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// The operation needs a different phase.
    WrongPhase(Phase),
    /// The selected text is not one of the current question's options.
    UnknownOption(String),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::WrongPhase(phase) => write!(f, "operation not allowed while {phase:?}"),
            RunError::UnknownOption(text) => write!(f, "'{text}' is not an option of this question"),
        }
    }
}

impl std::error::Error for RunError {}

#[derive(Debug, Clone)]
pub struct QuizRun {
    quiz_id: i64,
    phase: Phase,
    quiz: Option<QuizDetail>,
    current: usize,
    /// One slot per question; `None` is unanswered.
    answers: Vec<Option<String>>,
    time_left: u32,
    elapsed: u32,
    grade: Option<Grade>,
}

impl QuizRun {
    pub fn new(quiz_id: i64) -> Self {
        Self {
            quiz_id,
            phase: Phase::Loading,
            quiz: None,
            current: 0,
            answers: Vec::new(),
            time_left: 0,
            elapsed: 0,
            grade: None,
        }
    }

    pub fn quiz_id(&self) -> i64 {
        self.quiz_id
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuestionWithOptions> {
        self.questions().get(self.current)
    }

    /// Selection recorded for the question on screen.
    pub fn selected(&self) -> Option<&str> {
        self.answers.get(self.current).and_then(|a| a.as_deref())
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn grade(&self) -> Option<Grade> {
        self.grade
    }

    fn questions(&self) -> &[QuestionWithOptions] {
        self.quiz.as_ref().map_or(&[], |q| q.questions.as_slice())
    }

    fn require(&self, phase: Phase) -> Result<(), RunError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(RunError::WrongPhase(self.phase.clone()))
        }
    }

    /// Feeds the fetch result. Ignored unless the run is loading.
    pub fn load(&mut self, fetched: Result<QuizDetail, LoadError>) {
        if self.phase != Phase::Loading {
            return;
        }
        match fetched {
            Ok(quiz) => {
                self.time_left = quiz.quiz.time_limit_seconds();
                self.answers = vec![None; quiz.questions.len()];
                self.current = 0;
                self.elapsed = 0;
                self.quiz = Some(quiz);
                self.phase = Phase::InProgress;
            }
            Err(e) => {
                tracing::warn!(quiz_id = self.quiz_id, error = ?e, "Quiz run failed to load");
                self.phase = Phase::Failed(e.to_string());
            }
        }
    }

    /// Records `text` as the answer to the question on screen.
    pub fn select(&mut self, text: &str) -> Result<(), RunError> {
        self.require(Phase::InProgress)?;
        let known = self
            .current_question()
            .is_some_and(|q| q.options.iter().any(|o| o.text == text));
        if !known {
            return Err(RunError::UnknownOption(text.to_string()));
        }
        if let Some(slot) = self.answers.get_mut(self.current) {
            *slot = Some(text.to_string());
        }
        Ok(())
    }

    /// Moves forward; past the last question this submits.
    pub fn next(&mut self) -> Result<(), RunError> {
        self.require(Phase::InProgress)?;
        if self.current + 1 < self.answers.len() {
            self.current += 1;
        } else {
            self.finish(Phase::Completed);
        }
        Ok(())
    }

    /// Moves back one question. The answer there is cleared and must be given again.
    pub fn previous(&mut self) -> Result<(), RunError> {
        self.require(Phase::InProgress)?;
        if self.current > 0 {
            self.current -= 1;
            if let Some(slot) = self.answers.get_mut(self.current) {
                *slot = None;
            }
        }
        Ok(())
    }

    /// One second of wall-clock time. At zero the run is submitted as expired.
    /// No effect outside `InProgress`, so a timer outliving the run is harmless.
    pub fn tick(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        self.elapsed += 1;
        self.time_left = self.time_left.saturating_sub(1);
        if self.time_left == 0 {
            self.finish(Phase::TimeExpired);
        }
    }

    /// Finishes early with the answers recorded so far.
    pub fn submit(&mut self) -> Result<Grade, RunError> {
        self.require(Phase::InProgress)?;
        Ok(self.finish(Phase::Completed))
    }

    fn finish(&mut self, outcome: Phase) -> Grade {
        let grade = scoring::grade(self.questions(), &self.answers);
        tracing::debug!(
            quiz_id = self.quiz_id,
            score = grade.score,
            outcome = ?outcome,
            "Quiz run finished"
        );
        self.grade = Some(grade);
        self.phase = outcome;
        grade
    }

    pub fn show_results(&mut self) -> Result<Grade, RunError> {
        match (&self.phase, self.grade) {
            (Phase::Completed | Phase::TimeExpired, Some(grade)) => {
                self.phase = Phase::ResultsShown;
                Ok(grade)
            }
            _ => Err(RunError::WrongPhase(self.phase.clone())),
        }
    }

    /// Starts over on the same quiz; the caller fetches it again.
    pub fn restart(&mut self) -> Result<(), RunError> {
        match self.phase {
            Phase::ResultsShown | Phase::Failed(_) => {
                *self = QuizRun::new(self.quiz_id);
                Ok(())
            }
            _ => Err(RunError::WrongPhase(self.phase.clone())),
        }
    }

    /// Payload for `POST /quizzes/{id}/attempts` once the run has finished.
    pub fn attempt_request(&self) -> Option<SubmitAttemptRequest> {
        self.grade?;
        let answers: HashMap<i64, String> = self
            .questions()
            .iter()
            .zip(&self.answers)
            .filter_map(|(q, a)| a.clone().map(|text| (q.question.id, text)))
            .collect();
        Some(SubmitAttemptRequest {
            answers,
            time_taken: Some(i64::from(self.elapsed)),
        })
    }
}
