//! Grading of a quiz run. Shared by the attempt endpoint and the client-side
//! run state machine so both always agree on a score.

use crate::models::question::QuestionWithOptions;

/// Outcome of grading one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade {
    pub correct_count: usize,
    pub total_questions: usize,
    /// `correct_count / total_questions * 100`; 0 for a quiz without questions.
    pub score: f64,
}

impl Grade {
    pub fn passed(&self, passing_score: i64) -> bool {
        self.score >= passing_score as f64
    }
}

/// Text of the option that counts as the right answer.
///
/// The first option flagged correct in display order wins. `None` when the
/// question has no options or none is flagged; such a question never matches.
pub fn correct_text(question: &QuestionWithOptions) -> Option<&str> {
    question
        .options
        .iter()
        .filter(|option| option.is_correct)
        .min_by_key(|option| (option.order, option.id))
        .map(|option| option.text.as_str())
}

/// Grades selections against questions.
///
/// `selections[i]` is the option text chosen for `questions[i]`; a missing
/// entry or `None` means unanswered and counts as incorrect.
pub fn grade<S: AsRef<str>>(questions: &[QuestionWithOptions], selections: &[Option<S>]) -> Grade {
    let correct_count = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| {
            let selected: Option<&str> = selections
                .get(*index)
                .and_then(Option::as_ref)
                .map(|s| s.as_ref());
            matches!((selected, correct_text(question)), (Some(chosen), Some(expected)) if chosen == expected)
        })
        .count();

    let total_questions = questions.len();
    let score = if total_questions == 0 {
        0.0
    } else {
        correct_count as f64 / total_questions as f64 * 100.0
    };

    Grade {
        correct_count,
        total_questions,
        score,
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::question;
    use super::*;

    #[test]
    fn one_of_two_correct_is_fifty_percent() {
        let questions = vec![
            question(1, &[("Paris", true), ("Rome", false)]),
            question(2, &[("4", true), ("5", false)]),
        ];

        let grade = grade(&questions, &[Some("Paris"), Some("5")]);

        assert_eq!(grade.correct_count, 1);
        assert_eq!(grade.total_questions, 2);
        assert_eq!(grade.score, 50.0);
        assert!(grade.passed(50));
        assert!(!grade.passed(51));
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let questions = vec![
            question(1, &[("A", true), ("B", false)]),
            question(2, &[("A", true), ("B", false)]),
            question(3, &[("A", true), ("B", false)]),
            question(4, &[("A", true), ("B", false)]),
        ];

        let grade = grade(&questions, &[Some("A"), None]);

        assert_eq!(grade.correct_count, 1);
        assert_eq!(grade.score, 25.0);
    }

    #[test]
    fn question_without_correct_option_never_matches() {
        let questions = vec![
            question(1, &[]),
            question(2, &[("A", false), ("B", false)]),
        ];

        let grade = grade(&questions, &[Some("A"), Some("A")]);

        assert_eq!(grade.correct_count, 0);
        assert_eq!(grade.score, 0.0);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let grade = grade::<&str>(&[], &[]);
        assert_eq!(grade.score, 0.0);
        assert_eq!(grade.total_questions, 0);
    }

    #[test]
    fn first_correct_option_in_display_order_wins() {
        let mut q = question(1, &[("B", true), ("A", true)]);
        q.options[0].order = 5;

        assert_eq!(correct_text(&q), Some("A"));
    }
}
