use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::models::AnswerOption;

/// Marking scheme applied at submit time. Defaults follow the exam rules:
/// +1.0 per correct answer, 0.25 deducted per wrong answer, unanswered
/// questions contribute nothing.
#[derive(Debug, Clone)]
pub struct MarkScheme {
    pub marks_per_correct: f64,
    pub negative_mark_per_wrong: f64,
    pub clamp_at_zero: bool,
}

impl Default for MarkScheme {
    fn default() -> Self {
        Self {
            marks_per_correct: 1.0,
            negative_mark_per_wrong: 0.25,
            clamp_at_zero: false,
        }
    }
}

/// The subset of a question the scorer needs.
#[derive(Debug, Clone)]
pub struct QuestionKey {
    pub id: String,
    pub chapter: String,
    pub category: String,
    pub correct_option: AnswerOption,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupScore {
    pub name: String,
    pub total: u32,
    pub correct: u32,
    pub wrong: u32,
    pub unanswered: u32,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_questions: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub unanswered_count: u32,
    pub raw_score: f64,
    pub negative_marks: f64,
    pub final_score: f64,
    pub by_chapter: Vec<GroupScore>,
    pub by_category: Vec<GroupScore>,
}

pub fn is_correct(selected: AnswerOption, correct: AnswerOption) -> bool {
    selected == correct
}

/// Scores one attempt. Deterministic and side-effect-free: the same
/// questions, answers and scheme always produce the same breakdown.
/// Questions with no entry in `answers` count as unanswered.
pub fn score_attempt(
    questions: &[QuestionKey],
    answers: &HashMap<String, AnswerOption>,
    scheme: &MarkScheme,
) -> ScoreBreakdown {
    #[derive(Default)]
    struct Tally {
        total: u32,
        correct: u32,
        wrong: u32,
        unanswered: u32,
    }

    let mut correct_count = 0u32;
    let mut wrong_count = 0u32;
    let mut unanswered_count = 0u32;
    let mut chapters: BTreeMap<String, Tally> = BTreeMap::new();
    let mut categories: BTreeMap<String, Tally> = BTreeMap::new();

    for question in questions {
        let chapter = chapters.entry(question.chapter.clone()).or_default();
        let category = categories.entry(question.category.clone()).or_default();
        chapter.total += 1;
        category.total += 1;

        match answers.get(&question.id) {
            Some(&selected) if is_correct(selected, question.correct_option) => {
                correct_count += 1;
                chapter.correct += 1;
                category.correct += 1;
            }
            Some(_) => {
                wrong_count += 1;
                chapter.wrong += 1;
                category.wrong += 1;
            }
            None => {
                unanswered_count += 1;
                chapter.unanswered += 1;
                category.unanswered += 1;
            }
        }
    }

    let group_scores = |tallies: BTreeMap<String, Tally>| -> Vec<GroupScore> {
        tallies
            .into_iter()
            .map(|(name, tally)| {
                let score = f64::from(tally.correct) * scheme.marks_per_correct
                    - f64::from(tally.wrong) * scheme.negative_mark_per_wrong;
                GroupScore {
                    name,
                    total: tally.total,
                    correct: tally.correct,
                    wrong: tally.wrong,
                    unanswered: tally.unanswered,
                    score: round2(score),
                }
            })
            .collect()
    };

    let raw_score = f64::from(correct_count) * scheme.marks_per_correct;
    let negative_marks = f64::from(wrong_count) * scheme.negative_mark_per_wrong;
    let mut final_score = raw_score - negative_marks;
    if scheme.clamp_at_zero && final_score < 0.0 {
        final_score = 0.0;
    }

    ScoreBreakdown {
        total_questions: questions.len() as u32,
        correct_count,
        wrong_count,
        unanswered_count,
        raw_score: round2(raw_score),
        negative_marks: round2(negative_marks),
        final_score: round2(final_score),
        by_chapter: group_scores(chapters),
        by_category: group_scores(categories),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, chapter: &str, category: &str, correct: AnswerOption) -> QuestionKey {
        QuestionKey {
            id: id.to_string(),
            chapter: chapter.to_string(),
            category: category.to_string(),
            correct_option: correct,
        }
    }

    fn ten_questions() -> Vec<QuestionKey> {
        (0..10)
            .map(|i| {
                question(
                    &format!("q{}", i),
                    if i < 6 { "Pharmacology" } else { "Drug Laws" },
                    if i % 2 == 0 { "technical" } else { "case_law" },
                    AnswerOption::A,
                )
            })
            .collect()
    }

    #[test]
    fn six_correct_two_wrong_two_unanswered_scores_five_and_a_half() {
        let questions = ten_questions();
        let mut answers = HashMap::new();
        for q in questions.iter().take(6) {
            answers.insert(q.id.clone(), AnswerOption::A);
        }
        answers.insert("q6".to_string(), AnswerOption::B);
        answers.insert("q7".to_string(), AnswerOption::C);

        let breakdown = score_attempt(&questions, &answers, &MarkScheme::default());
        assert_eq!(breakdown.correct_count, 6);
        assert_eq!(breakdown.wrong_count, 2);
        assert_eq!(breakdown.unanswered_count, 2);
        assert_eq!(breakdown.raw_score, 6.0);
        assert_eq!(breakdown.negative_marks, 0.5);
        assert_eq!(breakdown.final_score, 5.5);
    }

    #[test]
    fn unanswered_contribute_zero() {
        let questions = ten_questions();
        let breakdown = score_attempt(&questions, &HashMap::new(), &MarkScheme::default());
        assert_eq!(breakdown.unanswered_count, 10);
        assert_eq!(breakdown.final_score, 0.0);
    }

    #[test]
    fn score_can_go_negative_unless_clamped() {
        let questions = ten_questions();
        let mut answers = HashMap::new();
        for q in &questions {
            answers.insert(q.id.clone(), AnswerOption::B); // all wrong
        }

        let breakdown = score_attempt(&questions, &answers, &MarkScheme::default());
        assert_eq!(breakdown.final_score, -2.5);

        let clamped = MarkScheme {
            clamp_at_zero: true,
            ..MarkScheme::default()
        };
        let breakdown = score_attempt(&questions, &answers, &clamped);
        assert_eq!(breakdown.final_score, 0.0);
        assert_eq!(breakdown.negative_marks, 2.5);
    }

    #[test]
    fn breakdown_groups_by_chapter_and_category() {
        let questions = ten_questions();
        let mut answers = HashMap::new();
        for q in questions.iter().take(6) {
            answers.insert(q.id.clone(), AnswerOption::A);
        }

        let breakdown = score_attempt(&questions, &answers, &MarkScheme::default());
        assert_eq!(breakdown.by_chapter.len(), 2);
        let pharma = breakdown
            .by_chapter
            .iter()
            .find(|g| g.name == "Pharmacology")
            .unwrap();
        assert_eq!(pharma.total, 6);
        assert_eq!(pharma.correct, 6);
        assert_eq!(pharma.score, 6.0);
        let laws = breakdown
            .by_chapter
            .iter()
            .find(|g| g.name == "Drug Laws")
            .unwrap();
        assert_eq!(laws.total, 4);
        assert_eq!(laws.unanswered, 4);
        assert_eq!(laws.score, 0.0);
        assert_eq!(breakdown.by_category.len(), 2);
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = ten_questions();
        let mut answers = HashMap::new();
        answers.insert("q0".to_string(), AnswerOption::A);
        answers.insert("q1".to_string(), AnswerOption::D);
        let a = score_attempt(&questions, &answers, &MarkScheme::default());
        let b = score_attempt(&questions, &answers, &MarkScheme::default());
        assert_eq!(a, b);
    }
}
