use crate::error::{EngineError, EngineResult};

/// Result of applying one answer to a mastery queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTransition {
    pub pending: Vec<String>,
    pub retired: Vec<String>,
    pub completed: bool,
}

/// Applies a single answer to the pending queue.
///
/// Only the queue head may be answered; anything else is a sequence error and
/// leaves the caller's state untouched. A correct answer retires the head
/// permanently; a wrong answer rotates it to the tail so it comes back after
/// every other pending question has been served once more. Each pass over the
/// queue therefore either shrinks it or keeps its size while rotating, so the
/// session terminates exactly when every question has been answered correctly
/// at least once.
pub fn apply_answer(
    pending: &[String],
    retired: &[String],
    question_id: &str,
    is_correct: bool,
) -> EngineResult<QueueTransition> {
    let head = pending.first().ok_or_else(|| {
        EngineError::InvalidState("session is already completed".to_string())
    })?;

    if head != question_id {
        return Err(EngineError::Sequence(format!(
            "question {} is not the current head of the queue",
            question_id
        )));
    }

    let mut pending: Vec<String> = pending.to_vec();
    let mut retired: Vec<String> = retired.to_vec();
    let answered = pending.remove(0);

    if is_correct {
        retired.push(answered);
    } else {
        pending.push(answered);
    }

    let completed = pending.is_empty();
    Ok(QueueTransition {
        pending,
        retired,
        completed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn correct_answer_retires_head() {
        let t = apply_answer(&queue(&["q1", "q2", "q3"]), &[], "q1", true).unwrap();
        assert_eq!(t.pending, queue(&["q2", "q3"]));
        assert_eq!(t.retired, queue(&["q1"]));
        assert!(!t.completed);
    }

    #[test]
    fn wrong_answer_rotates_head_to_tail() {
        let t = apply_answer(&queue(&["q1", "q2", "q3"]), &[], "q1", false).unwrap();
        assert_eq!(t.pending, queue(&["q2", "q3", "q1"]));
        assert!(t.retired.is_empty());
        assert!(!t.completed);
    }

    #[test]
    fn answering_non_head_is_a_sequence_error() {
        let err = apply_answer(&queue(&["q1", "q2"]), &[], "q2", true).unwrap_err();
        assert_eq!(err.kind(), "sequence");
    }

    #[test]
    fn repeated_wrong_answers_never_retire_a_question() {
        let mut pending = queue(&["q1", "q2"]);
        let mut retired: Vec<String> = Vec::new();
        for _ in 0..10 {
            let head = pending[0].clone();
            let t = apply_answer(&pending, &retired, &head, false).unwrap();
            pending = t.pending;
            retired = t.retired;
            assert_eq!(pending.len(), 2);
            assert!(retired.is_empty());
            assert!(!t.completed);
        }
        assert!(pending.contains(&"q1".to_string()));
        assert!(pending.contains(&"q2".to_string()));
    }

    #[test]
    fn completes_only_after_every_question_answered_correctly() {
        let mut pending = queue(&["q1", "q2", "q3"]);
        let mut retired: Vec<String> = Vec::new();
        // Miss each question once before getting it right.
        let mut completed = false;
        let mut correct_next = false;
        while !completed {
            let head = pending[0].clone();
            let t = apply_answer(&pending, &retired, &head, correct_next).unwrap();
            correct_next = !correct_next;
            pending = t.pending;
            retired = t.retired;
            completed = t.completed;
        }
        assert_eq!(retired.len(), 3);
        assert!(pending.is_empty());
    }

    #[test]
    fn answering_a_completed_session_is_invalid_state() {
        let err = apply_answer(&[], &queue(&["q1"]), "q1", true).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
    }
}
