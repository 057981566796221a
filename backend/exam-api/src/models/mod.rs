use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod attempt;
pub mod question;
pub mod session;
pub mod user;

pub use attempt::{
    AnswerRecord, AttemptHistoryEntry, AttemptKind, AttemptStatus, DailyStartResponse, DailyTest,
    StartTestRequest, SubmitResponse, TestAnswerAck, TestAnswerRequest, TestAttempt,
    TestStartResponse,
};
pub use question::{
    BankStats, Deck, DeckDetailResponse, DeckSummary, DeckView, ImportSummary, Question,
    QuestionPublic,
};
pub use session::{
    FlashcardAnswerLog, FlashcardAnswerRequest, FlashcardAnswerResult, MasterySession,
    NextFlashcardResponse, StartSessionResponse,
};
pub use user::{
    GroupTally, LoginRequest, RegisterRequest, TokenResponse, User, UserProfile, UserStatsDoc,
    UserStatsResponse, ROLE_ADMIN, ROLE_USER,
};

/// One of the four answer choices carried by every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerOption::A => "A",
            AnswerOption::B => "B",
            AnswerOption::C => "C",
            AnswerOption::D => "D",
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerOption {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "A" | "a" => Ok(AnswerOption::A),
            "B" | "b" => Ok(AnswerOption::B),
            "C" | "c" => Ok(AnswerOption::C),
            "D" | "d" => Ok(AnswerOption::D),
            other => Err(format!("invalid answer option '{}'", other)),
        }
    }
}
