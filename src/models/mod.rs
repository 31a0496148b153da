pub mod attempt;
pub mod catalog;
pub mod role;

pub use attempt::{AttemptState, AttemptStatus, Question, RemoteOption, RemoteQuestion};
pub use catalog::{
    Chapter, CreateTestResponse, QuestionQuery, StartAttemptResponse, Subject, TestType,
};
pub use role::Role;
