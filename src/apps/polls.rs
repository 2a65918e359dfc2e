//! Polls application: questions, their choices and voting.

pub mod admin;
pub mod models;
pub mod urls;
pub mod views;

pub use models::{Choice, ChoiceManager, Question, QuestionManager};
