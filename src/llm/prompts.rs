use crate::models::CommitRecord;

pub const SYSTEM_PROMPT: &str = r#"You are an expert at evaluating Git commit message quality.
Rate each commit message on a scale of 1-10 based on:
- Clarity: Is the purpose of the change clear?
- Specificity: Does it provide specific details about what changed?
- Completeness: Does it explain the why behind the change?
- Format: Does it follow conventional commit format?

Format your response as a JSON object with an array of evaluations:
{
  "evaluations": [
    {"index": 1, "score": 8, "reason": "Clear and specific with conventional format"},
    {"index": 2, "score": 3, "reason": "Too vague, missing context and rationale"}
  ]
}"#;

const EMPTY_MESSAGE: &str = "No message";

#[derive(Debug, Clone)]
pub struct RatingRequest {
    pub messages: Vec<String>,
}

impl RatingRequest {
    pub fn from_batch(batch: &[CommitRecord]) -> Self {
        Self {
            messages: batch.iter().map(|c| c.commit_message.clone()).collect(),
        }
    }

    /// One `[i] <message>` line per commit, numbered from 1.
    pub fn to_prompt(&self) -> String {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, message)| {
                let message = if message.trim().is_empty() {
                    EMPTY_MESSAGE
                } else {
                    message.as_str()
                };
                format!("[{}] {}", i + 1, message)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
