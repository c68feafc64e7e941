use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured body the model is asked to return for a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationResponse {
    #[serde(default, deserialize_with = "evaluation_list")]
    pub evaluations: Vec<Evaluation>,
}

/// Score for one commit, addressed by its 1-based position in the batch.
/// Fields are read leniently: numbers may arrive as floats or numeric strings,
/// and anything unusable is left as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(default, deserialize_with = "lenient_index")]
    pub index: Option<i64>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: Option<String>,
}

/// Entries that are not objects are skipped so one bad entry cannot sink the batch.
fn evaluation_list<'de, D>(deserializer: D) -> Result<Vec<Evaluation>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(evaluation) => Some(evaluation),
            Err(e) => {
                tracing::debug!("Skipping unreadable evaluation: {}", e);
                None
            }
        })
        .collect())
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Positions must be whole numbers; `2.5` is as unusable as a missing index.
fn lenient_index<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_number(&value)
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64))
}

fn lenient_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_number(&value).map(|n| n.round() as i64))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

impl Evaluation {
    /// Zero-based batch slot, if the index falls inside `[1, batch_len]`.
    pub fn slot(&self, batch_len: usize) -> Option<usize> {
        let index = self.index?;
        if index >= 1 && (index as u64) <= batch_len as u64 {
            Some(index as usize - 1)
        } else {
            None
        }
    }

    /// Score clamped to the 0-10 scale.
    pub fn clamped_score(&self) -> u8 {
        self.score.unwrap_or(0).clamp(0, 10) as u8
    }
}
