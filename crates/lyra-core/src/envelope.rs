//! Query response envelope.
//!
//! Wire shape (kept stable for presentation clients):
//! `{ "message": string, "success": bool, "data"?: object, "suggestions"?: [string] }`.
//! Agents build a [`QueryOutcome`]; only the bus boundary turns it into an [`AgentResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized envelope returned to callers of the query contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub message: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl AgentResponse {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            success: false,
            data: None,
            suggestions: None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What an agent produced for a query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The agent handled the query.
    Answer {
        message: String,
        data: Option<Value>,
        suggestions: Vec<String>,
    },
    /// The agent understood the query but could not fulfil it.
    Declined {
        message: String,
        data: Option<Value>,
    },
}

impl QueryOutcome {
    pub fn answer(message: impl Into<String>) -> Self {
        QueryOutcome::Answer {
            message: message.into(),
            data: None,
            suggestions: Vec::new(),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        QueryOutcome::Declined {
            message: message.into(),
            data: None,
        }
    }

    /// Attach a data payload. Replaces any existing payload.
    pub fn with_data(mut self, value: Value) -> Self {
        match &mut self {
            QueryOutcome::Answer { data, .. } | QueryOutcome::Declined { data, .. } => {
                *data = Some(value)
            }
        }
        self
    }

    /// Attach follow-up suggestions. Ignored for declined outcomes.
    pub fn with_suggestions<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let QueryOutcome::Answer { suggestions, .. } = &mut self {
            suggestions.extend(items.into_iter().map(Into::into));
        }
        self
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Answer { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            QueryOutcome::Answer { message, .. } | QueryOutcome::Declined { message, .. } => message,
        }
    }
}

impl From<QueryOutcome> for AgentResponse {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Answer {
                message,
                data,
                suggestions,
            } => AgentResponse {
                message,
                success: true,
                data,
                suggestions: (!suggestions.is_empty()).then_some(suggestions),
            },
            QueryOutcome::Declined { message, data } => AgentResponse {
                message,
                success: false,
                data,
                suggestions: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_fields_are_omitted_on_the_wire() {
        let response: AgentResponse = QueryOutcome::answer("hello").into();
        let wire = serde_json::to_value(&response).unwrap();
        assert_eq!(wire, json!({ "message": "hello", "success": true }));
    }

    #[test]
    fn answer_with_payload_and_suggestions() {
        let response: AgentResponse = QueryOutcome::answer("report")
            .with_data(json!({ "score": 90 }))
            .with_suggestions(["Run scan"])
            .into();
        assert!(response.success);
        assert_eq!(response.data, Some(json!({ "score": 90 })));
        assert_eq!(response.suggestions, Some(vec!["Run scan".to_string()]));
    }

    #[test]
    fn declined_maps_to_failure() {
        let outcome = QueryOutcome::declined("no workers").with_suggestions(["retry"]);
        assert!(!outcome.is_success());
        let response = AgentResponse::from(outcome);
        assert!(!response.success);
        assert_eq!(response.message, "no workers");
        assert!(response.suggestions.is_none());
    }
}
