//! Support assistant: canned answers for common questions, plus the alerts other agents
//! route here (auth anomalies, user behaviour).

use std::collections::VecDeque;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use lyra_core::{Agent, AgentError, AgentResult, IntelligenceMessage, QueryOutcome};

pub const AGENT_NAME: &str = "help";

const ALERT_CAPACITY: usize = 50;
const ESCALATION_CAPACITY: usize = 50;

/// User recorded on escalations raised through a plain query.
const ANONYMOUS_USER: &str = "anonymous";

static ARTICLE_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\barticles?\b(?:\s+(?:about|on|for))?\s*(.*)").expect("valid regex"));
static ESCALATION_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(escalat\w*|human|real person)\b").expect("valid regex"));

const FAQ: &[(&str, &str)] = &[
    (
        "how to create account",
        "To create an account, click on the 'Sign Up' button in the upper right corner and follow the instructions.",
    ),
    (
        "reset password",
        "To reset your password, go to the login page and click on 'Forgot Password'. Follow the instructions sent to your email.",
    ),
    (
        "contact support",
        "You can contact our support team through the Help menu or by replying to any support email.",
    ),
];

/// Canned answer for the first FAQ entry contained in `query`.
pub fn faq_answer(query: &str) -> Option<&'static str> {
    let q = query.to_lowercase();
    FAQ.iter().find(|(question, _)| q.contains(question)).map(|(_, answer)| *answer)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpArticle {
    pub topic: String,
    pub title: String,
    /// FAQ answers whose question mentions a word of the topic.
    pub sections: Vec<&'static str>,
}

/// An issue handed to human support staff.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Escalation {
    pub id: String,
    pub user_id: String,
    pub issue: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct HelpAgent {
    alerts: RwLock<VecDeque<IntelligenceMessage>>,
    escalations: RwLock<VecDeque<Escalation>>,
}

impl HelpAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alerts received from other agents, newest first.
    pub fn alerts(&self, limit: usize) -> Vec<IntelligenceMessage> {
        let alerts = self.alerts.read().unwrap_or_else(|e| e.into_inner());
        alerts.iter().rev().take(limit).cloned().collect()
    }

    pub fn help_article(&self, topic: &str) -> HelpArticle {
        let topic = topic.trim().to_lowercase();
        let words: Vec<&str> = topic.split_whitespace().filter(|w| w.len() > 2).collect();
        let sections = FAQ
            .iter()
            .filter(|(question, _)| words.iter().any(|w| question.contains(w)))
            .map(|(_, answer)| *answer)
            .collect();
        HelpArticle {
            title: format!("Help article about {}", topic),
            topic,
            sections,
        }
    }

    /// Hand an issue to human support staff. Only the most recent escalations are kept.
    pub fn escalate(&self, user_id: &str, issue: &str) -> Escalation {
        let escalation = Escalation {
            id: format!("esc-{}", uuid::Uuid::new_v4().simple()),
            user_id: user_id.to_string(),
            issue: issue.trim().to_string(),
            created_at: Utc::now(),
        };
        let mut escalations = self.escalations.write().unwrap_or_else(|e| e.into_inner());
        escalations.push_back(escalation.clone());
        if escalations.len() > ESCALATION_CAPACITY {
            escalations.pop_front();
        }
        info!(target: "lyra::agents", agent = AGENT_NAME, user_id, id = %escalation.id, "escalated to human support");
        escalation
    }

    /// Escalations, newest first.
    pub fn escalations(&self, limit: usize) -> Vec<Escalation> {
        let escalations = self.escalations.read().unwrap_or_else(|e| e.into_inner());
        escalations.iter().rev().take(limit).cloned().collect()
    }
}

#[async_trait]
impl Agent for HelpAgent {
    fn name(&self) -> &str {
        AGENT_NAME
    }

    fn description(&self) -> &str {
        "Support Assistant: helps users navigate the platform and answers questions"
    }

    async fn process_query(&self, query: &str) -> AgentResult<QueryOutcome> {
        let q = query.to_lowercase();

        if ESCALATION_REQUEST.is_match(&q) {
            let escalation = self.escalate(ANONYMOUS_USER, query);
            return Ok(QueryOutcome::answer(format!(
                "I've passed this to our support staff (ticket {}). Someone will follow up shortly.",
                escalation.id
            ))
            .with_data(json!(escalation)));
        }

        if let Some(topic) = ARTICLE_REQUEST.captures(&q).and_then(|c| c.get(1)) {
            let topic = topic.as_str().trim_matches(|c: char| c.is_whitespace() || c == '?' || c == '.');
            if topic.is_empty() {
                return Err(AgentError::InvalidQuery("which topic should the article cover?".to_string()));
            }
            let article = self.help_article(topic);
            let message = if article.sections.is_empty() {
                format!("{}: no published sections yet.", article.title)
            } else {
                format!("{} ({} sections).", article.title, article.sections.len())
            };
            return Ok(QueryOutcome::answer(message).with_data(json!(article)));
        }

        if let Some(answer) = faq_answer(query) {
            return Ok(QueryOutcome::answer(answer)
                .with_suggestions(["Tell me more about user settings", "How do I upgrade my account?"]));
        }

        Ok(QueryOutcome::answer(
            "I'm here to help with any questions you have about the platform. What specifically do you need assistance with?",
        )
        .with_suggestions([
            "How do I navigate the virtual world?",
            "How to customize my avatar?",
            "How to join communities?",
        ]))
    }

    fn receive_intelligence(&self, message: &IntelligenceMessage) {
        let mut alerts = self.alerts.write().unwrap_or_else(|e| e.into_inner());
        alerts.push_back(message.clone());
        if alerts.len() > ALERT_CAPACITY {
            alerts.pop_front();
        }
        debug!(target: "lyra::agents", agent = AGENT_NAME, kind = %message.kind, "alert stored");
    }
}
