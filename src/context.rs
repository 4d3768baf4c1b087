//! Conversation context and the aggregator stage pair.
//!
//! One [`ConversationContext`] exists per client connection and is never shared across
//! connections. The aggregator pair splits context recording across the pipeline the
//! way the turn cycle flows: the user stage sits before the model session and records
//! what the user said; the assistant stage sits after transport output and records what
//! the bot actually spoke.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::frames::Frame;
use crate::pipeline::Stage;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// An ordered sequence of conversation turns, owned for the lifetime of one connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationContext {
    turns: Vec<Turn>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context seeded with a single user directive.
    ///
    /// Both bots seed their context this way so that the first `Run` frame makes the
    /// model open with a greeting instead of waiting silently for input.
    pub fn seeded(directive: impl Into<String>) -> Self {
        let mut ctx = Self::new();
        ctx.push(Role::User, directive);
        ctx
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(Turn {
            role,
            content: content.into(),
        });
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Builder for the user/assistant aggregator stage pair.
pub struct ContextAggregator;

impl ContextAggregator {
    /// Split a context into its two pipeline stages.
    ///
    /// The returned stages share ownership of the context; the handle they expose is
    /// mainly useful for inspecting the conversation after a run.
    pub fn pair(context: ConversationContext) -> (UserAggregator, AssistantAggregator) {
        let shared = Arc::new(Mutex::new(context));
        (
            UserAggregator {
                context: Arc::clone(&shared),
            },
            AssistantAggregator {
                context: shared,
                pending: String::new(),
            },
        )
    }
}

/// Records user turns as frames flow toward the model session.
pub struct UserAggregator {
    context: Arc<Mutex<ConversationContext>>,
}

impl UserAggregator {
    pub fn context(&self) -> Arc<Mutex<ConversationContext>> {
        Arc::clone(&self.context)
    }
}

#[async_trait]
impl Stage for UserAggregator {
    fn name(&self) -> &'static str {
        "user-aggregator"
    }

    async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>> {
        if let Frame::InputText(text) = &frame {
            self.context.lock().await.push(Role::User, text.clone());
        }
        Ok(vec![frame])
    }
}

/// Records assistant turns after they have been delivered to the transport.
///
/// Response text can arrive in several `OutputText` pieces; we accumulate until the
/// piece marked `done` and record the whole utterance as one turn.
pub struct AssistantAggregator {
    context: Arc<Mutex<ConversationContext>>,
    pending: String,
}

impl AssistantAggregator {
    pub fn context(&self) -> Arc<Mutex<ConversationContext>> {
        Arc::clone(&self.context)
    }
}

#[async_trait]
impl Stage for AssistantAggregator {
    fn name(&self) -> &'static str {
        "assistant-aggregator"
    }

    async fn process(&mut self, frame: Frame) -> Result<Vec<Frame>> {
        if let Frame::OutputText { text, done } = &frame {
            self.pending.push_str(text);
            if *done {
                let utterance = std::mem::take(&mut self.pending);
                self.context.lock().await.push(Role::Assistant, utterance);
            }
        }
        Ok(vec![frame])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_context_starts_with_the_directive() {
        let ctx = ConversationContext::seeded("greet the user");
        assert_eq!(ctx.len(), 1);
        assert_eq!(ctx.turns()[0].role, Role::User);
        assert_eq!(ctx.turns()[0].content, "greet the user");
    }

    #[tokio::test]
    async fn user_stage_records_input_text() -> anyhow::Result<()> {
        let (mut user, _assistant) = ContextAggregator::pair(ConversationContext::new());
        let out = user
            .process(Frame::InputText("hello there".into()))
            .await?;

        // Frames pass through unchanged.
        assert_eq!(out, vec![Frame::InputText("hello there".into())]);

        let ctx = user.context();
        let ctx = ctx.lock().await;
        assert_eq!(ctx.turns(), &[Turn {
            role: Role::User,
            content: "hello there".into(),
        }]);
        Ok(())
    }

    #[tokio::test]
    async fn assistant_stage_accumulates_until_done() -> anyhow::Result<()> {
        let (_user, mut assistant) = ContextAggregator::pair(ConversationContext::new());

        assistant
            .process(Frame::OutputText {
                text: "First, for safety, ".into(),
                done: false,
            })
            .await?;
        {
            let ctx = assistant.context();
            assert!(ctx.lock().await.is_empty());
        }

        assistant
            .process(Frame::OutputText {
                text: "unplug the appliance.".into(),
                done: true,
            })
            .await?;

        let ctx = assistant.context();
        let ctx = ctx.lock().await;
        assert_eq!(ctx.turns(), &[Turn {
            role: Role::Assistant,
            content: "First, for safety, unplug the appliance.".into(),
        }]);
        Ok(())
    }

    #[tokio::test]
    async fn aggregators_ignore_unrelated_frames() -> anyhow::Result<()> {
        let (mut user, mut assistant) = ContextAggregator::pair(ConversationContext::new());
        user.process(Frame::Run).await?;
        assistant.process(Frame::Run).await?;
        let ctx = user.context();
        assert!(ctx.lock().await.is_empty());
        Ok(())
    }
}
