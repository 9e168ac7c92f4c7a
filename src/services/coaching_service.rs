use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{
    ChatMessage, MessageSender, NewChatMessage, NutritionPlan, TrainingPlan, UserProfile,
};
use crate::services::{ForwardRequest, LlmClient, LlmMessage, WhatsAppClient};
use crate::store::Repository;

pub const SYSTEM_PROMPT: &str = "You are a friendly, motivating personal fitness coach talking \
to your athlete on WhatsApp. Keep answers short (at most a few sentences), practical and safe. \
Always answer in the same language the athlete writes in. Never give medical diagnoses; suggest \
seeing a professional when pain or injury is mentioned.";

#[derive(Error, Debug)]
pub enum CoachingError {
    #[error("Storage error: {0}")]
    Storage(anyhow::Error),
    #[error("Language model error: {0}")]
    Llm(anyhow::Error),
}

#[derive(Debug)]
pub enum CoachingOutcome {
    /// Inbound message stored, no AI reply generated
    Skipped {
        inbound: ChatMessage,
        reason: &'static str,
    },
    Replied {
        inbound: ChatMessage,
        reply: ChatMessage,
        delivered: bool,
    },
}

/// Stores inbound WhatsApp messages and answers them with the language model
#[derive(Clone)]
pub struct CoachingService {
    repo: Arc<dyn Repository>,
    llm: LlmClient,
    whatsapp: Option<WhatsAppClient>,
    history_limit: i64,
}

impl CoachingService {
    pub fn new(
        repo: Arc<dyn Repository>,
        llm: LlmClient,
        whatsapp: Option<WhatsAppClient>,
        history_limit: i64,
    ) -> Self {
        Self {
            repo,
            llm,
            whatsapp,
            history_limit,
        }
    }

    pub async fn handle_inbound(
        &self,
        request: &ForwardRequest,
    ) -> Result<CoachingOutcome, CoachingError> {
        let profile = self
            .repo
            .find_profile_by_phone(&request.phone)
            .await
            .map_err(CoachingError::Storage)?;

        let inbound = self
            .repo
            .insert_message(NewChatMessage {
                phone: request.phone.clone(),
                user_id: profile.as_ref().map(|p| p.user_id),
                sender: MessageSender::User,
                content: request.message.clone(),
                instance: request.instancia.clone(),
            })
            .await
            .map_err(CoachingError::Storage)?;

        if request.is_group {
            return Ok(CoachingOutcome::Skipped {
                inbound,
                reason: "group_message",
            });
        }

        if self
            .repo
            .is_ai_paused(&request.phone)
            .await
            .map_err(CoachingError::Storage)?
        {
            info!(phone = %request.phone, "AI paused by operator, skipping reply");
            return Ok(CoachingOutcome::Skipped {
                inbound,
                reason: "ai_paused",
            });
        }

        let (training_plan, nutrition_plan) = match &profile {
            Some(profile) => (
                self.repo
                    .get_training_plan(profile.user_id)
                    .await
                    .map_err(CoachingError::Storage)?,
                self.repo
                    .get_nutrition_plan(profile.user_id)
                    .await
                    .map_err(CoachingError::Storage)?,
            ),
            None => (None, None),
        };

        let history = self
            .repo
            .recent_messages(&request.phone, self.history_limit)
            .await
            .map_err(CoachingError::Storage)?;

        let prompt = build_prompt(
            profile.as_ref(),
            training_plan.as_ref(),
            nutrition_plan.as_ref(),
            &history,
        );

        let reply_text = self
            .llm
            .complete(&prompt)
            .await
            .map_err(CoachingError::Llm)?;

        let reply = self
            .repo
            .insert_message(NewChatMessage {
                phone: request.phone.clone(),
                user_id: inbound.user_id,
                sender: MessageSender::Ai,
                content: reply_text,
                instance: request.instancia.clone(),
            })
            .await
            .map_err(CoachingError::Storage)?;

        let delivered = self
            .deliver(request.instancia.as_deref(), &request.phone, &reply.content)
            .await;

        Ok(CoachingOutcome::Replied {
            inbound,
            reply,
            delivered,
        })
    }

    /// Best-effort WhatsApp delivery; the stored reply stays authoritative
    pub async fn deliver(&self, instance: Option<&str>, phone: &str, text: &str) -> bool {
        let Some(whatsapp) = &self.whatsapp else {
            return false;
        };

        match whatsapp.send_text(instance, phone, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(phone = %phone, "WhatsApp delivery failed: {:#}", e);
                false
            }
        }
    }
}

/// Assemble the chat-completion messages: persona, athlete context, history.
///
/// `history` is expected oldest first and already contains the message being
/// answered.
pub fn build_prompt(
    profile: Option<&UserProfile>,
    training_plan: Option<&TrainingPlan>,
    nutrition_plan: Option<&NutritionPlan>,
    history: &[ChatMessage],
) -> Vec<LlmMessage> {
    let mut context = vec![];

    match profile {
        Some(profile) => context.push(format!("Athlete profile: {}", profile.summary())),
        None => context.push(
            "The athlete has not completed onboarding yet; invite them to fill in their profile in the app."
                .to_string(),
        ),
    }

    if let Some(plan) = training_plan {
        context.push(format!(
            "Current training plan: {} ({} to {}, {} weeks)",
            plan.title,
            plan.start_date,
            plan.end_date,
            plan.week_count()
        ));
    }

    if let Some(plan) = nutrition_plan {
        context.push(format!(
            "Nutrition targets: {} kcal/day, protein {:.0} g, carbs {:.0} g, fat {:.0} g",
            plan.daily_calories, plan.protein_g, plan.carbs_g, plan.fat_g
        ));
    }

    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(LlmMessage::system(format!(
        "{}\n\n{}",
        SYSTEM_PROMPT,
        context.join("\n")
    )));

    for message in history {
        messages.push(match message.sender {
            MessageSender::User => LlmMessage::user(message.content.clone()),
            MessageSender::Ai | MessageSender::Operator => {
                LlmMessage::assistant(message.content.clone())
            }
        });
    }

    messages
}
