use crate::backend::{CallContext, SharedBackend};
use crate::conversation::{ChatMessage, ConversationState};
use crate::error::{Result, TranslateError};
use crate::language::LanguageTag;
use crate::prompt;

/// Stateless translation orchestration on top of a [`ChatBackend`](crate::ChatBackend).
#[derive(Clone)]
pub struct TranslationEngine {
    backend: SharedBackend,
}

impl TranslationEngine {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn backend_id(&self) -> &'static str {
        self.backend.id()
    }

    /// Translate `input` into `target`, returning the new conversation and its first reply.
    pub async fn start_translation(
        &self,
        input: &str,
        target: &LanguageTag,
        ctx: &CallContext,
    ) -> Result<(ConversationState, String)> {
        let system = ChatMessage::system(prompt::translation_system_prompt(
            &target.display_name(),
        ));
        let user = ChatMessage::user(input);
        let request = [system.clone(), user.clone()];
        let reply = ctx.run(self.backend.chat(&request)).await?;
        let state = ConversationState::from_initial_turn(system, user, reply.clone(), target.clone());
        Ok((state, reply))
    }

    /// Ask the backend for the BCP 47 tag of `input`. No fallback tag on failure.
    pub async fn identify_language(&self, input: &str, ctx: &CallContext) -> Result<LanguageTag> {
        let request = [
            ChatMessage::system(prompt::IDENTIFY_SYSTEM_PROMPT),
            ChatMessage::user(input),
        ];
        let reply = ctx.run(self.backend.chat(&request)).await?;
        LanguageTag::parse(&reply).map_err(|err| TranslateError::Parse {
            reply,
            reason: err.reason,
        })
    }

    /// Resend the whole history plus `feedback`; returns the extended state and the reply.
    ///
    /// `state` itself is never modified, so a failed call leaves nothing half-applied.
    pub async fn improve(
        &self,
        state: &ConversationState,
        feedback: &str,
        ctx: &CallContext,
    ) -> Result<(ConversationState, String)> {
        let lang = state.target().display_name();
        let request = state.request_with(ChatMessage::user(prompt::improve_instruction(
            feedback, &lang,
        )));
        let reply = ctx.run(self.backend.chat(&request)).await?;
        let next = state.committed(request, reply.clone());
        Ok((next, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::conversation::Role;
    use crate::test_support::ScriptedBackend;
    use std::sync::Arc;

    fn spanish() -> LanguageTag {
        LanguageTag::parse("es").expect("tag")
    }

    #[tokio::test]
    async fn start_sends_system_and_user_only() {
        let backend = Arc::new(ScriptedBackend::replies(["Hola."]));
        let engine = TranslationEngine::new(backend.clone());
        let (state, reply) = engine
            .start_translation("Hello.", &spanish(), &CallContext::new())
            .await
            .expect("start");

        assert_eq!(reply, "Hola.");
        let sent = backend.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), 2);
        assert_eq!(sent[0][0].role, Role::System);
        assert!(sent[0][0].content.contains("into Spanish"));
        assert_eq!(sent[0][1], ChatMessage::user("Hello."));
        assert_eq!(state.len(), 3);
        assert_eq!(state.target(), &spanish());
    }

    #[tokio::test]
    async fn improve_resends_full_history() {
        let backend = Arc::new(ScriptedBackend::replies(["Hola.", "Buenos días.", "Saludos."]));
        let engine = TranslationEngine::new(backend.clone());
        let ctx = CallContext::new();
        let (state, _) = engine
            .start_translation("Hello.", &spanish(), &ctx)
            .await
            .expect("start");
        let (state, first) = engine.improve(&state, "more formal", &ctx).await.expect("improve");
        let (state, second) = engine.improve(&state, "shorter", &ctx).await.expect("improve");

        assert_eq!(first, "Buenos días.");
        assert_eq!(second, "Saludos.");
        let sizes: Vec<usize> = backend.requests().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 4, 6]);
        assert_eq!(state.len(), 7);
        assert!(state.messages()[3].content.starts_with("Improve: more formal"));
        assert!(state.messages()[5].content.starts_with("Improve: shorter"));
    }

    #[tokio::test]
    async fn failed_improve_leaves_state_untouched() {
        let backend = Arc::new(ScriptedBackend::replies(["Hola."]));
        let engine = TranslationEngine::new(backend.clone());
        let ctx = CallContext::new();
        let (state, _) = engine
            .start_translation("Hello.", &spanish(), &ctx)
            .await
            .expect("start");
        let before = state.clone();
        backend.fail_next(BackendError::Transport("connection refused".into()));
        let err = engine.improve(&state, "formal", &ctx).await.expect_err("fails");
        assert!(matches!(err, TranslateError::Backend(BackendError::Transport(_))));
        assert_eq!(state, before);
    }

    #[tokio::test]
    async fn identify_parses_tag() {
        let backend = Arc::new(ScriptedBackend::replies(["ja-JP\n"]));
        let engine = TranslationEngine::new(backend.clone());
        let tag = engine
            .identify_language("こんにちは。", &CallContext::new())
            .await
            .expect("identify");
        assert_eq!(tag.to_string(), "ja-JP");
        let sent = backend.requests();
        assert_eq!(sent[0][0].content, prompt::IDENTIFY_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn identify_rejects_prose_reply() {
        let backend = Arc::new(ScriptedBackend::replies(["The text is Japanese."]));
        let engine = TranslationEngine::new(backend);
        let err = engine
            .identify_language("こんにちは。", &CallContext::new())
            .await
            .expect_err("parse error");
        match err {
            TranslateError::Parse { reply, .. } => assert_eq!(reply, "The text is Japanese."),
            other => panic!("unexpected {other:?}"),
        }
    }
}
