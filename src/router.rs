//! Orchestrates the life of every conversation.
//!
//! Per conversation id the router walks `NONE → ACTIVE → (ACTIVE | CLOSED)`:
//! absence from the session table is `NONE`, a table entry is `ACTIVE`, and a
//! terminal answer (or any recovered failure) evicts the entry. Every inbound
//! call is guaranteed exactly one disposition: the real answer and the wait
//! timer race through the turn's [`ReplySlot`], and whichever loses becomes a
//! no-op.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::answer::Answer;
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::normalizer;
use crate::session::{Disposition, FulfillError, ReplySlot, SessionTable};
use crate::synthesizer::{closing_speech, synthesize};
use crate::turn::Turn;

/// User-defined logic that produces one [`Answer`] per [`Turn`].
///
/// Implementations may take their time; the router enforces the answer wait
/// window. A returned error becomes a spoken fallback, never a dropped call.
#[async_trait]
pub trait TurnConsumer: Send + Sync {
    async fn on_turn(&self, turn: Turn) -> anyhow::Result<Answer>;
}

pub struct SessionRouter {
    table: SessionTable,
    consumer: Arc<dyn TurnConsumer>,
    config: BridgeConfig,
}

impl SessionRouter {
    pub fn new(consumer: Arc<dyn TurnConsumer>, config: BridgeConfig) -> Arc<Self> {
        Arc::new(Self {
            table: SessionTable::new(),
            consumer,
            config,
        })
    }

    pub fn sessions(&self) -> &SessionTable {
        &self.table
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Entry point for the transport: one raw payload plus the single-use
    /// sender for this call.
    ///
    /// A payload that cannot be normalized is rejected through the sender
    /// with a 400 before it touches any session state, and the error is also
    /// returned. Otherwise the turn is accepted, the consumer runs in the
    /// background, and the call is dispositioned asynchronously.
    pub fn handle_turn(
        self: &Arc<Self>,
        payload: &Value,
        reply: oneshot::Sender<Disposition>,
    ) -> Result<(), BridgeError> {
        let slot = Arc::new(ReplySlot::new(reply));
        let turn = match normalizer::normalize_value(payload) {
            Ok(turn) => turn,
            Err(err) => {
                warn!(error = %err, "rejecting webhook call");
                let _ = slot.reject(400, err.to_string());
                return Err(err);
            }
        };
        self.accept(turn, slot);
        Ok(())
    }

    /// Registers the turn's reply slot and forwards the turn to the consumer.
    /// Useful directly when the transport already normalized the payload.
    pub fn accept(self: &Arc<Self>, turn: Turn, slot: Arc<ReplySlot>) {
        let conversation_id = turn.conversation_id.clone();
        let turn_id = turn.id.clone();

        match self.table.open_or_replace(&conversation_id, slot.clone()) {
            Some(previous) if !previous.is_spent() => {
                warn!(
                    conversation = %conversation_id,
                    turn = %turn_id,
                    "replacing a response channel that was never used; previous turn abandoned"
                );
            }
            Some(_) => {
                debug!(conversation = %conversation_id, turn = %turn_id, "continuation turn");
            }
            None => {
                info!(
                    conversation = %conversation_id,
                    turn = %turn_id,
                    intent = %turn.intent,
                    "session opened"
                );
            }
        }

        let timer = self.spawn_answer_timer(conversation_id.clone(), turn_id.clone(), slot.clone());

        let router = Arc::clone(self);
        tokio::spawn(async move {
            let consumer = router.consumer.clone();
            let worker = tokio::spawn(async move { consumer.on_turn(turn).await });
            let result = worker.await;
            // the wait window ends the moment the consumer comes back
            timer.abort();
            match result {
                Ok(Ok(answer)) => {
                    if let Err(err) = router.deliver_answer(&conversation_id, answer) {
                        warn!(conversation = %conversation_id, error = %err, "answer dropped");
                    }
                }
                Ok(Err(failure)) => {
                    router.on_consumer_failure(&conversation_id, &turn_id, &slot, failure.to_string());
                }
                Err(join_err) => {
                    router.on_consumer_failure(
                        &conversation_id,
                        &turn_id,
                        &slot,
                        format!("consumer panicked: {join_err}"),
                    );
                }
            }
        });
    }

    /// Synthesizes `answer` and delivers it through the channel currently
    /// recorded for the conversation. An answer that violates the response
    /// format is replaced by the configured fallback utterance and the
    /// conversation is closed; an answer for an unknown conversation is
    /// reported and skipped.
    pub fn deliver_answer(
        &self,
        conversation_id: &str,
        answer: Answer,
    ) -> Result<(), BridgeError> {
        let (response, closing) = match synthesize(&answer) {
            Ok(response) => (response, answer.close_conversation),
            Err(err) => {
                warn!(
                    conversation = %conversation_id,
                    error = %err,
                    "answer violated the response format; substituting fallback"
                );
                (closing_speech(&self.config.conflict_text), true)
            }
        };

        let Some(slot) = self.table.lookup(conversation_id) else {
            let err = BridgeError::UnknownConversation {
                conversation_id: conversation_id.to_string(),
            };
            warn!(conversation = %conversation_id, "no live session; answer skipped");
            return Err(err);
        };

        match slot.reply(response) {
            Ok(()) => {
                if closing {
                    self.table.close(conversation_id);
                }
                Ok(())
            }
            Err(FulfillError::AlreadySpent) => {
                // the timeout (or a racing delivery) won; discard quietly
                debug!(conversation = %conversation_id, "late answer discarded");
                Ok(())
            }
            Err(FulfillError::Closed) => {
                warn!(conversation = %conversation_id, "transport dropped the response channel");
                if closing {
                    self.table.close(conversation_id);
                }
                Ok(())
            }
        }
    }

    /// Clears all sessions. Pending calls are left to the transport, which
    /// owns their lifecycle during teardown.
    pub fn shutdown(&self) {
        info!(sessions = self.table.len(), "router shutting down; clearing sessions");
        self.table.clear();
    }

    /// Periodically evicts conversations that stopped producing turns. Abort
    /// the returned handle on shutdown.
    pub fn spawn_idle_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(router.config.sweep_interval());
            loop {
                ticker.tick().await;
                for (conversation_id, slot) in router.table.evict_idle(router.config.session_idle())
                {
                    warn!(conversation = %conversation_id, "evicting abandoned session");
                    if !slot.is_spent() {
                        let _ = slot.reply(closing_speech(&router.config.no_answer_text));
                    }
                }
            }
        })
    }

    fn spawn_answer_timer(
        self: &Arc<Self>,
        conversation_id: String,
        turn_id: String,
        slot: Arc<ReplySlot>,
    ) -> JoinHandle<()> {
        let router = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(router.config.answer_timeout()).await;
            router.on_answer_timeout(&conversation_id, &turn_id, &slot);
        })
    }

    fn on_answer_timeout(&self, conversation_id: &str, turn_id: &str, slot: &Arc<ReplySlot>) {
        // only act while this turn's slot is still the one on record: a newer
        // turn owns its own wait window, and a cleared table means teardown
        let Some(current) = self.table.lookup(conversation_id) else {
            return;
        };
        if !Arc::ptr_eq(&current, slot) {
            return;
        }

        match slot.reply(closing_speech(&self.config.no_answer_text)) {
            Ok(()) => {
                let err = BridgeError::AnswerTimeout {
                    conversation_id: conversation_id.to_string(),
                    waited_ms: self.config.answer_timeout_ms,
                };
                warn!(
                    conversation = %conversation_id,
                    turn = %turn_id,
                    error = %err,
                    "no answer within the wait window; fallback delivered"
                );
                self.table.close_if_current(conversation_id, slot);
            }
            Err(FulfillError::AlreadySpent) => {
                // the real answer arrived first
            }
            Err(FulfillError::Closed) => {
                warn!(conversation = %conversation_id, "transport dropped the response channel");
                self.table.close_if_current(conversation_id, slot);
            }
        }
    }

    fn on_consumer_failure(
        &self,
        conversation_id: &str,
        turn_id: &str,
        slot: &Arc<ReplySlot>,
        message: String,
    ) {
        let err = BridgeError::ConsumerFailure {
            conversation_id: conversation_id.to_string(),
            turn_id: turn_id.to_string(),
            message,
        };
        error!(
            conversation = %conversation_id,
            turn = %turn_id,
            error = %err,
            "consumer failed; fallback delivered"
        );

        // same staleness guard as the timeout path
        let Some(current) = self.table.lookup(conversation_id) else {
            return;
        };
        if !Arc::ptr_eq(&current, slot) {
            return;
        }

        match slot.reply(closing_speech(&self.config.failure_text)) {
            Ok(()) | Err(FulfillError::Closed) => {
                // a failed turn closes the conversation rather than leaving
                // the session stuck
                self.table.close_if_current(conversation_id, slot);
            }
            Err(FulfillError::AlreadySpent) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::{RichReply, SelectionList};
    use crate::wire::ResponseItem;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn payload(conversation_id: &str, query: &str) -> Value {
        json!({
            "conversation": { "conversationId": conversation_id, "type": "ACTIVE" },
            "inputs": [{
                "intent": "actions.intent.TEXT",
                "rawInputs": [{ "query": query }],
                "arguments": [{ "name": "text", "textValue": query }]
            }]
        })
    }

    fn spoken_text(disposition: &Disposition) -> String {
        let Disposition::Reply(response) = disposition else {
            panic!("expected a reply, got {:?}", disposition);
        };
        let rich = response
            .final_response
            .as_ref()
            .map(|f| &f.rich_response)
            .or_else(|| {
                response
                    .expected_inputs
                    .as_ref()
                    .and_then(|inputs| inputs.first())
                    .and_then(|input| input.input_prompt.as_ref())
                    .map(|p| &p.rich_initial_prompt)
            })
            .expect("response has no rich content");
        match &rich.items[0] {
            ResponseItem::SimpleResponse(simple) => simple
                .text_to_speech
                .clone()
                .or_else(|| simple.ssml.clone())
                .unwrap_or_default(),
            other => panic!("expected simple response, got {:?}", other),
        }
    }

    struct EchoConsumer {
        turns_seen: AtomicUsize,
    }

    #[async_trait]
    impl TurnConsumer for EchoConsumer {
        async fn on_turn(&self, turn: Turn) -> anyhow::Result<Answer> {
            self.turns_seen.fetch_add(1, Ordering::SeqCst);
            Ok(Answer::ask(format!(
                "you said {}",
                turn.raw_input.unwrap_or_default()
            )))
        }
    }

    struct SilentConsumer;

    #[async_trait]
    impl TurnConsumer for SilentConsumer {
        async fn on_turn(&self, _turn: Turn) -> anyhow::Result<Answer> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(Answer::tell("finally"))
        }
    }

    struct FailingConsumer;

    #[async_trait]
    impl TurnConsumer for FailingConsumer {
        async fn on_turn(&self, _turn: Turn) -> anyhow::Result<Answer> {
            Err(anyhow::anyhow!("backend unreachable"))
        }
    }

    struct ConflictingConsumer;

    #[async_trait]
    impl TurnConsumer for ConflictingConsumer {
        async fn on_turn(&self, _turn: Turn) -> anyhow::Result<Answer> {
            Ok(Answer::rich(
                RichReply::new("both at once")
                    .with_card(Default::default())
                    .with_carousel(SelectionList::default()),
                false,
            ))
        }
    }

    #[tokio::test]
    async fn test_first_turn_creates_session_and_forwards_once() {
        let consumer = Arc::new(EchoConsumer {
            turns_seen: AtomicUsize::new(0),
        });
        let router = SessionRouter::new(consumer.clone(), BridgeConfig::default());

        let (tx, rx) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx).unwrap();

        let disposition = rx.await.unwrap();
        assert_eq!(spoken_text(&disposition), "you said hello");
        assert_eq!(consumer.turns_seen.load(Ordering::SeqCst), 1);
        // non-terminal answer keeps the session active
        assert!(router.sessions().contains("abc"));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let router = SessionRouter::new(
            Arc::new(EchoConsumer {
                turns_seen: AtomicUsize::new(0),
            }),
            BridgeConfig::default(),
        );

        let (tx, rx) = oneshot::channel();
        let err = router
            .handle_turn(&json!({ "inputs": [] }), tx)
            .unwrap_err();
        assert!(matches!(err, BridgeError::MalformedPayload(_)));

        match rx.await.unwrap() {
            Disposition::Reject { status, .. } => assert_eq!(status, 400),
            other => panic!("expected a reject, got {:?}", other),
        }
        assert!(router.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_delivers_fallback_and_evicts() {
        let config = BridgeConfig::default().with_answer_timeout(Duration::from_millis(40));
        let router = SessionRouter::new(Arc::new(SilentConsumer), config);

        let (tx, rx) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx).unwrap();

        let disposition = rx.await.unwrap();
        assert_eq!(spoken_text(&disposition), router.config().no_answer_text);
        assert!(!router.sessions().contains("abc"));

        // the late answer is discarded without a second disposition
        tokio::time::sleep(Duration::from_millis(550)).await;
        assert!(router.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_consumer_failure_delivers_fallback_and_evicts() {
        let router = SessionRouter::new(Arc::new(FailingConsumer), BridgeConfig::default());

        let (tx, rx) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx).unwrap();

        let disposition = rx.await.unwrap();
        assert_eq!(spoken_text(&disposition), router.config().failure_text);
        assert!(!router.sessions().contains("abc"));
    }

    #[tokio::test]
    async fn test_conflicting_answer_falls_back_and_closes() {
        let router = SessionRouter::new(Arc::new(ConflictingConsumer), BridgeConfig::default());

        let (tx, rx) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx).unwrap();

        let disposition = rx.await.unwrap();
        assert_eq!(spoken_text(&disposition), router.config().conflict_text);
        assert!(!router.sessions().contains("abc"));
    }

    #[tokio::test]
    async fn test_retry_replaces_channel_and_abandons_old_one() {
        let config = BridgeConfig::default().with_answer_timeout(Duration::from_millis(60));
        let router = SessionRouter::new(Arc::new(SilentConsumer), config);

        let (tx1, mut rx1) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx1).unwrap();
        let (tx2, rx2) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx2).unwrap();

        // still exactly one session, now on its second turn
        assert_eq!(router.sessions().len(), 1);
        assert_eq!(router.sessions().turn_count("abc"), Some(2));

        // the replacement channel gets the (timeout) disposition...
        let disposition = rx2.await.unwrap();
        assert_eq!(spoken_text(&disposition), router.config().no_answer_text);
        // ...while the abandoned one never hears back from the router
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_deliver_answer_unknown_conversation() {
        let router = SessionRouter::new(
            Arc::new(EchoConsumer {
                turns_seen: AtomicUsize::new(0),
            }),
            BridgeConfig::default(),
        );
        let err = router
            .deliver_answer("nobody", Answer::tell("hi"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownConversation { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_clears_sessions_without_touching_channels() {
        let config = BridgeConfig::default().with_answer_timeout(Duration::from_millis(50));
        let router = SessionRouter::new(Arc::new(SilentConsumer), config);

        let (tx, mut rx) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx).unwrap();
        router.shutdown();
        assert!(router.sessions().is_empty());

        // neither the timer nor anything else dispositions the pending call
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_idle_sweeper_evicts_abandoned_sessions() {
        let config = BridgeConfig::default()
            .with_session_idle(Duration::from_millis(30))
            .with_sweep_interval(Duration::from_millis(20));
        let router = SessionRouter::new(
            Arc::new(EchoConsumer {
                turns_seen: AtomicUsize::new(0),
            }),
            config,
        );

        let (tx, rx) = oneshot::channel();
        router.handle_turn(&payload("abc", "hello"), tx).unwrap();
        // the answer arrives and keeps the session open
        let _ = rx.await.unwrap();
        assert!(router.sessions().contains("abc"));

        let sweeper = router.spawn_idle_sweeper();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!router.sessions().contains("abc"));
        sweeper.abort();
    }
}
