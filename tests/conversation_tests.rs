//! Coordinator scenarios against a scripted agent.

mod common;

use std::sync::Arc;

use common::{completed, factory, reply, Script, ScriptedAgent};
use pretty_assertions::assert_eq;
use serde_json::json;

use tasklink::config::ClientConfig;
use tasklink::error::TaskLinkError;
use tasklink::conversation::{ConversationPhase, Coordinator, OutgoingMessage, Sender};
use tasklink::types::{AgentEndpoint, FileAttachment, TaskState};

fn coordinator(agent: &Arc<ScriptedAgent>, streaming: bool) -> Coordinator {
    let coordinator = Coordinator::with_factory(&ClientConfig::default(), factory(agent.clone()));
    coordinator.add_agent(AgentEndpoint::new("a", "http://agent-a.test", streaming));
    coordinator
}

#[tokio::test]
async fn single_document_reply_yields_two_records() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Document(json!({
        "jsonrpc": "2.0",
        "result": {
            "status": {
                "state": "completed",
                "message": {"parts": [{"kind": "text", "text": "hi there"}]}
            }
        }
    })));
    let coordinator = coordinator(&agent, false);

    coordinator
        .send_message("a", OutgoingMessage::text("hello"))
        .await
        .unwrap();

    let history = coordinator.history("a");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, Sender::User);
    assert_eq!(history[0].content, "hello");
    assert_eq!(history[1].sender, Sender::Agent);
    assert_eq!(history[1].content, "hi there");
    assert_eq!(history[1].state, Some(TaskState::Completed));
    assert!(!history[1].pending);

    // No server id in the reply, so the record keeps the task id we sent.
    let sent = agent.requests();
    assert_eq!(Some(history[1].id.clone()), sent[0].task_id);
}

#[tokio::test]
async fn streamed_frames_update_one_placeholder() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Stream(vec![
        reply("task-9", "working", "Thinking"),
        reply("task-9", "working", "Thinking about"),
        reply("task-9", "completed", "Thinking about it: done"),
    ]));
    let coordinator = coordinator(&agent, true);

    let mut updates = Vec::new();
    let settled = coordinator
        .send_message_with("a", OutgoingMessage::text("go"), |record| {
            updates.push(record.clone());
        })
        .await
        .unwrap();

    let placeholder_updates: Vec<_> = updates.iter().filter(|r| r.pending).collect();
    assert_eq!(placeholder_updates.len(), 3);
    assert_eq!(placeholder_updates[0].content, "Thinking");
    assert_eq!(placeholder_updates[0].state, Some(TaskState::Working));
    assert!(placeholder_updates.iter().all(|r| r.id == placeholder_updates[0].id));

    let history = coordinator.history("a");
    let agent_records: Vec<_> = history.iter().filter(|r| r.sender == Sender::Agent).collect();
    assert_eq!(agent_records.len(), 1);
    assert_eq!(agent_records[0].content, "Thinking about it: done");
    assert_eq!(agent_records[0].state, Some(TaskState::Completed));
    assert_eq!(agent_records[0].id, "task-9");
    assert_eq!(settled, *agent_records[0]);
}

#[tokio::test]
async fn input_required_continues_the_task() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Document(reply("task-1", "input-required", "Which city?")));
    agent.queue(Script::Document(completed("task-1", "Sunny in Oslo")));
    agent.queue(Script::Document(completed("task-2", "Anything else?")));
    let coordinator = coordinator(&agent, false);

    for text in ["weather", "Oslo", "thanks"] {
        coordinator
            .send_message("a", OutgoingMessage::text(text))
            .await
            .unwrap();
    }

    let sent = agent.requests();
    let session = coordinator.session_id("a");
    assert!(sent.iter().all(|r| r.session_id == session));
    assert_ne!(sent[0].task_id.as_deref(), Some("task-1"));
    assert_eq!(sent[1].task_id.as_deref(), Some("task-1"));
    assert_ne!(sent[2].task_id.as_deref(), Some("task-1"));
    assert_ne!(sent[2].task_id, sent[0].task_id);
    assert_eq!(coordinator.phase("a"), Some(ConversationPhase::Idle));
}

#[tokio::test]
async fn phase_reports_awaiting_input() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Document(reply("task-1", "input-required", "More?")));
    let coordinator = coordinator(&agent, false);
    assert_eq!(coordinator.phase("a"), Some(ConversationPhase::NoSession));

    coordinator
        .send_message("a", OutgoingMessage::text("start"))
        .await
        .unwrap();
    assert_eq!(coordinator.phase("a"), Some(ConversationPhase::AwaitingInput));
}

#[tokio::test]
async fn reset_issues_new_session_and_clears_history() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Document(completed("t", "hi")));
    let coordinator = coordinator(&agent, false);
    coordinator.add_agent(AgentEndpoint::new("b", "http://agent-b.test", false));

    let session_b = coordinator.select_agent("b").unwrap();
    coordinator
        .send_message("a", OutgoingMessage::text("hello"))
        .await
        .unwrap();
    let before = coordinator.session_id("a").unwrap();

    let after = coordinator.reset_conversation("a").unwrap();
    assert_ne!(before, after);
    assert_eq!(coordinator.session_id("a"), Some(after));
    assert!(coordinator.history("a").is_empty());
    assert_eq!(coordinator.session_id("b"), Some(session_b));
}

#[tokio::test]
async fn failure_replaces_placeholder_with_one_error_record() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Fail(503));
    let coordinator = coordinator(&agent, true);

    let record = coordinator
        .send_message("a", OutgoingMessage::text("hello"))
        .await
        .unwrap();
    assert!(record.is_error);
    assert!(record.content.starts_with("Error: "), "{}", record.content);

    let history = coordinator.history("a");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, Sender::User);
    assert!(history[1].is_error);
    assert!(history.iter().all(|r| !r.pending));
}

#[tokio::test]
async fn user_record_carries_transmitted_envelope() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Document(completed("t", "ok")));
    let coordinator = coordinator(&agent, false);

    let file = FileAttachment::from_bytes("a.txt", Some("text/plain".into()), b"abc");
    coordinator
        .send_message("a", OutgoingMessage::text("see file").with_file(file))
        .await
        .unwrap();

    let history = coordinator.history("a");
    let raw = history[0].raw_exchange.clone().unwrap();
    assert_eq!(raw["jsonrpc"], "2.0");
    assert_eq!(raw["method"], "tasks/send");
    assert_eq!(raw["params"]["id"].as_str(), agent.requests()[0].task_id.as_deref());
    assert_eq!(raw["params"]["message"]["parts"][1]["kind"], "file");
    assert_eq!(history[0].attachment.as_deref(), Some("a.txt"));
    assert_eq!(history[1].raw_exchange, Some(completed("t", "ok")));
}

#[tokio::test]
async fn failed_send_keeps_provisional_envelope_on_user_record() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Fail(500));
    let coordinator = coordinator(&agent, false);

    coordinator
        .send_message("a", OutgoingMessage::text("hello"))
        .await
        .unwrap();

    let history = coordinator.history("a");
    let raw = history[0].raw_exchange.clone().unwrap();
    assert_eq!(raw["method"], "tasks/send");
    assert_eq!(raw["params"]["id"].as_str(), agent.requests()[0].task_id.as_deref());
    assert_eq!(raw["params"]["sessionId"].as_str(), agent.requests()[0].session_id.as_deref());
}

#[tokio::test]
async fn late_failure_of_a_reset_call_keeps_the_new_reply() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    let first_gate = agent.queue_gated();
    let second_gate = agent.queue_gated();
    let coordinator = Arc::new(coordinator(&agent, false));

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.send_message("a", OutgoingMessage::text("old")).await }
    });
    agent.wait_for_requests(1).await;
    coordinator.reset_conversation("a").unwrap();

    let second = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.send_message("a", OutgoingMessage::text("new")).await }
    });
    agent.wait_for_requests(2).await;

    first_gate.send(Script::Fail(500)).ok().unwrap();
    let late = first.await.unwrap().unwrap();
    assert!(late.is_error);

    let history = coordinator.history("a");
    assert_eq!(history.len(), 2);
    assert!(history[1].pending);

    second_gate
        .send(Script::Document(completed("t2", "second ok")))
        .ok()
        .unwrap();
    second.await.unwrap().unwrap();

    let history = coordinator.history("a");
    let summary: Vec<_> = history
        .iter()
        .map(|r| (r.sender, r.content.as_str(), r.is_error))
        .collect();
    assert_eq!(
        summary,
        vec![(Sender::User, "new", false), (Sender::Agent, "second ok", false)]
    );
    assert!(history.iter().all(|r| !r.pending));
}

#[tokio::test]
async fn reset_during_call_drops_the_late_reply() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    let gate = agent.queue_gated();
    let coordinator = Arc::new(coordinator(&agent, false));

    let call = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.send_message("a", OutgoingMessage::text("hello")).await }
    });
    agent.wait_for_requests(1).await;
    coordinator.reset_conversation("a").unwrap();

    gate.send(Script::Document(reply("t1", "input-required", "which one?")))
        .ok()
        .unwrap();
    let record = call.await.unwrap().unwrap();
    assert_eq!(record.content, "which one?");
    assert!(coordinator.history("a").is_empty());

    // The dropped input-required reply must not continue its task.
    agent.queue(Script::Document(completed("t2", "fresh")));
    coordinator
        .send_message("a", OutgoingMessage::text("again"))
        .await
        .unwrap();
    let sent = agent.requests();
    assert_ne!(sent[1].task_id, sent[0].task_id);
    assert_ne!(sent[1].session_id, sent[0].session_id);
    assert_eq!(coordinator.history("a").len(), 2);
}

#[tokio::test]
async fn streamed_update_after_reset_is_dropped() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    let gate = agent.queue_gated();
    let coordinator = Arc::new(coordinator(&agent, true));

    let call = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            let mut updates = Vec::new();
            let record = coordinator
                .send_message_with("a", OutgoingMessage::text("hello"), |record| {
                    updates.push(record.pending)
                })
                .await;
            (record, updates)
        }
    });
    agent.wait_for_requests(1).await;
    coordinator.reset_conversation("a").unwrap();

    gate.send(Script::Stream(vec![
        reply("t1", "working", "half"),
        reply("t1", "completed", "half and done"),
    ]))
    .ok()
    .unwrap();
    let (record, updates) = call.await.unwrap();
    record.unwrap();

    // Only the settled record reaches the callback; no placeholder survived.
    assert_eq!(updates, vec![false]);
    assert!(coordinator.history("a").is_empty());
}

#[tokio::test]
async fn second_send_while_pending_is_rejected() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    let gate = agent.queue_gated();
    let coordinator = Arc::new(coordinator(&agent, false));

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move { coordinator.send_message("a", OutgoingMessage::text("one")).await }
    });
    agent.wait_for_requests(1).await;

    let err = coordinator
        .send_message("a", OutgoingMessage::text("two"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskLinkError::InvalidArgument(_)), "{err:?}");
    assert_eq!(coordinator.history("a").len(), 2);
    assert_eq!(agent.requests().len(), 1);

    gate.send(Script::Document(completed("t1", "done"))).ok().unwrap();
    first.await.unwrap().unwrap();

    let history = coordinator.history("a");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "one");
    assert_eq!(history[1].content, "done");
}

#[tokio::test]
async fn unknown_agent_is_an_error() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    let coordinator = coordinator(&agent, false);
    assert!(coordinator
        .send_message("missing", OutgoingMessage::text("hi"))
        .await
        .is_err());
    assert!(coordinator.select_agent("missing").is_err());
    assert!(coordinator.history("missing").is_empty());
}

#[tokio::test]
async fn agent_management() {
    let agent = ScriptedAgent::new("http://agent-a.test");
    agent.queue(Script::Document(completed("t", "kept")));
    let coordinator = coordinator(&agent, false);
    coordinator
        .send_message("a", OutgoingMessage::text("hello"))
        .await
        .unwrap();

    let mut moved = coordinator.endpoint("a").unwrap();
    moved.url = "http://agent-a2.test".into();
    moved.streaming = true;
    coordinator.update_agent(moved).unwrap();
    assert_eq!(coordinator.history("a").len(), 2);
    assert!(coordinator.endpoint("a").unwrap().streaming);

    let card = coordinator.fetch_card("a").await.unwrap();
    assert_eq!(card.name, "Scripted");

    assert!(coordinator.remove_agent("a").is_some());
    assert!(coordinator.agent_ids().is_empty());
    assert!(coordinator.update_agent(AgentEndpoint::new("a", "http://x", false)).is_err());
}
