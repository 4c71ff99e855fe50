//! Chat front end for the fine-tuned persona model: configuration, a
//! blocking completion client, and a session state machine driven by
//! terminal input.

pub mod client;
pub mod config;
pub mod session;

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use thiserror::Error;
use tracing::{error, info};

use crate::reply::ReplyFormatter;
use client::{ChatMessage, ChatReply};
use config::{ChatConfig, ModelPreset};
use session::{ChatSession, SessionEvent};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("MASS_API_KEY environment variable is not set; set it in your .env file or environment")]
    MissingApiKey,

    #[error("unknown model preset '{0}'")]
    UnknownPreset(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("api response contained no reply")]
    EmptyReply,
}

/// Anything that can answer a chat-completion request.
pub trait CompletionBackend {
    fn complete(&self, preset: &ModelPreset, messages: &[ChatMessage]) -> Result<ChatReply, ChatError>;
}

/// Send a single prompt and print the reply with its metadata.
pub fn ask<B: CompletionBackend, W: Write>(
    backend: &B,
    preset: &ModelPreset,
    system_prompt: &str,
    prompt: &str,
    out: &mut W,
) -> Result<()> {
    info!(model = %preset.model_id, lora = %preset.lora_resource_id, "sending request");

    let messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(prompt)];
    let reply = backend
        .complete(preset, &messages)
        .context("error communicating with the model")?;

    writeln!(out, "--- Response ---")?;
    writeln!(out, "Content: {}", reply.content)?;
    if let Some(reasoning) = &reply.reasoning_content {
        writeln!(out, "Reasoning Content: {}", reasoning)?;
    }
    if let Some(plugins) = &reply.plugins_content {
        writeln!(out, "Plugins Content: {}", plugins)?;
    }
    if let Some(reason) = &reply.finish_reason {
        writeln!(out, "Finish Reason: {}", reason)?;
    }
    if let Some(usage) = &reply.usage {
        writeln!(out, "\n--- Usage ---")?;
        writeln!(out, "Prompt Tokens: {}", usage.prompt_tokens)?;
        writeln!(out, "Completion Tokens: {}", usage.completion_tokens)?;
        writeln!(out, "Total Tokens: {}", usage.total_tokens)?;
    }
    Ok(())
}

/// Interactive loop: one line per turn, `/model <preset>` switches model,
/// `/quit` exits. Request failures are reported and the loop continues.
pub fn repl<B, R, W>(
    backend: &B,
    config: &ChatConfig,
    initial_preset: &str,
    system_prompt: &str,
    input: R,
    out: &mut W,
) -> Result<ChatSession>
where
    B: CompletionBackend,
    R: BufRead,
    W: Write,
{
    let formatter = ReplyFormatter::new()?;
    config.preset(initial_preset)?;
    let mut session = ChatSession::new(initial_preset);

    writeln!(
        out,
        "Chatting with {} (presets: {}). /model <preset> to switch, /quit to exit.",
        initial_preset,
        config.preset_names().join(", ")
    )?;

    for line in input.lines() {
        let line = line.context("reading input")?;
        let trimmed = line.trim();

        if trimmed == "/quit" {
            break;
        }

        if let Some(name) = model_command(trimmed) {
            match config.preset(name) {
                Ok(_) => {
                    session = session.apply(SessionEvent::ModelChanged(name.to_string()), &formatter);
                    writeln!(out, "Switched to {}; history cleared.", name)?;
                }
                Err(e) => writeln!(out, "{}", e)?,
            }
            continue;
        }

        session = session.apply(SessionEvent::Submit(line.clone()), &formatter);
        if !session.waiting_for_response {
            continue;
        }

        let preset = config.preset(&session.model_preset)?;
        let event = match backend.complete(preset, &session.request_messages(system_prompt)) {
            Ok(reply) => SessionEvent::ResponseReceived(reply.content),
            Err(e) => {
                error!("chat request failed: {}", e);
                SessionEvent::ResponseFailed(format!("Error communicating with the model: {}", e))
            }
        };
        session = session.apply(event, &formatter);

        if let Some(message) = &session.last_error {
            writeln!(out, "{}", message)?;
        } else if let Some(reply) = session.last_reply() {
            if session.play_audio {
                writeln!(out, "{} (speakable)", reply)?;
            } else {
                writeln!(out, "{}", reply)?;
            }
            session = session.apply(SessionEvent::AudioPlayed, &formatter);
        }
    }

    Ok(session)
}

/// The preset named by a `/model <preset>` line. Words that merely start
/// with `/model` are ordinary messages.
fn model_command(line: &str) -> Option<&str> {
    line.strip_prefix("/model")
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replays canned replies and records what was sent.
    struct ScriptedBackend {
        replies: RefCell<Vec<Result<ChatReply, ChatError>>>,
        sent: RefCell<Vec<(String, Vec<ChatMessage>)>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<ChatReply, ChatError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into_iter().rev().collect()),
                sent: RefCell::new(Vec::new()),
            }
        }
    }

    impl CompletionBackend for ScriptedBackend {
        fn complete(&self, preset: &ModelPreset, messages: &[ChatMessage]) -> Result<ChatReply, ChatError> {
            self.sent
                .borrow_mut()
                .push((preset.name.clone(), messages.to_vec()));
            self.replies.borrow_mut().pop().unwrap_or(Err(ChatError::EmptyReply))
        }
    }

    fn reply(content: &str) -> Result<ChatReply, ChatError> {
        Ok(ChatReply {
            content: content.into(),
            reasoning_content: None,
            plugins_content: None,
            finish_reason: Some("stop".into()),
            usage: Some(client::Usage {
                prompt_tokens: 3,
                completion_tokens: 2,
                total_tokens: 5,
            }),
        })
    }

    fn config() -> ChatConfig {
        ChatConfig::from_lookup(|k| (k == "MASS_API_KEY").then(|| "k".to_string())).unwrap()
    }

    #[test]
    fn test_ask_prints_reply_and_usage() {
        let backend = ScriptedBackend::new(vec![reply("我是ku")]);
        let cfg = config();
        let mut out = Vec::new();
        ask(&backend, cfg.preset("KU1.0").unwrap(), "sys", "你是谁？", &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content: 我是ku"));
        assert!(text.contains("Finish Reason: stop"));
        assert!(text.contains("Total Tokens: 5"));
        assert_eq!(backend.sent.borrow()[0].1[0], ChatMessage::system("sys"));
    }

    #[test]
    fn test_ask_surfaces_failure() {
        let backend = ScriptedBackend::new(vec![Err(ChatError::EmptyReply)]);
        let cfg = config();
        let mut out = Vec::new();
        let err = ask(&backend, cfg.preset("KU1.0").unwrap(), "sys", "hi", &mut out).unwrap_err();
        assert!(format!("{:#}", err).contains("no reply"));
    }

    #[test]
    fn test_repl_conversation_flow() {
        let backend = ScriptedBackend::new(vec![
            reply("在的[微笑]"),
            Err(ChatError::EmptyReply),
            reply("新模型"),
        ]);
        let input = "在吗\n\n还在吗\n/model KU9.0\n/model KU5.0\n你好\n/quit\nignored\n";
        let mut out = Vec::new();

        let session = repl(&backend, &config(), "KU1.0", "sys", input.as_bytes(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("在的😊 (speakable)"));
        assert!(text.contains("Error communicating with the model"));
        assert!(text.contains("unknown model preset 'KU9.0'"));
        assert!(text.contains("Switched to KU5.0"));

        let sent = backend.sent.borrow();
        assert_eq!(sent.len(), 3);
        // Second request carries the first exchange as history.
        assert_eq!(sent[1].1.len(), 4);
        // After the switch, history starts over on the new preset.
        assert_eq!(sent[2].0, "KU5.0");
        assert_eq!(sent[2].1, vec![ChatMessage::system("sys"), ChatMessage::user("你好")]);

        assert_eq!(session.model_preset, "KU5.0");
        assert_eq!(session.messages.len(), 2);
        assert!(!session.play_audio);
    }

    #[test]
    fn test_model_command_needs_word_boundary() {
        assert_eq!(model_command("/model KU5.0"), Some("KU5.0"));
        assert_eq!(model_command("/model"), Some(""));
        assert_eq!(model_command("/modelfoo"), None);
        assert_eq!(model_command("/models please"), None);

        let backend = ScriptedBackend::new(vec![reply("好的")]);
        let mut out = Vec::new();
        let session = repl(&backend, &config(), "KU1.0", "sys", "/modelfoo\n".as_bytes(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("unknown model preset"));
        let sent = backend.sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, vec![ChatMessage::system("sys"), ChatMessage::user("/modelfoo")]);
        assert_eq!(session.model_preset, "KU1.0");
    }
}
