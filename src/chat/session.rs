use super::client::ChatMessage;
use crate::reply::ReplyFormatter;

/// Discrete front-end events that move a session forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Submit(String),
    ModelChanged(String),
    ResponseReceived(String),
    ResponseFailed(String),
    AudioPlayed,
}

/// Everything the chat front end keeps between refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub waiting_for_response: bool,
    pub play_audio: bool,
    pub model_preset: String,
    pub last_error: Option<String>,
}

impl ChatSession {
    pub fn new(model_preset: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            waiting_for_response: false,
            play_audio: false,
            model_preset: model_preset.into(),
            last_error: None,
        }
    }

    /// Apply one event and return the next state.
    pub fn apply(mut self, event: SessionEvent, formatter: &ReplyFormatter) -> Self {
        match event {
            SessionEvent::Submit(text) => {
                if text.trim().is_empty() || self.waiting_for_response {
                    return self;
                }
                self.messages.push(ChatMessage::user(text));
                self.waiting_for_response = true;
                self.last_error = None;
            }
            SessionEvent::ModelChanged(preset) => {
                self.messages.clear();
                self.waiting_for_response = false;
                self.play_audio = false;
                self.last_error = None;
                self.model_preset = preset;
            }
            SessionEvent::ResponseReceived(reply) => {
                // Late reply after a model switch.
                if !self.waiting_for_response {
                    return self;
                }
                let reply = formatter.clean(&reply);
                self.play_audio = formatter.is_speakable(&reply);
                self.messages.push(ChatMessage::assistant(reply));
                self.waiting_for_response = false;
            }
            SessionEvent::ResponseFailed(message) => {
                self.waiting_for_response = false;
                self.last_error = Some(message);
            }
            SessionEvent::AudioPlayed => {
                self.play_audio = false;
            }
        }
        self
    }

    /// Messages to send for the pending request: system prompt, then history.
    pub fn request_messages(&self, system_prompt: &str) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(system_prompt))
            .chain(self.messages.iter().cloned())
            .collect()
    }

    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == "assistant")
            .map(|m| m.content.as_str())
    }
}
