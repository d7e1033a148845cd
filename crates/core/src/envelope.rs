/// The normalized outcome of one dispatch: either the handler's content or a
/// user-visible error message. Produced exactly once per interaction and
/// consumed exactly once by delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseEnvelope {
    Content(String),
    Error(String),
}

impl ResponseEnvelope {
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// The text shown to the user. Error envelopes render their message as
    /// ordinary content so the platform always displays something.
    pub fn user_visible_text(&self) -> &str {
        match self {
            Self::Content(text) | Self::Error(text) => text,
        }
    }
}
