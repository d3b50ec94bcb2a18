//! Control-plane contract shared by the renderers and the output backends.
//!
//! Topics are relative to the configured MQTT topic prefix, e.g. a component
//! with prefix `plugin/clock` owning the topic `on` receives messages
//! published to `<topic_prefix>/plugin/clock/on`.

use crate::settings::Section;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("No component accepts topic '{0}'")]
    UnknownTopic(String),

    #[error(transparent)]
    Color(#[from] crate::color::ColorParseError),

    #[error("'{0}' is not a boolean")]
    Boolean(String),

    #[error("'{0}' is not a brightness between 0.0 and 1.0")]
    Brightness(String),

    #[error("Location must not be empty")]
    EmptyLocation,

    #[error("Payload is not valid UTF-8")]
    NotUtf8(#[source] std::str::Utf8Error),

    #[error("Setting '{section}.{key}' is invalid")]
    Setting {
        section: &'static str,
        key: &'static str,
        #[source]
        source: Box<ValidationError>,
    },
}

/// A component whose settings can be changed at runtime.
///
/// `handle_message` validates the payload completely before replacing the
/// settings of the component, so a rejected message leaves no trace.
pub trait Controllable {
    /// Section of the persisted settings owned by this component.
    fn section(&self) -> &'static str;

    fn topic_prefix(&self) -> &'static str;

    fn control_topics(&self) -> &'static [&'static str];

    fn handle_message(&mut self, topic: &str, payload: &str) -> Result<(), ValidationError>;

    /// Current settings in their persisted form.
    fn persisted(&self) -> Section;
}

/// Topics of all `targets`, relative to the MQTT topic prefix.
pub fn subscriptions<'a, I>(targets: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a dyn Controllable>,
{
    targets
        .into_iter()
        .flat_map(|target| {
            let prefix = target.topic_prefix();
            target
                .control_topics()
                .iter()
                .map(move |topic| format!("{prefix}/{topic}"))
        })
        .collect()
}

/// Hands `message` to the component owning its topic, returns that component's section.
pub fn route<'a, I>(targets: I, message: &ControlMessage) -> Result<&'static str, ValidationError>
where
    I: IntoIterator<Item = &'a mut dyn Controllable>,
{
    for target in targets {
        let Some(topic) = message
            .topic
            .strip_prefix(target.topic_prefix())
            .and_then(|rest| rest.strip_prefix('/'))
        else {
            continue;
        };

        if !target.control_topics().iter().any(|owned| *owned == topic) {
            break;
        }

        target.handle_message(topic, &message.payload)?;
        return Ok(target.section());
    }

    Err(ValidationError::UnknownTopic(message.topic.clone()))
}

pub fn parse_bool(payload: &str) -> Result<bool, ValidationError> {
    match payload.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" => Ok(false),
        _ => Err(ValidationError::Boolean(payload.to_string())),
    }
}

/// Out of range values are clamped, non-numbers are rejected.
pub fn parse_brightness(payload: &str) -> Result<f32, ValidationError> {
    payload
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|brightness| brightness.is_finite())
        .map(|brightness| brightness.clamp(0.0, 1.0))
        .ok_or_else(|| ValidationError::Brightness(payload.to_string()))
}

pub fn parse_location(payload: &str) -> Result<String, ValidationError> {
    let location = payload.trim();
    if location.is_empty() {
        return Err(ValidationError::EmptyLocation);
    }
    Ok(location.to_string())
}
