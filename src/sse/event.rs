use std::time::Duration;

/// A single event read from a `text/event-stream` body.
///
/// Fields that never appeared in the event are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Value of the last `id:` field.
    pub id: String,
    /// Value of the last `event:` field.
    pub event: String,
    /// All `data:` values, joined by `\n` in arrival order.
    pub data: String,
    /// Reconnection delay advertised by the last valid `retry:` field.
    pub retry: Option<Duration>,
}

impl Event {
    /// Decode the data payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Accumulates fields until a blank line completes the event.
#[derive(Debug, Default)]
pub(crate) struct EventBuilder {
    event: Event,
    has_data: bool,
    has_fields: bool,
}

impl EventBuilder {
    /// Apply one `name: value` field. Unknown names are ignored.
    pub(crate) fn add_field(&mut self, name: &str, value: &str) {
        match name {
            "id" => self.event.id = value.to_string(),
            "event" => self.event.event = value.to_string(),
            "data" => {
                if self.has_data {
                    self.event.data.push('\n');
                }
                self.event.data.push_str(value);
                self.has_data = true;
            },
            "retry" => match value.parse::<u64>() {
                Ok(ms) => self.event.retry = Some(Duration::from_millis(ms)),
                Err(_) => return,
            },
            _ => return,
        }
        self.has_fields = true;
    }

    pub(crate) fn is_empty(&self) -> bool {
        !self.has_fields
    }

    /// Hand out the accumulated event and reset the builder.
    pub(crate) fn take(&mut self) -> Event {
        std::mem::take(self).event
    }
}
