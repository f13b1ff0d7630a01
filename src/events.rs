use std::collections::VecDeque;
use std::fmt;

use crate::config::ConsoleConfig;

/// Lines the kernel shows on the operator console.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelEvent {
    SpriteCreated { name: String },
    Broadcast { message: String },
    Say { speaker: String, message: String },
    ScriptFault { entity: String, error: String },
    DocumentRejected { entity: String, error: String },
}

impl fmt::Display for KernelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelEvent::SpriteCreated { name } => write!(f, "Kernel: Created sprite <{name}>"),
            KernelEvent::Broadcast { message } => write!(f, "Broadcast: \"{message}\""),
            KernelEvent::Say { speaker, message } => write!(f, "[{speaker}] {message}"),
            KernelEvent::ScriptFault { entity, error } => write!(f, "Error in {entity}: {error}"),
            KernelEvent::DocumentRejected { entity, error } => {
                write!(f, "Error: script of {entity} rejected ({error})")
            }
        }
    }
}

/// Bounded operator console. The oldest line is dropped once full.
#[derive(Debug)]
pub struct Console {
    events: VecDeque<KernelEvent>,
    capacity: usize,
    echo: bool,
}

impl Console {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self { events: VecDeque::new(), capacity: config.capacity.max(1), echo: config.echo }
    }

    pub fn push(&mut self, event: KernelEvent) {
        if self.echo {
            tracing::info!(target: "console", "{event}");
        } else {
            tracing::debug!(target: "console", "{event}");
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<KernelEvent> {
        self.events.drain(..).collect()
    }

    pub fn events(&self) -> impl Iterator<Item = &KernelEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(&ConsoleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_render_like_the_editor_console() {
        let lines: Vec<String> = [
            KernelEvent::SpriteCreated { name: "Sprite1".into() },
            KernelEvent::Broadcast { message: "go".into() },
            KernelEvent::Say { speaker: "Cat".into(), message: "hi".into() },
        ]
        .iter()
        .map(ToString::to_string)
        .collect();
        assert_eq!(lines, ["Kernel: Created sprite <Sprite1>", "Broadcast: \"go\"", "[Cat] hi"]);
    }

    #[test]
    fn full_console_drops_oldest_line() {
        let mut console = Console::new(&ConsoleConfig { capacity: 2, echo: false });
        for name in ["a", "b", "c"] {
            console.push(KernelEvent::Broadcast { message: name.into() });
        }
        assert_eq!(console.len(), 2);
        let drained = console.drain();
        assert_eq!(drained[0], KernelEvent::Broadcast { message: "b".into() });
        assert!(console.is_empty());
    }
}
