// Copyright (C) 2024 Quickwit, Inc.
//
// Quickwit is offered under the AGPL v3.0 and as commercial software.
// For commercial licensing, contact us at hello@quickwit.io.
//
// AGPL:
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

use std::fmt;
use std::sync::Mutex;

use tracing::warn;

/// Which surface a deprecated usage came through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeprecationCategory {
    Api,
    Settings,
}

impl fmt::Display for DeprecationCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeprecationCategory::Api => write!(f, "api"),
            DeprecationCategory::Settings => write!(f, "settings"),
        }
    }
}

/// Where deprecation events go. The sink is the only shared mutable
/// touch-point of the resolver and must be safe to call concurrently.
pub trait DeprecationSink: Send + Sync {
    fn emit(&self, category: DeprecationCategory, key: &str, message: &str);
}

/// Default sink: one `warn` event per deprecation, with the category and key
/// as structured fields.
#[derive(Debug, Default)]
pub struct TracingDeprecationSink;

impl DeprecationSink for TracingDeprecationSink {
    fn emit(&self, category: DeprecationCategory, key: &str, message: &str) {
        warn!(category=%category, key=key, "{message}");
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeprecationEvent {
    pub category: DeprecationCategory,
    pub key: String,
    pub message: String,
}

/// Sink buffering every event, for assertions in tests and for embedders that
/// forward deprecations to a response header.
#[derive(Debug, Default)]
pub struct CapturingDeprecationSink {
    events: Mutex<Vec<DeprecationEvent>>,
}

impl CapturingDeprecationSink {
    pub fn drain(&self) -> Vec<DeprecationEvent> {
        std::mem::take(&mut self.events.lock().expect("lock should not be poisoned"))
    }
}

impl DeprecationSink for CapturingDeprecationSink {
    fn emit(&self, category: DeprecationCategory, key: &str, message: &str) {
        self.events
            .lock()
            .expect("lock should not be poisoned")
            .push(DeprecationEvent {
                category,
                key: key.to_string(),
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capturing_sink() {
        let sink = CapturingDeprecationSink::default();
        sink.emit(DeprecationCategory::Api, "open_system_index_access", "hello");
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, DeprecationCategory::Api);
        assert_eq!(events[0].key, "open_system_index_access");
        assert!(sink.drain().is_empty());
    }
}
