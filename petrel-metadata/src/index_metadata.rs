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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::Index;

/// Lifecycle state of a concrete index.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexState {
    Open,
    Close,
}

/// The dynamic index settings read during expression resolution. Everything
/// else an index carries is opaque to this crate.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Frozen indices are excluded from resolution when `ignore_throttled` is set.
    #[serde(default, rename = "index.frozen")]
    pub frozen: bool,
    /// Hidden indices are excluded from default wildcard expansions.
    #[serde(default, rename = "index.hidden")]
    pub hidden: bool,
}

/// Metadata attached to an alias declaration on a single index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AliasMetadata {
    pub alias: String,
    /// Filter query attached to the alias, kept as raw JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_routing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_routing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_write_index: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_hidden: Option<bool>,
}

impl AliasMetadata {
    pub fn new(alias: &str) -> Self {
        AliasMetadata {
            alias: alias.to_string(),
            ..Default::default()
        }
    }

    /// Whether requests routed through this alias must apply its filter.
    pub fn filtering_required(&self) -> bool {
        self.filter.is_some()
    }

    /// The comma-separated search routing, split into individual values.
    pub fn search_routing_values(&self) -> Vec<&str> {
        self.search_routing
            .as_deref()
            .map(|routing| {
                routing
                    .split(',')
                    .map(str::trim)
                    .filter(|value| !value.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Per-index metadata: identity, state, settings, alias declarations, and the
/// system flag. Immutable for the duration of a resolution call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub index: Index,
    pub state: IndexState,
    #[serde(default)]
    pub settings: IndexSettings,
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasMetadata>,
    #[serde(default)]
    pub system: bool,
}

impl IndexMetadata {
    pub fn new(index: Index, state: IndexState) -> Self {
        IndexMetadata {
            index,
            state,
            settings: IndexSettings::default(),
            aliases: BTreeMap::new(),
            system: false,
        }
    }

    pub fn index_id(&self) -> &str {
        self.index.index_id()
    }

    pub fn is_hidden(&self) -> bool {
        self.settings.hidden
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    /// Returns an [`IndexMetadata`] object with a deterministic uid for tests.
    #[cfg(any(test, feature = "testsuite"))]
    pub fn for_test(index_id: &str, uid: u128) -> Self {
        IndexMetadata::new(Index::for_test(index_id, uid), IndexState::Open)
    }
}
