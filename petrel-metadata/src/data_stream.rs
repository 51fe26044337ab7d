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

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A managed, ordered sequence of backing indices with a single write index.
/// Backing indices are referenced by index ID; the snapshot builder resolves
/// them and rejects dangling references.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataStream {
    pub name: String,
    #[serde(default = "DataStream::default_timestamp_field")]
    pub timestamp_field: String,
    /// Backing index IDs, oldest first. The write index is the last entry.
    pub backing_indices: Vec<String>,
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub allow_custom_routing: bool,
}

impl DataStream {
    pub fn new(name: &str, backing_indices: Vec<String>) -> Self {
        let generation = backing_indices.len() as u64;
        DataStream {
            name: name.to_string(),
            timestamp_field: Self::default_timestamp_field(),
            backing_indices,
            generation,
            hidden: false,
            system: false,
            allow_custom_routing: false,
        }
    }

    fn default_timestamp_field() -> String {
        "@timestamp".to_string()
    }

    /// The backing index targeted by write operations.
    pub fn write_index_id(&self) -> Option<&str> {
        self.backing_indices.last().map(String::as_str)
    }
}

/// An alias over one or more data streams, optionally designating a write
/// data stream for write targeting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataStreamAlias {
    pub name: String,
    pub data_streams: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_data_stream: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<JsonValue>,
}

impl DataStreamAlias {
    pub fn new(name: &str, data_streams: Vec<String>) -> Self {
        DataStreamAlias {
            name: name.to_string(),
            data_streams,
            write_data_stream: None,
            filter: None,
        }
    }

    /// Whether requests routed through this alias must apply its filter.
    pub fn filtering_required(&self) -> bool {
        self.filter.is_some()
    }
}
