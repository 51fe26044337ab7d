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

use crate::Index;

/// A named entry of the cluster abstraction lookup: a concrete index, an
/// alias, or a data stream. Every abstraction name is unique across all three
/// variants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IndexAbstraction {
    ConcreteIndex {
        index: Index,
        /// Name of the data stream this index backs, if any.
        parent_data_stream: Option<String>,
        hidden: bool,
        system: bool,
    },
    Alias {
        name: String,
        indices: Vec<Index>,
        write_index: Option<Index>,
        hidden: bool,
        system: bool,
        /// True for aliases pointing at data streams rather than indices.
        data_stream_alias: bool,
    },
    DataStream {
        name: String,
        indices: Vec<Index>,
        write_index: Index,
        hidden: bool,
        system: bool,
        allow_custom_routing: bool,
    },
}

impl IndexAbstraction {
    pub fn name(&self) -> &str {
        match self {
            IndexAbstraction::ConcreteIndex { index, .. } => index.index_id(),
            IndexAbstraction::Alias { name, .. } => name,
            IndexAbstraction::DataStream { name, .. } => name,
        }
    }

    /// The backing indices of this abstraction. A concrete index backs itself.
    pub fn indices(&self) -> &[Index] {
        match self {
            IndexAbstraction::ConcreteIndex { index, .. } => std::slice::from_ref(index),
            IndexAbstraction::Alias { indices, .. } => indices,
            IndexAbstraction::DataStream { indices, .. } => indices,
        }
    }

    /// The index targeted by write operations. A concrete index is its own
    /// write index; an alias may not designate one.
    pub fn write_index(&self) -> Option<&Index> {
        match self {
            IndexAbstraction::ConcreteIndex { index, .. } => Some(index),
            IndexAbstraction::Alias { write_index, .. } => write_index.as_ref(),
            IndexAbstraction::DataStream { write_index, .. } => Some(write_index),
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            IndexAbstraction::ConcreteIndex { hidden, .. } => *hidden,
            IndexAbstraction::Alias { hidden, .. } => *hidden,
            IndexAbstraction::DataStream { hidden, .. } => *hidden,
        }
    }

    pub fn is_system(&self) -> bool {
        match self {
            IndexAbstraction::ConcreteIndex { system, .. } => *system,
            IndexAbstraction::Alias { system, .. } => *system,
            IndexAbstraction::DataStream { system, .. } => *system,
        }
    }

    pub fn is_alias(&self) -> bool {
        matches!(self, IndexAbstraction::Alias { .. })
    }

    pub fn is_data_stream(&self) -> bool {
        matches!(self, IndexAbstraction::DataStream { .. })
    }

    /// The name of the data stream a concrete index backs, if any.
    pub fn parent_data_stream(&self) -> Option<&str> {
        match self {
            IndexAbstraction::ConcreteIndex {
                parent_data_stream, ..
            } => parent_data_stream.as_deref(),
            _ => None,
        }
    }

    /// Whether this abstraction is a data stream or an alias over data streams.
    pub fn is_data_stream_related(&self) -> bool {
        match self {
            IndexAbstraction::ConcreteIndex { .. } => false,
            IndexAbstraction::Alias {
                data_stream_alias, ..
            } => *data_stream_alias,
            IndexAbstraction::DataStream { .. } => true,
        }
    }

    /// Human-readable kind, used in error messages.
    pub fn display_type(&self) -> &'static str {
        match self {
            IndexAbstraction::ConcreteIndex { .. } => "concrete index",
            IndexAbstraction::Alias { .. } => "alias",
            IndexAbstraction::DataStream { .. } => "data stream",
        }
    }
}
