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

//! `petrel-metadata` is the immutable cluster-metadata model read by the
//! Petrel index name resolver: concrete indices, aliases, data streams, the
//! ordered abstraction lookup, and the system-index registry.
//!
//! Nothing in this crate mutates cluster state. A [`ClusterSnapshot`] is
//! assembled once per cluster-state publication and borrowed read-only by
//! every resolution call it serves.

mod abstraction;
mod data_stream;
mod index;
mod index_metadata;
pub mod pattern;
mod snapshot;
mod system;

pub use abstraction::IndexAbstraction;
pub use data_stream::{DataStream, DataStreamAlias};
pub use index::{Index, IndexId, InvalidIndex, Ulid};
pub use index_metadata::{AliasMetadata, IndexMetadata, IndexSettings, IndexState};
pub use snapshot::{ClusterSnapshot, ClusterSnapshotBuilder, SnapshotError, ALL};
pub use system::{SystemIndexAccess, SystemIndexAccessLevel, SystemIndexRegistry};
