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

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use thiserror::Error;

use crate::{
    AliasMetadata, DataStream, DataStreamAlias, Index, IndexAbstraction, IndexMetadata,
    IndexState,
};

/// The expression resolving to every index, alias and data stream.
pub const ALL: &str = "_all";

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum SnapshotError {
    #[error("abstraction name `{name}` is declared more than once")]
    DuplicateName { name: String },

    #[error("data stream `{referent}` references unknown backing index `{index_id}`")]
    UnknownIndex { referent: String, index_id: String },

    #[error("data stream alias `{referent}` references unknown data stream `{name}`")]
    UnknownDataStream { referent: String, name: String },

    #[error("data stream `{name}` has no backing indices")]
    EmptyDataStream { name: String },

    #[error("index `{index_id}` backs more than one data stream")]
    MultipleParentDataStreams { index_id: String },

    #[error("alias `{alias}` designates more than one write index")]
    MultipleWriteIndices { alias: String },

    #[error("alias `{alias}` must have the same is_hidden setting on all of its indices")]
    InconsistentAliasHidden { alias: String },
}

/// An immutable, self-consistent view over the cluster metadata: concrete
/// indices, aliases, data streams and data stream aliases, plus the ordered
/// abstraction lookup the resolver scans.
///
/// Snapshots are assembled through [`ClusterSnapshotBuilder`], which validates
/// the referential invariants once so that resolution never has to.
#[derive(Debug, Default)]
pub struct ClusterSnapshot {
    indices: BTreeMap<String, IndexMetadata>,
    data_streams: HashMap<String, DataStream>,
    data_stream_aliases: HashMap<String, DataStreamAlias>,
    lookup: BTreeMap<String, IndexAbstraction>,
    concrete_all_indices: Vec<String>,
    concrete_visible_indices: Vec<String>,
    concrete_all_open_indices: Vec<String>,
    concrete_visible_open_indices: Vec<String>,
    concrete_all_closed_indices: Vec<String>,
    concrete_visible_closed_indices: Vec<String>,
}

impl ClusterSnapshot {
    pub fn builder() -> ClusterSnapshotBuilder {
        ClusterSnapshotBuilder::default()
    }

    /// Looks an abstraction up by name.
    pub fn lookup(&self, name: &str) -> Option<&IndexAbstraction> {
        self.lookup.get(name)
    }

    pub fn has_index_abstraction(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// All abstractions, ordered by name.
    pub fn abstractions(&self) -> impl Iterator<Item = &IndexAbstraction> {
        self.lookup.values()
    }

    /// The abstractions whose name starts with `prefix`, resolved with a range
    /// scan over `[prefix, prefix⁺)` where `prefix⁺` increments the last
    /// codepoint of the prefix.
    pub fn abstractions_with_prefix(&self, prefix: &str) -> Vec<&IndexAbstraction> {
        let successor = prefix_successor(prefix);
        let upper_bound = match &successor {
            Some(successor) => Bound::Excluded(successor.as_str()),
            None => Bound::Unbounded,
        };
        self.lookup
            .range::<str, _>((Bound::Included(prefix), upper_bound))
            .map(|(_, abstraction)| abstraction)
            .collect()
    }

    pub fn index_metadata(&self, index_id: &str) -> Option<&IndexMetadata> {
        self.indices.get(index_id)
    }

    pub fn indices(&self) -> impl Iterator<Item = &IndexMetadata> {
        self.indices.values()
    }

    pub fn data_stream(&self, name: &str) -> Option<&DataStream> {
        self.data_streams.get(name)
    }

    pub fn data_stream_aliases(&self) -> &HashMap<String, DataStreamAlias> {
        &self.data_stream_aliases
    }

    /// The IDs of every concrete index.
    pub fn concrete_all_indices(&self) -> &[String] {
        &self.concrete_all_indices
    }

    /// The IDs of every non-hidden concrete index.
    pub fn concrete_visible_indices(&self) -> &[String] {
        &self.concrete_visible_indices
    }

    pub fn concrete_all_open_indices(&self) -> &[String] {
        &self.concrete_all_open_indices
    }

    pub fn concrete_visible_open_indices(&self) -> &[String] {
        &self.concrete_visible_open_indices
    }

    pub fn concrete_all_closed_indices(&self) -> &[String] {
        &self.concrete_all_closed_indices
    }

    pub fn concrete_visible_closed_indices(&self) -> &[String] {
        &self.concrete_visible_closed_indices
    }
}

fn prefix_successor(prefix: &str) -> Option<String> {
    let mut chars: Vec<char> = prefix.chars().collect();
    let last = chars.pop()?;
    let successor = char::from_u32(last as u32 + 1)?;
    chars.push(successor);
    Some(chars.into_iter().collect())
}

/// Assembles and validates a [`ClusterSnapshot`].
#[derive(Debug, Default)]
pub struct ClusterSnapshotBuilder {
    indices: Vec<IndexMetadata>,
    data_streams: Vec<DataStream>,
    data_stream_aliases: Vec<DataStreamAlias>,
}

impl ClusterSnapshotBuilder {
    pub fn add_index(mut self, index_metadata: IndexMetadata) -> Self {
        self.indices.push(index_metadata);
        self
    }

    pub fn add_data_stream(mut self, data_stream: DataStream) -> Self {
        self.data_streams.push(data_stream);
        self
    }

    pub fn add_data_stream_alias(mut self, data_stream_alias: DataStreamAlias) -> Self {
        self.data_stream_aliases.push(data_stream_alias);
        self
    }

    pub fn build(self) -> Result<ClusterSnapshot, SnapshotError> {
        let mut indices: BTreeMap<String, IndexMetadata> = BTreeMap::new();
        for index_metadata in self.indices {
            let index_id = index_metadata.index_id().to_string();
            if indices.insert(index_id.clone(), index_metadata).is_some() {
                return Err(SnapshotError::DuplicateName { name: index_id });
            }
        }

        let mut parents: HashMap<String, String> = HashMap::new();
        let mut data_streams: HashMap<String, DataStream> = HashMap::new();
        for data_stream in self.data_streams {
            if data_stream.backing_indices.is_empty() {
                return Err(SnapshotError::EmptyDataStream {
                    name: data_stream.name.clone(),
                });
            }
            if indices.contains_key(&data_stream.name)
                || data_streams.contains_key(&data_stream.name)
            {
                return Err(SnapshotError::DuplicateName {
                    name: data_stream.name.clone(),
                });
            }
            for index_id in &data_stream.backing_indices {
                if !indices.contains_key(index_id) {
                    return Err(SnapshotError::UnknownIndex {
                        referent: data_stream.name.clone(),
                        index_id: index_id.clone(),
                    });
                }
                if parents
                    .insert(index_id.clone(), data_stream.name.clone())
                    .is_some()
                {
                    return Err(SnapshotError::MultipleParentDataStreams {
                        index_id: index_id.clone(),
                    });
                }
            }
            data_streams.insert(data_stream.name.clone(), data_stream);
        }

        let mut data_stream_aliases: HashMap<String, DataStreamAlias> = HashMap::new();
        for alias in self.data_stream_aliases {
            if indices.contains_key(&alias.name)
                || data_streams.contains_key(&alias.name)
                || data_stream_aliases.contains_key(&alias.name)
            {
                return Err(SnapshotError::DuplicateName {
                    name: alias.name.clone(),
                });
            }
            for data_stream_name in alias
                .data_streams
                .iter()
                .chain(alias.write_data_stream.as_ref())
            {
                if !data_streams.contains_key(data_stream_name) {
                    return Err(SnapshotError::UnknownDataStream {
                        referent: alias.name.clone(),
                        name: data_stream_name.clone(),
                    });
                }
            }
            data_stream_aliases.insert(alias.name.clone(), alias);
        }

        let mut lookup: BTreeMap<String, IndexAbstraction> = BTreeMap::new();
        for (index_id, index_metadata) in &indices {
            lookup.insert(
                index_id.clone(),
                IndexAbstraction::ConcreteIndex {
                    index: index_metadata.index.clone(),
                    parent_data_stream: parents.get(index_id).cloned(),
                    hidden: index_metadata.is_hidden(),
                    system: index_metadata.is_system(),
                },
            );
        }

        // Alias declarations are scattered across their member indices. Group
        // them by alias name, in index order, before deriving the write index
        // and hidden flag.
        let mut alias_members: BTreeMap<String, Vec<(&IndexMetadata, &AliasMetadata)>> =
            BTreeMap::new();
        for index_metadata in indices.values() {
            for alias_metadata in index_metadata.aliases.values() {
                alias_members
                    .entry(alias_metadata.alias.clone())
                    .or_default()
                    .push((index_metadata, alias_metadata));
            }
        }
        for (alias, members) in alias_members {
            if lookup.contains_key(&alias)
                || data_streams.contains_key(&alias)
                || data_stream_aliases.contains_key(&alias)
            {
                return Err(SnapshotError::DuplicateName { name: alias });
            }
            let write_index = derive_alias_write_index(&alias, &members)?;
            let hidden = derive_alias_hidden(&alias, &members)?;
            let system = members
                .iter()
                .all(|(index_metadata, _)| index_metadata.is_system());
            let alias_indices: Vec<Index> = members
                .iter()
                .map(|(index_metadata, _)| index_metadata.index.clone())
                .collect();
            lookup.insert(
                alias.clone(),
                IndexAbstraction::Alias {
                    name: alias,
                    indices: alias_indices,
                    write_index,
                    hidden,
                    system,
                    data_stream_alias: false,
                },
            );
        }

        for data_stream in data_streams.values() {
            let backing: Vec<Index> = data_stream
                .backing_indices
                .iter()
                .map(|index_id| indices[index_id].index.clone())
                .collect();
            let write_index = backing
                .last()
                .expect("data stream backing indices should not be empty")
                .clone();
            lookup.insert(
                data_stream.name.clone(),
                IndexAbstraction::DataStream {
                    name: data_stream.name.clone(),
                    indices: backing,
                    write_index,
                    hidden: data_stream.hidden,
                    system: data_stream.system,
                    allow_custom_routing: data_stream.allow_custom_routing,
                },
            );
        }

        for alias in data_stream_aliases.values() {
            let mut alias_indices: Vec<Index> = Vec::new();
            for data_stream_name in &alias.data_streams {
                for index_id in &data_streams[data_stream_name].backing_indices {
                    alias_indices.push(indices[index_id].index.clone());
                }
            }
            let write_index = alias.write_data_stream.as_ref().map(|data_stream_name| {
                let write_index_id = data_streams[data_stream_name]
                    .write_index_id()
                    .expect("data stream backing indices should not be empty");
                indices[write_index_id].index.clone()
            });
            let system = alias
                .data_streams
                .iter()
                .all(|data_stream_name| data_streams[data_stream_name].system);
            lookup.insert(
                alias.name.clone(),
                IndexAbstraction::Alias {
                    name: alias.name.clone(),
                    indices: alias_indices,
                    write_index,
                    hidden: false,
                    system,
                    data_stream_alias: true,
                },
            );
        }

        let mut snapshot = ClusterSnapshot {
            indices,
            data_streams,
            data_stream_aliases,
            lookup,
            ..Default::default()
        };
        for index_metadata in snapshot.indices.values() {
            let index_id = index_metadata.index_id().to_string();
            let visible = !index_metadata.is_hidden();
            snapshot.concrete_all_indices.push(index_id.clone());
            if visible {
                snapshot.concrete_visible_indices.push(index_id.clone());
            }
            match index_metadata.state {
                IndexState::Open => {
                    snapshot.concrete_all_open_indices.push(index_id.clone());
                    if visible {
                        snapshot.concrete_visible_open_indices.push(index_id);
                    }
                }
                IndexState::Close => {
                    snapshot.concrete_all_closed_indices.push(index_id.clone());
                    if visible {
                        snapshot.concrete_visible_closed_indices.push(index_id);
                    }
                }
            }
        }
        Ok(snapshot)
    }
}

fn derive_alias_write_index(
    alias: &str,
    members: &[(&IndexMetadata, &AliasMetadata)],
) -> Result<Option<Index>, SnapshotError> {
    let mut write_indices = members
        .iter()
        .filter(|(_, alias_metadata)| alias_metadata.is_write_index == Some(true))
        .map(|(index_metadata, _)| &index_metadata.index);
    if let Some(write_index) = write_indices.next() {
        if write_indices.next().is_some() {
            return Err(SnapshotError::MultipleWriteIndices {
                alias: alias.to_string(),
            });
        }
        return Ok(Some(write_index.clone()));
    }
    // An alias over a single index writes to that index unless explicitly
    // opted out with is_write_index=false.
    if let [(index_metadata, alias_metadata)] = members {
        if alias_metadata.is_write_index != Some(false) {
            return Ok(Some(index_metadata.index.clone()));
        }
    }
    Ok(None)
}

fn derive_alias_hidden(
    alias: &str,
    members: &[(&IndexMetadata, &AliasMetadata)],
) -> Result<bool, SnapshotError> {
    let hidden_count = members
        .iter()
        .filter(|(_, alias_metadata)| alias_metadata.is_hidden == Some(true))
        .count();
    if hidden_count == 0 {
        Ok(false)
    } else if hidden_count == members.len() {
        Ok(true)
    } else {
        Err(SnapshotError::InconsistentAliasHidden {
            alias: alias.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IndexSettings;

    fn open_index(index_id: &str, uid: u128) -> IndexMetadata {
        IndexMetadata::for_test(index_id, uid)
    }

    #[test]
    fn test_build_lookup_and_concrete_lists() {
        let mut closed = open_index("logs-old", 3);
        closed.state = IndexState::Close;
        let mut hidden = open_index(".hidden-1", 4);
        hidden.settings = IndexSettings {
            hidden: true,
            frozen: false,
        };
        let snapshot = ClusterSnapshot::builder()
            .add_index(open_index("logs-1", 1))
            .add_index(open_index("logs-2", 2))
            .add_index(closed)
            .add_index(hidden)
            .build()
            .unwrap();

        assert!(snapshot.has_index_abstraction("logs-1"));
        assert!(!snapshot.has_index_abstraction("missing"));
        assert_eq!(
            snapshot.concrete_all_indices(),
            &[".hidden-1", "logs-1", "logs-2", "logs-old"]
        );
        assert_eq!(
            snapshot.concrete_visible_indices(),
            &["logs-1", "logs-2", "logs-old"]
        );
        assert_eq!(
            snapshot.concrete_all_open_indices(),
            &[".hidden-1", "logs-1", "logs-2"]
        );
        assert_eq!(snapshot.concrete_visible_open_indices(), &["logs-1", "logs-2"]);
        assert_eq!(snapshot.concrete_all_closed_indices(), &["logs-old"]);
        assert_eq!(snapshot.concrete_visible_closed_indices(), &["logs-old"]);
    }

    #[test]
    fn test_abstractions_with_prefix() {
        let snapshot = ClusterSnapshot::builder()
            .add_index(open_index("logs-1", 1))
            .add_index(open_index("logs-2", 2))
            .add_index(open_index("logt", 3))
            .add_index(open_index("metrics-1", 4))
            .build()
            .unwrap();
        let names: Vec<&str> = snapshot
            .abstractions_with_prefix("logs-")
            .iter()
            .map(|abstraction| abstraction.name())
            .collect();
        assert_eq!(names, vec!["logs-1", "logs-2"]);
    }

    #[test]
    fn test_alias_write_index_derivation() {
        let mut logs_1 = open_index("logs-1", 1);
        logs_1
            .aliases
            .insert("logs".to_string(), AliasMetadata::new("logs"));
        let mut logs_2 = open_index("logs-2", 2);
        let mut write_alias = AliasMetadata::new("logs");
        write_alias.is_write_index = Some(true);
        logs_2.aliases.insert("logs".to_string(), write_alias);

        let snapshot = ClusterSnapshot::builder()
            .add_index(logs_1)
            .add_index(logs_2)
            .build()
            .unwrap();
        let alias = snapshot.lookup("logs").unwrap();
        assert_eq!(alias.write_index().unwrap().index_id(), "logs-2");
        assert_eq!(alias.indices().len(), 2);
    }

    #[test]
    fn test_single_member_alias_is_implicit_write_index() {
        let mut logs_1 = open_index("logs-1", 1);
        logs_1
            .aliases
            .insert("logs".to_string(), AliasMetadata::new("logs"));
        let snapshot = ClusterSnapshot::builder().add_index(logs_1).build().unwrap();
        let alias = snapshot.lookup("logs").unwrap();
        assert_eq!(alias.write_index().unwrap().index_id(), "logs-1");

        let mut logs_2 = open_index("logs-2", 2);
        let mut opted_out = AliasMetadata::new("no-writes");
        opted_out.is_write_index = Some(false);
        logs_2.aliases.insert("no-writes".to_string(), opted_out);
        let snapshot = ClusterSnapshot::builder().add_index(logs_2).build().unwrap();
        assert!(snapshot.lookup("no-writes").unwrap().write_index().is_none());
    }

    #[test]
    fn test_duplicate_write_index_rejected() {
        let mut logs_1 = open_index("logs-1", 1);
        let mut write_alias = AliasMetadata::new("logs");
        write_alias.is_write_index = Some(true);
        logs_1.aliases.insert("logs".to_string(), write_alias.clone());
        let mut logs_2 = open_index("logs-2", 2);
        logs_2.aliases.insert("logs".to_string(), write_alias);

        let error = ClusterSnapshot::builder()
            .add_index(logs_1)
            .add_index(logs_2)
            .build()
            .unwrap_err();
        assert!(matches!(error, SnapshotError::MultipleWriteIndices { .. }));
    }

    #[test]
    fn test_data_stream_resolution() {
        let mut backing_1 = open_index(".ds-events-000001", 1);
        backing_1.settings.hidden = true;
        let mut backing_2 = open_index(".ds-events-000002", 2);
        backing_2.settings.hidden = true;
        let snapshot = ClusterSnapshot::builder()
            .add_index(backing_1)
            .add_index(backing_2)
            .add_data_stream(DataStream::new(
                "events",
                vec![
                    ".ds-events-000001".to_string(),
                    ".ds-events-000002".to_string(),
                ],
            ))
            .build()
            .unwrap();

        let data_stream = snapshot.lookup("events").unwrap();
        assert!(data_stream.is_data_stream());
        assert_eq!(
            data_stream.write_index().unwrap().index_id(),
            ".ds-events-000002"
        );
        let backing = snapshot.lookup(".ds-events-000001").unwrap();
        assert_eq!(backing.parent_data_stream(), Some("events"));
    }

    #[test]
    fn test_data_stream_alias_resolution() {
        let backing = open_index(".ds-events-000001", 1);
        let mut alias = DataStreamAlias::new("all-events", vec!["events".to_string()]);
        alias.write_data_stream = Some("events".to_string());
        let snapshot = ClusterSnapshot::builder()
            .add_index(backing)
            .add_data_stream(DataStream::new(
                "events",
                vec![".ds-events-000001".to_string()],
            ))
            .add_data_stream_alias(alias)
            .build()
            .unwrap();

        let abstraction = snapshot.lookup("all-events").unwrap();
        assert!(abstraction.is_alias());
        assert!(abstraction.is_data_stream_related());
        assert_eq!(
            abstraction.write_index().unwrap().index_id(),
            ".ds-events-000001"
        );
    }

    #[test]
    fn test_referential_validation() {
        let error = ClusterSnapshot::builder()
            .add_data_stream(DataStream::new("events", vec!["missing".to_string()]))
            .build()
            .unwrap_err();
        assert!(matches!(error, SnapshotError::UnknownIndex { .. }));

        let error = ClusterSnapshot::builder()
            .add_data_stream(DataStream::new("events", Vec::new()))
            .build()
            .unwrap_err();
        assert!(matches!(error, SnapshotError::EmptyDataStream { .. }));

        let error = ClusterSnapshot::builder()
            .add_data_stream_alias(DataStreamAlias::new("alias", vec!["events".to_string()]))
            .build()
            .unwrap_err();
        assert!(matches!(error, SnapshotError::UnknownDataStream { .. }));

        let error = ClusterSnapshot::builder()
            .add_index(open_index("logs-1", 1))
            .add_index(open_index("logs-1", 2))
            .build()
            .unwrap_err();
        assert!(matches!(error, SnapshotError::DuplicateName { .. }));
    }
}
