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

//! Per-index alias selection over a pre-resolved expression set.

use std::collections::HashSet;

use petrel_metadata::{AliasMetadata, ClusterSnapshot, DataStreamAlias, ALL};

use crate::{ResolveError, ResolveResult};

pub(crate) fn is_all_indices_set(resolved_expressions: &HashSet<String>) -> bool {
    resolved_expressions.is_empty()
        || (resolved_expressions.len() == 1 && resolved_expressions.contains(ALL))
}

/// Whether to generate the candidate set from the index's aliases or from the
/// resolved expressions: iterate the smaller side.
pub(crate) fn iterate_index_aliases(
    index_aliases_count: usize,
    resolved_expressions_count: usize,
) -> bool {
    index_aliases_count <= resolved_expressions_count
}

/// Selects the aliases of `index` that are present in `resolved_expressions`
/// and satisfy the caller predicates. Returns `None` when no alias filtering
/// applies: the expression set is the all-indices form, the index itself was
/// addressed directly, a non-required alias wins, or nothing accumulated.
///
/// The expressions must have been resolved beforehand with aliases preserved.
pub(crate) fn index_aliases(
    snapshot: &ClusterSnapshot,
    index: &str,
    required_alias: &dyn Fn(&AliasMetadata) -> bool,
    required_data_stream_alias: &dyn Fn(&DataStreamAlias) -> bool,
    skip_identity: bool,
    resolved_expressions: &HashSet<String>,
) -> ResolveResult<Option<Vec<String>>> {
    if is_all_indices_set(resolved_expressions) {
        return Ok(None);
    }
    let index_metadata = snapshot
        .index_metadata(index)
        .ok_or_else(|| ResolveError::index_not_found(index))?;

    if !skip_identity && resolved_expressions.contains(index) {
        return Ok(None);
    }

    let abstraction = snapshot
        .lookup(index)
        .expect("concrete index should be present in the lookup");
    if let Some(parent_data_stream) = abstraction.parent_data_stream() {
        let data_stream_aliases = snapshot.data_stream_aliases();
        let candidates: Vec<&DataStreamAlias> = if iterate_index_aliases(
            data_stream_aliases.len(),
            resolved_expressions.len(),
        ) {
            data_stream_aliases
                .values()
                .filter(|alias| resolved_expressions.contains(&alias.name))
                .collect()
        } else {
            resolved_expressions
                .iter()
                .filter_map(|expression| data_stream_aliases.get(expression))
                .collect()
        };
        let mut aliases: Vec<String> = candidates
            .into_iter()
            .filter(|alias| {
                alias
                    .data_streams
                    .iter()
                    .any(|data_stream| data_stream == parent_data_stream)
            })
            .filter(|alias| required_data_stream_alias(alias))
            .map(|alias| alias.name.clone())
            .collect();
        if aliases.is_empty() {
            return Ok(None);
        }
        aliases.sort_unstable();
        return Ok(Some(aliases));
    }

    let index_aliases = &index_metadata.aliases;
    let candidates: Vec<&AliasMetadata> =
        if iterate_index_aliases(index_aliases.len(), resolved_expressions.len()) {
            index_aliases
                .values()
                .filter(|alias_metadata| resolved_expressions.contains(&alias_metadata.alias))
                .collect()
        } else {
            resolved_expressions
                .iter()
                .filter_map(|expression| index_aliases.get(expression))
                .collect()
        };
    let mut aliases: Option<Vec<String>> = None;
    for alias_metadata in candidates {
        if required_alias(alias_metadata) {
            aliases
                .get_or_insert_with(Vec::new)
                .push(alias_metadata.alias.clone());
        } else {
            // A non-required alias addresses the index without filtering: the
            // unfiltered path wins.
            return Ok(None);
        }
    }
    let Some(mut aliases) = aliases else {
        return Ok(None);
    };
    aliases.sort_unstable();
    Ok(Some(aliases))
}
