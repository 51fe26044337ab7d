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

//! Search-routing projection: maps each concrete index matched by the
//! expressions to the routing values effectively applying to it.

use std::collections::{HashMap, HashSet};

use petrel_metadata::{ClusterSnapshot, IndexAbstraction};

use crate::context::Context;
use crate::{date_math, wildcard, ResolveResult};

pub(crate) fn split_routing_values(routing: &str) -> HashSet<String> {
    routing
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves the routing values per concrete index for the given expressions.
/// Aliases contribute their per-index search routing intersected with the
/// caller routing; everything else takes the caller routing as-is. `None`
/// means no index requires routing.
pub(crate) fn resolve_search_routing(
    context: &Context,
    routing: Option<&str>,
    expressions: &[String],
) -> ResolveResult<Option<HashMap<String, HashSet<String>>>> {
    let rewritten = date_math::resolve(context, expressions)?;
    let resolved = wildcard::resolve(context, &rewritten)?;
    let resolved_names: Vec<&str> = resolved.iter().collect();
    if resolved_names.is_empty()
        || (resolved_names.len() == 1 && resolved_names[0] == petrel_metadata::ALL)
    {
        return Ok(resolve_search_routing_all_indices(context.snapshot, routing));
    }

    let param_routing: Option<HashSet<String>> = routing.map(split_routing_values);
    let mut routings: Option<HashMap<String, HashSet<String>>> = None;
    // Indices settled as requiring no alias routing.
    let mut no_routing: HashSet<String> = HashSet::new();

    for expression in resolved_names {
        let abstraction = context.snapshot.lookup(expression);
        match abstraction {
            Some(abstraction @ IndexAbstraction::Alias { .. }) => {
                for index in abstraction.indices() {
                    let concrete_index = index.index_id();
                    if no_routing.contains(concrete_index) {
                        continue;
                    }
                    let search_routing_values: Vec<&str> = context
                        .snapshot
                        .index_metadata(concrete_index)
                        .and_then(|index_metadata| {
                            index_metadata.aliases.get(abstraction.name())
                        })
                        .map(|alias_metadata| alias_metadata.search_routing_values())
                        .unwrap_or_default();
                    if !search_routing_values.is_empty() {
                        let routings = routings.get_or_insert_with(HashMap::new);
                        let values = routings
                            .entry(concrete_index.to_string())
                            .or_default();
                        values.extend(
                            search_routing_values.iter().map(|value| value.to_string()),
                        );
                        if let Some(param_routing) = &param_routing {
                            values.retain(|value| param_routing.contains(value));
                        }
                        if values.is_empty() {
                            routings.remove(concrete_index);
                        }
                    } else {
                        collect_routings(
                            &mut routings,
                            param_routing.as_ref(),
                            &mut no_routing,
                            concrete_index,
                        );
                    }
                }
            }
            Some(
                abstraction @ IndexAbstraction::DataStream {
                    allow_custom_routing,
                    ..
                },
            ) => {
                if !*allow_custom_routing {
                    continue;
                }
                for index in abstraction.indices() {
                    collect_routings(
                        &mut routings,
                        param_routing.as_ref(),
                        &mut no_routing,
                        index.index_id(),
                    );
                }
            }
            _ => {
                collect_routings(
                    &mut routings,
                    param_routing.as_ref(),
                    &mut no_routing,
                    expression,
                );
            }
        }
    }
    Ok(routings.filter(|routings| !routings.is_empty()))
}

fn collect_routings(
    routings: &mut Option<HashMap<String, HashSet<String>>>,
    param_routing: Option<&HashSet<String>>,
    no_routing: &mut HashSet<String>,
    concrete_index: &str,
) {
    if no_routing.insert(concrete_index.to_string()) {
        if let Some(param_routing) = param_routing {
            routings
                .get_or_insert_with(HashMap::new)
                .insert(concrete_index.to_string(), param_routing.clone());
        } else if let Some(routings) = routings {
            routings.remove(concrete_index);
        }
    }
}

/// Applies the caller routing to every concrete index of the snapshot, or
/// `None` when no routing was given.
pub(crate) fn resolve_search_routing_all_indices(
    snapshot: &ClusterSnapshot,
    routing: Option<&str>,
) -> Option<HashMap<String, HashSet<String>>> {
    let routing_values = split_routing_values(routing?);
    let routings = snapshot
        .concrete_all_indices()
        .iter()
        .map(|index_id| (index_id.clone(), routing_values.clone()))
        .collect();
    Some(routings)
}
