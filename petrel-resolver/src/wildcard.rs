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

//! Wildcard expansion: turns an ordered sequence of expressions bearing globs
//! and `-` exclusions into the resource names they match in the snapshot.

use indexmap::IndexSet;
use itertools::Either;
use petrel_metadata::pattern;
use petrel_metadata::{IndexAbstraction, IndexState, SystemIndexAccessLevel, ALL};

use crate::context::Context;
use crate::{IndicesOptions, ResolveError, ResolveResult};

/// The outcome of wildcard resolution. As long as every input expression is a
/// plain existing name, the input sequence is reused verbatim; the first
/// missing name, wildcard or exclusion collapses it into an owned working set.
#[derive(Debug)]
pub(crate) enum ResolvedExpressions<'a> {
    Shared(&'a [String]),
    Owned(IndexSet<String>),
}

impl ResolvedExpressions<'_> {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            ResolvedExpressions::Shared(expressions) => {
                Either::Left(expressions.iter().map(String::as_str))
            }
            ResolvedExpressions::Owned(names) => Either::Right(names.iter().map(String::as_str)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ResolvedExpressions::Shared(expressions) => expressions.len(),
            ResolvedExpressions::Owned(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Expands the (already date-math-resolved) `expressions` against the
/// snapshot. Returns the input unchanged when wildcard expansion is off, the
/// all-indices selection for empty or trivial (`_all`, `*`) input, and the
/// per-expression expansion otherwise.
pub(crate) fn resolve<'e>(
    context: &Context,
    expressions: &'e [String],
) -> ResolveResult<ResolvedExpressions<'e>> {
    if !context.options.expand_wildcard_expressions() {
        return Ok(ResolvedExpressions::Shared(expressions));
    }
    if is_empty_or_trivial_wildcard(expressions) {
        return Ok(ResolvedExpressions::Owned(resolve_all(context)));
    }
    inner_resolve(context, expressions)
}

fn is_empty_or_trivial_wildcard(expressions: &[String]) -> bool {
    expressions.is_empty()
        || (expressions.len() == 1
            && (expressions[0] == ALL || pattern::is_match_all_pattern(&expressions[0])))
}

/// All indices and, when the context includes them, all data streams,
/// honoring the open/closed/hidden and system access rules.
fn resolve_all(context: &Context) -> IndexSet<String> {
    let mut resolved: IndexSet<String> =
        resolve_empty_or_trivial_wildcard(context).into_iter().collect();
    if !context.include_data_streams {
        return resolved;
    }
    let data_streams: Vec<&IndexAbstraction> = context
        .snapshot
        .abstractions()
        .filter(|abstraction| abstraction.is_data_stream())
        .filter(|abstraction| {
            !abstraction.is_system() || context.system_access_allows(abstraction.name())
        })
        .filter(|abstraction| {
            context.options.expand_wildcards_hidden || !abstraction.is_hidden()
        })
        .collect();
    resolved.extend(expand_to_open_closed(context, data_streams));
    resolved
}

fn inner_resolve<'e>(
    context: &Context,
    expressions: &'e [String],
) -> ResolveResult<ResolvedExpressions<'e>> {
    let mut result: Option<IndexSet<String>> = None;
    let mut wildcard_seen = false;
    for (i, raw_expression) in expressions.iter().enumerate() {
        let mut expression = validate_alias_or_index(raw_expression)?;
        let missing_expression_error = alias_or_index_missing(context, expression);
        let Some(missing_expression_error) = missing_expression_error else {
            // The expression exists: on the shared fast path there is nothing
            // to do, the input sequence already carries it.
            if let Some(result) = result.as_mut() {
                result.insert(expression.to_string());
            }
            continue;
        };
        // First divergence: materialize the expressions seen so far, they all
        // exist but were never added.
        let result = result
            .get_or_insert_with(|| expressions[..i].iter().cloned().collect());
        let add = if expression.starts_with('-') && wildcard_seen {
            expression = &expression[1..];
            false
        } else {
            true
        };
        if !pattern::is_wildcard_pattern(expression) {
            if add {
                if !context.options.ignore_unavailable {
                    return Err(missing_expression_error);
                }
                result.insert(expression.to_string());
            } else {
                result.shift_remove(expression);
            }
        } else {
            wildcard_seen = true;
            let matching_resources = match_resources_to_wildcard(context, expression);
            let matching_names = expand_to_open_closed(context, matching_resources);
            if !context.options.allow_no_indices && matching_names.is_empty() {
                return Err(ResolveError::index_not_found(expression));
            }
            for name in matching_names {
                if add {
                    result.insert(name);
                } else {
                    result.shift_remove(&name);
                }
            }
        }
    }
    match result {
        // Every expression was a plain existing name: reuse the input.
        None => Ok(ResolvedExpressions::Shared(expressions)),
        Some(result) => Ok(ResolvedExpressions::Owned(result)),
    }
}

fn validate_alias_or_index(expression: &str) -> ResolveResult<&str> {
    if expression.is_empty() {
        return Err(ResolveError::invalid_expression(
            expression,
            "empty index name expressions are not supported",
        ));
    }
    // Leading underscores are reserved for APIs. Reaching this point means no
    // such API exists and the path was interpreted as an expression.
    if expression.starts_with('_') {
        return Err(ResolveError::invalid_expression(
            expression,
            "must not start with '_'",
        ));
    }
    Ok(expression)
}

/// Returns the error the expression would fail with if it had to exist:
/// missing from the snapshot, or present but forbidden by the options.
/// `None` means the expression is usable as-is.
fn alias_or_index_missing(context: &Context, expression: &str) -> Option<ResolveError> {
    let Some(abstraction) = context.snapshot.lookup(expression) else {
        return Some(ResolveError::index_not_found(expression));
    };
    if abstraction.is_alias() && context.options.ignore_aliases {
        return Some(ResolveError::AliasNotAllowed {
            expression: expression.to_string(),
        });
    }
    if abstraction.is_data_stream_related() && !context.include_data_streams {
        return Some(ResolveError::index_not_found(expression));
    }
    None
}

/// All the resources the wildcard matches, after the per-context filters.
/// Open/closed status is not considered here.
fn match_resources_to_wildcard<'a>(
    context: &Context<'a>,
    wildcard: &str,
) -> Vec<&'a IndexAbstraction> {
    debug_assert!(pattern::is_wildcard_pattern(wildcard));
    let candidates: Vec<&IndexAbstraction> = if pattern::is_suffix_wildcard_pattern(wildcard) {
        // Pre-filter with a range scan over the ordered lookup.
        context
            .snapshot
            .abstractions_with_prefix(&wildcard[..wildcard.len() - 1])
    } else if pattern::is_match_all_pattern(wildcard) {
        context.snapshot.abstractions().collect()
    } else {
        let regex = pattern::build_pattern_regex(wildcard);
        context
            .snapshot
            .abstractions()
            .filter(|abstraction| regex.is_match(abstraction.name()))
            .collect()
    };
    candidates
        .into_iter()
        .filter(|abstraction| !context.options.ignore_aliases || !abstraction.is_alias())
        .filter(|abstraction| {
            context.include_data_streams || !abstraction.is_data_stream_related()
        })
        // Historic (non-net-new) system resources are matched irrespective of
        // the access predicate; net-new and data-stream-owned ones are gated.
        .filter(|abstraction| {
            !abstraction.is_system()
                || (!abstraction.is_data_stream()
                    && abstraction.parent_data_stream().is_none()
                    && !context.is_net_new_system_index(abstraction.name()))
                || context.system_access_allows(abstraction.name())
        })
        .filter(|abstraction| {
            if context.options.expand_wildcards_hidden {
                return true;
            }
            if wildcard.starts_with('.') {
                // Hidden resources starting with "." are matched by wildcards
                // that also start with ".".
                return !abstraction.is_hidden() || abstraction.name().starts_with('.');
            }
            !abstraction.is_hidden()
        })
        .collect()
}

/// Expands each resource to names: the resource's own name when the context
/// preserves aliases or data streams, the backing index IDs filtered by
/// open/closed status otherwise.
fn expand_to_open_closed(
    context: &Context,
    resources: Vec<&IndexAbstraction>,
) -> Vec<String> {
    let exclude_state = exclude_state(&context.options);
    let mut names = Vec::new();
    for abstraction in resources {
        if context.preserve_aliases && abstraction.is_alias() {
            names.push(abstraction.name().to_string());
        } else if context.preserve_data_streams && abstraction.is_data_stream() {
            names.push(abstraction.name().to_string());
        } else {
            for index in abstraction.indices() {
                let index_metadata = context
                    .snapshot
                    .index_metadata(index.index_id())
                    .expect("backing index should exist in the snapshot");
                if exclude_state != Some(index_metadata.state) {
                    names.push(index.index_id().to_string());
                }
            }
        }
    }
    names
}

fn exclude_state(options: &IndicesOptions) -> Option<IndexState> {
    if options.expand_wildcards_open && options.expand_wildcards_closed {
        None
    } else if options.expand_wildcards_open {
        Some(IndexState::Close)
    } else if options.expand_wildcards_closed {
        Some(IndexState::Open)
    } else {
        debug_assert!(false, "should not be called when wildcards expand to none");
        None
    }
}

fn resolve_empty_or_trivial_wildcard(context: &Context) -> Vec<String> {
    let all_indices = all_indices_selection(&context.options, context);
    if context.system_index_access_level == SystemIndexAccessLevel::All {
        all_indices.to_vec()
    } else {
        filter_allowed_system_indices(context, all_indices)
    }
}

fn all_indices_selection<'a>(
    options: &IndicesOptions,
    context: &Context<'a>,
) -> &'a [String] {
    let snapshot = context.snapshot;
    if options.expand_wildcards_open && options.expand_wildcards_closed {
        if options.expand_wildcards_hidden {
            snapshot.concrete_all_indices()
        } else {
            snapshot.concrete_visible_indices()
        }
    } else if options.expand_wildcards_open {
        if options.expand_wildcards_hidden {
            snapshot.concrete_all_open_indices()
        } else {
            snapshot.concrete_visible_open_indices()
        }
    } else if options.expand_wildcards_closed {
        if options.expand_wildcards_hidden {
            snapshot.concrete_all_closed_indices()
        } else {
            snapshot.concrete_visible_closed_indices()
        }
    } else {
        &[]
    }
}

fn filter_allowed_system_indices(context: &Context, all_indices: &[String]) -> Vec<String> {
    all_indices
        .iter()
        .filter(|name| {
            if !name.starts_with('.') {
                return true;
            }
            let abstraction = context
                .snapshot
                .lookup(name)
                .expect("all-indices selection should be present in the lookup");
            if !abstraction.is_system() {
                return true;
            }
            if context.is_net_new_system_index(name) {
                if context.system_index_access_level
                    == SystemIndexAccessLevel::BackwardsCompatibleOnly
                {
                    return false;
                }
                return context.system_access_allows(name);
            }
            if abstraction.is_data_stream() || abstraction.parent_data_stream().is_some() {
                return context.system_access_allows(name);
            }
            true
        })
        .cloned()
        .collect()
}
