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

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexSet;
use itertools::Itertools;
use petrel_metadata::{
    AliasMetadata, ClusterSnapshot, DataStreamAlias, Index, IndexAbstraction, IndexMetadata,
    IndexState, SystemIndexAccess, SystemIndexAccessLevel, SystemIndexRegistry, ALL,
};
use time::OffsetDateTime;

use crate::context::{AccessPredicate, Context};
use crate::deprecation::{DeprecationCategory, DeprecationSink, TracingDeprecationSink};
use crate::{
    aliases, date_math, routing, wildcard, IndicesOptions, ResolveError, ResolveResult,
};

/// Whether the expression collection refers to all indices: empty, or the
/// single explicit `_all` token.
pub fn is_all_indices<S: AsRef<str>>(aliases_or_indices: &[S]) -> bool {
    aliases_or_indices.is_empty() || is_explicit_all_pattern(aliases_or_indices)
}

/// Whether the expression collection is the single explicit `_all` token.
pub fn is_explicit_all_pattern<S: AsRef<str>>(aliases_or_indices: &[S]) -> bool {
    aliases_or_indices.len() == 1 && aliases_or_indices[0].as_ref() == ALL
}

fn current_time_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// Translates index expressions (wildcards, exclusions, date math, aliases,
/// data streams) into concrete, deduplicated backing indices under the
/// per-request [`IndicesOptions`].
///
/// The resolver itself is cheap to construct: one per request context, around
/// a shared system-index registry and deprecation sink. Every operation is
/// synchronous and leaves the snapshot untouched.
pub struct IndexExpressionResolver {
    system_index_registry: Arc<SystemIndexRegistry>,
    system_index_access: SystemIndexAccess,
    deprecation_sink: Arc<dyn DeprecationSink>,
}

impl IndexExpressionResolver {
    pub fn new(
        system_index_registry: Arc<SystemIndexRegistry>,
        system_index_access: SystemIndexAccess,
    ) -> Self {
        IndexExpressionResolver {
            system_index_registry,
            system_index_access,
            deprecation_sink: Arc::new(TracingDeprecationSink),
        }
    }

    pub fn with_deprecation_sink(mut self, deprecation_sink: Arc<dyn DeprecationSink>) -> Self {
        self.deprecation_sink = deprecation_sink;
        self
    }

    fn context<'a>(
        &'a self,
        snapshot: &'a ClusterSnapshot,
        options: IndicesOptions,
    ) -> Context<'a> {
        Context::new(
            snapshot,
            options,
            current_time_ms(),
            &self.system_index_registry,
            &self.system_index_access,
        )
    }

    /// Translates the provided index expressions into concrete index IDs,
    /// properly deduplicated.
    pub fn concrete_index_names(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        include_data_streams: bool,
        index_expressions: &[&str],
    ) -> ResolveResult<Vec<String>> {
        let indices =
            self.concrete_indices(snapshot, options, include_data_streams, index_expressions)?;
        Ok(indices
            .into_iter()
            .map(|index| index.index_id)
            .collect())
    }

    /// Same as [`Self::concrete_index_names`], but access to system indices
    /// is always allowed while net-new system indices stay hidden.
    pub fn concrete_index_names_with_system_index_access(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        include_data_streams: bool,
        index_expressions: &[&str],
    ) -> ResolveResult<Vec<String>> {
        let context = self
            .context(snapshot, options)
            .include_data_streams(include_data_streams)
            .override_system_access(
                SystemIndexAccessLevel::BackwardsCompatibleOnly,
                AccessPredicate::Always,
            );
        let expressions = to_owned_expressions(index_expressions);
        let indices = self.concrete_indices_in_context(&context, &expressions)?;
        Ok(indices
            .into_iter()
            .map(|index| index.index_id)
            .collect())
    }

    /// Translates the provided index expressions into concrete indices,
    /// properly deduplicated, preserving first-occurrence order.
    pub fn concrete_indices(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        include_data_streams: bool,
        index_expressions: &[&str],
    ) -> ResolveResult<Vec<Index>> {
        let context = self
            .context(snapshot, options)
            .include_data_streams(include_data_streams);
        let expressions = to_owned_expressions(index_expressions);
        self.concrete_indices_in_context(&context, &expressions)
    }

    /// Same as [`Self::concrete_indices`], with an explicit request start
    /// time (milliseconds since the epoch) driving date-math resolution.
    pub fn concrete_indices_at(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        include_data_streams: bool,
        start_time_ms: i64,
        index_expressions: &[&str],
    ) -> ResolveResult<Vec<Index>> {
        let context = Context::new(
            snapshot,
            options,
            start_time_ms,
            &self.system_index_registry,
            &self.system_index_access,
        )
        .include_data_streams(include_data_streams);
        let expressions = to_owned_expressions(index_expressions);
        self.concrete_indices_in_context(&context, &expressions)
    }

    /// The names of the data streams the expressions resolve to.
    pub fn data_stream_names(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        index_expressions: &[&str],
    ) -> ResolveResult<Vec<String>> {
        let context = self
            .context(snapshot, options)
            .include_data_streams(true)
            .preserve_data_streams(true);
        let expressions = if index_expressions.is_empty() {
            vec!["*".to_string()]
        } else {
            to_owned_expressions(index_expressions)
        };
        let rewritten = date_math::resolve(&context, &expressions)?;
        let resolved = wildcard::resolve(&context, &rewritten)?;
        let data_stream_names = resolved
            .iter()
            .filter_map(|name| snapshot.lookup(name))
            .filter(|abstraction| abstraction.is_data_stream())
            .map(|abstraction| abstraction.name().to_string())
            .collect();
        Ok(data_stream_names)
    }

    /// Resolves the abstraction a write request targets. The resolution must
    /// narrow to exactly one abstraction; an alias must designate a write
    /// index, and the write index must pass the system access gate.
    pub fn resolve_write_abstraction(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        index_expression: &str,
        include_data_streams: bool,
    ) -> ResolveResult<IndexAbstraction> {
        let context = self
            .context(snapshot, options)
            .include_data_streams(include_data_streams);
        let expressions = vec![index_expression.to_string()];
        let rewritten = date_math::resolve(&context, &expressions)?;
        let resolved = wildcard::resolve(&context, &rewritten)?;
        if resolved.len() != 1 {
            return Err(ResolveError::SingleTargetRequired {
                expression: index_expression.to_string(),
                resolved: resolved.len(),
            });
        }
        let name = resolved.iter().next().expect("resolved should hold one name");
        let Some(abstraction) = snapshot.lookup(name) else {
            return Err(ResolveError::index_not_found(name));
        };
        if abstraction.is_alias() && abstraction.write_index().is_none() {
            return Err(ResolveError::NoWriteIndex {
                alias: abstraction.name().to_string(),
            });
        }
        let write_index = abstraction
            .write_index()
            .expect("non-alias abstractions always define a write index");
        self.check_system_index_access(&context, [write_index])?;
        Ok(abstraction.clone())
    }

    /// Resolves an expression to its single concrete index. Fails unless the
    /// resolution narrows to exactly one index.
    pub fn concrete_single_index(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        index_expression: &str,
    ) -> ResolveResult<Index> {
        let mut indices =
            self.concrete_indices(snapshot, options, false, &[index_expression])?;
        if indices.len() != 1 {
            return Err(ResolveError::SingleTargetRequired {
                expression: index_expression.to_string(),
                resolved: indices.len(),
            });
        }
        Ok(indices.remove(0))
    }

    /// Resolves an expression to its single concrete write index. `None` is
    /// returned when nothing resolved and `allow_no_indices` permits it.
    pub fn concrete_write_index(
        &self,
        snapshot: &ClusterSnapshot,
        options: IndicesOptions,
        index_expression: &str,
        allow_no_indices: bool,
        include_data_streams: bool,
    ) -> ResolveResult<Option<Index>> {
        let combined_options = IndicesOptions {
            allow_no_indices,
            ..options
        };
        let context = self
            .context(snapshot, combined_options)
            .resolve_to_write_index(true)
            .include_data_streams(include_data_streams);
        let expressions = vec![index_expression.to_string()];
        let mut indices = self.concrete_indices_in_context(&context, &expressions)?;
        if allow_no_indices && indices.is_empty() {
            return Ok(None);
        }
        if indices.len() != 1 {
            return Err(ResolveError::SingleTargetRequired {
                expression: index_expression.to_string(),
                resolved: indices.len(),
            });
        }
        Ok(Some(indices.remove(0)))
    }

    /// Whether the specified index, data stream or alias exists, resolving
    /// date math first.
    pub fn has_index_abstraction(
        &self,
        index_abstraction: &str,
        snapshot: &ClusterSnapshot,
    ) -> ResolveResult<bool> {
        let resolved = date_math::resolve_expression(index_abstraction, current_time_ms())?;
        Ok(snapshot.has_index_abstraction(&resolved))
    }

    /// Rewrites a date-math expression against the current clock. Expressions
    /// without date math pass through unchanged.
    pub fn resolve_date_math_expression(index_expression: &str) -> ResolveResult<String> {
        date_math::resolve_expression(index_expression, current_time_ms())
    }

    /// Rewrites a date-math expression against the given clock (milliseconds
    /// since the epoch).
    pub fn resolve_date_math_expression_at(
        index_expression: &str,
        time_ms: i64,
    ) -> ResolveResult<String> {
        date_math::resolve_expression(index_expression, time_ms)
    }

    /// Resolves the expressions to the set of indices, aliases and data
    /// streams they match, with lenient options: wildcards expand to open and
    /// hidden resources, alias and data stream names are preserved.
    pub fn resolve_expressions(
        &self,
        snapshot: &ClusterSnapshot,
        expressions: &[&str],
    ) -> ResolveResult<HashSet<String>> {
        let context = self
            .context(snapshot, IndicesOptions::lenient_expand_open_hidden())
            .preserve_aliases(true)
            .include_data_streams(true);
        let expressions = to_owned_expressions(expressions);
        let rewritten = date_math::resolve(&context, &expressions)?;
        let resolved = wildcard::resolve(&context, &rewritten)?;
        Ok(resolved.iter().map(str::to_string).collect())
    }

    /// Selects the effective filtering aliases for `index` out of a set of
    /// expressions resolved with [`Self::resolve_expressions`]. `None` means
    /// no filtering is required.
    pub fn filtering_aliases(
        &self,
        snapshot: &ClusterSnapshot,
        index: &str,
        resolved_expressions: &HashSet<String>,
    ) -> ResolveResult<Option<Vec<String>>> {
        self.index_aliases(
            snapshot,
            index,
            &AliasMetadata::filtering_required,
            &DataStreamAlias::filtering_required,
            false,
            resolved_expressions,
        )
    }

    /// Selects the aliases of `index`, out of the resolved expressions, that
    /// satisfy the caller predicates. A candidate failing its predicate means
    /// the index is addressed without the alias requirement: `None` wins.
    pub fn index_aliases(
        &self,
        snapshot: &ClusterSnapshot,
        index: &str,
        required_alias: &dyn Fn(&AliasMetadata) -> bool,
        required_data_stream_alias: &dyn Fn(&DataStreamAlias) -> bool,
        skip_identity: bool,
        resolved_expressions: &HashSet<String>,
    ) -> ResolveResult<Option<Vec<String>>> {
        aliases::index_aliases(
            snapshot,
            index,
            required_alias,
            required_data_stream_alias,
            skip_identity,
            resolved_expressions,
        )
    }

    /// Resolves the search routing values applying to each concrete index the
    /// expressions match. `None` means no index requires routing.
    pub fn resolve_search_routing(
        &self,
        snapshot: &ClusterSnapshot,
        routing: Option<&str>,
        expressions: &[&str],
    ) -> ResolveResult<Option<HashMap<String, HashSet<String>>>> {
        let context = self
            .context(snapshot, IndicesOptions::lenient_expand_open())
            .include_data_streams(true);
        let expressions = to_owned_expressions(expressions);
        routing::resolve_search_routing(&context, routing, &expressions)
    }

    /// Applies the caller routing to every concrete index of the snapshot.
    pub fn resolve_search_routing_all_indices(
        snapshot: &ClusterSnapshot,
        routing: Option<&str>,
    ) -> Option<HashMap<String, HashSet<String>>> {
        routing::resolve_search_routing_all_indices(snapshot, routing)
    }

    fn concrete_indices_in_context(
        &self,
        context: &Context,
        index_expressions: &[String],
    ) -> ResolveResult<Vec<Index>> {
        let options = &context.options;
        let all_expression = [ALL.to_string()];
        let expressions: &[String] = if index_expressions.is_empty() {
            &all_expression
        } else {
            if !options.ignore_unavailable {
                let cross_cluster_expressions: Vec<String> = index_expressions
                    .iter()
                    .filter(|expression| expression.contains(':'))
                    .cloned()
                    .collect();
                if !cross_cluster_expressions.is_empty() {
                    return Err(ResolveError::CrossClusterUnsupported {
                        expressions: cross_cluster_expressions,
                    });
                }
            }
            index_expressions
        };
        // Whether a missing expression fails the request historically depends
        // on the expression count: `allow_no_indices` governs a single
        // expression, `ignore_unavailable` governs several. Kept for
        // compatibility.
        let fail_no_indices = if expressions.len() == 1 {
            !options.allow_no_indices
        } else {
            !options.ignore_unavailable
        };
        let rewritten = date_math::resolve(context, expressions)?;
        let resolved = wildcard::resolve(context, &rewritten)?;

        if resolved.is_empty() {
            if !options.allow_no_indices {
                return Err(ResolveError::IndexNotFound {
                    resources: expressions.to_vec(),
                    excluded_data_streams: false,
                });
            }
            return Ok(Vec::new());
        }

        let mut excluded_data_streams = false;
        let mut concrete_indices: IndexSet<Index> = IndexSet::with_capacity(resolved.len());
        for expression in resolved.iter() {
            let Some(abstraction) = context.snapshot.lookup(expression) else {
                if fail_no_indices {
                    return Err(ResolveError::index_not_found(expression));
                }
                continue;
            };
            if abstraction.is_alias() && options.ignore_aliases {
                if fail_no_indices {
                    return Err(ResolveError::AliasNotAllowed {
                        expression: expression.to_string(),
                    });
                }
                continue;
            }
            if abstraction.is_data_stream_related() && !context.include_data_streams {
                excluded_data_streams = true;
                continue;
            }

            if abstraction.is_alias() && context.resolve_to_write_index {
                let Some(write_index) = abstraction.write_index() else {
                    return Err(ResolveError::NoWriteIndex {
                        alias: abstraction.name().to_string(),
                    });
                };
                if admit_index(context, self.index_metadata(context, write_index)) {
                    concrete_indices.insert(write_index.clone());
                }
            } else if abstraction.is_data_stream() && context.resolve_to_write_index {
                let write_index = abstraction
                    .write_index()
                    .expect("data streams always define a write index");
                if admit_index(context, self.index_metadata(context, write_index)) {
                    concrete_indices.insert(write_index.clone());
                }
            } else {
                if abstraction.indices().len() > 1 && !options.allow_aliases_to_multiple_indices
                {
                    let index_ids: Vec<String> = abstraction
                        .indices()
                        .iter()
                        .map(|index| index.index_id().to_string())
                        .collect();
                    return Err(ResolveError::MultipleIndicesForbidden {
                        kind: abstraction.display_type().to_string(),
                        expression: expression.to_string(),
                        indices: index_ids,
                    });
                }
                for index in abstraction.indices() {
                    if self.should_track_concrete_index(context, index)? {
                        concrete_indices.insert(index.clone());
                    }
                }
            }
        }

        if !options.allow_no_indices && concrete_indices.is_empty() {
            return Err(ResolveError::IndexNotFound {
                resources: expressions.to_vec(),
                excluded_data_streams,
            });
        }
        self.check_system_index_access(context, concrete_indices.iter())?;
        Ok(concrete_indices.into_iter().collect())
    }

    fn index_metadata<'a>(&self, context: &Context<'a>, index: &Index) -> &'a IndexMetadata {
        context
            .snapshot
            .index_metadata(index.index_id())
            .expect("concrete index should exist in the snapshot")
    }

    fn should_track_concrete_index(
        &self,
        context: &Context,
        index: &Index,
    ) -> ResolveResult<bool> {
        if context.system_index_access_level == SystemIndexAccessLevel::BackwardsCompatibleOnly
            && context.is_net_new_system_index(index.index_id())
        {
            // Net-new system indices are never returned at this access level.
            return Ok(false);
        }
        let index_metadata = self.index_metadata(context, index);
        match index_metadata.state {
            IndexState::Close => {
                if context.options.forbid_closed_indices && !context.options.ignore_unavailable {
                    Err(ResolveError::IndexClosed {
                        index: index.index_id().to_string(),
                    })
                } else {
                    Ok(!context.options.forbid_closed_indices
                        && admit_index(context, index_metadata))
                }
            }
            IndexState::Open => Ok(admit_index(context, index_metadata)),
        }
    }

    fn check_system_index_access<'b>(
        &self,
        context: &Context,
        concrete_indices: impl IntoIterator<Item = &'b Index>,
    ) -> ResolveResult<()> {
        let denied_system_indices: Vec<&IndexMetadata> = concrete_indices
            .into_iter()
            .map(|index| self.index_metadata(context, index))
            .filter(|index_metadata| index_metadata.is_system())
            .filter(|index_metadata| !context.system_access_allows(index_metadata.index_id()))
            .collect();
        if denied_system_indices.is_empty() {
            return Ok(());
        }

        let mut historic_indices: Vec<String> = Vec::new();
        let mut net_new_indices: Vec<String> = Vec::new();
        let mut system_data_streams: BTreeSet<String> = BTreeSet::new();
        for index_metadata in denied_system_indices {
            let name = index_metadata.index_id();
            let abstraction = context
                .snapshot
                .lookup(name)
                .expect("concrete index should be present in the lookup");
            if let Some(parent_data_stream) = abstraction.parent_data_stream() {
                system_data_streams.insert(parent_data_stream.to_string());
            } else if context.is_net_new_system_index(name) {
                net_new_indices.push(name.to_string());
            } else {
                historic_indices.push(name.to_string());
            }
        }

        if !historic_indices.is_empty() {
            let index_names = historic_indices.iter().sorted().join(", ");
            self.deprecation_sink.emit(
                DeprecationCategory::Api,
                "open_system_index_access",
                &format!(
                    "this request accesses system indices: [{index_names}], but in a future \
                     major version, direct access to system indices will be prevented by default"
                ),
            );
        }
        if !system_data_streams.is_empty() {
            return Err(ResolveError::SystemDataStreamAccessDenied {
                names: system_data_streams.into_iter().collect(),
            });
        }
        if !net_new_indices.is_empty() {
            return Err(ResolveError::SystemNetNewAccessDenied {
                names: net_new_indices,
            });
        }
        Ok(())
    }
}

fn admit_index(context: &Context, index_metadata: &IndexMetadata) -> bool {
    // `index.frozen` rather than `index.search.throttled`: frozen indices
    // were the only users of the search-throttled pool when this replaced the
    // original setting check.
    if context.options.ignore_throttled {
        !index_metadata.settings.frozen
    } else {
        true
    }
}

fn to_owned_expressions(expressions: &[&str]) -> Vec<String> {
    expressions
        .iter()
        .map(|expression| expression.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use petrel_metadata::{DataStream, IndexSettings};

    use super::*;
    use crate::deprecation::CapturingDeprecationSink;

    fn index(index_id: &str, uid: u128) -> IndexMetadata {
        IndexMetadata::for_test(index_id, uid)
    }

    fn fixture_snapshot() -> ClusterSnapshot {
        let mut logs_1 = index("logs-1", 1);
        logs_1
            .aliases
            .insert("logs".to_string(), AliasMetadata::new("logs"));
        let mut logs_2 = index("logs-2", 2);
        let mut write_alias = AliasMetadata::new("logs");
        write_alias.is_write_index = Some(true);
        logs_2.aliases.insert("logs".to_string(), write_alias);
        let mut logs_old = index("logs-old", 3);
        logs_old.state = IndexState::Close;
        let mut frozen = index("logs-frozen", 4);
        frozen.settings = IndexSettings {
            frozen: true,
            hidden: false,
        };
        let mut backing_1 = index("events-000001", 5);
        backing_1.settings.hidden = true;
        let mut backing_2 = index("events-000002", 6);
        backing_2.settings.hidden = true;
        ClusterSnapshot::builder()
            .add_index(logs_1)
            .add_index(logs_2)
            .add_index(logs_old)
            .add_index(frozen)
            .add_index(backing_1)
            .add_index(backing_2)
            .add_data_stream(DataStream::new(
                "events",
                vec!["events-000001".to_string(), "events-000002".to_string()],
            ))
            .build()
            .unwrap()
    }

    fn resolver() -> IndexExpressionResolver {
        IndexExpressionResolver::new(
            Arc::new(SystemIndexRegistry::empty()),
            SystemIndexAccess::all(),
        )
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        let snapshot = fixture_snapshot();
        let names = resolver()
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                false,
                &["logs-*", "logs-1"],
            )
            .unwrap();
        assert_eq!(names, vec!["logs-1", "logs-2", "logs-frozen"]);
    }

    #[test]
    fn test_missing_expression_policy_by_arity() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        // Single expression: allow_no_indices controls the failure.
        let mut options = IndicesOptions::lenient_expand_open();
        options.allow_no_indices = false;
        let error = resolver
            .concrete_index_names(&snapshot, options, false, &["missing"])
            .unwrap_err();
        assert_eq!(error, ResolveError::index_not_found("missing"));

        // Multiple expressions: ignore_unavailable controls it instead.
        let names = resolver
            .concrete_index_names(&snapshot, options, false, &["missing", "logs-1"])
            .unwrap();
        assert_eq!(names, vec!["logs-1"]);

        let names = resolver
            .concrete_index_names(
                &snapshot,
                IndicesOptions::lenient_expand_open(),
                false,
                &["missing"],
            )
            .unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_cross_cluster_expressions_are_rejected() {
        let snapshot = fixture_snapshot();
        let error = resolver()
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                false,
                &["logs-1:foo", "logs-1"],
            )
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::CrossClusterUnsupported {
                expressions: vec!["logs-1:foo".to_string()],
            }
        );

        // Lenient requests skip the check and drop the remote name.
        let names = resolver()
            .concrete_index_names(
                &snapshot,
                IndicesOptions::lenient_expand_open(),
                false,
                &["logs-1:foo", "logs-1"],
            )
            .unwrap();
        assert_eq!(names, vec!["logs-1"]);
    }

    #[test]
    fn test_closed_index_handling() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        let mut options = IndicesOptions::strict_expand_open_forbid_closed();
        let error = resolver
            .concrete_index_names(&snapshot, options, false, &["logs-old"])
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::IndexClosed {
                index: "logs-old".to_string(),
            }
        );

        // forbid_closed_indices + ignore_unavailable skips the closed index.
        options.ignore_unavailable = true;
        let names = resolver
            .concrete_index_names(&snapshot, options, false, &["logs-old"])
            .unwrap();
        assert!(names.is_empty());

        let names = resolver
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                false,
                &["logs-old"],
            )
            .unwrap();
        assert_eq!(names, vec!["logs-old"]);
    }

    #[test]
    fn test_ignore_throttled_drops_frozen_indices() {
        let snapshot = fixture_snapshot();
        let mut options = IndicesOptions::strict_expand_open();
        options.ignore_throttled = true;
        let names = resolver()
            .concrete_index_names(&snapshot, options, false, &["logs-*"])
            .unwrap();
        assert_eq!(names, vec!["logs-1", "logs-2"]);

        options.ignore_throttled = false;
        let names = resolver()
            .concrete_index_names(&snapshot, options, false, &["logs-*"])
            .unwrap();
        assert_eq!(names, vec!["logs-1", "logs-2", "logs-frozen"]);
    }

    #[test]
    fn test_alias_with_multiple_indices_forbidden() {
        let snapshot = fixture_snapshot();
        let mut options = IndicesOptions::strict_expand_open();
        options.allow_aliases_to_multiple_indices = false;
        let error = resolver()
            .concrete_index_names(&snapshot, options, false, &["logs"])
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::MultipleIndicesForbidden {
                kind: "alias".to_string(),
                expression: "logs".to_string(),
                indices: vec!["logs-1".to_string(), "logs-2".to_string()],
            }
        );
    }

    #[test]
    fn test_ignore_aliases() {
        let snapshot = fixture_snapshot();
        let mut options = IndicesOptions::strict_expand_open();
        options.ignore_aliases = true;
        let error = resolver()
            .concrete_index_names(&snapshot, options, false, &["logs"])
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::AliasNotAllowed {
                expression: "logs".to_string(),
            }
        );
    }

    #[test]
    fn test_excluded_data_streams_annotation() {
        let snapshot = fixture_snapshot();
        let mut options = IndicesOptions::lenient_expand_open();
        options.allow_no_indices = false;
        let error = resolver()
            .concrete_index_names(&snapshot, options, false, &["events"])
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::IndexNotFound {
                resources: vec!["events".to_string()],
                excluded_data_streams: true,
            }
        );
    }

    #[test]
    fn test_write_index_resolution() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        let write_index = resolver
            .concrete_write_index(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                "logs",
                false,
                false,
            )
            .unwrap();
        assert_eq!(write_index.unwrap().index_id(), "logs-2");

        let write_index = resolver
            .concrete_write_index(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                "events",
                false,
                true,
            )
            .unwrap();
        assert_eq!(write_index.unwrap().index_id(), "events-000002");

        let write_index = resolver
            .concrete_write_index(
                &snapshot,
                IndicesOptions::lenient_expand_open(),
                "missing",
                true,
                false,
            )
            .unwrap();
        assert_eq!(write_index, None);
    }

    #[test]
    fn test_resolve_write_abstraction() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        let abstraction = resolver
            .resolve_write_abstraction(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                "logs",
                false,
            )
            .unwrap();
        assert_eq!(abstraction.name(), "logs");
        assert_eq!(abstraction.write_index().unwrap().index_id(), "logs-2");

        let abstraction = resolver
            .resolve_write_abstraction(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                "events",
                true,
            )
            .unwrap();
        assert!(abstraction.is_data_stream());
    }

    #[test]
    fn test_resolve_write_abstraction_requires_a_write_index() {
        let mut a_1 = index("a-1", 1);
        a_1.aliases
            .insert("many".to_string(), AliasMetadata::new("many"));
        let mut a_2 = index("a-2", 2);
        a_2.aliases
            .insert("many".to_string(), AliasMetadata::new("many"));
        let snapshot = ClusterSnapshot::builder()
            .add_index(a_1)
            .add_index(a_2)
            .build()
            .unwrap();
        let error = resolver()
            .resolve_write_abstraction(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                "many",
                false,
            )
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::NoWriteIndex {
                alias: "many".to_string(),
            }
        );
    }

    #[test]
    fn test_concrete_single_index() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        let index = resolver
            .concrete_single_index(&snapshot, IndicesOptions::strict_expand_open(), "logs-1")
            .unwrap();
        assert_eq!(index.index_id(), "logs-1");

        let error = resolver
            .concrete_single_index(&snapshot, IndicesOptions::strict_expand_open(), "logs-*")
            .unwrap_err();
        assert!(matches!(error, ResolveError::SingleTargetRequired { .. }));
    }

    #[test]
    fn test_data_stream_names() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        let names = resolver
            .data_stream_names(&snapshot, IndicesOptions::strict_expand_open_closed_hidden(), &[])
            .unwrap();
        assert_eq!(names, vec!["events"]);

        let names = resolver
            .data_stream_names(
                &snapshot,
                IndicesOptions::strict_expand_open_closed_hidden(),
                &["logs-*"],
            )
            .unwrap();
        assert!(names.is_empty());
    }

    #[test]
    fn test_resolve_expressions_preserves_aliases() {
        let snapshot = fixture_snapshot();
        let resolved = resolver()
            .resolve_expressions(&snapshot, &["log*"])
            .unwrap();
        assert!(resolved.contains("logs"));
        assert!(resolved.contains("logs-1"));
        assert!(resolved.contains("logs-2"));
    }

    #[test]
    fn test_has_index_abstraction() {
        let snapshot = fixture_snapshot();
        let resolver = resolver();
        assert!(resolver.has_index_abstraction("logs-1", &snapshot).unwrap());
        assert!(resolver.has_index_abstraction("logs", &snapshot).unwrap());
        assert!(resolver.has_index_abstraction("events", &snapshot).unwrap());
        assert!(!resolver
            .has_index_abstraction("<logs-{now/d}>", &snapshot)
            .unwrap());
    }

    #[test]
    fn test_system_index_gate() {
        let mut tasks = index(".tasks", 10);
        tasks.system = true;
        let mut fleet = index(".fleet-agents", 11);
        fleet.system = true;
        let mut ds_backing = index(".ds-notifications-000001", 12);
        ds_backing.system = true;
        let mut notifications = DataStream::new(
            ".notifications",
            vec![".ds-notifications-000001".to_string()],
        );
        notifications.system = true;
        notifications.hidden = true;
        let snapshot = ClusterSnapshot::builder()
            .add_index(tasks)
            .add_index(fleet)
            .add_index(ds_backing)
            .add_data_stream(notifications)
            .build()
            .unwrap();
        let registry = Arc::new(SystemIndexRegistry::new(
            vec![".fleet-*".to_string()],
            Default::default(),
        ));

        // Historic system index: deprecation only, the call succeeds.
        let sink = Arc::new(CapturingDeprecationSink::default());
        let resolver =
            IndexExpressionResolver::new(registry.clone(), SystemIndexAccess::none())
                .with_deprecation_sink(sink.clone());
        let names = resolver
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                false,
                &[".tasks"],
            )
            .unwrap();
        assert_eq!(names, vec![".tasks"]);
        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].key, "open_system_index_access");
        assert!(events[0].message.contains(".tasks"));

        // Net-new system index: the call fails.
        let error = resolver
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                false,
                &[".fleet-agents"],
            )
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::SystemNetNewAccessDenied {
                names: vec![".fleet-agents".to_string()],
            }
        );

        // System data stream backing index: the call fails with the parent.
        let error = resolver
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open_closed_hidden(),
                true,
                &[".ds-notifications-000001"],
            )
            .unwrap_err();
        assert_eq!(
            error,
            ResolveError::SystemDataStreamAccessDenied {
                names: vec![".notifications".to_string()],
            }
        );

        // Full access: nothing to report.
        let resolver =
            IndexExpressionResolver::new(registry, SystemIndexAccess::all());
        let names = resolver
            .concrete_index_names(
                &snapshot,
                IndicesOptions::strict_expand_open(),
                false,
                &[".tasks", ".fleet-agents"],
            )
            .unwrap();
        assert_eq!(names, vec![".tasks", ".fleet-agents"]);
    }

    #[test]
    fn test_concrete_index_names_with_system_index_access() {
        let mut tasks = index(".tasks", 10);
        tasks.system = true;
        let mut fleet = index(".fleet-agents", 11);
        fleet.system = true;
        let snapshot = ClusterSnapshot::builder()
            .add_index(tasks)
            .add_index(fleet)
            .build()
            .unwrap();
        let registry = Arc::new(SystemIndexRegistry::new(
            vec![".fleet-*".to_string()],
            Default::default(),
        ));
        let resolver = IndexExpressionResolver::new(registry, SystemIndexAccess::none());
        // The override admits the historic system index without deprecation,
        // but net-new system indices stay hidden.
        let names = resolver
            .concrete_index_names_with_system_index_access(
                &snapshot,
                IndicesOptions::lenient_expand_open(),
                false,
                &[".tasks", ".fleet-agents"],
            )
            .unwrap();
        assert_eq!(names, vec![".tasks"]);
    }

    #[test]
    fn test_is_all_indices() {
        assert!(is_all_indices::<&str>(&[]));
        assert!(is_all_indices(&["_all"]));
        assert!(!is_all_indices(&["logs-1"]));
        assert!(!is_all_indices(&["_all", "logs-1"]));
        assert!(is_explicit_all_pattern(&["_all"]));
        assert!(!is_explicit_all_pattern::<&str>(&[]));
    }
}
