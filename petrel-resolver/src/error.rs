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

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Everything that can abort an index name resolution call.
#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq, Serialize, Deserialize)]
pub enum ResolveError {
    #[error("no such index [{}]", .resources.join(", "))]
    IndexNotFound {
        resources: Vec<String>,
        /// Set when data streams matched but were excluded from the request,
        /// so callers can report the near miss.
        excluded_data_streams: bool,
    },

    #[error(
        "the provided expression [{expression}] matches an alias, specify the corresponding \
         concrete indices instead"
    )]
    AliasNotAllowed { expression: String },

    #[error(
        "{kind} [{expression}] has more than one index associated with it [{}], can't execute a \
         single index op",
        .indices.join(", ")
    )]
    MultipleIndicesForbidden {
        kind: String,
        expression: String,
        indices: Vec<String>,
    },

    #[error(
        "no write index is defined for alias [{alias}]. the write index may be explicitly \
         disabled using is_write_index=false or the alias points to multiple indices without one \
         being designated as a write index"
    )]
    NoWriteIndex { alias: String },

    #[error("index [{index}] is closed")]
    IndexClosed { index: String },

    #[error("invalid index name expression [{expression}]: {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error(
        "cross-cluster calls are not supported in this context but remote indices were \
         requested: [{}]",
        .expressions.join(", ")
    )]
    CrossClusterUnsupported { expressions: Vec<String> },

    #[error("cannot access system data streams [{}] in this context", .names.join(", "))]
    SystemDataStreamAccessDenied { names: Vec<String> },

    #[error(
        "access to net-new system indices [{}] is not allowed in this context",
        .names.join(", ")
    )]
    SystemNetNewAccessDenied { names: Vec<String> },

    #[error(
        "unable to return a single target: the expression [{expression}] and options provided \
         resolved to {resolved} targets"
    )]
    SingleTargetRequired {
        expression: String,
        resolved: usize,
    },
}

impl ResolveError {
    pub(crate) fn index_not_found(resource: &str) -> Self {
        ResolveError::IndexNotFound {
            resources: vec![resource.to_string()],
            excluded_data_streams: false,
        }
    }

    pub(crate) fn invalid_expression(expression: &str, reason: impl Into<String>) -> Self {
        ResolveError::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}
