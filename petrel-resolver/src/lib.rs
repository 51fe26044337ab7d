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

//! `petrel-resolver` translates user-supplied index expressions, bearing
//! wildcards, exclusions and date math, into concrete deduplicated backing
//! indices of a [`petrel_metadata::ClusterSnapshot`], under per-request
//! [`IndicesOptions`].
//!
//! The pipeline runs in three stages: date-math rewriting against the request
//! clock, wildcard expansion against the snapshot, and materialization into
//! concrete indices with option enforcement, write-index selection and
//! system-index access control. Auxiliary operations (filtering-alias
//! selection, search-routing projection) reuse the first two stages.
//!
//! Every operation is synchronous, lock-free, and deterministic for a fixed
//! snapshot, options and clock.

mod aliases;
mod context;
mod date_format;
mod date_math;
mod deprecation;
mod error;
mod options;
mod resolver;
mod routing;
mod wildcard;

pub use deprecation::{
    CapturingDeprecationSink, DeprecationCategory, DeprecationEvent, DeprecationSink,
    TracingDeprecationSink,
};
pub use error::{ResolveError, ResolveResult};
pub use options::IndicesOptions;
use petrel_metadata::pattern;
pub use resolver::{is_all_indices, is_explicit_all_pattern, IndexExpressionResolver};
