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

use petrel_metadata::{
    ClusterSnapshot, SystemIndexAccess, SystemIndexAccessLevel, SystemIndexRegistry,
};

use crate::IndicesOptions;

/// The system-index access predicate effective for one call. Derived from the
/// access level, except where an operation overrides it explicitly.
#[derive(Clone, Copy, Debug)]
pub(crate) enum AccessPredicate<'a> {
    Always,
    Never,
    /// Exactly the net-new system indices.
    NetNew,
    /// The system indices owned by the request's products.
    Products { product_tags: &'a [String] },
}

impl<'a> AccessPredicate<'a> {
    pub fn derive(access: &'a SystemIndexAccess) -> Self {
        match access.level {
            SystemIndexAccessLevel::All => AccessPredicate::Always,
            SystemIndexAccessLevel::None => AccessPredicate::Never,
            SystemIndexAccessLevel::BackwardsCompatibleOnly => AccessPredicate::NetNew,
            SystemIndexAccessLevel::Restricted => AccessPredicate::Products {
                product_tags: &access.product_tags,
            },
        }
    }
}

/// Everything one resolution call reads: the snapshot, the options, the
/// request clock, the resolution flags, and the system-index access rules.
/// Immutable for the duration of the call.
pub(crate) struct Context<'a> {
    pub snapshot: &'a ClusterSnapshot,
    pub options: IndicesOptions,
    /// Milliseconds since the epoch, read once at context creation and reused
    /// for every date-math token of the call.
    pub start_time: i64,
    /// Keep alias names in wildcard expansions instead of their backing
    /// indices. Only used by alias-level operations; aliases kept this way
    /// may point to closed indices.
    pub preserve_aliases: bool,
    /// Resolve aliases and data streams to their write index.
    pub resolve_to_write_index: bool,
    pub include_data_streams: bool,
    /// Keep data stream names in wildcard expansions instead of their backing
    /// indices.
    pub preserve_data_streams: bool,
    pub system_index_access_level: SystemIndexAccessLevel,
    pub access_predicate: AccessPredicate<'a>,
    pub registry: &'a SystemIndexRegistry,
}

impl<'a> Context<'a> {
    pub fn new(
        snapshot: &'a ClusterSnapshot,
        options: IndicesOptions,
        start_time: i64,
        registry: &'a SystemIndexRegistry,
        access: &'a SystemIndexAccess,
    ) -> Self {
        Context {
            snapshot,
            options,
            start_time,
            preserve_aliases: false,
            resolve_to_write_index: false,
            include_data_streams: false,
            preserve_data_streams: false,
            system_index_access_level: access.level,
            access_predicate: AccessPredicate::derive(access),
            registry,
        }
    }

    pub fn preserve_aliases(mut self, preserve_aliases: bool) -> Self {
        self.preserve_aliases = preserve_aliases;
        self
    }

    pub fn resolve_to_write_index(mut self, resolve_to_write_index: bool) -> Self {
        self.resolve_to_write_index = resolve_to_write_index;
        self
    }

    pub fn include_data_streams(mut self, include_data_streams: bool) -> Self {
        self.include_data_streams = include_data_streams;
        self
    }

    pub fn preserve_data_streams(mut self, preserve_data_streams: bool) -> Self {
        self.preserve_data_streams = preserve_data_streams;
        self
    }

    /// Overrides the derived access predicate, for operations that bypass the
    /// per-request access rules.
    pub fn override_system_access(
        mut self,
        level: SystemIndexAccessLevel,
        predicate: AccessPredicate<'a>,
    ) -> Self {
        self.system_index_access_level = level;
        self.access_predicate = predicate;
        self
    }

    /// Whether the request may touch the system index `name`.
    pub fn system_access_allows(&self, name: &str) -> bool {
        match self.access_predicate {
            AccessPredicate::Always => true,
            AccessPredicate::Never => false,
            AccessPredicate::NetNew => self.registry.is_net_new_system_index(name),
            AccessPredicate::Products { product_tags } => {
                self.registry.product_access_allows(product_tags, name)
            }
        }
    }

    pub fn is_net_new_system_index(&self, name: &str) -> bool {
        self.registry.is_net_new_system_index(name)
    }
}
