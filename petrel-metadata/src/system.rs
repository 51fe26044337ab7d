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

use std::collections::HashMap;

use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::pattern::build_pattern_regex_set;

/// How much access the current request has to system indices.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemIndexAccessLevel {
    All,
    None,
    /// Historic system indices remain reachable; net-new ones do not.
    BackwardsCompatibleOnly,
    /// Access is limited to the system indices owned by the products the
    /// request is tagged with.
    Restricted,
}

/// Classifies index names as net-new system indices or as system indices
/// owned by a given product. Effectively immutable after construction and
/// shared across requests.
#[derive(Debug)]
pub struct SystemIndexRegistry {
    net_new_matcher: RegexSet,
    product_matchers: HashMap<String, RegexSet>,
}

impl SystemIndexRegistry {
    /// Builds a registry from glob patterns: the set of net-new system index
    /// name patterns and, per product, the patterns of the system indices it
    /// owns.
    pub fn new(
        net_new_patterns: Vec<String>,
        product_patterns: HashMap<String, Vec<String>>,
    ) -> Self {
        let net_new_matcher = build_pattern_regex_set(&net_new_patterns);
        let product_matchers = product_patterns
            .into_iter()
            .map(|(product, patterns)| (product, build_pattern_regex_set(&patterns)))
            .collect();
        SystemIndexRegistry {
            net_new_matcher,
            product_matchers,
        }
    }

    /// A registry that classifies nothing. Every system index is then
    /// historic and product-less.
    pub fn empty() -> Self {
        SystemIndexRegistry::new(Vec::new(), HashMap::new())
    }

    pub fn is_net_new_system_index(&self, name: &str) -> bool {
        self.net_new_matcher.is_match(name)
    }

    /// Whether any of the given products owns the system index `name`.
    pub fn product_access_allows(&self, product_tags: &[String], name: &str) -> bool {
        product_tags.iter().any(|product| {
            self.product_matchers
                .get(product)
                .map(|matcher| matcher.is_match(name))
                .unwrap_or(false)
        })
    }
}

/// The system-index access granted to one request: an access level plus the
/// product tags backing the `Restricted` level.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SystemIndexAccess {
    pub level: SystemIndexAccessLevel,
    #[serde(default)]
    pub product_tags: Vec<String>,
}

impl SystemIndexAccess {
    pub fn all() -> Self {
        SystemIndexAccess {
            level: SystemIndexAccessLevel::All,
            product_tags: Vec::new(),
        }
    }

    pub fn none() -> Self {
        SystemIndexAccess {
            level: SystemIndexAccessLevel::None,
            product_tags: Vec::new(),
        }
    }

    pub fn backwards_compatible_only() -> Self {
        SystemIndexAccess {
            level: SystemIndexAccessLevel::BackwardsCompatibleOnly,
            product_tags: Vec::new(),
        }
    }

    pub fn restricted(product_tags: Vec<String>) -> Self {
        SystemIndexAccess {
            level: SystemIndexAccessLevel::Restricted,
            product_tags,
        }
    }
}
