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

/// Per-request resolution policy. A plain record of booleans, cheap to copy
/// into every resolution context.
///
/// `strict` constructors fail on missing names; `lenient` ones skip them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicesOptions {
    /// Silently drop missing concrete names instead of failing.
    pub ignore_unavailable: bool,
    /// Permit a resolution to produce no indices at all.
    pub allow_no_indices: bool,
    pub expand_wildcards_open: bool,
    pub expand_wildcards_closed: bool,
    pub expand_wildcards_hidden: bool,
    /// When false, any abstraction backed by more than one index is rejected.
    pub allow_aliases_to_multiple_indices: bool,
    pub forbid_closed_indices: bool,
    /// Treat aliases as if they did not exist.
    pub ignore_aliases: bool,
    /// Exclude indices whose `index.frozen` setting is true.
    pub ignore_throttled: bool,
}

impl Default for IndicesOptions {
    fn default() -> Self {
        IndicesOptions::strict_expand_open()
    }
}

impl IndicesOptions {
    pub fn from_options(
        ignore_unavailable: bool,
        allow_no_indices: bool,
        expand_wildcards_open: bool,
        expand_wildcards_closed: bool,
    ) -> Self {
        IndicesOptions {
            ignore_unavailable,
            allow_no_indices,
            expand_wildcards_open,
            expand_wildcards_closed,
            expand_wildcards_hidden: false,
            allow_aliases_to_multiple_indices: true,
            forbid_closed_indices: false,
            ignore_aliases: false,
            ignore_throttled: false,
        }
    }

    pub fn strict_expand_open() -> Self {
        Self::from_options(false, true, true, false)
    }

    pub fn strict_expand_open_forbid_closed() -> Self {
        IndicesOptions {
            forbid_closed_indices: true,
            ..Self::strict_expand_open()
        }
    }

    pub fn strict_expand_open_closed() -> Self {
        Self::from_options(false, true, true, true)
    }

    pub fn strict_expand_open_closed_hidden() -> Self {
        IndicesOptions {
            expand_wildcards_hidden: true,
            ..Self::strict_expand_open_closed()
        }
    }

    pub fn strict_single_index_no_expand_forbid_closed() -> Self {
        IndicesOptions {
            allow_aliases_to_multiple_indices: false,
            forbid_closed_indices: true,
            ..Self::from_options(false, true, false, false)
        }
    }

    pub fn lenient_expand_open() -> Self {
        Self::from_options(true, true, true, false)
    }

    pub fn lenient_expand_open_hidden() -> Self {
        IndicesOptions {
            expand_wildcards_hidden: true,
            ..Self::lenient_expand_open()
        }
    }

    pub fn lenient_expand_open_closed() -> Self {
        Self::from_options(true, true, true, true)
    }

    pub fn lenient_expand_open_closed_hidden() -> Self {
        IndicesOptions {
            expand_wildcards_hidden: true,
            ..Self::lenient_expand_open_closed()
        }
    }

    /// Whether wildcard expressions expand at all. Only open and closed count:
    /// expanding to hidden indices makes no sense without expanding to open or
    /// closed ones. Wildcards pass through as literals otherwise.
    pub fn expand_wildcard_expressions(&self) -> bool {
        self.expand_wildcards_open || self.expand_wildcards_closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let options = IndicesOptions::strict_expand_open();
        assert!(!options.ignore_unavailable);
        assert!(options.allow_no_indices);
        assert!(options.expand_wildcards_open);
        assert!(!options.expand_wildcards_closed);
        assert!(options.allow_aliases_to_multiple_indices);
        assert!(options.expand_wildcard_expressions());

        let options = IndicesOptions::lenient_expand_open_closed_hidden();
        assert!(options.ignore_unavailable);
        assert!(options.expand_wildcards_hidden);

        let options = IndicesOptions::strict_single_index_no_expand_forbid_closed();
        assert!(!options.allow_aliases_to_multiple_indices);
        assert!(options.forbid_closed_indices);
        assert!(!options.expand_wildcard_expressions());
    }

    #[test]
    fn test_serde_defaults() {
        let options: IndicesOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, IndicesOptions::strict_expand_open());

        let options: IndicesOptions =
            serde_json::from_str(r#"{"ignore_unavailable": true, "ignore_throttled": true}"#)
                .unwrap();
        assert!(options.ignore_unavailable);
        assert!(options.ignore_throttled);
    }
}
