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

//! Glob-style name patterns: `*` matches any run of characters, `?` matches a
//! single character. All other regular expression meta characters are escaped.

use regex::{Regex, RegexSet};
use regex_syntax::escape_into;

const WILDCARD_CHARS: [char; 2] = ['*', '?'];

/// Whether the expression contains a wildcard character.
pub fn is_wildcard_pattern(expression: &str) -> bool {
    expression.contains(&WILDCARD_CHARS[..])
}

/// Whether the expression is the pure match-all pattern `*`.
pub fn is_match_all_pattern(expression: &str) -> bool {
    expression == "*"
}

/// Whether the expression has the shape `prefix*` with a non-empty prefix free
/// of wildcard characters. Such patterns can be resolved with a range scan
/// over an ordered lookup instead of a full scan.
pub fn is_suffix_wildcard_pattern(expression: &str) -> bool {
    expression.len() > 1
        && expression.ends_with('*')
        && !expression[..expression.len() - 1].contains(&WILDCARD_CHARS[..])
}

/// Matches `name` against a single glob pattern.
pub fn simple_match(pattern: &str, name: &str) -> bool {
    build_pattern_regex(pattern).is_match(name)
}

/// Builds the anchored regex equivalent of a glob pattern.
pub fn build_pattern_regex(pattern: &str) -> Regex {
    Regex::new(&build_regex(pattern)).expect("regular expression should compile")
}

/// Builds a [`RegexSet`] matching any of the given glob patterns. An empty
/// pattern list yields a set that matches nothing.
pub fn build_pattern_regex_set(patterns: &[String]) -> RegexSet {
    let regexes = patterns.iter().map(|pattern| build_regex(pattern));
    RegexSet::new(regexes).expect("regular expression set should compile")
}

fn build_regex(pattern: &str) -> String {
    let mut regex = String::new();
    regex.push('^');

    let mut literal = String::new();
    for ch in pattern.chars() {
        if WILDCARD_CHARS.contains(&ch) {
            escape_into(&literal, &mut regex);
            literal.clear();
            regex.push_str(if ch == '*' { ".*" } else { "." });
        } else {
            literal.push(ch);
        }
    }
    escape_into(&literal, &mut regex);
    regex.push('$');
    regex
}
