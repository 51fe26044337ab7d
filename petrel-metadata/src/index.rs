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

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
pub use ulid::Ulid;

/// Index identifiers.
pub type IndexId = String;

/// A concrete backing index: the index ID paired with an incarnation uid
/// distinguishing deleted and recreated indices bearing the same ID.
/// It is represented as a string in index_id:uid format.
#[derive(Clone, Debug, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Index {
    pub index_id: IndexId,
    pub uid: Ulid,
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.index_id, self.uid)
    }
}

impl Index {
    /// Creates a new index identifier from an index ID using a random ULID as uid.
    pub fn new_with_random_ulid(index_id: &str) -> Self {
        Self::new(index_id, Ulid::new())
    }

    fn new(index_id: &str, uid: impl Into<Ulid>) -> Self {
        assert!(!index_id.contains(':'), "index ID may not contain `:`");

        Self {
            index_id: index_id.to_string(),
            uid: uid.into(),
        }
    }

    pub fn index_id(&self) -> &str {
        &self.index_id
    }

    #[cfg(any(test, feature = "testsuite"))]
    pub fn for_test(index_id: &str, uid: u128) -> Self {
        Self {
            index_id: index_id.to_string(),
            uid: uid.into(),
        }
    }
}

#[derive(Error, Debug)]
#[error("invalid index identifier `{0}`")]
pub struct InvalidIndex(String);

impl FromStr for Index {
    type Err = InvalidIndex;

    fn from_str(index_str: &str) -> Result<Self, Self::Err> {
        let Some((index_id, uid_str)) = index_str.split_once(':') else {
            return Err(InvalidIndex(index_str.to_string()));
        };
        let uid =
            Ulid::from_string(uid_str).map_err(|_| InvalidIndex(index_str.to_string()))?;
        let index = Index {
            index_id: index_id.to_string(),
            uid,
        };
        Ok(index)
    }
}

impl<'de> Deserialize<'de> for Index {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: Deserializer<'de> {
        let index_str: Cow<'de, str> = Cow::deserialize(deserializer)?;
        let index = Index::from_str(&index_str).map_err(D::Error::custom)?;
        Ok(index)
    }
}

impl Serialize for Index {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.collect_str(&self)
    }
}
