// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Append-only audit chain attached to a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// One event of a job's audit trail. Each node points back to the event that
/// preceded it; the newest node is the head of the chain.
///
/// On the wire the head carries its predecessors as a flat `previous` list,
/// newest first, so the document depth does not grow with the chain. The
/// older nested form, where `previous` is itself a History object, is still
/// accepted on input.
#[derive(Debug)]
pub struct History {
    pub message: String,
    pub date: DateTime<Utc>,
    pub is_final: bool,
    pub extra: Map<String, Value>,
    pub previous: Option<Box<History>>,
}

impl History {
    pub fn new(message: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            message: message.into(),
            date,
            is_final: false,
            extra: Map::new(),
            previous: None,
        }
    }

    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    /// Returns a new head whose `previous` is `previous`. Neither chain is
    /// modified.
    pub fn chained_to(mut self, previous: Option<&History>) -> Self {
        self.previous = previous.map(|p| Box::new(p.clone()));
        self
    }

    pub fn previous(&self) -> Option<&History> {
        self.previous.as_deref()
    }

    /// Walks the chain from the newest event to the oldest.
    pub fn iter(&self) -> HistoryIter<'_> {
        HistoryIter {
            current: Some(self),
        }
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    fn entry(&self) -> Entry {
        Entry {
            message: self.message.clone(),
            date: self.date,
            is_final: self.is_final,
            extra: self.extra.clone(),
        }
    }

    /// Links entries given newest first, building from the oldest one.
    fn from_entries(entries: Vec<Entry>) -> Option<History> {
        entries.into_iter().rev().fold(None, |previous, entry| {
            Some(History {
                message: entry.message,
                date: entry.date,
                is_final: entry.is_final,
                extra: entry.extra,
                previous: previous.map(Box::new),
            })
        })
    }
}

pub struct HistoryIter<'a> {
    current: Option<&'a History>,
}

impl<'a> Iterator for HistoryIter<'a> {
    type Item = &'a History;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        self.current = node.previous();
        Some(node)
    }
}

impl Clone for History {
    fn clone(&self) -> Self {
        let older = self.iter().skip(1).map(History::entry).collect();
        History {
            message: self.message.clone(),
            date: self.date,
            is_final: self.is_final,
            extra: self.extra.clone(),
            previous: History::from_entries(older).map(Box::new),
        }
    }
}

impl PartialEq for History {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self.iter();
        let mut right = other.iter();
        loop {
            match (left.next(), right.next()) {
                (None, None) => return true,
                (Some(a), Some(b))
                    if a.message == b.message
                        && a.date == b.date
                        && a.is_final == b.is_final
                        && a.extra == b.extra => {}
                _ => return false,
            }
        }
    }
}

impl Drop for History {
    // Unlinks the chain iteratively so very long histories do not overflow
    // the stack when dropped.
    fn drop(&mut self) {
        let mut next = self.previous.take();
        while let Some(mut node) = next {
            next = node.previous.take();
        }
    }
}

/// A single event without its chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    message: String,
    date: DateTime<Utc>,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    extra: Map<String, Value>,
}

#[derive(Serialize)]
struct WireOut<'a> {
    message: &'a str,
    date: DateTime<Utc>,
    is_final: bool,
    extra: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    previous: Vec<Entry>,
}

#[derive(Deserialize)]
struct WireIn {
    message: String,
    date: DateTime<Utc>,
    #[serde(default)]
    is_final: bool,
    #[serde(default)]
    extra: Map<String, Value>,
    #[serde(default)]
    previous: Option<WirePrevious>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WirePrevious {
    List(Vec<Entry>),
    Nested(Box<WireIn>),
}

impl Serialize for History {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireOut {
            message: &self.message,
            date: self.date,
            is_final: self.is_final,
            extra: &self.extra,
            previous: self.iter().skip(1).map(History::entry).collect(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for History {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut entries = Vec::new();
        let mut node = WireIn::deserialize(deserializer)?;
        loop {
            entries.push(Entry {
                message: std::mem::take(&mut node.message),
                date: node.date,
                is_final: node.is_final,
                extra: std::mem::take(&mut node.extra),
            });
            match node.previous.take() {
                None => break,
                Some(WirePrevious::List(older)) => {
                    entries.extend(older);
                    break;
                }
                Some(WirePrevious::Nested(older)) => node = *older,
            }
        }
        History::from_entries(entries)
            .ok_or_else(|| serde::de::Error::custom("history has no entries"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_chain_iterates_newest_first() {
        let first = History::new("paas.job.received", at(0));
        let second = History::new("paas.job.workspace.prepared", at(1)).chained_to(Some(&first));
        let third = History::new("paas.job.deployed", at(2))
            .finalized()
            .chained_to(Some(&second));

        let messages: Vec<&str> = third.iter().map(|h| h.message.as_str()).collect();
        assert_eq!(
            messages,
            vec!["paas.job.deployed", "paas.job.workspace.prepared", "paas.job.received"]
        );
        assert_eq!(third.depth(), 3);
        assert!(third.is_final);
        assert!(!second.is_final);
    }

    #[test]
    fn test_wire_format_is_flat() {
        let first = History::new("a", at(0));
        let second = History::new("b", at(1)).chained_to(Some(&first));
        let third = History::new("c", at(2)).finalized().chained_to(Some(&second));

        let value = serde_json::to_value(&third).unwrap();
        assert_eq!(value["message"], "c");
        let previous = value["previous"].as_array().unwrap();
        assert_eq!(previous.len(), 2);
        assert_eq!(previous[0]["message"], "b");
        assert!(previous[0].get("previous").is_none());

        let single = serde_json::to_value(&first).unwrap();
        assert!(single.get("previous").is_none());
    }

    #[test]
    fn test_clone_and_eq_walk_the_chain() {
        let mut head = History::new("0", at(0));
        for index in 1..10_000 {
            let mut next = History::new(index.to_string(), at(index));
            next.previous = Some(Box::new(head));
            head = next;
        }
        let copy = head.clone();
        assert_eq!(copy.depth(), 10_000);
        assert_eq!(copy, head);

        let other = History::new("9999", at(9_999)).chained_to(None);
        assert_ne!(other, head);
    }

    #[test]
    fn test_chaining_does_not_mutate_previous() {
        let first = History::new("a", at(0));
        let _second = History::new("b", at(1)).chained_to(Some(&first));
        assert!(first.previous().is_none());
    }
}
