//! Message tree reconstruction over an unordered append log
//!
//! A transcript is a flat list of records linked by `parentUuid`. The tree is
//! built in two passes (index every identity, then link children) so forward
//! references resolve regardless of line order. Anomalies are tolerated:
//!
//! - **Duplicate identities**: the first occurrence is the node, later ones are kept
//!   as records but take no part in the tree.
//! - **Dangling parents**: a record whose parent is unknown becomes a root.
//! - **Cycles**: the earliest record of every cycle is detached and made a root, so
//!   every traversal terminates.

pub mod text;

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::models::MessageRecord;
pub use text::{DEFAULT_MAX_EXCERPT_CHARS, TextCleaner};

/// Maximum number of excerpts handed to the summarizer
pub const MAX_SUMMARY_EXCERPTS: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct MessageTree {
    records: Vec<MessageRecord>,
    index: HashMap<String, usize>,
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
    dangling: usize,
    cycles_broken: usize,
}

impl MessageTree {
    /// Build the forest in O(n)
    pub fn build(records: Vec<MessageRecord>) -> Self {
        let n = records.len();
        let mut index = HashMap::with_capacity(n);
        let mut duplicates = 0;

        for (i, record) in records.iter().enumerate() {
            if index.contains_key(&record.uuid) {
                duplicates += 1;
                continue;
            }
            index.insert(record.uuid.clone(), i);
        }
        if duplicates > 0 {
            warn!("{} records reuse an identity already present in the transcript", duplicates);
        }

        let mut parents = vec![None; n];
        let mut children = vec![Vec::new(); n];
        let mut roots = Vec::new();
        let mut dangling = 0;

        for (i, record) in records.iter().enumerate() {
            if index.get(&record.uuid) != Some(&i) {
                continue;
            }
            match record.parent_uuid.as_deref().map(|p| index.get(p).copied()) {
                Some(Some(parent)) if parent != i => {
                    parents[i] = Some(parent);
                    children[parent].push(i);
                }
                Some(Some(_)) => roots.push(i),
                Some(None) => {
                    dangling += 1;
                    roots.push(i);
                }
                None => roots.push(i),
            }
        }

        let mut tree = Self { records, index, parents, children, roots, dangling, cycles_broken: 0 };
        tree.break_cycles();
        tree
    }

    /// Detach nodes unreachable from any root; only cycles can be unreachable
    fn break_cycles(&mut self) {
        let n = self.records.len();
        let mut reachable = vec![false; n];
        let mut stack: Vec<usize> = self.roots.clone();
        self.mark(&mut stack, &mut reachable);

        for i in 0..n {
            if reachable[i] || !self.is_node(i) {
                continue;
            }
            if let Some(parent) = self.parents[i].take() {
                self.children[parent].retain(|&c| c != i);
            }
            warn!(
                "Parent cycle through message {} (line {}), treating it as a root",
                self.records[i].uuid, self.records[i].line_number
            );
            self.cycles_broken += 1;
            self.roots.push(i);
            stack.push(i);
            self.mark(&mut stack, &mut reachable);
        }
        self.roots.sort_unstable();
    }

    fn mark(&self, stack: &mut Vec<usize>, reachable: &mut [bool]) {
        while let Some(i) = stack.pop() {
            if reachable[i] {
                continue;
            }
            reachable[i] = true;
            stack.extend(self.children[i].iter().copied());
        }
    }

    fn is_node(&self, i: usize) -> bool {
        self.index.get(&self.records[i].uuid) == Some(&i)
    }

    /// Number of distinct messages
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, uuid: &str) -> Option<&MessageRecord> {
        self.index.get(uuid).map(|&i| &self.records[i])
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.index.contains_key(uuid)
    }

    /// Distinct messages in file order
    pub fn messages(&self) -> impl Iterator<Item = &MessageRecord> {
        self.records.iter().enumerate().filter(|(i, _)| self.is_node(*i)).map(|(_, r)| r)
    }

    /// Every parsed record in file order, duplicates included
    pub fn records(&self) -> &[MessageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<MessageRecord> {
        self.records
    }

    pub fn roots(&self) -> impl Iterator<Item = &MessageRecord> {
        self.roots.iter().map(|&i| &self.records[i])
    }

    pub fn children(&self, uuid: &str) -> impl Iterator<Item = &MessageRecord> {
        let kids: &[usize] = self.index.get(uuid).map(|&i| self.children[i].as_slice()).unwrap_or(&[]);
        kids.iter().map(|&c| &self.records[c])
    }

    /// Parent as linked in the tree (`None` for roots, including detached ones)
    pub fn parent(&self, uuid: &str) -> Option<&MessageRecord> {
        let i = *self.index.get(uuid)?;
        self.parents[i].map(|p| &self.records[p])
    }

    /// Depth of a message below its root
    pub fn depth(&self, uuid: &str) -> Option<usize> {
        let mut i = *self.index.get(uuid)?;
        let mut depth = 0;
        while let Some(p) = self.parents[i] {
            depth += 1;
            i = p;
        }
        Some(depth)
    }

    /// Identities of `uuid` and all of its descendants, `None` if absent
    pub fn subtree_ids(&self, uuid: &str) -> Option<HashSet<String>> {
        let start = *self.index.get(uuid)?;
        let mut seen = vec![false; self.records.len()];
        let mut ids = HashSet::new();
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            if std::mem::replace(&mut seen[i], true) {
                continue;
            }
            ids.insert(self.records[i].uuid.clone());
            stack.extend(self.children[i].iter().copied());
        }
        Some(ids)
    }

    /// Records with a parent identity that matches nothing in the file
    pub fn dangling_links(&self) -> usize {
        self.dangling
    }

    pub fn cycles_broken(&self) -> usize {
        self.cycles_broken
    }

    /// Messages that count toward the session size (meta bookkeeping excluded)
    pub fn message_count(&self) -> usize {
        self.messages().filter(|r| !r.is_meta).count()
    }

    /// User messages eligible for titles and summaries, with their cleaned text
    pub fn meaningful_user_messages<'a>(
        &'a self,
        cleaner: &'a TextCleaner,
    ) -> impl Iterator<Item = (&'a MessageRecord, String)> + 'a {
        self.messages()
            .filter(|r| r.is_user() && !r.is_meta && !r.is_sidechain)
            .filter_map(move |r| r.content.as_ref().and_then(|c| cleaner.clean(c)).map(|t| (r, t)))
    }

    /// Cleaned text of the first meaningful user message
    pub fn first_user_prompt(&self, cleaner: &TextCleaner) -> Option<String> {
        self.meaningful_user_messages(cleaner).next().map(|(_, text)| text)
    }

    /// Up to `max` cleaned user-message excerpts in file order
    pub fn user_excerpts(&self, cleaner: &TextCleaner, max: usize) -> Vec<String> {
        self.meaningful_user_messages(cleaner).take(max).map(|(_, text)| text).collect()
    }

    /// First git branch recorded in the transcript
    pub fn git_branch(&self) -> Option<&str> {
        self.messages().find_map(|r| r.git_branch.as_deref())
    }

    /// A session is a sidechain when every one of its messages is
    pub fn is_sidechain(&self) -> bool {
        !self.is_empty() && self.messages().all(|r| r.is_sidechain)
    }

    pub fn first_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.messages().filter_map(|r| r.timestamp).min()
    }

    pub fn last_timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.messages().filter_map(|r| r.timestamp).max()
    }
}
