//! Mutable, path-addressed container for resolved variables.
//!
//! A hierarchical store splits names on its separator and nests branches, so
//! `APP.DB.HOST` lands under `APP -> DB -> HOST`. A flat store never splits and
//! keeps every name at depth one. Both share the same tree type so the
//! encryption scanner walks either without special cases.
//!
//! There is no escaping for a segment containing the separator: string paths
//! can never produce one, and `path_segments` rejects such segments.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::store::node::{Branch, VariableNode};

pub const DEFAULT_SEPARATOR: &str = ".";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Flat,
    Hierarchical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableStore {
    variables: Branch,
    separator: String,
    layout: Layout,
}

impl VariableStore {
    /// Hierarchical store using the default `.` separator.
    pub fn new() -> Self {
        Self {
            variables: IndexMap::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            layout: Layout::Hierarchical,
        }
    }

    pub fn flat() -> Self {
        Self {
            layout: Layout::Flat,
            ..Self::new()
        }
    }

    pub fn hierarchical(separator: &str) -> Result<Self> {
        let mut store = Self::new();
        store.set_separator(separator)?;
        Ok(store)
    }

    pub fn with_layout(layout: Layout, separator: &str) -> Result<Self> {
        let mut store = Self::hierarchical(separator)?;
        store.layout = layout;
        Ok(store)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn set_separator(&mut self, separator: &str) -> Result<()> {
        if separator.is_empty() {
            return Err(Error::InvalidSeparator);
        }
        self.separator = separator.to_string();
        Ok(())
    }

    /// Splits a name into path segments. Flat stores never split.
    pub fn split<'a>(&self, name: &'a str) -> Vec<&'a str> {
        match self.layout {
            Layout::Flat => vec![name],
            Layout::Hierarchical => name.split(self.separator.as_str()).collect(),
        }
    }

    /// Joins segments with the separator, the inverse of [`split`](Self::split).
    pub fn path_segments<S: AsRef<str>>(&self, parts: &[S]) -> Result<String> {
        let parts: Vec<&str> = parts.iter().map(AsRef::<str>::as_ref).collect();
        if let Some(bad) = parts.iter().find(|part| part.contains(self.separator.as_str())) {
            return Err(Error::SeparatorInSegment {
                segment: bad.to_string(),
            });
        }
        Ok(parts.join(self.separator.as_str()))
    }

    pub fn read(&self, path: &str) -> Option<&str> {
        let segments = self.split(path);
        let (last, parents) = segments.split_last()?;

        let mut level = &self.variables;
        for segment in parents {
            level = level.get(*segment)?.as_branch()?;
        }
        level.get(*last)?.as_leaf()
    }

    pub fn write(&mut self, path: &str, value: impl Into<String>) {
        let segments = self.split(path);
        self.write_at(segments.as_slice(), value.into());
    }

    /// Writes a leaf at an already split path. Leaves met on the way are
    /// replaced by branches; a branch at the final segment is replaced by the leaf.
    pub(crate) fn write_at<S: AsRef<str>>(&mut self, segments: &[S], value: String) {
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut level = &mut self.variables;
        for segment in parents {
            level = level
                .entry(AsRef::<str>::as_ref(segment).to_string())
                .or_insert_with(VariableNode::empty_branch)
                .make_branch();
        }
        level.insert(AsRef::<str>::as_ref(last).to_string(), VariableNode::Leaf(value));
    }

    /// Removes a leaf or a whole branch. Missing paths are a no-op.
    pub fn delete(&mut self, path: &str) {
        let segments = self.split(path);
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut level = &mut self.variables;
        for segment in parents {
            match level.get_mut(*segment) {
                Some(VariableNode::Branch(children)) => level = children,
                _ => return,
            }
        }
        level.shift_remove(*last);
    }

    /// Top-level entries, borrowed.
    pub fn root(&self) -> &Branch {
        &self.variables
    }

    /// Deep copy of the whole tree.
    pub fn materialize(&self) -> VariableNode {
        VariableNode::Branch(self.variables.clone())
    }

    /// `(full path, value)` for every leaf, in insertion order.
    pub fn flatten(&self) -> Vec<(String, String)> {
        self.materialize().flatten(&self.separator)
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}
