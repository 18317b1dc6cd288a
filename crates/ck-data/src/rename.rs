//! Cluster id renaming on data containers.

use std::collections::BTreeMap;

use ck_core::errors::{CkError, ErrorInfo};
use tracing::warn;

use crate::container::DataContainer;
use crate::table::Column;

/// How cluster ids are renamed.
pub enum Rename<'a> {
    /// Contiguous ids from 0 in order of first appearance.
    Auto,
    /// Explicit old → new mapping; ids without an entry are kept.
    Map(BTreeMap<i64, i64>),
    /// Function applied to every id.
    Func(&'a dyn Fn(i64) -> i64),
}

/// Renumbers `ids` to `0..k` in order of first appearance.
///
/// The induced partition is unchanged: two rows share an id afterwards iff
/// they shared one before.
pub fn canonical_ids(ids: &[i64]) -> Vec<i64> {
    let mut mapping: Vec<(i64, i64)> = Vec::new();
    ids.iter()
        .map(|&id| match mapping.iter().find(|(old, _)| *old == id) {
            Some((_, new)) => *new,
            None => {
                let new = mapping.len() as i64;
                mapping.push((id, new));
                new
            }
        })
        .collect()
}

impl DataContainer {
    /// Renames the cluster ids in `column`, writing to `new_column` if given.
    ///
    /// Mapping entries that refer to ids not present in the column are
    /// reported and ignored.
    pub fn rename_clusters(
        &mut self,
        column: &str,
        rename: Rename<'_>,
        new_column: Option<&str>,
    ) -> Result<(), CkError> {
        let ids = self.table().ints(column)?.to_vec();
        let renamed = match rename {
            Rename::Auto => canonical_ids(&ids),
            Rename::Map(mapping) => {
                for old in mapping.keys() {
                    if !ids.contains(old) {
                        let err = CkError::UnknownClusterReference(
                            ErrorInfo::new("rename-unknown-cluster", "no rows carry this cluster id")
                                .with_context("column", column)
                                .with_context("cluster", old.to_string()),
                        );
                        warn!(%err, "dropping rename entry");
                    }
                }
                ids.iter()
                    .map(|id| mapping.get(id).copied().unwrap_or(*id))
                    .collect()
            }
            Rename::Func(func) => ids.iter().map(|&id| func(id)).collect(),
        };
        self.set_column(Column::int(new_column.unwrap_or(column), renamed))
    }
}
