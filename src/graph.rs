use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use crate::overlay::Script;
use crate::version::Version;
use crate::{MigrateError, Result};

/// One migration step: the scripts that move a schema from one version to
/// another. Install directories contribute edges from zero.
#[derive(Debug, Clone)]
pub struct Edge {
    pub from: Version,
    pub to: Version,
    /// Directory name the edge came from, kept for diagnostics and
    /// deterministic tie-breaking.
    pub dir_name: String,
    pub scripts: Vec<Script>,
}

/// Directed graph of version transitions for one schema.
///
/// Vertices are every version named by an install or transition directory,
/// plus the zero sentinel. Cycles are legal (upgrade then downgrade); the
/// planner's visited set terminates them.
pub struct Graph {
    edges: Vec<Edge>,
    outgoing: BTreeMap<Version, Vec<usize>>,
    vertices: BTreeSet<Version>,
}

impl Graph {
    pub fn new(edges: Vec<Edge>) -> Self {
        let mut vertices = BTreeSet::new();
        vertices.insert(Version::zero());
        let mut outgoing: BTreeMap<Version, Vec<usize>> = BTreeMap::new();
        for (i, edge) in edges.iter().enumerate() {
            vertices.insert(edge.from.clone());
            vertices.insert(edge.to.clone());
            outgoing.entry(edge.from.clone()).or_default().push(i);
        }
        Graph {
            edges,
            outgoing,
            vertices,
        }
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.vertices.contains(version)
    }

    /// Compute the shortest plan (by edge count) from `from` to `to`.
    ///
    /// Breadth-first search over the transition edges. Ties between equally
    /// short paths are broken by expanding each vertex's outgoing edges in a
    /// fixed order: ascending target when the overall walk is upward,
    /// descending when downward, then directory name. An equal pair of
    /// endpoints yields the empty plan. A `from` the graph does not know is
    /// `UnknownCurrentVersion`; an unreachable `to` is `NoMigrationPath`.
    pub fn plan(&self, from: &Version, to: &Version) -> Result<Vec<Edge>> {
        if from == to {
            return Ok(Vec::new());
        }
        if !self.contains(from) {
            return Err(MigrateError::UnknownCurrentVersion(from.clone()));
        }

        let upward = to > from;
        let mut parent: BTreeMap<Version, usize> = BTreeMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(at) = queue.pop_front() {
            for idx in self.sorted_outgoing(&at, upward) {
                let edge = &self.edges[idx];
                if edge.to == *from || parent.contains_key(&edge.to) {
                    continue;
                }
                parent.insert(edge.to.clone(), idx);
                if edge.to == *to {
                    let path = self.reconstruct(from, to, &parent);
                    debug!(
                        "planned {} step(s) from {} to {}",
                        path.len(),
                        from,
                        to
                    );
                    return Ok(path);
                }
                queue.push_back(edge.to.clone());
            }
        }

        Err(MigrateError::NoMigrationPath {
            from: from.clone(),
            to: to.clone(),
        })
    }

    /// The highest version reachable from `from`; `from` itself when nothing
    /// beyond it is reachable.
    pub fn latest_reachable(&self, from: &Version) -> Result<Version> {
        if !self.contains(from) {
            return Err(MigrateError::UnknownCurrentVersion(from.clone()));
        }
        let mut seen = BTreeSet::new();
        seen.insert(from.clone());
        let mut queue = VecDeque::new();
        queue.push_back(from.clone());
        while let Some(at) = queue.pop_front() {
            for &idx in self.outgoing.get(&at).map(Vec::as_slice).unwrap_or(&[]) {
                let edge = &self.edges[idx];
                if seen.insert(edge.to.clone()) {
                    queue.push_back(edge.to.clone());
                }
            }
        }
        Ok(seen
            .into_iter()
            .last()
            .unwrap_or_else(|| from.clone()))
    }

    fn sorted_outgoing(&self, at: &Version, upward: bool) -> Vec<usize> {
        let mut idxs = self.outgoing.get(at).cloned().unwrap_or_default();
        idxs.sort_by(|&a, &b| {
            let (ea, eb) = (&self.edges[a], &self.edges[b]);
            let by_target = if upward {
                ea.to.cmp(&eb.to)
            } else {
                eb.to.cmp(&ea.to)
            };
            by_target.then_with(|| ea.dir_name.cmp(&eb.dir_name))
        });
        idxs
    }

    fn reconstruct(
        &self,
        from: &Version,
        to: &Version,
        parent: &BTreeMap<Version, usize>,
    ) -> Vec<Edge> {
        let mut path = Vec::new();
        let mut cursor = to.clone();
        while cursor != *from {
            let edge = self.edges[parent[&cursor]].clone();
            cursor = edge.from.clone();
            path.push(edge);
        }
        path.reverse();
        path
    }
}
