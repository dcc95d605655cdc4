// Copyright 2025 eraflo
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

//! A generic implementation of Kahn's algorithm for topological sorting.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

/// An error indicating that a cycle was detected in the graph.
///
/// Carries every node that could not be ordered, in input order. Each of them
/// is either on a cycle or downstream of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleError<T> {
    /// The nodes left with a non-zero in-degree once the sort stalled.
    pub unresolved: Vec<T>,
}

/// Performs a topological sort on a generic directed graph.
///
/// The graph is defined by a collection of nodes and a set of directed edges
/// representing dependencies (from dependency to dependent). The sort is
/// stable: among nodes that become ready at the same time, input order wins.
///
/// # Arguments
///
/// * `nodes`: An iterator over the unique nodes in the graph.
/// * `edges`: An iterator over the directed edges, as `(dependency, dependent)`.
///   Edges touching unknown nodes are ignored.
///
/// # Returns
///
/// * `Ok(Vec<T>)`: The nodes in a valid topological order.
/// * `Err(CycleError)`: If the graph contains one or more cycles.
pub fn topological_sort<T>(
    nodes: impl IntoIterator<Item = T>,
    edges: impl IntoIterator<Item = (T, T)>,
) -> Result<Vec<T>, CycleError<T>>
where
    T: Copy + Eq + Hash,
{
    let node_list: Vec<T> = nodes.into_iter().collect();
    if node_list.is_empty() {
        return Ok(Vec::new());
    }

    let mut adjacency_list: HashMap<T, Vec<T>> = HashMap::new();
    let mut in_degree: HashMap<T, usize> = node_list.iter().map(|id| (*id, 0)).collect();

    // 1. Build adjacency list and in-degree counts from edges.
    for (parent, child) in edges {
        if !in_degree.contains_key(&parent) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(&child) {
            *degree += 1;
            adjacency_list.entry(parent).or_default().push(child);
        }
    }

    // 2. Initialize queue with all root nodes (in-degree of 0).
    let mut queue: VecDeque<T> = node_list
        .iter()
        .copied()
        .filter(|node| in_degree.get(node).copied().unwrap_or(0) == 0)
        .collect();

    // 3. Process the queue.
    let mut sorted_list = Vec::with_capacity(node_list.len());
    while let Some(parent_node) = queue.pop_front() {
        sorted_list.push(parent_node);
        if let Some(children) = adjacency_list.get(&parent_node) {
            for &child_node in children {
                if let Some(degree) = in_degree.get_mut(&child_node) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(child_node);
                    }
                }
            }
        }
    }

    // 4. Check for cycles.
    if sorted_list.len() != node_list.len() {
        let unresolved = node_list
            .into_iter()
            .filter(|node| in_degree.get(node).copied().unwrap_or(0) > 0)
            .collect();
        Err(CycleError { unresolved })
    } else {
        Ok(sorted_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_a_chain() {
        let sorted = topological_sort([3, 2, 1], [(1, 2), (2, 3)]).unwrap();
        assert_eq!(sorted, vec![1, 2, 3]);
    }

    #[test]
    fn keeps_input_order_for_independent_nodes() {
        let sorted = topological_sort([5, 4, 3], std::iter::empty()).unwrap();
        assert_eq!(sorted, vec![5, 4, 3]);
    }

    #[test]
    fn diamond_respects_every_edge() {
        let edges = [(0, 1), (0, 2), (1, 3), (2, 3)];
        let sorted = topological_sort([0, 1, 2, 3], edges).unwrap();
        let pos = |n| sorted.iter().position(|&x| x == n).unwrap();
        for (a, b) in edges {
            assert!(pos(a) < pos(b));
        }
    }

    #[test]
    fn reports_the_nodes_on_a_cycle() {
        let err = topological_sort([0, 1, 2, 3], [(0, 1), (1, 2), (2, 1), (2, 3)]).unwrap_err();
        assert_eq!(err.unresolved, vec![1, 2, 3]);
    }

    #[test]
    fn ignores_edges_to_unknown_nodes() {
        let sorted = topological_sort([0, 1], [(0, 1), (7, 1), (1, 9)]).unwrap();
        assert_eq!(sorted, vec![0, 1]);
    }
}
