//! Graph algorithms shared by every engine
//!
//! Whole-graph analytics (cliques, centrality) and exports run on a
//! [`GraphSnapshot`], an in-memory copy of all nodes and edges. The
//! in-memory engine builds one from its petgraph store and the SQL engine
//! pulls one out of the database, so both report identical results for the
//! same graph.
//!
//! Projections used here:
//!
//! - **undirected**: simple graph, parallel edges collapsed, self-loops dropped
//! - **directed**: simple digraph, parallel edges of different types collapsed

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use tracing::{debug, warn};

use super::entity::{Entity, EntityType, canonicalize};
use super::model::{CentralityResult, CliqueResult, Path};
use super::relationship::Relationship;

/// PageRank damping factor
pub const PAGERANK_ALPHA: f64 = 0.85;

/// PageRank iteration limit
pub const PAGERANK_MAX_ITER: usize = 100;

/// PageRank convergence tolerance (per node)
pub const PAGERANK_TOLERANCE: f64 = 1.0e-6;

/// In-memory copy of a graph, nodes in insertion order
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
    index: HashMap<String, usize>,
    /// (source position, target position) for every relationship
    endpoints: Vec<(usize, usize)>,
}

impl GraphSnapshot {
    /// Build a snapshot; relationship endpoints missing from `entities`
    /// become placeholder nodes, later duplicates are dropped
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        let mut snapshot = Self::default();
        for entity in entities {
            snapshot.insert_entity(entity);
        }

        let mut seen = HashSet::new();
        for relationship in relationships {
            if !seen.insert(relationship.key()) {
                continue;
            }
            let source = snapshot.ensure_node(&relationship.source);
            let target = snapshot.ensure_node(&relationship.target);
            snapshot.endpoints.push((source, target));
            snapshot.relationships.push(relationship);
        }
        snapshot
    }

    fn insert_entity(&mut self, entity: Entity) -> usize {
        let canonical = entity.canonical_name();
        if let Some(&position) = self.index.get(&canonical) {
            return position;
        }
        let position = self.entities.len();
        self.index.insert(canonical, position);
        self.entities.push(entity);
        position
    }

    fn ensure_node(&mut self, name: &str) -> usize {
        match self.index.get(&canonicalize(name)) {
            Some(&position) => position,
            None => self.insert_entity(Entity::placeholder(name)),
        }
    }

    /// Nodes in insertion order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Edges in insertion order
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.relationships.len()
    }

    /// Position of an entity by name
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&canonicalize(name)).copied()
    }

    /// Simple undirected adjacency restricted to nodes where `include` holds
    fn undirected_adjacency(&self, include: impl Fn(usize) -> bool) -> Vec<BTreeSet<usize>> {
        let mut adjacency = vec![BTreeSet::new(); self.entities.len()];
        for &(source, target) in &self.endpoints {
            if source == target || !include(source) || !include(target) {
                continue;
            }
            adjacency[source].insert(target);
            adjacency[target].insert(source);
        }
        adjacency
    }

    /// Simple directed successor sets
    fn successors(&self) -> Vec<BTreeSet<usize>> {
        let mut successors = vec![BTreeSet::new(); self.entities.len()];
        for &(source, target) in &self.endpoints {
            successors[source].insert(target);
        }
        successors
    }
}

// ========== Traversal ==========

/// Shortest path by bidirectional breadth-first search
///
/// `successors` and `predecessors` give the directed neighbours of a node.
/// Returns the node sequence from `source` to `target`, endpoints included.
pub fn bidirectional_shortest_path<N, S, P>(
    source: N,
    target: N,
    successors: S,
    predecessors: P,
) -> Option<Vec<N>>
where
    N: Copy + Eq + Hash,
    S: Fn(N) -> Vec<N>,
    P: Fn(N) -> Vec<N>,
{
    if source == target {
        return Some(vec![source]);
    }

    // parent pointers toward the source / toward the target
    let mut forward: HashMap<N, Option<N>> = HashMap::from([(source, None)]);
    let mut backward: HashMap<N, Option<N>> = HashMap::from([(target, None)]);
    let mut forward_fringe = vec![source];
    let mut backward_fringe = vec![target];

    let meeting = 'search: loop {
        if forward_fringe.is_empty() || backward_fringe.is_empty() {
            return None;
        }

        if forward_fringe.len() <= backward_fringe.len() {
            let mut next = Vec::new();
            for node in forward_fringe.drain(..) {
                for succ in successors(node) {
                    if let std::collections::hash_map::Entry::Vacant(slot) = forward.entry(succ) {
                        slot.insert(Some(node));
                        next.push(succ);
                    }
                    if backward.contains_key(&succ) {
                        break 'search succ;
                    }
                }
            }
            forward_fringe = next;
        } else {
            let mut next = Vec::new();
            for node in backward_fringe.drain(..) {
                for pred in predecessors(node) {
                    if let std::collections::hash_map::Entry::Vacant(slot) = backward.entry(pred) {
                        slot.insert(Some(node));
                        next.push(pred);
                    }
                    if forward.contains_key(&pred) {
                        break 'search pred;
                    }
                }
            }
            backward_fringe = next;
        }
    };

    let mut path = Vec::new();
    let mut cursor = Some(meeting);
    while let Some(node) = cursor {
        path.push(node);
        cursor = forward.get(&node).copied().flatten();
    }
    path.reverse();

    let mut cursor = backward.get(&meeting).copied().flatten();
    while let Some(node) = cursor {
        path.push(node);
        cursor = backward.get(&node).copied().flatten();
    }
    Some(path)
}

/// Shortest paths from `source` to every node reachable within `cutoff`
/// hops, by breadth-first search; the source itself is not included
pub fn single_source_shortest_paths<N, S>(
    source: N,
    cutoff: Option<usize>,
    successors: S,
) -> Vec<(N, Vec<N>)>
where
    N: Copy + Eq + Hash,
    S: Fn(N) -> Vec<N>,
{
    let mut parents: HashMap<N, Option<N>> = HashMap::from([(source, None)]);
    let mut order = Vec::new();
    let mut queue = VecDeque::from([(source, 0usize)]);

    while let Some((node, depth)) = queue.pop_front() {
        if cutoff.is_some_and(|c| depth >= c) {
            continue;
        }
        for succ in successors(node) {
            if parents.contains_key(&succ) {
                continue;
            }
            parents.insert(succ, Some(node));
            order.push(succ);
            queue.push_back((succ, depth + 1));
        }
    }

    order
        .into_iter()
        .map(|target| {
            let mut path = vec![target];
            let mut cursor = parents.get(&target).copied().flatten();
            while let Some(node) = cursor {
                path.push(node);
                cursor = parents.get(&node).copied().flatten();
            }
            path.reverse();
            (target, path)
        })
        .collect()
}

/// Pick the relationship that represents a hop: strongest first, then by
/// type name, then by canonical source name
///
/// The order is total over distinct edges, so the pick never depends on the
/// order candidates are visited in.
pub fn strongest<'a, I>(candidates: I) -> Option<&'a Relationship>
where
    I: IntoIterator<Item = &'a Relationship>,
{
    candidates.into_iter().min_by(|a, b| {
        b.strength
            .total_cmp(&a.strength)
            .then(a.relationship_type.as_str().cmp(b.relationship_type.as_str()))
            .then_with(|| canonicalize(&a.source).cmp(&canonicalize(&b.source)))
            .then_with(|| canonicalize(&a.target).cmp(&canonicalize(&b.target)))
    })
}

/// Order neighbours for output: distance, then strength descending, then name
pub fn neighbor_order(a: &super::model::Neighbor, b: &super::model::Neighbor) -> std::cmp::Ordering {
    a.distance
        .cmp(&b.distance)
        .then(b.relationship.strength.total_cmp(&a.relationship.strength))
        .then_with(|| a.entity.canonical_name().cmp(&b.entity.canonical_name()))
}

impl GraphSnapshot {
    /// Resolve a node sequence into a [`Path`], choosing the strongest
    /// relationship for each hop
    pub fn path_from_positions(&self, positions: &[usize]) -> Option<Path> {
        let names = positions
            .iter()
            .map(|&p| self.entities[p].name.clone())
            .collect();
        let mut relationships = Vec::with_capacity(positions.len().saturating_sub(1));
        for hop in positions.windows(2) {
            let candidates = self
                .endpoints
                .iter()
                .zip(&self.relationships)
                .filter(|((s, t), _)| *s == hop[0] && *t == hop[1])
                .map(|(_, r)| r);
            relationships.push(strongest(candidates)?.clone());
        }
        Some(Path::new(names, relationships))
    }
}

// ========== Cliques ==========

/// Enumerate every maximal clique (Bron–Kerbosch with pivoting)
fn maximal_cliques(adjacency: &[BTreeSet<usize>], nodes: BTreeSet<usize>) -> Vec<Vec<usize>> {
    let mut cliques = Vec::new();
    let mut current = Vec::new();
    bron_kerbosch(adjacency, &mut current, nodes, BTreeSet::new(), &mut cliques);
    cliques
}

fn bron_kerbosch(
    adjacency: &[BTreeSet<usize>],
    current: &mut Vec<usize>,
    mut candidates: BTreeSet<usize>,
    mut excluded: BTreeSet<usize>,
    cliques: &mut Vec<Vec<usize>>,
) {
    if candidates.is_empty() && excluded.is_empty() {
        cliques.push(current.clone());
        return;
    }

    let pivot = candidates
        .union(&excluded)
        .max_by_key(|&&u| adjacency[u].intersection(&candidates).count())
        .copied();
    let branch: Vec<usize> = match pivot {
        Some(u) => candidates.difference(&adjacency[u]).copied().collect(),
        None => Vec::new(),
    };

    for v in branch {
        current.push(v);
        let next_candidates = candidates.intersection(&adjacency[v]).copied().collect();
        let next_excluded = excluded.intersection(&adjacency[v]).copied().collect();
        bron_kerbosch(adjacency, current, next_candidates, next_excluded, cliques);
        current.pop();
        candidates.remove(&v);
        excluded.insert(v);
    }
}

/// Maximal cliques of the undirected projection, filtered by size and type
pub fn find_cliques(
    snapshot: &GraphSnapshot,
    min_size: usize,
    max_size: Option<usize>,
    entity_type: Option<EntityType>,
) -> CliqueResult {
    let include = |p: usize| entity_type.is_none_or(|t| snapshot.entities[p].entity_type == t);
    let adjacency = snapshot.undirected_adjacency(include);
    let nodes: BTreeSet<usize> = (0..snapshot.node_count()).filter(|&p| include(p)).collect();

    let mut cliques: Vec<Vec<String>> = maximal_cliques(&adjacency, nodes)
        .into_iter()
        .filter(|c| c.len() >= min_size && max_size.is_none_or(|m| c.len() <= m))
        .map(|c| {
            let mut members: Vec<&Entity> = c.iter().map(|&p| &snapshot.entities[p]).collect();
            members.sort_by_key(|e| e.canonical_name());
            members.into_iter().map(|e| e.name.clone()).collect()
        })
        .collect();

    cliques.sort_by(|a, b| {
        b.len().cmp(&a.len()).then_with(|| {
            let a: Vec<String> = a.iter().map(|n| canonicalize(n)).collect();
            let b: Vec<String> = b.iter().map(|n| canonicalize(n)).collect();
            a.cmp(&b)
        })
    });

    debug!(count = cliques.len(), min_size, ?max_size, "Cliques enumerated");

    CliqueResult {
        largest_size: cliques.first().map_or(0, Vec::len),
        total_count: cliques.len(),
        cliques,
    }
}

// ========== Centrality ==========

/// Degree centrality: degree / (n - 1)
fn degree_centrality(adjacency: &[BTreeSet<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 1.0 / (n as f64 - 1.0);
    adjacency.iter().map(|nbrs| nbrs.len() as f64 * scale).collect()
}

/// Normalized betweenness centrality (Brandes) on an undirected graph
fn betweenness_centrality(adjacency: &[BTreeSet<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    let mut betweenness = vec![0.0; n];

    for source in 0..n {
        let mut stack = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut sigma = vec![0.0_f64; n];
        let mut distance = vec![-1_i64; n];
        sigma[source] = 1.0;
        distance[source] = 0;

        let mut queue = VecDeque::from([source]);
        while let Some(v) = queue.pop_front() {
            stack.push(v);
            for &w in &adjacency[v] {
                if distance[w] < 0 {
                    distance[w] = distance[v] + 1;
                    queue.push_back(w);
                }
                if distance[w] == distance[v] + 1 {
                    sigma[w] += sigma[v];
                    predecessors[w].push(v);
                }
            }
        }

        let mut delta = vec![0.0_f64; n];
        while let Some(w) = stack.pop() {
            for &v in &predecessors[w] {
                delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
            }
            if w != source {
                betweenness[w] += delta[w];
            }
        }
    }

    // every pair was counted from both ends
    if n > 2 {
        let scale = 1.0 / ((n as f64 - 1.0) * (n as f64 - 2.0));
        for value in &mut betweenness {
            *value *= scale;
        }
    }
    betweenness
}

/// Connected components in node order
fn connected_components(adjacency: &[BTreeSet<usize>]) -> Vec<Vec<usize>> {
    let mut seen = vec![false; adjacency.len()];
    let mut components = Vec::new();
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(v) = queue.pop_front() {
            for &w in &adjacency[v] {
                if !seen[w] {
                    seen[w] = true;
                    component.push(w);
                    queue.push_back(w);
                }
            }
        }
        components.push(component);
    }
    components
}

/// Closeness centrality with the Wasserman–Faust correction
///
/// On a disconnected graph the scores are computed on the largest connected
/// component only; every node outside it scores 0.
fn closeness_centrality(adjacency: &[BTreeSet<usize>]) -> Vec<f64> {
    let n = adjacency.len();
    let mut closeness = vec![0.0; n];

    let components = connected_components(adjacency);
    let Some(largest) = components
        .iter()
        .fold(None::<&Vec<usize>>, |best, c| match best {
            Some(b) if b.len() >= c.len() => Some(b),
            _ => Some(c),
        })
    else {
        return closeness;
    };

    let size = largest.len();
    if size <= 1 {
        return closeness;
    }

    for &u in largest {
        let mut distance: HashMap<usize, usize> = HashMap::from([(u, 0)]);
        let mut queue = VecDeque::from([u]);
        while let Some(v) = queue.pop_front() {
            let d = distance[&v];
            for &w in &adjacency[v] {
                if let std::collections::hash_map::Entry::Vacant(slot) = distance.entry(w) {
                    slot.insert(d + 1);
                    queue.push_back(w);
                }
            }
        }
        let total: usize = distance.values().sum();
        if total > 0 {
            let reached = (distance.len() - 1) as f64;
            closeness[u] = (reached / total as f64) * (reached / (size as f64 - 1.0));
        }
    }
    closeness
}

/// PageRank by power iteration; dangling mass is spread uniformly
fn pagerank(successors: &[BTreeSet<usize>]) -> Vec<f64> {
    let n = successors.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = 1.0 / n as f64;
    let mut rank = vec![uniform; n];

    for iteration in 0..PAGERANK_MAX_ITER {
        let previous = rank.clone();
        let dangling: f64 = successors
            .iter()
            .zip(&previous)
            .filter(|(succ, _)| succ.is_empty())
            .map(|(_, r)| r)
            .sum();

        let base = (PAGERANK_ALPHA * dangling + (1.0 - PAGERANK_ALPHA)) * uniform;
        rank = vec![base; n];
        for (v, succ) in successors.iter().enumerate() {
            if succ.is_empty() {
                continue;
            }
            let share = PAGERANK_ALPHA * previous[v] / succ.len() as f64;
            for &w in succ {
                rank[w] += share;
            }
        }

        let error: f64 = rank.iter().zip(&previous).map(|(a, b)| (a - b).abs()).sum();
        if error < n as f64 * PAGERANK_TOLERANCE {
            debug!(iterations = iteration + 1, "PageRank converged");
            return rank;
        }
    }

    warn!(max_iter = PAGERANK_MAX_ITER, "PageRank did not converge; returning last iterate");
    rank
}

/// Degree, betweenness and closeness on the undirected projection and
/// pagerank on the directed projection, sorted by pagerank descending
pub fn centrality(
    snapshot: &GraphSnapshot,
    name: Option<&str>,
    top_n: Option<usize>,
) -> Vec<CentralityResult> {
    let adjacency = snapshot.undirected_adjacency(|_| true);
    let degree = degree_centrality(&adjacency);
    let betweenness = betweenness_centrality(&adjacency);
    let closeness = closeness_centrality(&adjacency);
    let pagerank = pagerank(&snapshot.successors());

    let wanted = name.map(canonicalize);
    let mut results: Vec<CentralityResult> = snapshot
        .entities
        .iter()
        .enumerate()
        .filter(|(_, e)| wanted.as_ref().is_none_or(|w| e.canonical_name() == *w))
        .map(|(p, e)| CentralityResult {
            entity: e.name.clone(),
            degree: degree[p],
            betweenness: betweenness[p],
            closeness: closeness[p],
            pagerank: pagerank[p],
        })
        .collect();

    results.sort_by(|a, b| {
        b.pagerank
            .total_cmp(&a.pagerank)
            .then_with(|| canonicalize(&a.entity).cmp(&canonicalize(&b.entity)))
    });
    if let Some(n) = top_n {
        results.truncate(n);
    }
    results
}

/// Per-type counts for stats
pub fn type_counts<T: Ord + Copy>(items: impl IntoIterator<Item = T>) -> BTreeMap<T, usize> {
    let mut counts = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::RelationshipType;

    fn rel(s: &str, t: &str) -> Relationship {
        Relationship::new(s, t, RelationshipType::Knows)
    }

    fn person(name: &str) -> Entity {
        Entity::new(name, EntityType::Character)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_snapshot_creates_placeholders_and_dedups() {
        let snapshot = GraphSnapshot::new(
            vec![person("Alice")],
            vec![rel("Alice", "Bob"), rel("alice", "BOB")],
        );
        assert_eq!(snapshot.node_count(), 2);
        assert_eq!(snapshot.edge_count(), 1);
        assert_eq!(snapshot.entities()[1].entity_type, EntityType::Unknown);
    }

    #[test]
    fn test_bidirectional_path() {
        let succ = |n: u32| if n < 4 { vec![n + 1] } else { Vec::new() };
        let pred = |n: u32| if n > 0 { vec![n - 1] } else { Vec::new() };
        assert_eq!(bidirectional_shortest_path(0, 4, succ, pred), Some(vec![0, 1, 2, 3, 4]));
        assert_eq!(bidirectional_shortest_path(4, 0, succ, pred), None);
        assert_eq!(bidirectional_shortest_path(2, 2, succ, pred), Some(vec![2]));
    }

    #[test]
    fn test_single_source_paths_respect_cutoff() {
        let succ = |n: u32| if n < 4 { vec![n + 1] } else { Vec::new() };
        let all = single_source_shortest_paths(0, None, succ);
        assert_eq!(all.len(), 4);
        let bounded = single_source_shortest_paths(0, Some(2), succ);
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[1], (2, vec![0, 1, 2]));
    }

    #[test]
    fn test_find_cliques_triangle_and_pendant() {
        let snapshot = GraphSnapshot::new(
            vec![person("A"), person("B"), person("C"), person("D")],
            vec![rel("A", "B"), rel("B", "C"), rel("C", "A"), rel("C", "D")],
        );

        let result = find_cliques(&snapshot, 2, None, None);
        assert_eq!(result.cliques[0], vec!["A", "B", "C"]);
        assert_eq!(result.largest_size, 3);
        assert_eq!(result.total_count, 2);

        let triangles = find_cliques(&snapshot, 3, None, None);
        assert_eq!(triangles.total_count, 1);

        let pairs = find_cliques(&snapshot, 2, Some(2), None);
        assert_eq!(pairs.cliques, vec![vec!["C".to_string(), "D".to_string()]]);
    }

    #[test]
    fn test_find_cliques_type_filter() {
        let snapshot = GraphSnapshot::new(
            vec![
                person("A"),
                person("B"),
                Entity::new("Castle", EntityType::Location),
            ],
            vec![rel("A", "B"), rel("A", "Castle"), rel("B", "Castle")],
        );
        let all = find_cliques(&snapshot, 3, None, None);
        assert_eq!(all.total_count, 1);

        let characters = find_cliques(&snapshot, 2, None, Some(EntityType::Character));
        assert_eq!(characters.cliques, vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_centrality_on_path_graph() {
        // A -> B -> C
        let snapshot = GraphSnapshot::new(
            vec![person("A"), person("B"), person("C")],
            vec![rel("A", "B"), rel("B", "C")],
        );
        let results = centrality(&snapshot, None, None);
        let b = results.iter().find(|r| r.entity == "B").unwrap();
        let a = results.iter().find(|r| r.entity == "A").unwrap();

        assert!(approx(b.degree, 1.0));
        assert!(approx(a.degree, 0.5));
        assert!(approx(b.betweenness, 1.0));
        assert!(approx(a.betweenness, 0.0));
        assert!(approx(b.closeness, 1.0));
        assert!(approx(a.closeness, 2.0 / 3.0));

        let total: f64 = results.iter().map(|r| r.pagerank).sum();
        assert!(approx(total, 1.0));
        assert_eq!(results[0].entity, "C");
        assert!(results.windows(2).all(|w| w[0].pagerank >= w[1].pagerank));
    }

    #[test]
    fn test_closeness_zero_outside_largest_component() {
        let snapshot = GraphSnapshot::new(
            vec![person("A"), person("B"), person("C"), person("X"), person("Y")],
            vec![rel("A", "B"), rel("B", "C"), rel("X", "Y")],
        );
        let results = centrality(&snapshot, None, None);
        let x = results.iter().find(|r| r.entity == "X").unwrap();
        let b = results.iter().find(|r| r.entity == "B").unwrap();
        assert_eq!(x.closeness, 0.0);
        assert!(approx(b.closeness, 1.0));
    }

    #[test]
    fn test_centrality_filter_and_top_n() {
        let snapshot = GraphSnapshot::new(
            vec![person("A"), person("B"), person("C")],
            vec![rel("A", "B"), rel("B", "C")],
        );
        let single = centrality(&snapshot, Some("b"), None);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].entity, "B");

        assert_eq!(centrality(&snapshot, None, Some(2)).len(), 2);
        assert!(centrality(&snapshot, Some("nobody"), None).is_empty());
        assert!(centrality(&GraphSnapshot::default(), None, None).is_empty());
    }

    #[test]
    fn test_strongest_prefers_strength_then_type() {
        let weak = Relationship::new("A", "B", RelationshipType::Knows).with_strength(0.2);
        let strong = Relationship::new("A", "B", RelationshipType::Loves).with_strength(0.9);
        let tie = Relationship::new("A", "B", RelationshipType::Owns).with_strength(0.9);
        let chosen = strongest([&weak, &tie, &strong]).unwrap();
        assert_eq!(chosen.relationship_type, RelationshipType::Loves);
    }

    #[test]
    fn test_strongest_breaks_full_ties_by_source() {
        let from_c = rel("C", "D");
        let from_b = rel("b", "D");
        assert_eq!(strongest([&from_c, &from_b]).unwrap().source, "b");
        assert_eq!(strongest([&from_b, &from_c]).unwrap().source, "b");
    }

    #[test]
    fn test_path_from_positions() {
        let snapshot = GraphSnapshot::new(
            vec![person("A"), person("B")],
            vec![rel("A", "B")],
        );
        let path = snapshot.path_from_positions(&[0, 1]).unwrap();
        assert_eq!(path.entities, vec!["A", "B"]);
        assert_eq!(path.length, 1);
        assert!(snapshot.path_from_positions(&[1, 0]).is_none());
    }
}
