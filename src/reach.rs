// Copyright (c) 2022 Bastiaan Marinus van de Weerd

//! Two tiers of dead-end detection. The fast tier partitions the free
//! navigable cells into connected regions and demands the exit and every
//! vital cell (remaining alien or unfilled house) stay reachable with a
//! little local slack. The exact tier proves, per vital cell, that two
//! vertex-disjoint routes survive (one for the train to come, one to get
//! on to the exit) via Suurballe's minimum-cost disjoint-path
//! construction. The exact tier is strictly stronger and much more
//! expensive, so the search controller runs it on a schedule rather than
//! every step.

use std::{cmp::Reverse, collections::BinaryHeap};
use crate::{map::GridMap, step::CellSet};


struct Regions {
	parent: Vec<u32>,
}

impl Regions {
	fn new(cells: usize) -> Self {
		Regions { parent: (0..cells as u32).collect() }
	}

	fn find(&mut self, cell: usize) -> usize {
		let mut root = cell;
		while self.parent[root] as usize != root {
			root = self.parent[root] as usize;
		}
		let mut cell = cell;
		while cell != root {
			cell = std::mem::replace(&mut self.parent[cell], root as u32) as usize;
		}
		root
	}

	fn union(&mut self, a: usize, b: usize) {
		let (a, b) = (self.find(a), self.find(b));
		if a != b {
			self.parent[a] = b as u32;
		}
	}
}

/// Approximate reachability, run on every candidate step against the
/// previous step's `filled` snapshot and position `from`. Passes iff the
/// exit shares `from`'s free region, and every vital cell has a free
/// neighbor in that region with at least two free same-region neighbors of
/// its own; the slack keeps the train out of single-entry pockets it
/// could only dead-end in. (The slack rule, like the quiet-run redundancy
/// prune, is an empirically tuned heuristic without a completeness proof.)
pub fn fast_check(
	map: &GridMap,
	filled: &CellSet,
	from: usize,
	aliens: &[usize],
	houses: &[usize],
) -> bool {
	let mut regions = Regions::new(map.width * map.height);
	for &cell in &map.navigable {
		if filled.contains(cell) { continue }
		for &adj in map.nav_neighbors(cell) {
			if !filled.contains(adj) {
				regions.union(cell, adj);
			}
		}
	}
	let home = regions.find(from);
	if regions.find(map.exit) != home { return false }

	// Filled and non-navigable cells keep their own singleton labels, so
	// `home` membership alone means free, navigable, and connected.
	let in_home = (0..map.width * map.height)
		.map(|cell| regions.find(cell) == home)
		.collect::<Vec<_>>();

	aliens.iter().chain(houses).all(|&vital|
		map.nav_neighbors(vital).iter().any(|&cell| in_home[cell]
			&& map.nav_neighbors(cell).iter().filter(|&&adj| in_home[adj]).count() >= 2))
}


const INFINITY: u32 = u32::MAX;

/// Binary-heap Dijkstra; returns distances and predecessors from `from`.
fn dijkstra(edges: &[Vec<(usize, u32)>], from: usize) -> (Vec<u32>, Vec<usize>) {
	let mut dist = vec![INFINITY; edges.len()];
	let mut prev = vec![usize::MAX; edges.len()];
	let mut heap = BinaryHeap::new();
	dist[from] = 0;
	heap.push(Reverse((0u32, from)));
	while let Some(Reverse((d, node))) = heap.pop() {
		if d > dist[node] { continue }
		for &(next, weight) in &edges[node] {
			let next_d = d + weight;
			if next_d < dist[next] {
				dist[next] = next_d;
				prev[next] = node;
				heap.push(Reverse((next_d, next)));
			}
		}
	}
	(dist, prev)
}

/// Whether two vertex-disjoint `origin`→`target` paths exist, given one
/// shortest-path tree from `origin`. Suurballe: reprice every edge by its
/// reduced cost, drop the first path's forward edges, add zero-cost
/// reversals along it, and look for a second path in the residual.
fn two_disjoint(
	edges: &[Vec<(usize, u32)>],
	dist: &[u32],
	prev: &[usize],
	origin: usize,
	target: usize,
) -> bool {
	if dist[target] == INFINITY { return false }

	let mut path_prev = vec![usize::MAX; edges.len()];
	let mut node = target;
	while node != origin {
		path_prev[node] = prev[node];
		node = prev[node];
	}

	let mut residual = vec![Vec::new(); edges.len()];
	for (node, adj) in edges.iter().enumerate() {
		if dist[node] == INFINITY { continue }
		for &(next, weight) in adj {
			if dist[next] == INFINITY || path_prev[next] == node { continue }
			residual[node].push((next, weight + dist[node] - dist[next]));
		}
	}
	let mut node = target;
	while node != origin {
		// A reversed shortest-path edge always reprices to zero.
		residual[node].push((path_prev[node], 0));
		node = path_prev[node];
	}

	dijkstra(&residual, origin).0[target] != INFINITY
}

/// Exact reachability, run on the schedule against this step's own
/// `filled` snapshot with the train at `train`. Free navigable cells are
/// split into in/out halves so each can be crossed at most once, and a
/// synthetic origin is wired to the train and the exit with unit edges. A
/// vital cell passes iff some free neighbor of it admits two
/// vertex-disjoint origin paths, one consuming the train's approach and
/// the other the exit's; the step passes iff every vital cell does.
/// Shortest-path data is shared across targets within one invocation and
/// discarded afterwards; the excluded-cell set changes every step.
pub fn exact_check(
	map: &GridMap,
	filled: &CellSet,
	train: usize,
	aliens: &[usize],
	houses: &[usize],
) -> bool {
	let mut node = vec![usize::MAX; map.width * map.height];
	let mut free = Vec::new();
	for &cell in &map.navigable {
		if !filled.contains(cell) {
			node[cell] = free.len();
			free.push(cell);
		}
	}

	// Split nodes: cell k enters at 2k and leaves at 2k + 1.
	let origin = 2 * free.len();
	let mut edges = vec![Vec::new(); origin + 1];
	for (k, &cell) in free.iter().enumerate() {
		edges[2 * k].push((2 * k + 1, 0));
		for &adj in map.nav_neighbors(cell) {
			if node[adj] == usize::MAX { continue }
			let enter = 2 * node[adj];
			if !edges[2 * k + 1].iter().any(|&(to, _)| to == enter) {
				edges[2 * k + 1].push((enter, 1));
			}
		}
	}
	edges[origin].push((2 * node[train], 1));
	edges[origin].push((2 * node[map.exit], 1));

	let (dist, prev) = dijkstra(&edges, origin);

	aliens.iter().chain(houses).all(|&vital|
		map.nav_neighbors(vital).iter().any(|&cell| node[cell] != usize::MAX
			&& two_disjoint(&edges, &dist, &prev, origin, 2 * node[cell])))
}
