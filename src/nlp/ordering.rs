//! Bandwidth-reducing ordering of a symmetric sparsity pattern
//!
//! Reverse Cuthill-McKee: breadth-first search from a pseudo-peripheral node,
//! visiting neighbours by increasing degree, then reversed. For the stage-wise
//! KKT systems of an optimal-control problem this brings every nonzero within
//! a couple of stages of the diagonal.

use std::collections::VecDeque;

/// Symmetric adjacency lists without self loops or duplicates
fn adjacency(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); n];
    for &(a, b) in edges {
        if a == b || a >= n || b >= n {
            continue;
        }
        adj[a].push(b);
        adj[b].push(a);
    }
    for list in adj.iter_mut() {
        list.sort_unstable();
        list.dedup();
    }
    adj
}

/// Nodes of the deepest BFS level reachable from `root`, and that depth
fn last_level(adj: &[Vec<usize>], root: usize) -> (Vec<usize>, usize) {
    let mut depth = vec![usize::MAX; adj.len()];
    let mut queue = VecDeque::new();
    depth[root] = 0;
    queue.push_back(root);
    let mut max_depth = 0;
    while let Some(node) = queue.pop_front() {
        max_depth = max_depth.max(depth[node]);
        for &nb in &adj[node] {
            if depth[nb] == usize::MAX {
                depth[nb] = depth[node] + 1;
                queue.push_back(nb);
            }
        }
    }
    let level = (0..adj.len()).filter(|&i| depth[i] == max_depth).collect();
    (level, max_depth)
}

/// George-Liu style search for a node of (near) maximal eccentricity
fn pseudo_peripheral(adj: &[Vec<usize>], start: usize) -> usize {
    let mut root = start;
    let (mut level, mut ecc) = last_level(adj, root);
    loop {
        let candidate = match level.iter().min_by_key(|&&i| adj[i].len()) {
            Some(&c) => c,
            None => return root,
        };
        let (next_level, next_ecc) = last_level(adj, candidate);
        if next_ecc <= ecc {
            return root;
        }
        root = candidate;
        level = next_level;
        ecc = next_ecc;
    }
}

/// Reverse Cuthill-McKee permutation, `perm[new] = old`
pub fn reverse_cuthill_mckee(n: usize, edges: &[(usize, usize)]) -> Vec<usize> {
    let adj = adjacency(n, edges);
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);

    while order.len() < n {
        let start = match (0..n).filter(|&i| !visited[i]).min_by_key(|&i| adj[i].len()) {
            Some(s) => s,
            None => break,
        };
        let root = pseudo_peripheral(&adj, start);

        let mut queue = VecDeque::new();
        visited[root] = true;
        queue.push_back(root);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let mut next: Vec<usize> = adj[node].iter().copied().filter(|&nb| !visited[nb]).collect();
            next.sort_by_key(|&nb| adj[nb].len());
            for nb in next {
                visited[nb] = true;
                queue.push_back(nb);
            }
        }
    }

    order.reverse();
    order
}

/// Inverse of a permutation, `inv[old] = new`
pub fn invert(perm: &[usize]) -> Vec<usize> {
    let mut inv = vec![0; perm.len()];
    for (new, &old) in perm.iter().enumerate() {
        inv[old] = new;
    }
    inv
}

/// Half bandwidth of the pattern once reordered with `inv`
pub fn bandwidth(inv: &[usize], edges: &[(usize, usize)]) -> usize {
    edges
        .iter()
        .map(|&(a, b)| if inv[a] > inv[b] { inv[a] - inv[b] } else { inv[b] - inv[a] })
        .max()
        .unwrap_or(0)
}
