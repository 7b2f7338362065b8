//! Character-resolution reference graph in CSR form.
//!
//! Vertices carry exactly one reference character each and are numbered in a
//! topological order, so every edge `(u, v)` satisfies `u < v`. Both the
//! out-adjacency and the in-adjacency are kept as offset + neighbor arrays;
//! this is redundant but the forward DP consumes in-edges while the reverse
//! DP consumes out-edges, and neither wants to transpose on the fly.

use std::io;

use rand::Rng;

/// Node-labeled DAG with one character per vertex.
///
/// Adjacency of vertex `j` lives in `adj_*[offsets_*[j]..offsets_*[j + 1]]`.
/// `origins[j]` maps the expanded vertex back to the `(vertex id, character
/// offset)` of the pre-expansion graph; the alignment core never interprets
/// it, it is only carried through to the result writer.
#[derive(Debug, Clone)]
pub struct CharGraph {
    pub num_vertices: usize,
    pub num_edges: usize,
    pub labels: Vec<u8>,
    pub offsets_in: Vec<usize>,
    pub adj_in: Vec<u32>,
    pub offsets_out: Vec<usize>,
    pub adj_out: Vec<u32>,
    pub origins: Vec<(u32, u32)>,
}

/// Count of randomized Kahn runs used when the input numbering has to be
/// repaired; the run with the smallest directed bandwidth wins.
const TOPO_SORT_RUNS: usize = 5;

fn data_err(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

impl CharGraph {
    /// Build a graph whose vertices are their own originals (offset 0).
    pub fn new(labels: Vec<u8>, edges: Vec<(u32, u32)>) -> io::Result<Self> {
        let origins = (0..labels.len() as u32).map(|i| (i, 0)).collect();
        Self::with_origins(labels, origins, edges)
    }

    /// Build a graph from single-character vertex labels, an original-id
    /// mapping and a directed edge list.
    ///
    /// Parallel edges are deduplicated. Self-loops and cycles are rejected.
    /// If the supplied numbering is not topological, vertices are relabeled
    /// by the lowest-bandwidth order found over several randomized Kahn
    /// runs before the CSR arrays are built.
    pub fn with_origins(
        mut labels: Vec<u8>,
        mut origins: Vec<(u32, u32)>,
        mut edges: Vec<(u32, u32)>,
    ) -> io::Result<Self> {
        let n = labels.len();
        if n == 0 {
            return Err(data_err("graph has no vertices".to_owned()));
        }
        if origins.len() != n {
            return Err(data_err(format!(
                "origin mapping covers {} vertices, graph has {}",
                origins.len(),
                n
            )));
        }

        for &(u, v) in &edges {
            if u as usize >= n || v as usize >= n {
                return Err(data_err(format!("edge ({}, {}) out of range", u, v)));
            }
            if u == v {
                return Err(data_err(format!("self-loop on vertex {}", u)));
            }
        }

        edges.sort_unstable();
        edges.dedup();

        if !edges.iter().all(|&(u, v)| u < v) {
            // Numbering is not topological; compute one and apply it.
            let order = best_topological_order(n, &edges)?;

            let mut new_labels = vec![0u8; n];
            let mut new_origins = vec![(0u32, 0u32); n];
            for v in 0..n {
                new_labels[order[v] as usize] = labels[v];
                new_origins[order[v] as usize] = origins[v];
            }
            labels = new_labels;
            origins = new_origins;

            for e in edges.iter_mut() {
                *e = (order[e.0 as usize], order[e.1 as usize]);
            }
            edges.sort_unstable();

            debug_assert!(edges.iter().all(|&(u, v)| u < v));
        }

        let num_edges = edges.len();

        // Out-CSR directly from the (from, to)-sorted edge list.
        let mut offsets_out = vec![0usize; n + 1];
        let mut adj_out = Vec::with_capacity(num_edges);
        for &(u, v) in &edges {
            offsets_out[u as usize + 1] += 1;
            adj_out.push(v);
        }
        for i in 0..n {
            offsets_out[i + 1] += offsets_out[i];
        }

        // In-CSR from the transposed list, re-sorted the same way.
        let mut offsets_in = vec![0usize; n + 1];
        let mut adj_in = Vec::with_capacity(num_edges);
        let mut rev: Vec<(u32, u32)> = edges.iter().map(|&(u, v)| (v, u)).collect();
        rev.sort_unstable();
        for &(v, u) in &rev {
            offsets_in[v as usize + 1] += 1;
            adj_in.push(u);
        }
        for i in 0..n {
            offsets_in[i + 1] += offsets_in[i];
        }

        let graph = CharGraph {
            num_vertices: n,
            num_edges,
            labels,
            offsets_in,
            adj_in,
            offsets_out,
            adj_out,
            origins,
        };
        graph.verify()?;
        Ok(graph)
    }

    /// Successors of vertex `j`.
    #[inline]
    pub fn out_neighbors(&self, j: usize) -> &[u32] {
        &self.adj_out[self.offsets_out[j]..self.offsets_out[j + 1]]
    }

    /// Predecessors of vertex `j`.
    #[inline]
    pub fn in_neighbors(&self, j: usize) -> &[u32] {
        &self.adj_in[self.offsets_in[j]..self.offsets_in[j + 1]]
    }

    /// Largest span `pos(v) - pos(u)` over all edges under the current
    /// numbering. Bounds how far back the DP must reach into earlier
    /// columns, so smaller is better for locality.
    pub fn directed_bandwidth(&self) -> usize {
        let mut bandwidth = 0usize;
        for u in 0..self.num_vertices {
            for &v in self.out_neighbors(u) {
                bandwidth = bandwidth.max(v as usize - u);
            }
        }
        bandwidth
    }

    /// Sanity check of the CSR storage and the topological numbering.
    pub fn verify(&self) -> io::Result<()> {
        let n = self.num_vertices;
        let e = self.num_edges;

        if self.labels.len() != n || self.origins.len() != n {
            return Err(data_err("label/origin arrays do not match vertex count".to_owned()));
        }
        if self.adj_in.len() != e || self.adj_out.len() != e {
            return Err(data_err("adjacency arrays do not match edge count".to_owned()));
        }
        if self.offsets_in.len() != n + 1 || self.offsets_out.len() != n + 1 {
            return Err(data_err("offset arrays do not match vertex count".to_owned()));
        }
        if self.offsets_in[n] != e || self.offsets_out[n] != e {
            return Err(data_err("offset arrays are not terminated by the edge count".to_owned()));
        }
        if self.offsets_in.windows(2).any(|w| w[0] > w[1])
            || self.offsets_out.windows(2).any(|w| w[0] > w[1])
        {
            return Err(data_err("offset arrays are not non-decreasing".to_owned()));
        }
        if self.adj_in.iter().chain(self.adj_out.iter()).any(|&v| v as usize >= n) {
            return Err(data_err("neighbor id out of range".to_owned()));
        }

        for j in 0..n {
            if self.in_neighbors(j).iter().any(|&p| p as usize >= j) {
                return Err(data_err(format!("vertex {} has a predecessor not before it", j)));
            }
            if self.out_neighbors(j).iter().any(|&s| s as usize <= j) {
                return Err(data_err(format!("vertex {} has a successor not after it", j)));
            }
        }

        Ok(())
    }

    /// Dump the adjacency and labels, one vertex per line.
    pub fn log_graph(&self) {
        log::debug!("graph: {} vertices, {} edges", self.num_vertices, self.num_edges);
        for j in 0..self.num_vertices {
            let nbrs: Vec<String> = self.out_neighbors(j).iter().map(|v| v.to_string()).collect();
            log::debug!("[{}] {} {}", j, nbrs.join(" "), self.labels[j] as char);
        }
    }
}

/// Topological order minimizing directed bandwidth over several randomized
/// Kahn runs. Returns `order` with `order[v]` = position of vertex `v`.
fn best_topological_order(n: usize, edges: &[(u32, u32)]) -> io::Result<Vec<u32>> {
    let mut out_adj: Vec<Vec<u32>> = vec![Vec::new(); n];
    let mut in_degree = vec![0usize; n];
    for &(u, v) in edges {
        out_adj[u as usize].push(v);
        in_degree[v as usize] += 1;
    }

    let mut rng = rand::thread_rng();
    let mut best_order: Option<Vec<u32>> = None;
    let mut best_bandwidth = usize::MAX;

    for _ in 0..TOPO_SORT_RUNS {
        let mut order = vec![0u32; n];
        let mut deg = in_degree.clone();
        let mut ready: Vec<u32> = (0..n as u32).filter(|&v| deg[v as usize] == 0).collect();
        let mut placed = 0u32;

        while !ready.is_empty() {
            // Ties between ready vertices are broken randomly; different
            // runs explore different orders.
            let pick = rng.gen_range(0..ready.len());
            let v = ready.swap_remove(pick);

            order[v as usize] = placed;
            placed += 1;

            for &s in &out_adj[v as usize] {
                deg[s as usize] -= 1;
                if deg[s as usize] == 0 {
                    ready.push(s);
                }
            }
        }

        if (placed as usize) < n {
            return Err(data_err("reference graph contains a cycle".to_owned()));
        }

        let bandwidth = edges
            .iter()
            .map(|&(u, v)| (order[v as usize] - order[u as usize]) as usize)
            .max()
            .unwrap_or(0);

        if bandwidth < best_bandwidth {
            best_bandwidth = bandwidth;
            best_order = Some(order);
        }
    }

    log::info!("topological order computed, bandwidth = {}", best_bandwidth);

    Ok(best_order.expect("at least one sort run"))
}
