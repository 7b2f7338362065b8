//! Reference graph loading.
//!
//! The text format carries one vertex per line: its sequence followed by
//! the ids of its out-neighbors. Multi-character vertices are expanded into
//! chains of single-character vertices before the CSR graph is built, with
//! every expanded vertex remembering its original `(id, offset)`.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use crate::graph::CharGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphFormat {
    Vg,
    Txt,
}

impl FromStr for GraphFormat {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, io::Error> {
        match s {
            "vg" => Ok(GraphFormat::Vg),
            "txt" => Ok(GraphFormat::Txt),
            other => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid reference graph format '{}', expected vg or txt", other),
            )),
        }
    }
}

/// Load a reference graph in the given format.
pub fn load_graph(format: GraphFormat, path: &Path) -> io::Result<CharGraph> {
    match format {
        GraphFormat::Txt => load_txt(path),
        GraphFormat::Vg => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "this build has no vg protobuf decoder; convert the graph to txt",
        )),
    }
}

/// Load the plain-text graph format.
///
/// Line 1 holds the vertex count `n`; each of the following `n` lines holds
/// a vertex's sequence and its whitespace-separated out-neighbor ids. Blank
/// lines are skipped. Sequences are upper-cased.
pub fn load_txt(path: &Path) -> io::Result<CharGraph> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader
        .lines()
        .filter(|l| l.as_ref().map(|s| !s.trim().is_empty()).unwrap_or(true));

    let header = lines
        .next()
        .ok_or_else(|| data_err("graph file is empty".to_owned()))??;
    let num_vertices: usize = header
        .trim()
        .parse()
        .map_err(|_| data_err(format!("invalid vertex count '{}'", header.trim())))?;
    if num_vertices == 0 {
        return Err(data_err("graph has no vertices".to_owned()));
    }

    let mut sequences: Vec<Vec<u8>> = Vec::with_capacity(num_vertices);
    let mut neighbors: Vec<Vec<u32>> = Vec::with_capacity(num_vertices);

    for id in 0..num_vertices {
        let line = lines
            .next()
            .ok_or_else(|| data_err(format!("expected {} vertex lines, found {}", num_vertices, id)))??;
        let mut fields = line.split_whitespace();

        let seq = fields
            .next()
            .ok_or_else(|| data_err(format!("vertex {} has no sequence", id)))?;
        let mut seq = seq.as_bytes().to_vec();
        crate::seq_utils::make_uppercase(&mut seq);

        let mut nbrs = Vec::new();
        for field in fields {
            let nbr: u32 = field
                .parse()
                .map_err(|_| data_err(format!("vertex {}: invalid neighbor id '{}'", id, field)))?;
            if nbr as usize >= num_vertices {
                return Err(data_err(format!(
                    "vertex {}: neighbor id {} out of range",
                    id, nbr
                )));
            }
            nbrs.push(nbr);
        }

        sequences.push(seq);
        neighbors.push(nbrs);
    }

    let graph = expand_to_char_graph(&sequences, &neighbors)?;

    log::info!(
        "loaded reference graph: {} vertices, {} edges after character expansion",
        graph.num_vertices,
        graph.num_edges
    );
    if log::log_enabled!(log::Level::Debug) {
        graph.log_graph();
    }

    Ok(graph)
}

/// Expand multi-character vertices into per-character chains.
fn expand_to_char_graph(
    sequences: &[Vec<u8>],
    neighbors: &[Vec<u32>],
) -> io::Result<CharGraph> {
    let mut labels: Vec<u8> = Vec::new();
    let mut origins: Vec<(u32, u32)> = Vec::new();
    let mut first_char = vec![0u32; sequences.len()];
    let mut last_char = vec![0u32; sequences.len()];

    for (id, seq) in sequences.iter().enumerate() {
        if seq.is_empty() {
            return Err(data_err(format!("vertex {} has an empty sequence", id)));
        }
        first_char[id] = labels.len() as u32;
        for (offset, &base) in seq.iter().enumerate() {
            labels.push(base);
            origins.push((id as u32, offset as u32));
        }
        last_char[id] = labels.len() as u32 - 1;
    }

    let mut edges: Vec<(u32, u32)> = Vec::new();
    for id in 0..sequences.len() {
        // Serial edges along the expanded chain.
        for c in first_char[id]..last_char[id] {
            edges.push((c, c + 1));
        }
        for &nbr in &neighbors[id] {
            edges.push((last_char[id], first_char[nbr as usize]));
        }
    }

    CharGraph::with_origins(labels, origins, edges)
}

fn data_err(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_graph(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_single_char_vertices() {
        let file = write_graph("4\nA 1 2\nC 3\nG 3\nT\n");
        let graph = load_txt(file.path()).unwrap();
        assert_eq!(graph.num_vertices, 4);
        assert_eq!(graph.num_edges, 4);
        assert_eq!(graph.labels, b"ACGT".to_vec());
        assert_eq!(graph.out_neighbors(0), &[1, 2]);
        assert_eq!(graph.in_neighbors(3), &[1, 2]);
    }

    #[test]
    fn test_character_expansion() {
        let file = write_graph("2\nACG 1\nT\n");
        let graph = load_txt(file.path()).unwrap();
        assert_eq!(graph.num_vertices, 4);
        assert_eq!(graph.labels, b"ACGT".to_vec());
        assert_eq!(
            graph.origins,
            vec![(0, 0), (0, 1), (0, 2), (1, 0)]
        );
        assert_eq!(graph.out_neighbors(2), &[3]);
    }

    #[test]
    fn test_lowercase_sequences_normalized() {
        let file = write_graph("1\nacgt\n");
        let graph = load_txt(file.path()).unwrap();
        assert_eq!(graph.labels, b"ACGT".to_vec());
    }

    #[test]
    fn test_unsorted_numbering_relabeled() {
        // Vertex 1 feeds vertex 0; the loader must hand back a graph that
        // is nevertheless topologically numbered.
        let file = write_graph("2\nG\nA 0\n");
        let graph = load_txt(file.path()).unwrap();
        assert_eq!(graph.labels, b"AG".to_vec());
        assert_eq!(graph.origins, vec![(1, 0), (0, 0)]);
        assert_eq!(graph.out_neighbors(0), &[1]);
    }

    #[test]
    fn test_bad_inputs_rejected() {
        assert!(load_txt(write_graph("").path()).is_err());
        assert!(load_txt(write_graph("0\n").path()).is_err());
        assert!(load_txt(write_graph("2\nA 5\nC\n").path()).is_err());
        assert!(load_txt(write_graph("2\nA 1\n").path()).is_err());
    }

    #[test]
    fn test_vg_mode_unsupported() {
        let file = write_graph("1\nA\n");
        assert!(load_graph(GraphFormat::Vg, file.path()).is_err());
        assert!(load_graph(GraphFormat::Txt, file.path()).is_ok());
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("vg".parse::<GraphFormat>().unwrap(), GraphFormat::Vg);
        assert_eq!("txt".parse::<GraphFormat>().unwrap(), GraphFormat::Txt);
        assert!("gfa".parse::<GraphFormat>().is_err());
    }
}
