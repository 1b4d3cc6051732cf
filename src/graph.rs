//! The in-memory citation graph.
//!
//! Nodes live in a dense array indexed by id; each node's citation list is a
//! span of a single shared target array. Ids are checked against the id space
//! once, while loading, so everything downstream can index freely.
//!
//! Wire format, all fields signed 32-bit little-endian:
//!
//! ```text
//! header: max_id, node_count      (node_count absent for `SizeOnly`)
//! record: node_id, citation_count, target_id * citation_count
//! ```
//!
//! Records run until the end of input, which must fall exactly on a record
//! boundary.

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use fixedbitset::FixedBitSet;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::mapped::MappedFile;

/// Score every participating node starts from.
pub const SEED: f64 = 1.0;

/// Which header precedes the records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderLayout {
    /// `max_id` followed by the number of distinct ids.
    #[default]
    SizeAndCount,
    /// `max_id` alone.
    SizeOnly,
}

impl HeaderLayout {
    pub fn header_len(&self) -> usize {
        match *self {
            HeaderLayout::SizeAndCount => 8,
            HeaderLayout::SizeOnly => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Node {
    /// Zero for nodes outside the graph; the seed or latest round otherwise.
    pub score: f64,
    offset: usize,
    len: u32,
    cited: u32,
}

impl Node {
    pub fn is_participating(&self) -> bool { self.score != 0.0 }
    /// Number of citation list entries, across all nodes, naming this node.
    pub fn cited_count(&self) -> u32 { self.cited }
    pub fn citation_count(&self) -> u32 { self.len }
}

pub struct Graph {
    nodes: Vec<Node>,
    targets: Vec<u32>,
    declared: Option<u32>,
    named: usize,
}

impl Graph {
    /// Maps `path` and loads it; see [`Graph::from_bytes`].
    pub fn open<P: AsRef<Path>>(path: P, layout: HeaderLayout) -> Result<Graph> {
        let map = MappedFile::open(path)?;
        Graph::from_bytes(&map[..], layout)
    }

    /// Parses a complete graph. Any malformed, truncated, or trailing input
    /// fails the whole load.
    pub fn from_bytes(bytes: &[u8], layout: HeaderLayout) -> Result<Graph> {
        let start = OffsetDateTime::now_utc();

        if bytes.len() < layout.header_len() {
            return Err(Error::TruncatedHeader);
        }
        let max_id = non_negative("max id", LittleEndian::read_i32(&bytes[0..4]), 0)?;
        let declared = match layout {
            HeaderLayout::SizeAndCount => Some(non_negative("node count", LittleEndian::read_i32(&bytes[4..8]), 4)?),
            HeaderLayout::SizeOnly => None,
        };

        let mut builder = GraphBuilder::new(max_id)?;
        builder.declared = declared;

        let mut citations = Vec::new();
        let mut cursor = layout.header_len();
        while cursor < bytes.len() {
            let record = cursor;
            if bytes.len() - cursor < 8 {
                return Err(Error::TruncatedRecord { offset: record });
            }
            let node = non_negative("node id", LittleEndian::read_i32(&bytes[cursor..]), cursor)?;
            let count = non_negative("citation count", LittleEndian::read_i32(&bytes[cursor + 4..]), cursor + 4)? as usize;
            cursor += 8;

            if (bytes.len() - cursor) / 4 < count {
                return Err(Error::TruncatedRecord { offset: record });
            }
            citations.clear();
            for chunk in bytes[cursor..cursor + 4 * count].chunks_exact(4) {
                citations.push(non_negative("target id", LittleEndian::read_i32(chunk), cursor)?);
                cursor += 4;
            }
            builder.add(node, &citations)?;
        }

        let graph = builder.finish();
        info!(
            max_id,
            participating = graph.participating(),
            edges = graph.edges(),
            seconds = (OffsetDateTime::now_utc() - start).as_seconds_f64(),
            "loaded graph"
        );
        if let Some(declared) = graph.declared {
            if declared as usize != graph.named() {
                warn!(declared, named = graph.named(), "header node count disagrees with records");
            }
        }
        Ok(graph)
    }

    /// Size of the id space, `max_id + 1`.
    pub fn len(&self) -> usize { self.nodes.len() }
    pub fn is_empty(&self) -> bool { self.nodes.is_empty() }

    pub fn node(&self, index: usize) -> &Node { &self.nodes[index] }
    pub fn nodes(&self) -> &[Node] { &self.nodes[..] }

    /// The ids `index` cites; each is a valid index into this graph.
    pub fn citations(&self, index: usize) -> &[u32] {
        let node = &self.nodes[index];
        &self.targets[node.offset..node.offset + node.len as usize]
    }

    pub fn participating(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_participating()).count()
    }

    pub fn edges(&self) -> usize { self.targets.len() }

    /// Distinct ids heading a record or cited by one, participating or not.
    /// This is what the header's node count describes.
    pub fn named(&self) -> usize { self.named }

    /// Node count announced by the header, if the layout carries one.
    pub fn declared(&self) -> Option<u32> { self.declared }

    pub fn scores(&self) -> Vec<f64> {
        self.nodes.iter().map(|node| node.score).collect()
    }

    /// Replaces every node's score. Only the rank engine calls this, with a
    /// buffer sized to the id space.
    pub(crate) fn set_scores(&mut self, scores: &[f64]) {
        assert_eq!(scores.len(), self.nodes.len());
        for (node, &score) in self.nodes.iter_mut().zip(scores) {
            node.score = score;
        }
    }
}

/// Assembles a graph record by record, rejecting ids outside `[0, max_id]`.
pub struct GraphBuilder {
    nodes: Vec<Node>,
    targets: Vec<u32>,
    recorded: FixedBitSet,
    max_id: u32,
    declared: Option<u32>,
}

impl GraphBuilder {
    /// Fails rather than aborting when `max_id + 1` nodes cannot be allocated.
    pub fn new(max_id: u32) -> Result<GraphBuilder> {
        let len = max_id as usize + 1;
        Ok(GraphBuilder {
            nodes: allocate(len)?,
            targets: Vec::new(),
            recorded: FixedBitSet::with_capacity(len),
            max_id,
            declared: None,
        })
    }

    /// Records that `node` cites each of `citations`, marking all of them as
    /// participating. A record with no citations leaves `node` outside the
    /// graph unless something else cites it.
    pub fn add(&mut self, node: u32, citations: &[u32]) -> Result<()> {
        if node > self.max_id {
            return Err(Error::NodeOutOfRange { node, max_id: self.max_id });
        }
        if let Some(&target) = citations.iter().find(|&&target| target > self.max_id) {
            return Err(Error::TargetOutOfRange { node, target, max_id: self.max_id });
        }
        if self.recorded.put(node as usize) {
            return Err(Error::DuplicateRecord { node });
        }

        let entry = &mut self.nodes[node as usize];
        if !citations.is_empty() {
            entry.score = SEED;
        }
        entry.offset = self.targets.len();
        entry.len = citations.len() as u32;
        self.targets.extend_from_slice(citations);

        for &target in citations {
            let entry = &mut self.nodes[target as usize];
            entry.score = SEED;
            entry.cited += 1;
        }
        Ok(())
    }

    pub fn finish(self) -> Graph {
        let named = self.nodes.iter()
                              .enumerate()
                              .filter(|&(index, node)| node.is_participating() || self.recorded.contains(index))
                              .count();
        Graph {
            nodes: self.nodes,
            targets: self.targets,
            declared: self.declared,
            named,
        }
    }
}

fn allocate(len: usize) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    nodes.try_reserve_exact(len).map_err(|_| Error::IdSpaceTooLarge { nodes: len })?;
    nodes.resize(len, Node::default());
    Ok(nodes)
}

fn non_negative(field: &'static str, value: i32, offset: usize) -> Result<u32> {
    if value < 0 {
        Err(Error::NegativeField { field, value, offset })
    } else {
        Ok(value as u32)
    }
}

#[cfg(test)]
fn bytes(fields: &[i32]) -> Vec<u8> {
    let mut bytes = vec![0u8; 4 * fields.len()];
    LittleEndian::write_i32_into(fields, &mut bytes);
    bytes
}

#[test]
fn load_small_graph() {
    // 0 cites 1 and 2, 2 cites 1; node 3 exists in the id space only
    let graph = Graph::from_bytes(&bytes(&[3, 3, 0, 2, 1, 2, 2, 1, 1]), HeaderLayout::SizeAndCount).unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.edges(), 3);
    assert_eq!(graph.participating(), 3);
    assert_eq!(graph.declared(), Some(3));
    assert_eq!(graph.citations(0), &[1, 2]);
    assert_eq!(graph.citations(1), &[] as &[u32]);
    assert_eq!(graph.citations(2), &[1]);
    assert_eq!(graph.node(1).cited_count(), 2);
    assert_eq!(graph.node(2).cited_count(), 1);
    assert_eq!(graph.node(0).cited_count(), 0);
    assert_eq!(graph.scores(), vec![SEED, SEED, SEED, 0.0]);
    assert!(!graph.node(3).is_participating());
}

#[test]
fn load_size_only_header() {
    let graph = Graph::from_bytes(&bytes(&[1, 1, 1, 0]), HeaderLayout::SizeOnly).unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(graph.declared(), None);
    assert_eq!(graph.citations(1), &[0]);
}

#[test]
fn empty_record_list() {
    let graph = Graph::from_bytes(&bytes(&[5, 0]), HeaderLayout::SizeAndCount).unwrap();
    assert_eq!(graph.len(), 6);
    assert_eq!(graph.participating(), 0);
}

#[test]
fn reject_malformed_input() {
    let layout = HeaderLayout::SizeAndCount;
    match Graph::from_bytes(&[0, 0, 0], layout) { Err(Error::TruncatedHeader) => {}, _ => panic!("short header accepted") }
    match Graph::from_bytes(&[], layout) { Err(Error::TruncatedHeader) => {}, _ => panic!("empty input accepted") }

    // citation list shorter than its count
    match Graph::from_bytes(&bytes(&[3, 2, 0, 2, 1]), layout) {
        Err(Error::TruncatedRecord { offset: 8 }) => {},
        _ => panic!("truncated record accepted"),
    }

    // trailing bytes after the last record
    let mut trailing = bytes(&[3, 2, 0, 1, 1]);
    trailing.push(0);
    match Graph::from_bytes(&trailing, layout) {
        Err(Error::TruncatedRecord { offset: 20 }) => {},
        _ => panic!("trailing bytes accepted"),
    }

    match Graph::from_bytes(&bytes(&[3, 2, 0, 1, 4]), layout) {
        Err(Error::TargetOutOfRange { node: 0, target: 4, max_id: 3 }) => {},
        _ => panic!("out of range target accepted"),
    }
    match Graph::from_bytes(&bytes(&[3, 2, 7, 0]), layout) {
        Err(Error::NodeOutOfRange { node: 7, max_id: 3 }) => {},
        _ => panic!("out of range node accepted"),
    }
    match Graph::from_bytes(&bytes(&[3, 2, 0, 1, -1]), layout) {
        Err(Error::NegativeField { field: "target id", value: -1, .. }) => {},
        _ => panic!("negative target accepted"),
    }
    match Graph::from_bytes(&bytes(&[3, 2, 0, 1, 1, 0, 1, 2]), layout) {
        Err(Error::DuplicateRecord { node: 0 }) => {},
        _ => panic!("duplicate record accepted"),
    }
}

#[test]
fn edgeless_record_does_not_participate() {
    let graph = Graph::from_bytes(&bytes(&[2, 1, 1, 0, 2, 1, 0]), HeaderLayout::SizeAndCount).unwrap();
    assert!(!graph.node(1).is_participating());
    assert!(graph.node(0).is_participating());
    assert!(graph.node(2).is_participating());
}

#[test]
fn duplicate_targets_count_per_edge() {
    let mut builder = GraphBuilder::new(2).unwrap();
    builder.add(0, &[1, 1]).unwrap();
    builder.add(2, &[1]).unwrap();
    let graph = builder.finish();
    assert_eq!(graph.node(1).cited_count(), 3);
    assert_eq!(graph.node(0).citation_count(), 2);
}

#[test]
fn header_count_includes_edgeless_records() {
    use crate::encode::{self, Record};
    let records = vec![Record { node: 0, citations: vec![1] }, Record { node: 2, citations: vec![] }];
    let mut bytes = Vec::new();
    encode::write(&mut bytes, &records, HeaderLayout::SizeAndCount).unwrap();
    let graph = Graph::from_bytes(&bytes, HeaderLayout::SizeAndCount).unwrap();
    assert_eq!(graph.participating(), 2);
    assert_eq!(graph.named(), 3);
    assert_eq!(graph.declared(), Some(graph.named() as u32));
}

#[test]
fn oversized_id_space_is_an_error() {
    match allocate(usize::MAX / 8) {
        Err(Error::IdSpaceTooLarge { .. }) => {},
        _ => panic!("impossible allocation accepted"),
    }
}
