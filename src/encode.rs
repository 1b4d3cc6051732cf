use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use fixedbitset::FixedBitSet;
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::HeaderLayout;

/// A node and the ids it cites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub node: u32,
    pub citations: Vec<u32>,
}

/// Parses `node,target,target,...`; `line` numbers errors.
pub fn parse_line(text: &str, line: usize) -> Result<Record> {
    let mut ids = text.split(',').map(|field| {
        let field = field.trim();
        field.parse::<u32>().map_err(|_| Error::Parse { line, message: format!("malformed id {:?}", field) })
    });
    let node = match ids.next() {
        Some(node) => node?,
        None => return Err(Error::Parse { line, message: "empty line".to_string() }),
    };
    let citations = ids.collect::<Result<Vec<_>>>()?;
    Ok(Record { node, citations })
}

/// Writes `records` in the wire format read by `Graph::from_bytes`.
pub fn write<W: Write>(writer: &mut W, records: &[Record], layout: HeaderLayout) -> Result<()> {

    let mut max_id = 0u32;
    for record in records {
        max_id = ::std::cmp::max(max_id, record.node);
        for &target in &record.citations {
            max_id = ::std::cmp::max(max_id, target);
        }
    }
    let max_id = checked(max_id)?;

    writer.write_i32::<LittleEndian>(max_id)?;
    if layout == HeaderLayout::SizeAndCount {
        let mut seen = FixedBitSet::with_capacity(max_id as usize + 1);
        for record in records {
            seen.insert(record.node as usize);
            for &target in &record.citations {
                seen.insert(target as usize);
            }
        }
        writer.write_i32::<LittleEndian>(seen.count_ones(..) as i32)?;
    }

    for record in records {
        writer.write_i32::<LittleEndian>(checked(record.node)?)?;
        writer.write_i32::<LittleEndian>(checked(record.citations.len() as u32)?)?;
        for &target in &record.citations {
            writer.write_i32::<LittleEndian>(target as i32)?;
        }
    }

    info!(max_id, records = records.len(), "encoded graph");
    Ok(())
}

pub fn write_file<P: AsRef<Path>>(path: P, records: &[Record], layout: HeaderLayout) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer, records, layout)?;
    writer.flush()?;
    Ok(())
}

fn checked(id: u32) -> Result<i32> {
    if id > i32::MAX as u32 { Err(Error::IdTooLarge { id }) } else { Ok(id as i32) }
}

#[test]
fn parse_lines() {
    assert_eq!(parse_line("4,1, 2", 1).unwrap(), Record { node: 4, citations: vec![1, 2] });
    assert_eq!(parse_line("7", 2).unwrap(), Record { node: 7, citations: vec![] });
    match parse_line("4,x", 3) {
        Err(Error::Parse { line: 3, .. }) => {},
        _ => panic!("malformed id accepted"),
    }
    match parse_line("-1,2", 4) {
        Err(Error::Parse { line: 4, .. }) => {},
        _ => panic!("negative id accepted"),
    }
}

#[test]
fn encode_header() {
    let records = vec![Record { node: 0, citations: vec![5, 2] }, Record { node: 2, citations: vec![0] }];
    let mut bytes = Vec::new();
    write(&mut bytes, &records, HeaderLayout::SizeAndCount).unwrap();
    let mut expected = Vec::new();
    for &field in &[5i32, 3, 0, 2, 5, 2, 2, 1, 0] {
        expected.write_i32::<LittleEndian>(field).unwrap();
    }
    assert_eq!(bytes, expected);

    let mut short = Vec::new();
    write(&mut short, &records, HeaderLayout::SizeOnly).unwrap();
    assert_eq!(&short[..], &expected[..4]);
    assert_eq!(&short[4..], &expected[8..]);
}

#[test]
fn encode_rejects_wide_ids() {
    let records = vec![Record { node: 1 << 31, citations: vec![] }];
    match write(&mut Vec::new(), &records, HeaderLayout::SizeOnly) {
        Err(Error::IdTooLarge { .. }) => {},
        _ => panic!("wide id accepted"),
    }
}

#[test]
fn encode_and_load() {
    use crate::graph::Graph;
    let dir = ::tempdir::TempDir::new("encode_and_load").unwrap();
    let path = dir.path().join("links");
    let records = vec![
        Record { node: 0, citations: vec![1] },
        Record { node: 1, citations: vec![2] },
        Record { node: 3, citations: vec![0, 1, 2] },
    ];
    write_file(&path, &records, HeaderLayout::SizeAndCount).unwrap();
    let graph = Graph::open(&path, HeaderLayout::SizeAndCount).unwrap();
    assert_eq!(graph.len(), 4);
    assert_eq!(graph.declared(), Some(4));
    let read = (0..graph.len()).filter(|&node| graph.node(node).citation_count() > 0)
                               .map(|node| Record { node: node as u32, citations: graph.citations(node).to_vec() })
                               .collect::<Vec<_>>();
    assert_eq!(read, records);
}
