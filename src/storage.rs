//! On-disk graph format: header, node table, edge table, CRC-32 footer.
//!
//! All integers are little-endian. Node and pillar coordinates are stored
//! fixed-point at 6 decimals, the same precision the importer rounds to, so
//! a write/read round trip is exact. Edge ids are positional and not
//! stored.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::coord::{Coordinate, COORD_SCALE};
use crate::encoder::EdgeFlags;
use crate::error::{Error, Result};
use crate::graph::{GraphEdge, GraphNode, MemGraph};

const MAGIC: u32 = 0x5457_5247; // "TWRG"
const VERSION: u16 = 1;
const HEADER_LEN: usize = 24;
const FOOTER_LEN: usize = 4;

struct Header {
    node_count: u64,
    edge_count: u64,
}

impl Header {
    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN);
        bytes.extend_from_slice(&MAGIC.to_le_bytes());
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes()); // reserved
        bytes.extend_from_slice(&self.node_count.to_le_bytes());
        bytes.extend_from_slice(&self.edge_count.to_le_bytes());
        bytes
    }

    fn from_bytes(path: &str, buf: &mut &[u8]) -> Result<Self> {
        let magic = read_u32(buf).ok_or_else(|| Error::format(path, "truncated header"))?;
        if magic != MAGIC {
            return Err(Error::format(path, format!("bad magic {magic:#010x}")));
        }

        let version = read_u16(buf).ok_or_else(|| Error::format(path, "truncated header"))?;
        if version != VERSION {
            return Err(Error::format(path, format!("unsupported version {version}")));
        }

        let _reserved = read_u16(buf).ok_or_else(|| Error::format(path, "truncated header"))?;
        let node_count = read_u64(buf).ok_or_else(|| Error::format(path, "truncated header"))?;
        let edge_count = read_u64(buf).ok_or_else(|| Error::format(path, "truncated header"))?;

        Ok(Header {
            node_count,
            edge_count,
        })
    }
}

/// Header facts reported without decoding the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphFileInfo {
    pub node_count: u64,
    pub edge_count: u64,
}

/// Writer/reader for the graph file.
pub struct GraphFile;

impl GraphFile {
    /// Write nodes and edges to `path`, with the checksum footer.
    pub fn write<P: AsRef<Path>>(path: P, nodes: &[GraphNode], edges: &[GraphEdge]) -> Result<()> {
        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        let mut hasher = crc32fast::Hasher::new();

        let header = Header {
            node_count: nodes.len() as u64,
            edge_count: edges.len() as u64,
        };
        put(&mut writer, &mut hasher, &header.to_bytes())?;

        for node in nodes {
            put(&mut writer, &mut hasher, &node.id.to_le_bytes())?;
            put(&mut writer, &mut hasher, &to_e6(node.lat).to_le_bytes())?;
            put(&mut writer, &mut hasher, &to_e6(node.lon).to_le_bytes())?;
        }

        for edge in edges {
            put(&mut writer, &mut hasher, &edge.from.to_le_bytes())?;
            put(&mut writer, &mut hasher, &edge.to.to_le_bytes())?;
            put(&mut writer, &mut hasher, &edge.distance_m.to_le_bytes())?;
            put(&mut writer, &mut hasher, &edge.flags.bits().to_le_bytes())?;
            put(
                &mut writer,
                &mut hasher,
                &(edge.pillars.len() as u32).to_le_bytes(),
            )?;
            for pillar in &edge.pillars {
                put(&mut writer, &mut hasher, &pillar.lon_e6().to_le_bytes())?;
                put(&mut writer, &mut hasher, &pillar.lat_e6().to_le_bytes())?;
            }
        }

        writer.write_all(&hasher.finalize().to_le_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Read a graph file back into memory. The checksum is verified before
    /// anything is decoded.
    pub fn read<P: AsRef<Path>>(path: P) -> Result<MemGraph> {
        let path_text = path.as_ref().display().to_string();
        let data = fs::read(&path)?;
        let mut content = checked_content(&path_text, &data)?;

        let header = Header::from_bytes(&path_text, &mut content)?;

        let mut graph = MemGraph::new();
        graph.nodes.reserve(header.node_count as usize);
        for _ in 0..header.node_count {
            let id = read_u32(&mut content)
                .ok_or_else(|| Error::format(&path_text, "truncated node table"))?;
            let lat_e6 = read_i32(&mut content)
                .ok_or_else(|| Error::format(&path_text, "truncated node table"))?;
            let lon_e6 = read_i32(&mut content)
                .ok_or_else(|| Error::format(&path_text, "truncated node table"))?;
            graph.nodes.push(GraphNode {
                id,
                lat: lat_e6 as f64 / COORD_SCALE,
                lon: lon_e6 as f64 / COORD_SCALE,
            });
        }

        graph.edges.reserve(header.edge_count as usize);
        for index in 0..header.edge_count {
            let truncated = || Error::format(&path_text, "truncated edge table");
            let from = read_u32(&mut content).ok_or_else(truncated)?;
            let to = read_u32(&mut content).ok_or_else(truncated)?;
            let distance_m = read_f64(&mut content).ok_or_else(truncated)?;
            let flags = read_u64(&mut content).ok_or_else(truncated)?;
            let pillar_count = read_u32(&mut content).ok_or_else(truncated)?;

            let mut pillars = Vec::with_capacity(pillar_count as usize);
            for _ in 0..pillar_count {
                let lon_e6 = read_i32(&mut content).ok_or_else(truncated)?;
                let lat_e6 = read_i32(&mut content).ok_or_else(truncated)?;
                pillars.push(Coordinate::from_e6(lon_e6, lat_e6));
            }

            graph.edges.push(GraphEdge {
                id: index as u32,
                from,
                to,
                distance_m,
                pillars,
                flags: EdgeFlags::new(flags),
            });
        }

        if !content.is_empty() {
            return Err(Error::format(&path_text, "trailing bytes after edge table"));
        }

        Ok(graph)
    }

    /// Check the footer checksum and the header, without decoding the
    /// tables.
    pub fn verify<P: AsRef<Path>>(path: P) -> Result<GraphFileInfo> {
        let path_text = path.as_ref().display().to_string();
        let data = fs::read(&path)?;
        let mut content = checked_content(&path_text, &data)?;

        let header = Header::from_bytes(&path_text, &mut content)?;
        Ok(GraphFileInfo {
            node_count: header.node_count,
            edge_count: header.edge_count,
        })
    }
}

/// Split off and check the CRC footer, returning the content bytes.
fn checked_content<'a>(path: &str, data: &'a [u8]) -> Result<&'a [u8]> {
    if data.len() < HEADER_LEN + FOOTER_LEN {
        return Err(Error::format(path, "file too short"));
    }

    let (content, footer) = data.split_at(data.len() - FOOTER_LEN);
    let mut footer_buf = footer;
    let stored = read_u32(&mut footer_buf).ok_or_else(|| Error::format(path, "missing footer"))?;
    let computed = crc32fast::hash(content);
    if stored != computed {
        return Err(Error::ChecksumMismatch {
            path: path.to_string(),
            stored,
            computed,
        });
    }
    Ok(content)
}

fn put(writer: &mut BufWriter<File>, hasher: &mut crc32fast::Hasher, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes)?;
    hasher.update(bytes);
    Ok(())
}

fn to_e6(deg: f64) -> i32 {
    (deg * COORD_SCALE).round() as i32
}

fn read_u16(buf: &mut &[u8]) -> Option<u16> {
    let (head, tail) = buf.split_first_chunk::<2>()?;
    *buf = tail;
    Some(u16::from_le_bytes(*head))
}

fn read_u32(buf: &mut &[u8]) -> Option<u32> {
    let (head, tail) = buf.split_first_chunk::<4>()?;
    *buf = tail;
    Some(u32::from_le_bytes(*head))
}

fn read_i32(buf: &mut &[u8]) -> Option<i32> {
    let (head, tail) = buf.split_first_chunk::<4>()?;
    *buf = tail;
    Some(i32::from_le_bytes(*head))
}

fn read_u64(buf: &mut &[u8]) -> Option<u64> {
    let (head, tail) = buf.split_first_chunk::<8>()?;
    *buf = tail;
    Some(u64::from_le_bytes(*head))
}

fn read_f64(buf: &mut &[u8]) -> Option<f64> {
    read_u64(buf).map(f64::from_bits)
}
