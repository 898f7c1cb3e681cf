//! 形状解码
//!
//! 几何内核由宿主提供；核心只负责找到并读出 BREP 数据，然后交给 `ShapeDecoder`。

use thiserror::Error;

/// 形状数据解码失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct DecodeError(pub String);

/// 几何内核：把 BREP 字节解码成形状
pub trait ShapeDecoder {
    type Shape;

    fn decode(&self, data: &[u8]) -> Result<Self::Shape, DecodeError>;
}

/// BREP 头部只在前几行中查找
const HEADER_LINES: usize = 4;
const HEADER_TAG: &str = "CASCADE Topology V";

/// 未经几何内核处理的 BREP 形状
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrepShape {
    /// 原始数据
    pub data: Vec<u8>,

    /// 拓扑格式版本（`CASCADE Topology V<n>`）
    pub topology_version: u32,
}

impl BrepShape {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 默认解码器：校验 OpenCASCADE BREP 头部并保留原始数据
#[derive(Debug, Clone, Copy, Default)]
pub struct BrepDecoder;

impl ShapeDecoder for BrepDecoder {
    type Shape = BrepShape;

    fn decode(&self, data: &[u8]) -> Result<BrepShape, DecodeError> {
        let topology_version = data
            .split(|b| *b == b'\n')
            .take(HEADER_LINES)
            .find_map(topology_version)
            .ok_or_else(|| DecodeError("missing BREP topology header".to_string()))?;

        Ok(BrepShape {
            data: data.to_vec(),
            topology_version,
        })
    }
}

fn topology_version(line: &[u8]) -> Option<u32> {
    let line = String::from_utf8_lossy(line);
    let start = line.find(HEADER_TAG)? + HEADER_TAG.len();
    let digits: String = line[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
