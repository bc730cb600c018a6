// Copyright 2025 Lablup Inc. and Jeongkyu Shin
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

//! `topology`: pairwise link properties between the selected GPUs.
//!
//! Human output is one square table per aspect plus a legend, JSON nests a
//! `links` list under every source GPU, and CSV flattens the grid into
//! `<aspect>_<bdf>` columns.

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{LinkType, ProcessorHandle};
use crate::output::store::SecondaryTable;
use crate::output::table::column_for;
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::field::{enabled, tolerant};
use super::Ctx;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aspect {
    Access,
    Weight,
    Hops,
    LinkType,
    NumaBw,
    Coherent,
    Atomics,
    Dma,
    BiDir,
}

impl Aspect {
    const ALL: [Aspect; 9] = [
        Aspect::Access,
        Aspect::Weight,
        Aspect::Hops,
        Aspect::LinkType,
        Aspect::NumaBw,
        Aspect::Coherent,
        Aspect::Atomics,
        Aspect::Dma,
        Aspect::BiDir,
    ];

    fn flag(self) -> &'static str {
        match self {
            Aspect::Access => "access",
            Aspect::Weight => "weight",
            Aspect::Hops => "hops",
            Aspect::LinkType => "link-type",
            Aspect::NumaBw => "numa-bw",
            Aspect::Coherent => "coherent",
            Aspect::Atomics => "atomics",
            Aspect::Dma => "dma",
            Aspect::BiDir => "bi-dir",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Aspect::Access => "access",
            Aspect::Weight => "weight",
            Aspect::Hops => "hops",
            Aspect::LinkType => "link_type",
            Aspect::NumaBw => "numa_bw",
            Aspect::Coherent => "coherent",
            Aspect::Atomics => "atomics",
            Aspect::Dma => "dma",
            Aspect::BiDir => "bi_dir",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Aspect::Access => "ACCESS TABLE:",
            Aspect::Weight => "WEIGHT TABLE:",
            Aspect::Hops => "HOPS TABLE:",
            Aspect::LinkType => "LINK TYPE TABLE:",
            Aspect::NumaBw => "NUMA BW TABLE:",
            Aspect::Coherent => "CACHE COHERANCY TABLE:",
            Aspect::Atomics => "ATOMICS TABLE:",
            Aspect::Dma => "DMA TABLE:",
            Aspect::BiDir => "BI-DIRECTIONAL TABLE:",
        }
    }
}

const LEGEND: &str = "Legend:
  SELF = Current GPU
  ENABLED / DISABLED = Link is enabled or disabled
  N/A = Not supported
  T/F = True / False
  C/NC = Coherant / Non-Coherant io links
  64,32 = 64 bit and 32 bit atomic support
  <BW from>-<BW to>";

struct Node {
    id: usize,
    handle: ProcessorHandle,
    bdf: String,
}

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    let nodes: Vec<Node> = dispatch::targets(ctx, &[DeviceClass::Gpu])?
        .into_iter()
        .flat_map(|target| target.handles)
        .map(|handle| Node {
            id: ctx.id(handle),
            handle,
            bdf: tolerant("bdf", ctx.lib.gpu_bdf(handle))
                .map_or_else(|| AppConfig::NOT_AVAILABLE.to_string(), |bdf| bdf.to_string()),
        })
        .collect();
    if nodes.is_empty() {
        return Ok(());
    }
    let aspects: Vec<Aspect> = Aspect::ALL
        .into_iter()
        .filter(|aspect| ctx.wants(DeviceClass::Gpu, aspect.flag()))
        .collect();

    match ctx.format() {
        OutputFormat::Human => {
            for table in tables(ctx, &nodes, &aspects) {
                output.add_secondary(table);
            }
            output.print(false, false, true)
        }
        OutputFormat::Json => {
            let rows = nodes
                .iter()
                .map(|src| {
                    let links: Vec<Value> = nodes
                        .iter()
                        .map(|dst| {
                            let mut link = Record::new().with("gpu", dst.id).with("bdf", dst.bdf.as_str());
                            for aspect in &aspects {
                                link.insert(aspect.key(), cell(ctx, src, dst, *aspect));
                            }
                            link.into()
                        })
                        .collect();
                    let values = Record::new()
                        .with("bdf", src.bdf.as_str())
                        .with("links", Value::List(links));
                    (src.id, values)
                })
                .collect();
            dispatch::emit(output, DeviceClass::Gpu, rows, Emit::default())
        }
        OutputFormat::Csv => {
            let rows = nodes
                .iter()
                .map(|src| {
                    let mut values = Record::new().with("bdf", src.bdf.as_str());
                    for aspect in &aspects {
                        let grid: Record = nodes
                            .iter()
                            .map(|dst| (dst.bdf.clone(), cell(ctx, src, dst, *aspect)))
                            .collect();
                        values.insert(aspect.key(), grid);
                    }
                    (src.id, values)
                })
                .collect();
            let opts = Emit {
                grid: true,
                ..Emit::default()
            };
            dispatch::emit(output, DeviceClass::Gpu, rows, opts)
        }
    }
}

/// One titled grid per aspect, then the legend. The tables carry no JSON
/// key, so they only ever render as text.
fn tables(ctx: &Ctx<'_>, nodes: &[Node], aspects: &[Aspect]) -> Vec<SecondaryTable> {
    let column = column_for("gpu_0");
    let header: String = std::iter::once(column.pad(""))
        .chain(nodes.iter().map(|dst| column.pad(&dst.bdf)))
        .collect();
    let mut tables: Vec<SecondaryTable> = aspects
        .iter()
        .map(|aspect| SecondaryTable {
            title: aspect.title().to_string(),
            header: header.trim_end().to_string(),
            key: String::new(),
            rows: nodes
                .iter()
                .map(|src| {
                    let mut row = Record::new().with("bdf", src.bdf.as_str());
                    for dst in nodes {
                        row.insert(format!("gpu_{}", dst.id), cell(ctx, src, dst, *aspect));
                    }
                    row
                })
                .collect(),
        })
        .collect();
    tables.push(SecondaryTable {
        title: LEGEND.to_string(),
        ..SecondaryTable::default()
    });
    tables
}

fn true_false(flag: bool) -> Value {
    Value::from(if flag { "T" } else { "F" })
}

fn cell(ctx: &Ctx<'_>, src: &Node, dst: &Node, aspect: Aspect) -> Value {
    if src.handle == dst.handle {
        return match aspect {
            Aspect::Weight | Aspect::Hops => Value::from(0u64),
            _ => Value::from("SELF"),
        };
    }
    let lib = ctx.lib;
    let (a, b) = (src.handle, dst.handle);
    match aspect {
        Aspect::Access => tolerant("p2p_access", lib.is_p2p_accessible(a, b)).map_or(Value::na(), enabled),
        Aspect::Weight => Value::opt(tolerant("link_weight", lib.topo_link_weight(a, b))),
        Aspect::Hops => Value::opt(tolerant("link_hops", lib.topo_link_type(a, b)).map(|(hops, _)| hops)),
        Aspect::LinkType => {
            Value::opt(tolerant("link_type", lib.topo_link_type(a, b)).map(|(_, kind)| kind.name()))
        }
        Aspect::NumaBw => {
            let xgmi = tolerant("link_type", lib.topo_link_type(a, b)).is_some_and(|(_, kind)| kind == LinkType::Xgmi);
            if !xgmi {
                return Value::na();
            }
            Value::opt(tolerant("minmax_bandwidth", lib.minmax_bandwidth(a, b)).map(|(min, max)| format!("{min}-{max}")))
        }
        Aspect::Coherent | Aspect::Atomics | Aspect::Dma | Aspect::BiDir => {
            let Some(caps) = tolerant("p2p_status", lib.p2p_status(a, b)) else {
                return Value::na();
            };
            match aspect {
                Aspect::Coherent => Value::from(if caps.coherent { "C" } else { "NC" }),
                Aspect::Atomics => match (caps.atomics_64bit, caps.atomics_32bit) {
                    (true, true) => Value::from("64,32"),
                    (true, false) => Value::from("64"),
                    (false, true) => Value::from("32"),
                    (false, false) => Value::na(),
                },
                Aspect::Dma => true_false(caps.dma),
                _ => true_false(caps.bi_directional),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_flags_and_keys() {
        assert_eq!(Aspect::LinkType.flag(), "link-type");
        assert_eq!(Aspect::LinkType.key(), "link_type");
        assert_eq!(Aspect::BiDir.key(), "bi_dir");
        assert!(LEGEND.starts_with("Legend:"));
    }
}
