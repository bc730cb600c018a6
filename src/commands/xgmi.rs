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

//! `xgmi`: link rate and per-peer traffic counters.

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{LinkMetric, ProcessorHandle, XgmiLinkInfo};
use crate::output::table::render_row;
use crate::output::{Output, OutputFormat, Record, Value};

use super::dispatch::{self, Emit};
use super::field::tolerant;
use super::Ctx;

struct Source {
    id: usize,
    bdf: String,
    info: Option<XgmiLinkInfo>,
}

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    let sources: Vec<Source> = dispatch::targets(ctx, &[DeviceClass::Gpu])?
        .into_iter()
        .flat_map(|target| target.handles)
        .map(|handle| source(ctx, handle))
        .collect();
    // -m/--metric is the only section; it is on when no switch is given.
    if sources.is_empty() || !ctx.wants(DeviceClass::Gpu, "metric") {
        return Ok(());
    }

    if ctx.format() == OutputFormat::Human {
        return output.print_text(&table(&sources));
    }

    let rows = sources
        .iter()
        .map(|src| {
            let mut values = Record::new().with("bdf", src.bdf.as_str());
            values.merge(metadata(src.info.as_ref()));
            let links: Record = sources
                .iter()
                .map(|dst| {
                    let link = peer(src, dst);
                    let record = Record::new()
                        .with("read", kb(link.map(|l| l.read)))
                        .with("write", kb(link.map(|l| l.write)));
                    (dst.bdf.clone(), record)
                })
                .collect();
            values.insert("link_metrics", links);
            (src.id, values)
        })
        .collect();
    dispatch::emit(output, DeviceClass::Gpu, rows, Emit::default())
}

fn source(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Source {
    Source {
        id: ctx.id(handle),
        bdf: tolerant("bdf", ctx.lib.gpu_bdf(handle))
            .map_or_else(|| AppConfig::NOT_AVAILABLE.to_string(), |bdf| bdf.to_string()),
        info: tolerant("xgmi_link_info", ctx.lib.xgmi_link_info(handle)),
    }
}

/// The link from `src` towards `dst`, if the source reports one.
fn peer<'a>(src: &'a Source, dst: &Source) -> Option<&'a LinkMetric> {
    src.info
        .as_ref()?
        .links
        .iter()
        .find(|link| link.bdf.to_string() == dst.bdf)
}

fn kb(value: Option<u64>) -> Value {
    Value::with_unit(Value::opt(value), "KB")
}

fn metadata(info: Option<&XgmiLinkInfo>) -> Record {
    let gbps = |value: Option<u64>| Value::with_unit(Value::opt(value), "Gb/s");
    let link_type = info
        .and_then(|info| info.links.first())
        .map(|link| link.link_type.name());
    Record::new()
        .with("bit_rate", gbps(info.map(|i| u64::from(i.bit_rate))))
        .with(
            "max_bandwidth",
            gbps(info.map(|i| u64::from(i.bit_rate).saturating_mul(u64::from(i.max_width)))),
        )
        .with("link_type", Value::opt(link_type))
}

fn table(sources: &[Source]) -> String {
    let mut text = String::from("LINK METRIC TABLE:\n");

    let mut header = Record::new().with("RW", "");
    for (n, dst) in sources.iter().enumerate() {
        header.insert(format!("bdf_{n}"), dst.bdf.as_str());
    }
    text.push_str(&render_row(&header));
    text.push('\n');

    for src in sources {
        let mut meta = Record::new().with("bdf", src.bdf.as_str());
        meta.merge(metadata(src.info.as_ref()));
        text.push_str(&render_row(&meta));
        text.push('\n');

        for (label, pick) in [(" Read", true), (" Write", false)] {
            let mut row = Record::new().with("RW", label);
            for (n, dst) in sources.iter().enumerate() {
                let counter = peer(src, dst).map(|link| if pick { link.read } else { link.write });
                row.insert(format!("bdf_{n}"), kb(counter));
            }
            text.push_str(&render_row(&row));
            text.push('\n');
        }
    }
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Bdf;
    use crate::native::LinkType;

    fn sources() -> Vec<Source> {
        let link = |bdf: &str, read: u64| LinkMetric {
            bdf: bdf.parse::<Bdf>().unwrap(),
            bit_rate: 32,
            max_bandwidth: 512,
            link_type: LinkType::Xgmi,
            read,
            write: read * 2,
        };
        vec![
            Source {
                id: 0,
                bdf: "0000:03:00.0".to_string(),
                info: Some(XgmiLinkInfo {
                    bit_rate: 32,
                    max_width: 16,
                    links: vec![link("0000:83:00.0", 1024)],
                }),
            },
            Source {
                id: 1,
                bdf: "0000:83:00.0".to_string(),
                info: None,
            },
        ]
    }

    #[test]
    fn test_max_bandwidth_is_rate_times_width() {
        let sources = sources();
        let meta = metadata(sources[0].info.as_ref());
        assert_eq!(meta.get("max_bandwidth").unwrap().to_string(), "512 Gb/s");
        assert_eq!(meta.get("link_type"), Some(&Value::from("XGMI")));
        assert!(metadata(None).get("bit_rate").is_some_and(Value::is_na));
    }

    #[test]
    fn test_max_bandwidth_does_not_wrap() {
        let info = XgmiLinkInfo {
            bit_rate: u32::MAX,
            max_width: 16,
            links: Vec::new(),
        };
        let meta = metadata(Some(&info));
        assert_eq!(
            meta.get("max_bandwidth").unwrap().to_string(),
            format!("{} Gb/s", u64::from(u32::MAX) * 16)
        );
    }

    #[test]
    fn test_human_table_rows() {
        let text = table(&sources());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "LINK METRIC TABLE:");
        assert!(lines[2].starts_with("0000:03:00.0 32 Gb/s"));
        assert!(lines[3].starts_with(" Read"));
        assert!(lines[3].contains("1024 KB"));
        assert!(lines[4].contains("2048 KB"));
        assert_eq!(lines.len(), 8);
    }
}
