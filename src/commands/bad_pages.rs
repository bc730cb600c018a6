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

//! `bad-pages`: the reserved page list split by status.

use crate::common::config::AppConfig;
use crate::error::{DeviceClass, Result};
use crate::native::{BadPage, PageStatus, ProcessorHandle};
use crate::output::{Output, Record, Value};

use super::dispatch::{self, Emit};
use super::field::tolerant;
use super::Ctx;

/// Output key, selecting flag and page status of each bucket.
const BUCKETS: [(&str, &str, PageStatus); 3] = [
    ("retired", "retired", PageStatus::Reserved),
    ("pending", "pending", PageStatus::Pending),
    ("un_res", "un-res", PageStatus::Unreservable),
];

pub fn run(ctx: &Ctx<'_>, output: &mut Output) -> Result<()> {
    dispatch::fan_out(ctx, output, &[DeviceClass::Gpu], Emit::default(), |ctx, _, handle| {
        Ok(vec![bad_pages(ctx, handle)])
    })
}

fn bad_pages(ctx: &Ctx<'_>, handle: ProcessorHandle) -> Record {
    let pages = tolerant("bad_page_info", ctx.lib.bad_pages(handle));
    let mut values = Record::new();
    for (key, flag, status) in BUCKETS {
        if !ctx.wants(DeviceClass::Gpu, flag) {
            continue;
        }
        let bucket = pages.as_deref().map_or(Value::na(), |pages| bucket(pages, status));
        values.insert(key, bucket);
    }
    values
}

/// Pages with `status`. An empty bucket reads as a sentence and a single
/// page is not wrapped in a list.
fn bucket(pages: &[BadPage], status: PageStatus) -> Value {
    let mut entries: Vec<Value> = pages
        .iter()
        .filter(|page| page.status == status)
        .map(|page| {
            Record::new()
                .with("page_address", page.page_address)
                .with("page_size", page.page_size)
                .with("status", page.status.name())
                .into()
        })
        .collect();
    match entries.len() {
        0 => Value::from(AppConfig::NO_BAD_PAGES),
        1 => entries.remove(0),
        _ => Value::List(entries),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(address: u64, status: PageStatus) -> BadPage {
        BadPage {
            page_address: address,
            page_size: 4096,
            status,
        }
    }

    #[test]
    fn test_pages_split_by_status() {
        let pages = [
            page(0x1000, PageStatus::Reserved),
            page(0x2000, PageStatus::Pending),
            page(0x3000, PageStatus::Pending),
            page(0x4000, PageStatus::Unreservable),
        ];
        let retired = bucket(&pages, PageStatus::Reserved);
        assert_eq!(retired.as_record().and_then(|r| r.get("status")), Some(&Value::from("RESERVED")));
        match bucket(&pages, PageStatus::Pending) {
            Value::List(items) => assert_eq!(items.len(), 2),
            other => panic!("expected a list, got {other:?}"),
        }
        assert!(bucket(&pages, PageStatus::Unreservable).as_record().is_some());
    }

    #[test]
    fn test_empty_bucket_placeholder() {
        let pages = [page(0x1000, PageStatus::Pending)];
        assert_eq!(bucket(&pages, PageStatus::Reserved).to_string(), "No bad pages found.");
    }
}
