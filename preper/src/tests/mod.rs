// SPDX-License-Identifier: MIT

use std::io::Read as _;
use std::path::Path;
use std::time::Duration;

use flate2::read::GzDecoder;
use futures::StreamExt;

use crate::config::Config;
use crate::error::PackError;
use crate::stream::{PackEvent, PackStream};


/// A config whose temp workspaces live below `base`.
pub(crate) fn test_config(base: &Path) -> Config {
    Config {
        tmp_dir: base.join("tmp"),
        ..Config::default()
    }
}

/// Everything a [`PackStream`] yielded, split at its terminal error.
pub(crate) struct Collected {
    pub events: Vec<PackEvent>,
    pub error: Option<PackError>,
    pub after_error: usize,
}

impl Collected {
    pub fn bytes(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                PackEvent::Data(b) => Some(b.as_ref()),
                PackEvent::Prepared => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn prepared_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| **e == PackEvent::Prepared)
            .count()
    }
}

pub(crate) async fn collect(mut stream: PackStream) -> Collected {
    let mut events = Vec::new();
    let mut error = None;
    let mut after_error = 0;
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) if error.is_none() => events.push(event),
            Err(e) if error.is_none() => error = Some(e),
            _ => after_error += 1,
        }
    }
    Collected {
        events,
        error,
        after_error,
    }
}

/// `(name, contents)` of every entry in a gzip'd tarball.
pub(crate) fn archive_entries(tgz: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = tar::Archive::new(GzDecoder::new(tgz));
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let name = entry.path().unwrap().to_string_lossy().into_owned();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            (name, contents)
        })
        .collect()
}

pub(crate) fn entry_names(tgz: &[u8]) -> Vec<String> {
    archive_entries(tgz).into_iter().map(|(n, _)| n).collect()
}

/// Wait until `dir` holds no entries, failing after a few seconds.
pub(crate) async fn wait_until_empty(dir: &Path) {
    for _ in 0..200 {
        if preper_utils_test::list_tree(dir).unwrap().is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "{} still holds {:?}",
        dir.display(),
        preper_utils_test::list_tree(dir).unwrap()
    );
}
