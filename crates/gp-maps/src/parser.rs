//! Streaming reader for the legacy fixed-format map grammar.
//!
//! Layout, in file order:
//!
//! ```text
//! ...free-form comments...
//! 99 <map-type> <title words...>
//! ...optional lines...
//! REYNOLDS RNI=... f_RNI=... RNI=... f_RNI=...
//! <KEYWORD>
//! <packed-count> <beta values, wrapping freely>
//! <Nc value> <beta_count data values, wrapping freely>
//! ...
//! ```
//!
//! The packed count encodes (Nc_count + 1) in the integer part and
//! (beta_count + 1)/1000 in the fraction. Values wrap across lines until
//! the declared count is met.

use crate::error::{MapError, MapResult};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// A parsed keyword grid: `values[i][j]` at (nc[i], beta[j]).
#[derive(Debug, Clone)]
pub struct CrossTable {
    pub nc: Vec<f64>,
    pub beta: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

/// Line-oriented reader tracking the current line number for diagnostics.
pub struct MapFileReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl MapFileReader {
    pub fn open(path: &Path) -> MapResult<Self> {
        let file = File::open(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_line(&mut self) -> MapResult<Option<String>> {
        match self.lines.next() {
            None => Ok(None),
            Some(Err(source)) => Err(MapError::Io {
                path: self.path.clone(),
                source,
            }),
            Some(Ok(line)) => {
                self.line_no += 1;
                Ok(Some(line))
            }
        }
    }

    fn malformed(&self, what: impl Into<String>) -> MapError {
        MapError::MalformedGrid {
            path: self.path.clone(),
            line: self.line_no,
            what: what.into(),
        }
    }

    /// Skip to the `99` header line; returns (map type token, title).
    pub fn read_header(&mut self) -> MapResult<(String, String)> {
        while let Some(line) = self.next_line()? {
            if line.contains("99") {
                // First token is the 99 marker itself.
                let rest: Vec<&str> = line.split_whitespace().skip(1).collect();
                let map_type = rest.first().map(|s| s.to_string()).unwrap_or_default();
                let title = rest.get(1..).unwrap_or(&[]).join(" ");
                tracing::debug!(path = %self.path.display(), map_type, title, "map header");
                return Ok((map_type, title));
            }
        }
        Err(MapError::MissingHeader {
            path: self.path.clone(),
        })
    }

    /// Skip to the REYNOLDS record and parse its two (RNI, f_RNI) pairs.
    pub fn read_reynolds(&mut self) -> MapResult<([f64; 2], [f64; 2])> {
        while let Some(line) = self.next_line()? {
            if line.to_uppercase().contains("REYNOLDS") {
                let items: Vec<&str> = line.split_whitespace().collect();
                if items.len() < 5 {
                    return Err(self.malformed("REYNOLDS record needs 4 key=value items"));
                }
                let value_of = |item: &str| -> MapResult<f64> {
                    item.split_once('=')
                        .ok_or_else(|| self.malformed(format!("expected key=value, got '{item}'")))?
                        .1
                        .parse()
                        .map_err(|_| self.malformed(format!("bad number in '{item}'")))
                };
                let rni = [value_of(items[1])?, value_of(items[3])?];
                let f_rni = [value_of(items[2])?, value_of(items[4])?];
                return Ok((rni, f_rni));
            }
        }
        Err(MapError::MissingKeyword {
            path: self.path.clone(),
            keyword: "REYNOLDS",
        })
    }

    /// Skip to a keyword line and read its (Nc, beta) cross table.
    pub fn read_cross_table(&mut self, keyword: &'static str) -> MapResult<CrossTable> {
        loop {
            match self.next_line()? {
                None => {
                    return Err(MapError::MissingKeyword {
                        path: self.path.clone(),
                        keyword,
                    });
                }
                Some(line) if line.to_uppercase().contains(keyword) => break,
                Some(_) => continue,
            }
        }

        // Packed-count header plus the first chunk of beta values.
        let line = self
            .next_line()?
            .ok_or_else(|| self.malformed("grid header missing"))?;
        let mut items = line.split_whitespace();
        let packed: f64 = items
            .next()
            .ok_or_else(|| self.malformed("empty grid header"))?
            .parse()
            .map_err(|_| self.malformed("packed count is not a number"))?;
        let nc_count = (packed.trunc() as usize)
            .checked_sub(1)
            .ok_or_else(|| self.malformed("packed Nc count below 1"))?;
        let beta_count = ((packed.fract() * 1000.0).round() as usize)
            .checked_sub(1)
            .ok_or_else(|| self.malformed("packed beta count below 1"))?;
        if nc_count == 0 || beta_count == 0 {
            return Err(self.malformed("grid declares zero rows or columns"));
        }

        let mut beta = parse_numbers(items, |what| self.malformed(what))?;
        while beta.len() < beta_count {
            let line = self
                .next_line()?
                .ok_or_else(|| self.malformed("beta values truncated"))?;
            beta.extend(parse_numbers(line.split_whitespace(), |what| {
                self.malformed(what)
            })?);
        }
        if beta.len() != beta_count {
            return Err(self.malformed(format!(
                "expected {beta_count} beta values, found {}",
                beta.len()
            )));
        }

        // One row per Nc value, each wrapping until beta_count values.
        let mut nc = Vec::with_capacity(nc_count);
        let mut values = Vec::with_capacity(nc_count);
        for _ in 0..nc_count {
            let line = loop {
                let line = self
                    .next_line()?
                    .ok_or_else(|| self.malformed("grid rows truncated"))?;
                if !line.trim().is_empty() {
                    break line;
                }
            };
            let mut items = line.split_whitespace();
            let nc_value: f64 = items
                .next()
                .ok_or_else(|| self.malformed("row missing Nc value"))?
                .parse()
                .map_err(|_| self.malformed("row Nc value is not a number"))?;
            let mut row = parse_numbers(items, |what| self.malformed(what))?;
            while row.len() < beta_count {
                let line = self
                    .next_line()?
                    .ok_or_else(|| self.malformed("row values truncated"))?;
                row.extend(parse_numbers(line.split_whitespace(), |what| {
                    self.malformed(what)
                })?);
            }
            if row.len() != beta_count {
                return Err(self.malformed(format!(
                    "row for Nc={nc_value} has {} values, expected {beta_count}",
                    row.len()
                )));
            }
            nc.push(nc_value);
            values.push(row);
        }

        Ok(CrossTable { nc, beta, values })
    }
}

fn parse_numbers<'a>(
    items: impl Iterator<Item = &'a str>,
    err: impl Fn(String) -> MapError,
) -> MapResult<Vec<f64>> {
    items
        .map(|item| {
            item.parse::<f64>()
                .map_err(|_| err(format!("'{item}' is not a number")))
        })
        .collect()
}
