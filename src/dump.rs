//! Line-oriented transform dumps captured from a running game.
//!
//! ```text
//! BONE|root
//! FRAME_COUNT=2
//! FRAME=0
//! T|root|qx|qy|qz|qw|px|py|pz
//! ```

use std::collections::HashMap;
use std::str::FromStr;

use log::{debug, warn};

use crate::convert::{Sample, SampledAnimation};
use crate::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dump {
    pub bones: Vec<String>,
    /// `FRAME_COUNT=` as written. The non-empty frame blocks are trusted over it.
    pub declared_frame_count: Option<usize>,
    pub frames: Vec<HashMap<String, Sample>>,
}

fn schema(line: usize, msg: String) -> Error {
    Error::Schema(format!("line {}: {}", line, msg))
}

fn transform(line: usize, rest: &str) -> Result<(String, Sample)> {
    let mut parts = rest.split('|');
    let name = parts
        .next()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| schema(line, "transform without a bone name".into()))?;
    let values = parts
        .map(|p| {
            p.trim()
                .parse::<f32>()
                .map_err(|_| schema(line, format!("`{}` is not a number", p)))
        })
        .collect::<Result<Vec<f32>>>()?;
    let sample = Sample::from_slice(&values)
        .ok_or_else(|| schema(line, format!("expected 7 numbers, found {}", values.len())))?;
    Ok((name.to_string(), sample))
}

impl Dump {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Dense per-bone samples in `BONE|` order.
    pub fn to_sampled(&self, name: &str, frame_rate: u16, has_positions: bool) -> SampledAnimation {
        if let Some(declared) = self.declared_frame_count {
            if declared != self.frames.len() {
                warn!(
                    "dump declares {} frames but carries {}",
                    declared,
                    self.frames.len()
                );
            }
        }
        let frames = self
            .frames
            .iter()
            .map(|frame| self.bones.iter().map(|b| frame.get(b).copied()).collect())
            .collect();
        SampledAnimation {
            name: name.replace(' ', "_"),
            frame_rate,
            bones: self.bones.clone(),
            has_positions,
            frames,
        }
    }
}

impl FromStr for Dump {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let mut dump = Dump::default();
        let mut current: Option<HashMap<String, Sample>> = None;
        let mut undeclared = 0;

        for (i, line) in text.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(name) = line.strip_prefix("BONE|") {
                dump.bones.push(name.to_string());
            } else if let Some(n) = line.strip_prefix("FRAME_COUNT=") {
                let n = n
                    .trim()
                    .parse()
                    .map_err(|_| schema(line_no, format!("bad frame count `{}`", n)))?;
                dump.declared_frame_count = Some(n);
            } else if line.starts_with("FRAME=") {
                if let Some(frame) = current.replace(HashMap::new()).filter(|f| !f.is_empty()) {
                    dump.frames.push(frame);
                }
            } else if let Some(rest) = line.strip_prefix("T|") {
                let (name, sample) = transform(line_no, rest)?;
                if !dump.bones.contains(&name) {
                    undeclared += 1;
                }
                current.get_or_insert_with(HashMap::new).insert(name, sample);
            } else {
                debug!("line {}: ignored", line_no);
            }
        }
        if let Some(frame) = current.filter(|f| !f.is_empty()) {
            dump.frames.push(frame);
        }
        if undeclared > 0 {
            warn!("{} transforms name bones without a BONE| line", undeclared);
        }
        Ok(dump)
    }
}
