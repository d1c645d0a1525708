//! Skeleton slot assignment.
//!
//! Priority, highest first: explicit overrides, a hash match against a reference container,
//! then sequential slots after the highest index already taken.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info, warn};

use crate::{bone_name_hash, AnimationContainer, Error, Result};

/// Hash to skeleton index, read from a container built for the target skeleton.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SkeletonBoneMap {
    by_hash: HashMap<u32, u16>,
}

impl SkeletonBoneMap {
    /// Indexes every clip's bones. The first occurrence of a hash wins.
    pub fn from_container(container: &AnimationContainer) -> Self {
        let mut by_hash = HashMap::new();
        for clip in &container.clips {
            for bone in &clip.bones {
                let index = *by_hash.entry(bone.name_hash).or_insert(bone.skeleton_index);
                if index != bone.skeleton_index {
                    debug!(
                        "clip `{}`: bone {:08x} at {} disagrees with {}",
                        clip.name, bone.name_hash, bone.skeleton_index, index
                    );
                }
            }
        }
        Self { by_hash }
    }

    pub fn from_motlist(buf: &[u8]) -> Result<Self> {
        Ok(Self::from_container(&AnimationContainer::decode(buf)?))
    }

    pub fn get(&self, hash: u32) -> Option<u16> {
        self.by_hash.get(&hash).copied()
    }

    pub fn get_name(&self, name: &str) -> Option<u16> {
        self.get(bone_name_hash(name))
    }

    pub fn insert(&mut self, hash: u32, index: u16) {
        self.by_hash.insert(hash, index);
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    /// `(hash, index)` pairs ordered by index.
    pub fn entries(&self) -> Vec<(u32, u16)> {
        let mut entries: Vec<(u32, u16)> = self.by_hash.iter().map(|(h, i)| (*h, *i)).collect();
        entries.sort_by_key(|(h, i)| (*i, *h));
        entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSource {
    Override,
    Reference,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedIndex {
    pub index: u16,
    pub source: IndexSource,
}

/// One unique index per input name, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoneIndexMap {
    entries: Vec<(String, ResolvedIndex)>,
}

impl BoneIndexMap {
    pub fn get(&self, name: &str) -> Option<u16> {
        self.resolved(name).map(|r| r.index)
    }

    pub fn resolved(&self, name: &str) -> Option<ResolvedIndex> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, r)| *r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ResolvedIndex)> {
        self.entries.iter().map(|(n, r)| (n.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, source: IndexSource) -> usize {
        self.entries.iter().filter(|(_, r)| r.source == source).count()
    }
}

/// Assigns every name in `names` a unique skeleton index.
///
/// Fails on duplicate names, on two overrides claiming one index, and when sequential
/// assignment runs out of 16-bit indices.
pub fn resolve<S: AsRef<str>>(
    names: &[S],
    reference: Option<&SkeletonBoneMap>,
    overrides: &BTreeMap<String, u16>,
) -> Result<BoneIndexMap> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_ref()) {
            return Err(Error::Schema(format!("bone `{}` is listed twice", name.as_ref())));
        }
    }

    let mut assigned: Vec<Option<ResolvedIndex>> = vec![None; names.len()];
    let mut taken: HashMap<u16, &str> = HashMap::new();

    for (slot, name) in assigned.iter_mut().zip(names) {
        let name = name.as_ref();
        if let Some(&index) = overrides.get(name) {
            if let Some(other) = taken.insert(index, name) {
                return Err(Error::Schema(format!(
                    "overrides give index {} to both `{}` and `{}`",
                    index, other, name
                )));
            }
            *slot = Some(ResolvedIndex {
                index,
                source: IndexSource::Override,
            });
        }
    }

    if let Some(reference) = reference {
        for (slot, name) in assigned.iter_mut().zip(names) {
            let name = name.as_ref();
            if slot.is_some() {
                continue;
            }
            if let Some(index) = reference.get_name(name) {
                if let Some(other) = taken.get(&index) {
                    warn!("bone `{}`: reference index {} already taken by `{}`", name, index, other);
                    continue;
                }
                taken.insert(index, name);
                *slot = Some(ResolvedIndex {
                    index,
                    source: IndexSource::Reference,
                });
            }
        }
    }

    let mut next = taken.keys().max().map(|m| *m as u32 + 1).unwrap_or(0);
    for (slot, name) in assigned.iter_mut().zip(names) {
        if slot.is_some() {
            continue;
        }
        while taken.contains_key(&(next as u16)) && next <= u16::MAX as u32 {
            next += 1;
        }
        if next > u16::MAX as u32 {
            return Err(Error::Schema(format!("no skeleton index left for `{}`", name.as_ref())));
        }
        let index = next as u16;
        taken.insert(index, name.as_ref());
        debug!("bone `{}`: sequential index {}", name.as_ref(), index);
        *slot = Some(ResolvedIndex {
            index,
            source: IndexSource::Sequential,
        });
        next += 1;
    }

    let entries: Vec<(String, ResolvedIndex)> = names
        .iter()
        .zip(assigned)
        .filter_map(|(name, slot)| slot.map(|r| (name.as_ref().to_string(), r)))
        .collect();
    let map = BoneIndexMap { entries };
    info!(
        "resolved {} bones: {} override, {} reference, {} sequential",
        map.len(),
        map.count(IndexSource::Override),
        map.count(IndexSource::Reference),
        map.count(IndexSource::Sequential)
    );
    Ok(map)
}
