//! Read-only structural checks for motlist and motbank files.
//!
//! Unlike `decode`, inspection keeps going after a problem: every anomaly is collected and the
//! walk continues with whatever can still be read safely.

use std::fmt;

use nom::number::complete::le_u16;

use crate::const_table::known_bone_name;
use crate::format::*;
use crate::read::utilities::offset as offset_u64;
use crate::read::Reader;
use crate::Error;

/// Bone clips (and their tracks) kept in the report per entry.
pub const PREVIEW_BONES: usize = 5;

#[derive(Debug)]
pub enum Anomaly {
    /// A read that failed: bad tag, out-of-range offset, unreadable string.
    Structural(Error),
    /// Readable, but not what the engine writes.
    Suspicious { offset: usize, message: String },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Anomaly::Structural(e) => write!(f, "{}", e),
            Anomaly::Suspicious { offset, message } => write!(f, "{} at offset {:#x}", message, offset),
        }
    }
}

#[derive(Debug)]
pub struct TrackSummary {
    pub header: TrackHeader,
    pub kind: Option<TrackKind>,
}

#[derive(Debug)]
pub struct BoneClipSummary {
    pub header: BoneClipHeader,
    pub name: Option<&'static str>,
    pub tracks: Vec<TrackSummary>,
}

#[derive(Debug)]
pub struct EntrySummary {
    pub offset: usize,
    pub header: Option<MotHeader>,
    pub name: Option<String>,
    /// The first [`PREVIEW_BONES`] bone clips.
    pub bone_clips: Vec<BoneClipSummary>,
}

#[derive(Debug)]
pub struct MotlistSummary {
    pub header: MotlistHeader,
    pub name: Option<String>,
    pub collection_count: Option<u16>,
    pub entries: Vec<EntrySummary>,
}

#[derive(Debug)]
pub struct BankEntrySummary {
    pub record: MotbankRecord,
    pub path: Option<String>,
}

#[derive(Debug)]
pub struct MotbankSummary {
    pub header: MotbankHeader,
    pub entries: Vec<BankEntrySummary>,
}

#[derive(Debug)]
pub enum Summary {
    Motlist(MotlistSummary),
    Motbank(MotbankSummary),
    /// Not even a header could be read.
    Unreadable,
}

#[derive(Debug)]
pub struct Report {
    pub file_size: usize,
    pub summary: Summary,
    pub anomalies: Vec<Anomaly>,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }
}

/// Accumulates anomalies while walking a file.
struct Walk<'a> {
    r: Reader<'a>,
    anomalies: Vec<Anomaly>,
}

impl<'a> Walk<'a> {
    fn note<T>(&mut self, result: crate::Result<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(e) => {
                self.anomalies.push(Anomaly::Structural(e));
                None
            }
        }
    }

    fn suspicious(&mut self, offset: usize, message: String) {
        self.anomalies.push(Anomaly::Suspicious { offset, message });
    }

    fn tag(&mut self, at: usize, what: &'static str, magic: [u8; 4], version: u32, expected: (&[u8; 4], u32)) {
        if &magic != expected.0 {
            self.anomalies
                .push(Anomaly::Structural(Error::magic(what, at + 4, expected.0, &magic)));
        }
        if version != expected.1 {
            self.anomalies
                .push(Anomaly::Structural(Error::version(what, at, expected.1, version)));
        }
    }

    fn track(&mut self, entry: Reader<'a>, at: usize, header: &TrackHeader) -> Option<TrackKind> {
        let kind = TrackKind::from_flags(header.flags);
        let kind = match kind {
            Some(kind) => kind,
            None => {
                self.suspicious(entry.base() + at, format!("unknown track flags {:#010x}", header.flags));
                return None;
            }
        };
        let n = header.key_count as usize;
        let data_len = n.saturating_mul(kind.bytes_per_key());
        let index_len = n.saturating_mul(2);
        self.note(entry.bytes("frame data", header.frame_data_offset as usize, data_len));
        self.note(entry.bytes("frame indices", header.frame_index_offset as usize, index_len));
        if kind.has_unpack_data() {
            self.note(entry.bytes("unpack data", header.unpack_offset as usize, UNPACK_DATA_SIZE));
        }
        Some(kind)
    }

    fn entry(&mut self, at: usize) -> EntrySummary {
        let mut summary = EntrySummary {
            offset: at,
            header: None,
            name: None,
            bone_clips: vec![],
        };
        let entry = match self.note(self.r.entry("mot entry", at)) {
            Some(entry) => entry,
            None => return summary,
        };
        if at % 16 != 0 {
            self.suspicious(at, "mot entry is not 16-byte aligned".into());
        }
        let header: MotHeader = match self.note(entry.record("mot header", 0)) {
            Some(h) => h,
            None => return summary,
        };
        self.tag(at, "mot header", header.magic, header.version, (MOT_MAGIC, MOT_VERSION));
        if header.sentinel != MOT_SENTINEL {
            self.suspicious(at + 0x5C, format!("sentinel is {} instead of -1", header.sentinel));
        }
        if header.secondary_max_frame != header.max_frame {
            self.suspicious(
                at + 0x64,
                format!(
                    "secondary frame count {} differs from {}",
                    header.secondary_max_frame, header.max_frame
                ),
            );
        }
        if header.bone_count != header.bone_clip_count {
            self.suspicious(
                at + 0x68,
                format!(
                    "bone count {} differs from bone clip count {}",
                    header.bone_count, header.bone_clip_count
                ),
            );
        }
        if header.bone_header_offset == 0 {
            self.suspicious(at + 0x10, "missing bone header stub".into());
        } else {
            self.note(entry.bytes("bone header stub", header.bone_header_offset as usize, BONE_HEADER_STUB_SIZE));
        }
        summary.name = self.note(entry.wide_string("motion name", header.name_offset as usize));

        let clips: Option<Vec<BoneClipHeader>> = self.note(entry.records(
            "bone clip table",
            header.bone_clip_offset as usize,
            header.bone_clip_count as usize,
        ));
        for (i, clip) in clips.unwrap_or_default().into_iter().enumerate() {
            let clip_at = header.bone_clip_offset as usize + i * BONE_CLIP_SIZE;
            if clip.marker != BONE_CLIP_MARKER {
                self.suspicious(at + clip_at + 8, format!("bone clip marker is {}", clip.marker));
            }
            let first = clip.track_header_offset as usize;
            let headers: Vec<TrackHeader> = self
                .note(entry.records("track headers", first, clip.track_count()))
                .unwrap_or_default();
            let tracks: Vec<TrackSummary> = headers
                .into_iter()
                .enumerate()
                .map(|(t, header)| TrackSummary {
                    kind: self.track(entry, first + t * TRACK_HEADER_SIZE, &header),
                    header,
                })
                .collect();
            if i < PREVIEW_BONES {
                summary.bone_clips.push(BoneClipSummary {
                    name: known_bone_name(clip.name_hash),
                    header: clip,
                    tracks,
                });
            }
        }
        summary.header = Some(header);
        summary
    }
}

/// Walks a motlist and every entry it points to.
pub fn inspect_motlist(buf: &[u8]) -> Report {
    let mut walk = Walk {
        r: Reader::new(buf),
        anomalies: vec![],
    };
    let summary = match walk.note(walk.r.record::<MotlistHeader>("motlist header", 0)) {
        Some(header) => Summary::Motlist(walk.motlist(header)),
        None => Summary::Unreadable,
    };
    Report {
        file_size: buf.len(),
        summary,
        anomalies: walk.anomalies,
    }
}

impl<'a> Walk<'a> {
    fn motlist(&mut self, header: MotlistHeader) -> MotlistSummary {
        self.tag(
            0,
            "motlist header",
            header.magic,
            header.version,
            (MOTLIST_MAGIC, MOTLIST_VERSION),
        );
        let name = self.note(self.r.wide_string("motlist name", header.name_offset as usize));
        if header.entry_count == 0 {
            self.suspicious(0x30, "motlist has no entries".into());
        }
        let pointers = self
            .note(self.r.table(
                "pointer table",
                header.pointer_table_offset as usize,
                header.entry_count as usize,
                8,
                offset_u64,
            ))
            .unwrap_or_default();
        let entries = pointers.into_iter().map(|at| self.entry(at)).collect();

        let count_at = (header.collection_offset as usize).saturating_add(COLLECTION_COUNT_OFFSET);
        let collection_count = self.note(self.r.parse("collection block", count_at, 2, le_u16));
        if let Some(count) = collection_count {
            if count as u32 != header.entry_count {
                self.suspicious(
                    count_at,
                    format!("collection count {} differs from {} entries", count, header.entry_count),
                );
            }
        }
        MotlistSummary {
            header,
            name,
            collection_count,
            entries,
        }
    }

    fn motbank(&mut self, header: MotbankHeader) -> MotbankSummary {
        self.tag(
            0,
            "motbank header",
            header.magic,
            header.version,
            (MOTBANK_MAGIC, MOTBANK_VERSION),
        );
        let records: Vec<MotbankRecord> = self
            .note(self.r.records(
                "motbank entry table",
                header.entry_table_offset as usize,
                header.entry_count as usize,
            ))
            .unwrap_or_default();
        let entries = records
            .into_iter()
            .map(|record| BankEntrySummary {
                path: self.note(self.r.wide_string("motlist path", record.path_offset as usize)),
                record,
            })
            .collect();
        MotbankSummary { header, entries }
    }
}

pub fn inspect_motbank(buf: &[u8]) -> Report {
    let mut walk = Walk {
        r: Reader::new(buf),
        anomalies: vec![],
    };
    let summary = match walk.note(walk.r.record::<MotbankHeader>("motbank header", 0)) {
        Some(header) => Summary::Motbank(walk.motbank(header)),
        None => Summary::Unreadable,
    };
    Report {
        file_size: buf.len(),
        summary,
        anomalies: walk.anomalies,
    }
}

/// Picks the walk from the file's magic, defaulting to motlist.
pub fn inspect(buf: &[u8]) -> Report {
    if buf.get(4..8) == Some(&MOTBANK_MAGIC[..]) {
        inspect_motbank(buf)
    } else {
        inspect_motlist(buf)
    }
}

fn tag(magic: &[u8; 4]) -> String {
    String::from_utf8_lossy(magic).into_owned()
}

impl fmt::Display for TrackSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let h = &self.header;
        let kind = match self.kind {
            Some(kind) => format!("{:?}", kind),
            None => format!("flags {:#010x}", h.flags),
        };
        write!(
            f,
            "{}: {} keys, data={:#x}, indices={:#x}",
            kind, h.key_count, h.frame_data_offset, h.frame_index_offset
        )?;
        if h.unpack_offset != 0 {
            write!(f, ", unpack={:#x}", h.unpack_offset)?;
        }
        Ok(())
    }
}

impl fmt::Display for EntrySummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Entry at {:#x}", self.offset)?;
        let h = match &self.header {
            Some(h) => h,
            None => return writeln!(f, "  (unreadable header)"),
        };
        writeln!(
            f,
            "  Mot: v{} {:?}, bones={}, frames={:.0}, fps={}",
            h.version,
            tag(&h.magic),
            h.bone_clip_count,
            h.max_frame + 1.0,
            h.frame_rate
        )?;
        if let Some(name) = &self.name {
            writeln!(f, "  Motion name: '{}'", name)?;
        }
        for (i, clip) in self.bone_clips.iter().enumerate() {
            let name = clip.name.map(|n| format!(" ({})", n)).unwrap_or_default();
            writeln!(
                f,
                "  Bone {}: idx={}, hash={:#010x}{}, track_off={:#x}",
                i, clip.header.bone_index, clip.header.name_hash, name, clip.header.track_header_offset
            )?;
            for track in &clip.tracks {
                writeln!(f, "    {}", track)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "=== Validation Report ===")?;
        match &self.summary {
            Summary::Motlist(m) => {
                writeln!(
                    f,
                    "Motlist: v{} {:?}, entries={}, size={}",
                    m.header.version,
                    tag(&m.header.magic),
                    m.header.entry_count,
                    self.file_size
                )?;
                if let Some(name) = &m.name {
                    writeln!(f, "Motlist name: '{}'", name)?;
                }
                for entry in &m.entries {
                    write!(f, "{}", entry)?;
                }
            }
            Summary::Motbank(b) => {
                writeln!(
                    f,
                    "Motbank: v{} {:?}, entries={}, size={}",
                    b.header.version,
                    tag(&b.header.magic),
                    b.header.entry_count,
                    self.file_size
                )?;
                for (i, entry) in b.entries.iter().enumerate() {
                    let r = &entry.record;
                    writeln!(
                        f,
                        "Entry {}: bank={}, weapon={}, layer={:#x}, path='{}'",
                        i,
                        r.bank_id,
                        r.weapon_id,
                        r.layer_mask,
                        entry.path.as_deref().unwrap_or("?")
                    )?;
                }
            }
            Summary::Unreadable => writeln!(f, "Unreadable file of {} bytes", self.file_size)?,
        }
        if self.anomalies.is_empty() {
            write!(f, "\n=== No issues found ===")
        } else {
            writeln!(f, "\n=== {} ISSUES FOUND ===", self.anomalies.len())?;
            for (i, anomaly) in self.anomalies.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "  ! {}", anomaly)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::*;

    fn container() -> AnimationContainer {
        let mut clip = AnimationClip::new("walk", 3, 30);
        for (i, name) in ["root", "hips", "spine_0", "spine_1", "spine_2", "neck_0", "custom"]
            .iter()
            .enumerate()
        {
            let mut bone = BoneTrack::new(name, i as u16);
            bone.rotations = (0..3)
                .map(|f| Keyframe::new(f, Quaternion::new(1.0, 0.0, 0.0, 0.0)))
                .collect();
            clip.bones.push(bone);
        }
        clip.bones[0].positions = Some((0..3).map(|f| Keyframe::new(f, Vector3::new(0.0, 0.0, 0.0))).collect());
        AnimationContainer::new("custom_anim", vec![clip, AnimationClip::new("idle", 1, 60)])
    }

    #[test]
    fn clean_file() {
        let buf = container().encode().unwrap();
        let report = inspect_motlist(&buf);
        assert!(report.is_clean(), "{}", report);
        let m = match &report.summary {
            Summary::Motlist(m) => m,
            other => panic!("{:?}", other),
        };
        assert_eq!(m.name.as_deref(), Some("custom_anim"));
        assert_eq!(m.collection_count, Some(2));
        assert_eq!(m.entries.len(), 2);
        let walk = &m.entries[0];
        assert_eq!(walk.bone_clips.len(), PREVIEW_BONES);
        assert_eq!(walk.bone_clips[0].name, Some("root"));
        assert_eq!(walk.bone_clips[0].tracks.len(), 2);
        assert_eq!(walk.bone_clips[0].tracks[0].kind, Some(TrackKind::Position));
        let text = report.to_string();
        assert!(text.contains("Motion name: 'walk'"));
        assert!(text.contains("No issues found"));
    }

    #[test]
    fn accumulates_every_anomaly() {
        let mut buf = container().encode().unwrap();
        buf[4..8].copy_from_slice(b"xxxx");
        // Second pointer past the end of the file.
        let len = buf.len() as u64;
        buf[0x58..0x60].copy_from_slice(&(align_up(len as usize, 16) as u64 + 64).to_le_bytes());
        let report = inspect_motlist(&buf);
        assert_eq!(report.anomalies.len(), 2, "{}", report);
        assert!(matches!(report.anomalies[0], Anomaly::Structural(Error::Format { .. })));
        assert!(matches!(report.anomalies[1], Anomaly::Structural(Error::Bounds { .. })));
        // The first entry is still walked.
        if let Summary::Motlist(m) = &report.summary {
            assert_eq!(m.entries[0].name.as_deref(), Some("walk"));
        }
        assert!(report.to_string().contains("2 ISSUES FOUND"));
    }

    #[test]
    fn unknown_track_flags_are_reported() {
        let container = container();
        let layout = crate::layout::MotLayout::for_clip(&container.clips[0]);
        let mut buf = container.encode().unwrap();
        let at = 0x60 + layout.track_headers.offset;
        buf[at..at + 4].copy_from_slice(&0xDEADu32.to_le_bytes());
        let report = inspect_motlist(&buf);
        assert_eq!(report.anomalies.len(), 1);
        assert!(report.anomalies[0].to_string().contains("0x0000dead"));
    }

    #[test]
    fn truncated_file() {
        let report = inspect_motlist(&[0u8; 10]);
        assert!(matches!(report.summary, Summary::Unreadable));
        assert_eq!(report.anomalies.len(), 1);
    }

    #[test]
    fn motbank() {
        let bank = BankContainer {
            entries: vec![BankEntry {
                motlist_path: "CAF/dodge.motlist".into(),
                bank_id: 3,
                ..Default::default()
            }],
        };
        let report = inspect(&bank.encode().unwrap());
        assert!(report.is_clean(), "{}", report);
        assert!(report.to_string().contains("path='CAF/dodge.motlist'"));
    }
}
