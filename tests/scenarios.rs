use std::collections::BTreeMap;

use cgmath::{Deg, InnerSpace, Rotation3};
use motlist::convert::{build_clip, ConvertOptions};
use motlist::exchange::ExchangeDocument;
use motlist::format::{align_up, TrackKind};
use motlist::inspect::inspect_motlist;
use motlist::layout::MotLayout;
use motlist::quantize::{components, QuantizationParams};
use motlist::resolve::{resolve, SkeletonBoneMap};
use motlist::*;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn swing(frames: u16, axis: Vector3<f32>, degrees: f32) -> Vec<Keyframe<Quaternion<f32>>> {
    (0..frames)
        .map(|f| {
            let angle = Deg(degrees * f as f32 / frames as f32);
            Keyframe::new(f, Quaternion::from_axis_angle(axis.normalize(), angle))
        })
        .collect()
}

fn three_bone_clip() -> AnimationClip {
    let mut clip = AnimationClip::new("scenario_a", 30, 30);
    let mut root = BoneTrack::new("root", 0);
    root.rotations = swing(30, Vector3::new(0.0, 1.0, 0.0), 10.0);
    root.positions = Some(
        (0..30)
            .map(|f| Keyframe::new(f, Vector3::new(0.0, 0.0, f as f32 * 0.05)))
            .collect(),
    );
    let mut spine = BoneTrack::new("spine", 1);
    spine.rotations = swing(30, Vector3::new(1.0, 0.0, 0.0), 20.0);
    let mut head = BoneTrack::new("head", 2);
    head.rotations = swing(30, Vector3::new(0.2, 1.0, 0.1), 90.0);
    clip.bones = vec![head, root, spine];
    clip
}

#[test]
fn scenario_a_three_bone_roundtrip() {
    init();
    let container = AnimationContainer::new("custom_anim", vec![three_bone_clip()]);
    let buf = container.encode().unwrap();
    let decoded = AnimationContainer::decode(&buf).unwrap();

    let clip = &decoded.clips[0];
    assert_eq!(clip.frame_count, 30);
    assert_eq!(clip.frame_rate, 30);
    let order: Vec<u16> = clip.bones.iter().map(|b| b.skeleton_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    let hashes: Vec<u32> = clip.bones.iter().map(|b| b.name_hash).collect();
    assert_eq!(
        hashes,
        vec![bone_name_hash("root"), bone_name_hash("spine"), bone_name_hash("head")]
    );

    assert!(clip.bones[0].has_position());
    assert!(!clip.bones[1].has_position());
    assert!(!clip.bones[2].has_position());

    let head = &clip.bones[2];
    assert_ne!(head.rotations[0].value, head.rotations[9].value);

    // Every decoded component stays within one quantization step.
    let original = three_bone_clip();
    for bone in &clip.bones {
        let source = original
            .bones
            .iter()
            .find(|b| b.name_hash == bone.name_hash)
            .unwrap();
        let params = QuantizationParams::derive(source.rotations.iter().map(|k| &k.value));
        for (a, b) in source.rotations.iter().zip(&bone.rotations) {
            let (ca, cb) = (components(&a.value), components(&b.value));
            for i in 0..4 {
                assert!((ca[i] - cb[i]).abs() <= params.tolerance(i) + 1e-6);
                assert!(cb[i] >= params.base[i] - 1e-6);
                assert!(cb[i] <= params.base[i] + params.scale[i] + 1e-6);
            }
        }
    }
    assert_eq!(clip.bones[0].positions, original.bones[1].positions);
}

#[test]
fn scenario_b_corrupted_magic() {
    init();
    let container = AnimationContainer::new("custom_anim", vec![three_bone_clip()]);
    let mut buf = container.encode().unwrap();
    buf[4] = b'X';
    match AnimationContainer::decode(&buf) {
        Err(Error::Format { offset, expected, .. }) => {
            assert_eq!(offset, 4);
            assert!(expected.contains("mlst"));
        }
        other => panic!("expected a format error, got {:?}", other),
    }
    assert!(!inspect_motlist(&buf).is_clean());
}

const NO_POSITIONS: &str = r#"{
    "format": "CAF_AnimData",
    "version": 1,
    "action_name": "step",
    "fps": 30,
    "frame_count": 3,
    "bone_count": 2,
    "bones": ["root", "head"],
    "has_positions": false,
    "data": [
        [[0, 0, 0, 1, 0, 0, 0], [0, 0, 0, 1, 0, 0, 0]],
        [[0, 0, 0, 1, 0, 0, 0], [0, 0.1, 0, 0.99, 0, 0, 0]],
        [[0, 0, 0, 1, 0, 0, 0], [0, 0.2, 0, 0.98, 0, 0, 0]]
    ]
}"#;

#[test]
fn scenario_c_rotation_only_document() {
    init();
    let doc = ExchangeDocument::from_json(NO_POSITIONS).unwrap();
    let sampled = doc.to_sampled();
    let indices = resolve(&sampled.bones[..], None, &BTreeMap::new()).unwrap();
    let conversion = build_clip(&sampled, &indices, &ConvertOptions::default()).unwrap();
    assert!(conversion.quality.is_clean());

    let buf = AnimationContainer::new("custom_anim", vec![conversion.clip])
        .encode()
        .unwrap();
    let decoded = AnimationContainer::decode(&buf).unwrap();
    let clip = &decoded.clips[0];
    assert_eq!(clip.name, "step");
    assert_eq!(clip.frame_count, 3);
    for bone in &clip.bones {
        assert_eq!(bone.positions, None);
        assert_eq!(bone.rotations.len(), 3);
    }
    let layout = MotLayout::for_clip(clip);
    assert!(layout.tracks.iter().all(|t| t.kind == TrackKind::CompressedRotation));
}

#[test]
fn scenario_d_sign_flip_correction() {
    init();
    let doc = NO_POSITIONS.replace("[0, 0.2, 0, 0.98, 0, 0, 0]", "[0, -0.2, 0, -0.98, 0, 0, 0]");
    let sampled = ExchangeDocument::from_json(&doc).unwrap().to_sampled();
    let indices = resolve(&sampled.bones[..], None, &BTreeMap::new()).unwrap();
    let conversion = build_clip(&sampled, &indices, &ConvertOptions::default()).unwrap();
    assert_eq!(conversion.quality.sign_flips, 1);

    let head = conversion.clip.bone("head").unwrap();
    let prev = head.rotations[1].value;
    let cur = head.rotations[2].value;
    assert!(prev.dot(cur) >= 0.0);
}

#[test]
fn layout_sections_are_aligned_and_disjoint() {
    let mut clips = vec![three_bone_clip()];
    let mut odd = three_bone_clip();
    odd.name = "odd_name_len".into();
    odd.rotation_encoding = RotationEncoding::Uncompressed12Byte;
    odd.bones[0].rotations.truncate(3);
    clips.push(odd);
    clips.push(AnimationClip::new("e", 1, 60));

    for clip in &clips {
        let layout = MotLayout::for_clip(clip);
        let sections = layout.sections();
        for (kind, section, align) in &sections {
            assert_eq!(section.offset % align, 0, "{:?} at {:#x}", kind, section.offset);
            assert!(section.end() <= layout.size);
        }
        for (i, (ka, a, _)) in sections.iter().enumerate() {
            for (kb, b, _) in &sections[i + 1..] {
                assert!(!a.overlaps(b), "{:?} {:?} overlaps {:?} {:?}", ka, a, kb, b);
            }
        }
        assert_eq!(layout.size, align_up(layout.size, 16));
        assert_eq!(clip.encode().unwrap().len(), layout.size);
    }
}

#[test]
fn reference_mapping_places_bones() {
    init();
    let reference = AnimationContainer::new("ref", vec![three_bone_clip()])
        .encode()
        .unwrap();
    let map = SkeletonBoneMap::from_motlist(&reference).unwrap();
    let names = ["head", "tail", "root", "spine"];
    let indices = resolve(&names[..], Some(&map), &BTreeMap::new()).unwrap();
    assert_eq!(indices.len(), names.len());
    assert_eq!(indices.get("head"), Some(2));
    assert_eq!(indices.get("root"), Some(0));
    assert_eq!(indices.get("tail"), Some(3));
}

#[test]
fn bank_roundtrip() {
    let bank = BankContainer {
        entries: vec![BankEntry {
            motlist_path: "CAF/custom_anim.motlist".into(),
            bank_id: 1200,
            weapon_id: 0,
            layer_mask: 0,
        }],
    };
    assert_eq!(BankContainer::decode(&bank.encode().unwrap()).unwrap(), bank);
}

const WALK: &[u8] = include_bytes!("../assets/walk.motlist");

fn quat(x: f32, y: f32, z: f32, w: f32) -> Quaternion<f32> {
    Quaternion::new(w, x, y, z)
}

fn walk_clip() -> AnimationClip {
    let mut clip = AnimationClip::new("walk", 4, 30);
    let mut root = BoneTrack::new("root", 0);
    root.rotations = vec![
        Keyframe::new(0, quat(0.0, 0.0, 0.0, 1.0)),
        Keyframe::new(1, quat(0.0, 0.125, 0.0, 0.9375)),
        Keyframe::new(2, quat(0.0, 0.5, 0.0, 0.75)),
        Keyframe::new(3, quat(0.0, 0.25, 0.0, 0.875)),
    ];
    root.positions = Some(
        (0..4)
            .map(|f| Keyframe::new(f, Vector3::new(0.0, 1.5, f as f32 * 0.25)))
            .collect(),
    );
    let mut head = BoneTrack::new("head", 3);
    head.rotations = vec![
        Keyframe::new(0, quat(0.5, 0.0, 0.0, 0.75)),
        Keyframe::new(1, quat(0.375, 0.0, 0.0, 0.875)),
        Keyframe::new(2, quat(0.25, 0.0, 0.0, 0.9375)),
        Keyframe::new(3, quat(0.125, 0.0, 0.0, 1.0)),
    ];
    clip.bones = vec![head, root];
    clip
}

#[test]
fn matches_reference_bytes() {
    init();
    let buf = AnimationContainer::new("fixture", vec![walk_clip()])
        .encode()
        .unwrap();
    assert_eq!(buf.len(), WALK.len());
    assert_eq!(&buf[..], WALK);
    assert!(inspect_motlist(WALK).is_clean());
}

#[test]
fn decodes_reference_bytes() {
    let container = AnimationContainer::decode(WALK).unwrap();
    assert_eq!(container.name, "fixture");
    let clip = &container.clips[0];
    assert_eq!((clip.name.as_str(), clip.frame_count, clip.frame_rate), ("walk", 4, 30));

    let expected = walk_clip();
    let root = &clip.bones[0];
    assert_eq!(root.skeleton_index, 0);
    assert_eq!(root.name_hash, bone_name_hash("root"));
    assert_eq!(root.positions, expected.bones[1].positions);
    // Track minimum and maximum decode exactly.
    assert_eq!(root.rotations[0].value, quat(0.0, 0.0, 0.0, 1.0));
    assert_eq!(root.rotations[2].value, quat(0.0, 0.5, 0.0, 0.75));

    let head = &clip.bones[1];
    assert_eq!(head.skeleton_index, 3);
    assert!(!head.has_position());
    for (a, b) in head.rotations.iter().zip(&expected.bones[0].rotations) {
        assert_eq!(a.frame, b.frame);
        assert!((a.value - b.value).magnitude() < 0.01);
    }
}
