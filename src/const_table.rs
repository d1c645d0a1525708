//! Known bone names, used to label hashes when decoding and inspecting.

use std::collections::HashMap;

use crate::hash::bone_name_hash;

/// The RE2 player skeleton.
pub const PLAYER_BONE_NAMES: &[&str] = &[
    "COG",
    "Null_Offset",
    "cam_root",
    "front_holster_left",
    "front_holster_right",
    "head",
    "hips",
    "holster_startleft_muscleOffset",
    "holster_startright_muscleOffset",
    "l_arm_clavicle",
    "l_arm_humerus",
    "l_arm_radius",
    "l_arm_wrist",
    "l_hand_index_0",
    "l_hand_index_1",
    "l_hand_index_2",
    "l_hand_little_0",
    "l_hand_little_1",
    "l_hand_little_2",
    "l_hand_little_3",
    "l_hand_middle_0",
    "l_hand_middle_1",
    "l_hand_middle_2",
    "l_hand_ring_0",
    "l_hand_ring_1",
    "l_hand_ring_2",
    "l_hand_ring_3",
    "l_hand_thumb_0",
    "l_hand_thumb_1",
    "l_hand_thumb_2",
    "l_leg_ankle",
    "l_leg_ball",
    "l_leg_femur",
    "l_leg_tibia",
    "l_scapula_0",
    "l_trapA_muscle",
    "l_trapA_muscleOffset",
    "l_weapon",
    "light_01",
    "light_02",
    "neck_0",
    "neck_1",
    "r_arm_clavicle",
    "r_arm_humerus",
    "r_arm_radius",
    "r_arm_wrist",
    "r_beltSide_muscle",
    "r_beltSide_muscleOffset",
    "r_hand_index_0",
    "r_hand_index_1",
    "r_hand_index_2",
    "r_hand_little_0",
    "r_hand_little_1",
    "r_hand_little_2",
    "r_hand_little_3",
    "r_hand_middle_0",
    "r_hand_middle_1",
    "r_hand_middle_2",
    "r_hand_ring_0",
    "r_hand_ring_1",
    "r_hand_ring_2",
    "r_hand_ring_3",
    "r_hand_thumb_0",
    "r_hand_thumb_1",
    "r_hand_thumb_2",
    "r_leg_ankle",
    "r_leg_ball",
    "r_leg_femur",
    "r_leg_tibia",
    "r_scapula_0",
    "r_trapA_muscle",
    "r_trapA_muscleOffset",
    "r_weapon",
    "root",
    "setProp_C_00",
    "setProp_E_00",
    "setProp_F_00",
    "spine_0",
    "spine_1",
    "spine_2",
];

lazy_static! {
    static ref KNOWN_BONES: HashMap<u32, &'static str> = PLAYER_BONE_NAMES
        .iter()
        .map(|name| (bone_name_hash(name), *name))
        .collect();
}

pub fn known_bone_name(hash: u32) -> Option<&'static str> {
    KNOWN_BONES.get(&hash).copied()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_name_resolves() {
        assert_eq!(PLAYER_BONE_NAMES.len(), 80);
        for name in PLAYER_BONE_NAMES {
            assert_eq!(known_bone_name(bone_name_hash(name)), Some(*name));
        }
    }

    #[test]
    fn unknown_hash() {
        assert_eq!(known_bone_name(bone_name_hash("not_a_bone")), None);
    }
}
