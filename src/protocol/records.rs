//! Payload records for the command protocol
//!
//! Every record mirrors the sorting controller's wire layout byte for
//! byte. The controller is a 32-bit little-endian system, so `ulong`
//! fields pin to `u32` and two packing regimes apply:
//!
//! - *tight pack*: `#[repr(C, packed)]`, no padding at all
//!   (`SysConfig`, `ColorIntervalItem`, `PercentInfo`, `Bgr`)
//! - *align-4 pack*: natural layout with 32-bit alignment; padding the
//!   32-bit compiler would insert is spelled out as explicit `_pad`
//!   fields so every byte of the record is accounted for
//!
//! Records are plain-old-data (`bytemuck::Pod`): `from_bytes`/`to_bytes`
//! are memcpy-equivalents, and the `const` assertions below pin each
//! record to its wire size. A size drift fails the build, not the field.

use crate::error::{Error, Result};
use bytemuck::{Pod, Zeroable};
use std::mem;

#[cfg(target_endian = "big")]
compile_error!("records are little-endian memcpy views; big-endian hosts are not supported");

// ============================================================================
// Wire dimensions
// ============================================================================

pub const MAX_SUBSYS_NUM: usize = 4;
pub const MAX_CHANNEL_NUM: usize = 12;
pub const MAX_CAMERA_NUM: usize = 9;
pub const CHANNEL_NUM: usize = 2;
pub const MAX_COLOR_CAMERA_NUM: usize = 3;

pub const MAX_QUALITY_GRADE_NUM: usize = 16;
pub const MAX_SIZE_GRADE_NUM: usize = 16;
pub const MAX_EXIT_NUM: usize = 48;
pub const MAX_TEXT_LENGTH: usize = 12;
pub const MAX_FRUIT_NAME_LENGTH: usize = 50;

pub const MAX_COLOR_INTERVAL_NUM: usize = 3;
pub const MAX_COLOR_GRADE_NUM: usize = 16;
pub const MAX_SHAPE_GRADE_NUM: usize = 6;
pub const MAX_FLAWAREA_GRADE_NUM: usize = 6;
pub const MAX_BRUISE_GRADE_NUM: usize = 6;
pub const MAX_ROT_GRADE_NUM: usize = 6;
pub const MAX_DENSITY_GRADE_NUM: usize = 6;
pub const MAX_SUGAR_GRADE_NUM: usize = 6;
pub const MAX_ACIDITY_GRADE_NUM: usize = 6;
pub const MAX_HOLLOW_GRADE_NUM: usize = 6;
pub const MAX_SKIN_GRADE_NUM: usize = 6;
pub const MAX_BROWN_GRADE_NUM: usize = 6;
pub const MAX_TANGXIN_GRADE_NUM: usize = 6;
pub const MAX_RIGIDITY_GRADE_NUM: usize = 6;
pub const MAX_WATER_GRADE_NUM: usize = 6;

pub const PARAS_TAGINFO_NUM: usize = 6;
pub const MAX_LABEL_NUM: usize = 4;
pub const MAX_NOTICE_LENGTH: usize = 30;
pub const MAX_EXIT_DISPLAYNAME_LENGTH: usize = 20;

/// Waveform sample count per weigh-cell trace
pub const WAVEFORM_SAMPLES: usize = 256;

// ============================================================================
// Record plumbing
// ============================================================================

macro_rules! impl_record {
    ($($t:ty),* $(,)?) => {$(
        impl $t {
            /// Wire size of this record in bytes
            pub const SIZE: usize = mem::size_of::<Self>();

            /// Reconstruct a record from exactly `SIZE` wire bytes
            pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
                if bytes.len() != Self::SIZE {
                    return Err(Error::RecordSize {
                        expected: Self::SIZE,
                        got: bytes.len(),
                    });
                }
                Ok(bytemuck::pod_read_unaligned(bytes))
            }

            /// Wire bytes of this record
            pub fn to_bytes(&self) -> Vec<u8> {
                bytemuck::bytes_of(self).to_vec()
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Zeroable::zeroed()
            }
        }
    )*};
}

// ============================================================================
// Tight-pack records
// ============================================================================

/// System configuration block pushed by the FSM after connect
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SysConfig {
    pub exit_state: [u8; MAX_EXIT_NUM * 2 * 4],
    pub channel_info: [u8; MAX_SUBSYS_NUM],
    pub image_uv: [u8; MAX_SUBSYS_NUM],
    pub data_registration: [u8; MAX_SUBSYS_NUM],
    pub image_sugar: [u8; MAX_SUBSYS_NUM],
    pub image_ultrasonic: [u8; MAX_SUBSYS_NUM],
    pub camera_delay: [i32; MAX_CAMERA_NUM * 2],
    pub width: i32,
    pub height: i32,
    pub packet_size: i32,
    pub system_info: u16,
    pub subsys_num: u8,
    pub exit_num: u8,
    pub classification_info: u8,
    pub multi_freq: u8,
    pub camera_type: u8,
    pub cir_classify_type: u8,
    pub uv_classify_type: u8,
    pub weight_classify_type: u8,
    pub internal_classify_type: u8,
    pub ultrasonic_classify_type: u8,
    pub wifi_enable: u8,
    pub check_exit: u8,
    pub check_num: u8,
    pub iqs_enable: u8,
}

/// One U/V color interval of the grading table
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ColorIntervalItem {
    pub min_u: u8,
    pub max_u: u8,
    pub min_v: u8,
    pub max_v: u8,
}

/// Color-percentage bounds per grade
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct PercentInfo {
    pub max: u8,
    pub min: u8,
}

/// Blue/green/red gain triple
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct Bgr {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

// ============================================================================
// Align-4 records
// ============================================================================

/// One cell of the quality x size grading matrix
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GradeItemInfo {
    pub exit: u32,
    pub min_size: f32,
    pub max_size: f32,
    pub fruit_num: i32,
    pub color_grade: i8,
    pub shape_size: i8,
    pub density: i8,
    pub flaw_area: i8,
    pub bruise: i8,
    pub rot: i8,
    pub sugar: i8,
    pub acidity: i8,
    pub hollow: i8,
    pub skin: i8,
    pub brown: i8,
    pub tangxin: i8,
    pub rigidity: i8,
    pub water: i8,
    pub label_by_grade: i8,
    pub _pad: [u8; 1],
}

/// Full grading program: intervals, factors, grade names, exit routing
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct GradeInfo {
    pub intervals: [ColorIntervalItem; MAX_COLOR_INTERVAL_NUM],
    pub percent: [PercentInfo; MAX_COLOR_GRADE_NUM * MAX_COLOR_INTERVAL_NUM],
    pub grades: [GradeItemInfo; MAX_QUALITY_GRADE_NUM * MAX_SIZE_GRADE_NUM],
    pub exit_enabled: [i32; 2],
    pub color_intervals: [i32; 2],
    pub exit_switch_num: [i32; MAX_EXIT_NUM],
    pub tag_info: [u8; PARAS_TAGINFO_NUM],
    pub _pad0: [u8; 2],
    pub fruit_type: i32,
    pub fruit_name: [u8; MAX_FRUIT_NAME_LENGTH],
    pub _pad1: [u8; 2],
    pub flaw_area_factor: [u32; MAX_FLAWAREA_GRADE_NUM * 2],
    pub bruise_factor: [u32; MAX_BRUISE_GRADE_NUM * 2],
    pub rot_factor: [u32; MAX_ROT_GRADE_NUM * 2],
    pub density_factor: [f32; MAX_DENSITY_GRADE_NUM],
    pub sugar_factor: [f32; MAX_SUGAR_GRADE_NUM],
    pub acidity_factor: [f32; MAX_ACIDITY_GRADE_NUM],
    pub hollow_factor: [f32; MAX_HOLLOW_GRADE_NUM],
    pub skin_factor: [f32; MAX_SKIN_GRADE_NUM],
    pub brown_factor: [f32; MAX_BROWN_GRADE_NUM],
    pub tangxin_factor: [f32; MAX_TANGXIN_GRADE_NUM],
    pub rigidity_factor: [f32; MAX_RIGIDITY_GRADE_NUM],
    pub water_factor: [f32; MAX_WATER_GRADE_NUM],
    pub shape_factor: [f32; MAX_SHAPE_GRADE_NUM],
    pub size_grade_name: [u8; MAX_SIZE_GRADE_NUM * MAX_TEXT_LENGTH],
    pub quality_grade_name: [u8; MAX_QUALITY_GRADE_NUM * MAX_TEXT_LENGTH],
    pub density_grade_name: [u8; MAX_DENSITY_GRADE_NUM * MAX_TEXT_LENGTH],
    pub color_grade_name: [u8; MAX_COLOR_GRADE_NUM * MAX_TEXT_LENGTH],
    pub shape_grade_name: [u8; MAX_SHAPE_GRADE_NUM * MAX_TEXT_LENGTH],
    pub flaw_area_grade_name: [u8; MAX_FLAWAREA_GRADE_NUM * MAX_TEXT_LENGTH],
    pub bruise_grade_name: [u8; MAX_BRUISE_GRADE_NUM * MAX_TEXT_LENGTH],
    pub rot_grade_name: [u8; MAX_ROT_GRADE_NUM * MAX_TEXT_LENGTH],
    pub sugar_grade_name: [u8; MAX_SUGAR_GRADE_NUM * MAX_TEXT_LENGTH],
    pub acidity_grade_name: [u8; MAX_ACIDITY_GRADE_NUM * MAX_TEXT_LENGTH],
    pub hollow_grade_name: [u8; MAX_HOLLOW_GRADE_NUM * MAX_TEXT_LENGTH],
    pub skin_grade_name: [u8; MAX_SKIN_GRADE_NUM * MAX_TEXT_LENGTH],
    pub brown_grade_name: [u8; MAX_BROWN_GRADE_NUM * MAX_TEXT_LENGTH],
    pub tangxin_grade_name: [u8; MAX_TANGXIN_GRADE_NUM * MAX_TEXT_LENGTH],
    pub rigidity_grade_name: [u8; MAX_FLAWAREA_GRADE_NUM * MAX_TEXT_LENGTH],
    pub water_grade_name: [u8; MAX_WATER_GRADE_NUM * MAX_TEXT_LENGTH],
    pub color_type: u8,
    pub label_type: u8,
    pub label_by_exit: [u8; MAX_EXIT_NUM],
    pub switch_label: [u8; MAX_EXIT_NUM],
    pub size_grade_num: u8,
    pub quality_grade_num: u8,
    pub classify_type: u8,
    pub _pad2: [u8; 1],
    pub check_num: i16,
    pub force_channel: i16,
    pub _pad3: [u8; 2],
}

/// Rolling production statistics pushed by the FSM
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct Statistics {
    pub grade_count: [u32; MAX_QUALITY_GRADE_NUM * MAX_SIZE_GRADE_NUM],
    pub weight_grade_count: [u32; MAX_QUALITY_GRADE_NUM * MAX_SIZE_GRADE_NUM],
    pub exit_count: [u32; MAX_EXIT_NUM],
    pub exit_weight_count: [u32; MAX_EXIT_NUM],
    pub channel_total_count: [u32; MAX_CHANNEL_NUM],
    pub channel_weight_count: [u32; MAX_CHANNEL_NUM],
    pub subsys_id: i32,
    pub box_grade_count: [i32; MAX_QUALITY_GRADE_NUM * MAX_SIZE_GRADE_NUM],
    pub box_grade_weight: [i32; MAX_QUALITY_GRADE_NUM * MAX_SIZE_GRADE_NUM],
    pub total_cup_num: i32,
    pub interval: i32,
    pub interval_sum_per_minute: i32,
    pub cup_state: u16,
    pub pulse_interval: u16,
    pub unpush_fruit_count: u16,
    pub net_state: u8,
    pub weight_setting: u8,
    pub scm_state: u8,
    pub iqs_net_state: u8,
    pub lock_state: u8,
    pub _pad0: [u8; 1],
    pub exit_box_num: [u16; MAX_EXIT_NUM],
    pub exit_weight: [u32; MAX_EXIT_NUM],
    pub notice: [u8; MAX_NOTICE_LENGTH],
    pub _pad1: [u8; 2],
}

/// Statistics block as broadcast to peer HMIs over UDP
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BroadcastStatistics {
    pub statistics: Statistics,
    pub start_time: [u8; MAX_TEXT_LENGTH],
    pub separation_efficiency: f32,
    pub real_weight_count: f32,
    pub program_name: [u8; MAX_TEXT_LENGTH],
    pub label_name: [u8; MAX_LABEL_NUM * MAX_TEXT_LENGTH],
}

/// System config block as broadcast to peer HMIs over UDP
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct BroadcastSysConfig {
    pub sys_config: SysConfig,
    pub language: i32,
    pub exit_display_type: i32,
    pub display_name: [u8; MAX_EXIT_NUM * MAX_EXIT_DISPLAYNAME_LENGTH],
}

/// Per-cup tracking sample from the weigh cell
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TrackingData {
    pub vehicle_id: i32,
    pub fruit_weight: f32,
    pub vehicle_weight: f32,
    pub ad_fruit: u16,
    pub ad_vehicle: u16,
}

/// Weigh-cell calibration snapshot
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WeightStat {
    pub cup_average_weight: f32,
    pub ad0: u16,
    pub ad1: u16,
    pub standard_ad0: u16,
    pub standard_ad1: u16,
}

/// One weighing result as reported per channel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WeightResult {
    pub data: TrackingData,
    pub paras: WeightStat,
    pub channel_id: i32,
    pub vehicle_weight0: f32,
    pub vehicle_weight1: f32,
    pub state: u8,
    pub _pad: [u8; 3],
}

/// Vision measurements for one fruit
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FruitVisionParam {
    pub color_rate0: u32,
    pub color_rate1: u32,
    pub color_rate2: u32,
    pub area: u32,
    pub flaw_area: u32,
    pub volume: u32,
    pub flaw_num: u32,
    pub max_r: f32,
    pub min_r: f32,
    pub select_basis: f32,
    pub diameter_ratio: f32,
    pub min_d_ratio: f32,
}

/// UV-camera measurements for one fruit
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FruitUvParam {
    pub bruise_area: u32,
    pub bruise_num: u32,
    pub rot_area: u32,
    pub rot_num: u32,
    pub rigidity: u32,
    pub water: u32,
    pub time_tag: u32,
}

/// Near-infrared internal-quality measurements for one fruit
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct NirParam {
    pub sugar: f32,
    pub acidity: f32,
    pub hollow: f32,
    pub skin: f32,
    pub brown: f32,
    pub tangxin: f32,
    pub time_tag: u32,
}

/// Combined grading parameters for one fruit
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FruitParam {
    pub vision_param: FruitVisionParam,
    pub uv_param: FruitUvParam,
    pub nir_param: NirParam,
    pub weight: f32,
    pub density: f32,
    pub grade: u32,
    pub which_exit: u8,
    pub _pad: [u8; 3],
}

/// Real-time grade report for both cups of one route
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FruitGradeInfo {
    pub param: [FruitParam; CHANNEL_NUM],
    pub route_id: i32,
}

/// Channel means backing a white-balance pass
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct WhiteBalanceMean {
    pub mean_r: i32,
    pub mean_g: i32,
    pub mean_b: i32,
}

/// White-balance result from the IPM auto-balance command
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct WhiteBalanceCoefficient {
    pub bgr: Bgr,
    pub _pad: [u8; 1],
    pub mean_value: WhiteBalanceMean,
}

/// Camera shutter levels from the IPM shutter-adjust command
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct ShutterAdjust {
    pub color_y: [u16; MAX_COLOR_CAMERA_NUM],
    pub color_h: [u16; MAX_COLOR_CAMERA_NUM],
    pub nir1_y: [u16; MAX_COLOR_CAMERA_NUM],
    pub nir2_y: [u16; MAX_COLOR_CAMERA_NUM],
}

/// Weigh-cell waveform trace for one channel
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
pub struct WaveInfo {
    pub channel_id: i32,
    pub waveform0: [u16; WAVEFORM_SAMPLES],
    pub waveform1: [u16; WAVEFORM_SAMPLES],
    pub fruit_weight: f32,
}

/// Weigher-wide calibration block (WAM weight-info command)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct WeightGlobal {
    pub vehicle_weight: [f32; MAX_CHANNEL_NUM],
    pub weight_factor: [f32; MAX_CHANNEL_NUM],
    pub standard_ad0: [u16; MAX_CHANNEL_NUM],
    pub standard_ad1: [u16; MAX_CHANNEL_NUM],
    pub channel_num: i32,
}

impl_record!(
    SysConfig,
    ColorIntervalItem,
    PercentInfo,
    Bgr,
    GradeItemInfo,
    GradeInfo,
    Statistics,
    BroadcastStatistics,
    BroadcastSysConfig,
    TrackingData,
    WeightStat,
    WeightResult,
    FruitVisionParam,
    FruitUvParam,
    NirParam,
    FruitParam,
    FruitGradeInfo,
    WhiteBalanceMean,
    WhiteBalanceCoefficient,
    ShutterAdjust,
    WaveInfo,
    WeightGlobal,
);

// ============================================================================
// Wire-size pins (32-bit controller layout; a drift fails the build)
// ============================================================================

const _: () = assert!(mem::size_of::<SysConfig>() == 504);
const _: () = assert!(mem::size_of::<ColorIntervalItem>() == 4);
const _: () = assert!(mem::size_of::<PercentInfo>() == 2);
const _: () = assert!(mem::size_of::<Bgr>() == 3);
const _: () = assert!(mem::size_of::<GradeItemInfo>() == 32);
const _: () = assert!(mem::size_of::<GradeInfo>() == 10576);
const _: () = assert!(mem::size_of::<Statistics>() == 4924);
const _: () = assert!(mem::size_of::<BroadcastStatistics>() == 5004);
const _: () = assert!(mem::size_of::<BroadcastSysConfig>() == 1472);
const _: () = assert!(mem::size_of::<TrackingData>() == 16);
const _: () = assert!(mem::size_of::<WeightStat>() == 12);
const _: () = assert!(mem::size_of::<WeightResult>() == 44);
const _: () = assert!(mem::size_of::<FruitVisionParam>() == 48);
const _: () = assert!(mem::size_of::<FruitUvParam>() == 28);
const _: () = assert!(mem::size_of::<NirParam>() == 28);
const _: () = assert!(mem::size_of::<FruitParam>() == 120);
const _: () = assert!(mem::size_of::<FruitGradeInfo>() == 244);
const _: () = assert!(mem::size_of::<WhiteBalanceMean>() == 12);
const _: () = assert!(mem::size_of::<WhiteBalanceCoefficient>() == 16);
const _: () = assert!(mem::size_of::<ShutterAdjust>() == 24);
const _: () = assert!(mem::size_of::<WaveInfo>() == 1032);
const _: () = assert!(mem::size_of::<WeightGlobal>() == 148);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_result_round_trip() {
        let mut r = WeightResult::default();
        r.data.vehicle_id = 7;
        r.data.fruit_weight = 182.5;
        r.paras.ad0 = 0x1234;
        r.channel_id = 3;
        r.vehicle_weight0 = 61.25;
        r.state = 1;

        let bytes = r.to_bytes();
        assert_eq!(bytes.len(), WeightResult::SIZE);
        assert_eq!(WeightResult::from_bytes(&bytes).unwrap(), r);
    }

    #[test]
    fn test_weight_result_field_offsets_little_endian() {
        let mut r = WeightResult::default();
        r.data.vehicle_id = 0x0102_0304;
        r.channel_id = 0x1122_3344;

        let bytes = r.to_bytes();
        // vehicle_id at offset 0, channel_id after TrackingData + WeightStat
        assert_eq!(&bytes[0..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[28..32], &[0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn test_sys_config_is_tightly_packed() {
        let mut c = SysConfig::default();
        c.system_info = 0xBEEF;
        c.subsys_num = 2;

        let bytes = c.to_bytes();
        // system_info directly follows the packed arrays and ints: 404 + 84
        assert_eq!(&bytes[488..490], &[0xEF, 0xBE]);
        assert_eq!(bytes[490], 2);
    }

    #[test]
    fn test_wave_info_layout() {
        let mut w = WaveInfo::default();
        w.channel_id = 5;
        w.waveform0[0] = 0xAABB;
        w.waveform1[WAVEFORM_SAMPLES - 1] = 0x0102;
        w.fruit_weight = 1.0;

        let bytes = w.to_bytes();
        assert_eq!(bytes.len(), 1032);
        assert_eq!(&bytes[4..6], &[0xBB, 0xAA]);
        assert_eq!(&bytes[1026..1028], &[0x02, 0x01]);
        assert_eq!(&bytes[1028..1032], &1.0f32.to_le_bytes());
    }

    #[test]
    fn test_white_balance_pad_between_bgr_and_means() {
        let mut w = WhiteBalanceCoefficient::default();
        w.bgr = Bgr { b: 1, g: 2, r: 3 };
        w.mean_value.mean_r = 0x0A0B_0C0D;

        let bytes = w.to_bytes();
        assert_eq!(&bytes[0..3], &[1, 2, 3]);
        // mean_r starts on the next 4-byte boundary
        assert_eq!(&bytes[4..8], &[0x0D, 0x0C, 0x0B, 0x0A]);
    }

    #[test]
    fn test_grade_info_tail_fields() {
        let mut g = GradeInfo::default();
        g.check_num = 0x0506;
        g.force_channel = -2;

        let bytes = g.to_bytes();
        assert_eq!(bytes.len(), 10576);
        assert_eq!(&bytes[10570..10572], &[0x06, 0x05]);
        assert_eq!(&bytes[10572..10574], &(-2i16).to_le_bytes());
    }

    #[test]
    fn test_statistics_pad_before_exit_box_num() {
        let mut s = Statistics::default();
        s.lock_state = 9;
        s.exit_box_num[0] = 0x0708;

        let bytes = s.to_bytes();
        assert_eq!(bytes[4603], 9);
        assert_eq!(&bytes[4604..4606], &[0x08, 0x07]);
    }

    #[test]
    fn test_from_bytes_rejects_wrong_length() {
        let err = WeightResult::from_bytes(&[0u8; 43]).unwrap_err();
        match err {
            Error::RecordSize { expected, got } => {
                assert_eq!(expected, 44);
                assert_eq!(got, 43);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_broadcast_records_embed_base_blocks() {
        let mut b = BroadcastSysConfig::default();
        b.sys_config.width = 0x0102_0304;
        b.language = 1;

        let bytes = b.to_bytes();
        // width sits at offset 404 + 72 inside the packed SysConfig
        assert_eq!(&bytes[476..480], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[504..508], &1i32.to_le_bytes());
    }
}
