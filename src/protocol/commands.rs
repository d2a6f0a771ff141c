//! Command identifiers and the command length map
//!
//! Each subsystem owns a command-id block. FSM is the sorting controller's
//! main state machine, WAM the weigher, SIM the simulator/display channel,
//! IPM the image-processing modules and ACS the exit/chute controller.
//!
//! The length map is the authority for how many body bytes follow the
//! 12-byte header. The three IPM image commands are the only ones that
//! carry their own 4-byte length prefix; everything else is fixed-size.

use super::records::*;

// FSM -> HMI commands (0x1000 block)
pub const FSM_CMD_CONFIG: i32 = 0x1000;
pub const FSM_CMD_STATISTICS: i32 = 0x1001;
pub const FSM_CMD_GRADEINFO: i32 = 0x1002;
pub const FSM_CMD_WEIGHTINFO: i32 = 0x1003;
pub const FSM_CMD_WAVEINFO: i32 = 0x1004;
pub const FSM_CMD_VERSIONERROR: i32 = 0x1005;
pub const FSM_CMD_BURN_FLASH_PROGRESS: i32 = 0x1006;
pub const FSM_CMD_BURN_DEBUG: i32 = 0x1007;
pub const FSM_CMD_GETVERSION: i32 = 0x1008;
pub const FSM_CMD_BOOT_FLASH_PROGRESS: i32 = 0x1009;

// WAM -> HMI commands (0x2000 block)
pub const WAM_CMD_REP_WAM_INFO: i32 = 0x2000;
pub const WAM_CMD_WEIGHTINFO: i32 = 0x2001;
pub const WAM_CMD_WAVEINFO: i32 = 0x2002;
pub const WAM_CMD_WEIGHT_INFO: i32 = 0x2003;

// IPM -> HMI commands (0x3000 block)
pub const IPM_CMD_IMAGE: i32 = 0x3000;
pub const IPM_CMD_AUTOBALANCE_COEFFICIENT: i32 = 0x3001;
pub const IPM_CMD_IMAGE_SPLICE: i32 = 0x3002;
pub const IPM_CMD_IMAGE_SPOT: i32 = 0x3003;
pub const IPM_CMD_SHUTTER_ADJUST: i32 = 0x3004;

// SIM <-> HMI commands (0x5000 block)
pub const SIM_HMI_DISPLAY_ON: i32 = 0x5000;
pub const SIM_HMI_INSPECTION_ON: i32 = 0x5001;
pub const SIM_HMI_INSPECTION_OFF: i32 = 0x5002;

// ACS -> HMI commands
pub const ACS_HMI_EXIT_STOP: i32 = 0x8000;

/// Version strings from the FSM/WAM are fixed 64-byte fields
pub const VERSION_INFO_BYTES: u32 = 64;

/// Resolve the body length for a command id
///
/// Returns `(body_bytes, needs_length_prefix)`. When the second element is
/// true the body begins with a 4-byte little-endian length and
/// `body_bytes` is the size of that prefix. Unknown ids map to `(0, false)`;
/// the frame is still delivered, with an empty body.
pub fn body_size_for(cmd_id: i32) -> (u32, bool) {
    match cmd_id {
        FSM_CMD_CONFIG => (SysConfig::SIZE as u32, false),
        FSM_CMD_STATISTICS => (Statistics::SIZE as u32, false),
        FSM_CMD_GRADEINFO => (FruitGradeInfo::SIZE as u32, false),
        FSM_CMD_WEIGHTINFO | WAM_CMD_WEIGHTINFO => (WeightResult::SIZE as u32, false),
        FSM_CMD_WAVEINFO | WAM_CMD_WAVEINFO => (WaveInfo::SIZE as u32, false),
        FSM_CMD_VERSIONERROR | FSM_CMD_BURN_FLASH_PROGRESS | FSM_CMD_BOOT_FLASH_PROGRESS => {
            (4, false)
        }
        FSM_CMD_GETVERSION | WAM_CMD_REP_WAM_INFO => (VERSION_INFO_BYTES, false),
        WAM_CMD_WEIGHT_INFO => (WeightGlobal::SIZE as u32, false),
        SIM_HMI_DISPLAY_ON | SIM_HMI_INSPECTION_OFF => (0, false),
        SIM_HMI_INSPECTION_ON => (GradeInfo::SIZE as u32, false),
        IPM_CMD_IMAGE | IPM_CMD_IMAGE_SPLICE | IPM_CMD_IMAGE_SPOT => (4, true),
        IPM_CMD_AUTOBALANCE_COEFFICIENT => (WhiteBalanceCoefficient::SIZE as u32, false),
        IPM_CMD_SHUTTER_ADJUST => (ShutterAdjust::SIZE as u32, false),
        ACS_HMI_EXIT_STOP => (4, false),
        _ => (0, false),
    }
}
