//! LPS22HB register map

#![allow(dead_code)]

/// Default I2C address (SA0 pulled high)
pub const LPS22HB_ADDRESS: u8 = 0x5C;

pub const INT_CFG: u8 = 0x0B;
pub const THS_P_L: u8 = 0x0C;
pub const THS_P_H: u8 = 0x0D;
pub const WHO_AM_I: u8 = 0x0F;
pub const CTRL_REG1: u8 = 0x10;
pub const CTRL_REG2: u8 = 0x11;
pub const CTRL_REG3: u8 = 0x12;
pub const FIFO_CTRL: u8 = 0x14;
pub const REF_P_XL: u8 = 0x15;
pub const REF_P_L: u8 = 0x16;
pub const REF_P_H: u8 = 0x17;
pub const RPDS_L: u8 = 0x18;
pub const RPDS_H: u8 = 0x19;
pub const RES_CONF: u8 = 0x1A;
pub const INT_SOURCE: u8 = 0x25;
pub const FIFO_STATUS: u8 = 0x26;
pub const STATUS: u8 = 0x27;
pub const PRESS_OUT_XL: u8 = 0x28;
pub const PRESS_OUT_L: u8 = 0x29;
pub const PRESS_OUT_H: u8 = 0x2A;
pub const TEMP_OUT_L: u8 = 0x2B;
pub const TEMP_OUT_H: u8 = 0x2C;
pub const LPFP_RES: u8 = 0x33;

// STATUS bits
/// New pressure sample available
pub const STATUS_P_DA: u8 = 0x01;
/// New temperature sample available
pub const STATUS_T_DA: u8 = 0x02;

// CTRL_REG2 bits
pub const CTRL2_ONE_SHOT: u8 = 0x01;
pub const CTRL2_SWRESET: u8 = 0x04;

/// CTRL_REG1 value written at startup: power-down ODR (one-shot only), block data update
pub const CTRL1_DEFAULT: u8 = 0x02;
