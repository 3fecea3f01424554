//! TCS34725 RGBC light sensor
//!
//! Lux is derived from the raw channels with the DN40 method: the IR
//! component is estimated from the difference between the clear channel and
//! the sum of the colour channels, removed from each, and the weighted sum is
//! scaled by counts-per-lux for the configured integration time and gain.

use super::{LightSensor, SensorError};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use serde::{Deserialize, Serialize};

pub const TCS34725_ADDRESS: u8 = 0x29;

const COMMAND_BIT: u8 = 0x80;
const AUTO_INCREMENT: u8 = 0x20;

const REG_ENABLE: u8 = 0x00;
const REG_ATIME: u8 = 0x01;
const REG_CONTROL: u8 = 0x0F;
const REG_ID: u8 = 0x12;
const REG_CDATAL: u8 = 0x14;

const ENABLE_PON: u8 = 0x01;
const ENABLE_AEN: u8 = 0x02;

/// TCS34721/TCS34725 and TCS34723/TCS34727 report these ids
const KNOWN_IDS: [u8; 2] = [0x44, 0x4D];

// DN40 coefficients
const R_COEF: f64 = 0.136;
const G_COEF: f64 = 1.000;
const B_COEF: f64 = -0.444;
/// Device factor
const DF: f64 = 310.0;
/// Glass attenuation
const GA: f64 = 1.0;

/// Analog gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gain {
    X1,
    X4,
    X16,
    X60,
}

impl Gain {
    fn register_value(self) -> u8 {
        match self {
            Gain::X1 => 0x00,
            Gain::X4 => 0x01,
            Gain::X16 => 0x02,
            Gain::X60 => 0x03,
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            Gain::X1 => 1.0,
            Gain::X4 => 4.0,
            Gain::X16 => 16.0,
            Gain::X60 => 60.0,
        }
    }
}

/// Raw channel counts from one integration cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RgbcSample {
    pub clear: u16,
    pub red: u16,
    pub green: u16,
    pub blue: u16,
}

/// Integration time in milliseconds for an ATIME register value
pub fn integration_ms(atime: u8) -> f64 {
    (256 - atime as u32) as f64 * 2.4
}

/// DN40 lux from a raw sample. Never negative.
pub fn compute_lux(sample: RgbcSample, atime_ms: f64, gain: f64) -> f64 {
    let c = sample.clear as f64;
    let r = sample.red as f64;
    let g = sample.green as f64;
    let b = sample.blue as f64;

    let ir = if r + g + b > c { (r + g + b - c) / 2.0 } else { 0.0 };
    let cpl = (atime_ms * gain) / (GA * DF);
    if cpl <= 0.0 {
        return 0.0;
    }

    let lux = (R_COEF * (r - ir) + G_COEF * (g - ir) + B_COEF * (b - ir)) / cpl;
    lux.max(0.0)
}

pub struct Tcs34725<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    atime: u8,
    gain: Gain,
}

impl<I2C: I2c, D: DelayNs> Tcs34725<I2C, D> {
    /// Check the device id, program integration time and gain, and power on
    pub fn new(i2c: I2C, delay: D, address: u8, atime: u8, gain: Gain) -> Result<Self, SensorError> {
        let mut sensor = Self {
            i2c,
            delay,
            address,
            atime,
            gain,
        };

        let id = sensor.read_byte(REG_ID)?;
        if !KNOWN_IDS.contains(&id) {
            return Err(SensorError::UnknownDevice(id));
        }

        sensor.write_byte(REG_ATIME, atime)?;
        sensor.write_byte(REG_CONTROL, gain.register_value())?;
        sensor.write_byte(REG_ENABLE, ENABLE_PON)?;
        sensor.delay.delay_ms(3);
        sensor.write_byte(REG_ENABLE, ENABLE_PON | ENABLE_AEN)?;
        Ok(sensor)
    }

    /// Wait one integration cycle and read all four channels
    pub fn sample(&mut self) -> Result<RgbcSample, SensorError> {
        self.delay.delay_ms(integration_ms(self.atime).ceil() as u32);

        let mut buf = [0u8; 8];
        self.i2c
            .write_read(
                self.address,
                &[COMMAND_BIT | AUTO_INCREMENT | REG_CDATAL],
                &mut buf,
            )
            .map_err(SensorError::bus)?;

        Ok(RgbcSample {
            clear: u16::from_le_bytes([buf[0], buf[1]]),
            red: u16::from_le_bytes([buf[2], buf[3]]),
            green: u16::from_le_bytes([buf[4], buf[5]]),
            blue: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[COMMAND_BIT | register], &mut buf)
            .map_err(SensorError::bus)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[COMMAND_BIT | register, value])
            .map_err(SensorError::bus)
    }
}

impl<I2C: I2c, D: DelayNs> LightSensor for Tcs34725<I2C, D> {
    fn lux(&mut self) -> Result<f64, SensorError> {
        let sample = self.sample()?;
        let lux = compute_lux(sample, integration_ms(self.atime), self.gain.factor());
        tracing::debug!(?sample, lux, "TCS34725 sample");
        Ok(lux)
    }
}
