//! LPS22HB barometric pressure and temperature sensor
//!
//! The device is left in power-down mode and sampled with one-shot
//! conversions. When the status register reports no fresh sample the last
//! decoded value is returned unchanged.

use super::registers::*;
use super::{BarometricSensor, SensorError};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

/// Wait before each one-shot conversion
const SETTLE_MS: u32 = 100;
const RESET_POLL_LIMIT: u32 = 100;

/// 24-bit raw pressure to hPa
pub fn decode_pressure(raw: [u8; 3]) -> f64 {
    let [xl, l, h] = raw;
    (((h as u32) << 16) + ((l as u32) << 8) + xl as u32) as f64 / 4096.0
}

/// 16-bit raw temperature to °C
///
/// The raw value is read as unsigned, so sub-zero readings are not
/// sign-extended: -2.00 °C (0xFF38) decodes as 653.36.
pub fn decode_temperature(raw: [u8; 2]) -> f64 {
    let [l, h] = raw;
    (((h as u32) << 8) + l as u32) as f64 / 100.0
}

pub struct Lps22hb<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    pressure: f64,
    temperature: f64,
}

impl<I2C: I2c, D: DelayNs> Lps22hb<I2C, D> {
    /// Soft-reset the device and configure it for one-shot sampling
    pub fn new(i2c: I2C, delay: D, address: u8) -> Result<Self, SensorError> {
        let mut sensor = Self {
            i2c,
            delay,
            address,
            pressure: 0.0,
            temperature: 0.0,
        };
        sensor.reset()?;
        sensor.write_byte(CTRL_REG1, CTRL1_DEFAULT)?;
        Ok(sensor)
    }

    fn reset(&mut self) -> Result<(), SensorError> {
        let ctrl = self.read_byte(CTRL_REG2)? | CTRL2_SWRESET;
        self.write_byte(CTRL_REG2, ctrl)?;

        for _ in 0..RESET_POLL_LIMIT {
            if self.read_byte(CTRL_REG2)? & CTRL2_SWRESET == 0 {
                return Ok(());
            }
            self.delay.delay_ms(1);
        }
        Err(SensorError::ResetTimeout(RESET_POLL_LIMIT))
    }

    fn start_one_shot(&mut self) -> Result<(), SensorError> {
        let ctrl = self.read_byte(CTRL_REG2)? | CTRL2_ONE_SHOT;
        self.write_byte(CTRL_REG2, ctrl)
    }

    /// Settle, trigger a conversion and report whether `bit` is set in STATUS
    fn convert(&mut self, bit: u8) -> Result<bool, SensorError> {
        self.delay.delay_ms(SETTLE_MS);
        self.start_one_shot()?;
        Ok(self.read_byte(STATUS)? & bit == bit)
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .map_err(SensorError::bus)?;
        Ok(buf[0])
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(SensorError::bus)
    }
}

impl<I2C: I2c, D: DelayNs> BarometricSensor for Lps22hb<I2C, D> {
    fn pressure(&mut self) -> Result<f64, SensorError> {
        if self.convert(STATUS_P_DA)? {
            let raw = [
                self.read_byte(PRESS_OUT_XL)?,
                self.read_byte(PRESS_OUT_L)?,
                self.read_byte(PRESS_OUT_H)?,
            ];
            self.pressure = decode_pressure(raw);
        } else {
            tracing::debug!("No fresh pressure sample, keeping {} hPa", self.pressure);
        }
        Ok(self.pressure)
    }

    fn temperature(&mut self) -> Result<f64, SensorError> {
        if self.convert(STATUS_T_DA)? {
            let raw = [self.read_byte(TEMP_OUT_L)?, self.read_byte(TEMP_OUT_H)?];
            self.temperature = decode_temperature(raw);
        } else {
            tracing::debug!("No fresh temperature sample, keeping {} °C", self.temperature);
        }
        Ok(self.temperature)
    }
}
