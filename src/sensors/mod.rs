//! Sensors module - environmental readings from the I2C bus and the SHTC3 library

pub mod lps22hb;
pub mod registers;
#[cfg(feature = "sensors")]
pub mod shtc3;
pub mod tcs34725;

/// Errors raised by the sensor adapters.
///
/// A pressure/temperature read that finds no fresh sample is not an error;
/// the adapter hands back its previous value instead.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("I2C bus error: {0}")]
    Bus(String),
    #[error("unexpected device id 0x{0:02X}")]
    UnknownDevice(u8),
    #[error("device did not finish reset after {0} polls")]
    ResetTimeout(u32),
    #[error("native library error: {0}")]
    Library(String),
}

impl SensorError {
    pub(crate) fn bus<E: embedded_hal::i2c::Error>(e: E) -> Self {
        SensorError::Bus(format!("{:?}", e.kind()))
    }
}

/// Ambient light in lux
pub trait LightSensor {
    fn lux(&mut self) -> Result<f64, SensorError>;
}

/// Barometric pressure (hPa) and temperature (°C)
pub trait BarometricSensor {
    fn pressure(&mut self) -> Result<f64, SensorError>;
    fn temperature(&mut self) -> Result<f64, SensorError>;
}

/// Relative humidity in percent
pub trait HumiditySensor {
    fn humidity(&mut self) -> Result<f64, SensorError>;
}

/// The full set of sensors sampled on each run
pub struct Sensors<L, B, H> {
    pub light: L,
    pub barometer: B,
    /// `None` when no humidity library is configured
    pub humidity: Option<H>,
}

/// One sampled set of values, uploaded once and then discarded
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    /// Seconds since the Unix epoch as a decimal string
    pub timestamp: String,
    pub lux: f64,
    pub pressure: f64,
    pub temperature: f64,
    pub humidity: Option<f64>,
}
