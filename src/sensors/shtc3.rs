//! SHTC3 humidity sensor through its vendor shared library
//!
//! The library exports `int init(void*)` and `float SHTC3_Read_RH(void*)`.
//! It is loaded once and stays loaded for the life of the process; `init`
//! runs exactly once no matter how many adapters are opened. The library
//! gives no way to detect a failed read, so the float is passed through.

use super::{HumiditySensor, SensorError};
use libloading::Library;
use std::ffi::{c_float, c_int, c_void};
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::OnceLock;

type InitFn = unsafe extern "C" fn(*mut c_void) -> c_int;
type ReadRhFn = unsafe extern "C" fn(*mut c_void) -> c_float;

struct NativeDriver {
    read_rh: ReadRhFn,
    path: PathBuf,
    // keeps `read_rh` valid; `None` only for drivers built in tests
    _library: Option<Library>,
}

/// Entry points resolved from a freshly loaded library
struct Symbols {
    init: InitFn,
    read_rh: ReadRhFn,
    library: Option<Library>,
}

static DRIVER: OnceLock<NativeDriver> = OnceLock::new();

fn load_library(path: &Path) -> Result<Symbols, SensorError> {
    // SAFETY: loading runs the library's constructors; the SHTC3 library has none
    // beyond libc setup.
    let library = unsafe { Library::new(path) }
        .map_err(|e| SensorError::Library(format!("Failed to load {}: {}", path.display(), e)))?;

    // SAFETY: the symbol types match the C prototypes declared above.
    let (init, read_rh) = unsafe {
        let init = *library
            .get::<InitFn>(b"init\0")
            .map_err(|e| SensorError::Library(format!("Missing symbol init: {}", e)))?;
        let read_rh = *library
            .get::<ReadRhFn>(b"SHTC3_Read_RH\0")
            .map_err(|e| SensorError::Library(format!("Missing symbol SHTC3_Read_RH: {}", e)))?;
        (init, read_rh)
    };

    Ok(Symbols {
        init,
        read_rh,
        library: Some(library),
    })
}

pub struct Shtc3 {
    driver: &'static NativeDriver,
}

impl Shtc3 {
    /// Load the library at `path` and initialise the sensor.
    ///
    /// Later calls reuse the library loaded by the first successful call.
    /// Asking for a different path once a library is loaded is an error.
    pub fn open(path: &Path) -> Result<Self, SensorError> {
        Self::open_with(&DRIVER, path, load_library)
    }

    fn open_with<F>(
        cell: &'static OnceLock<NativeDriver>,
        path: &Path,
        load: F,
    ) -> Result<Self, SensorError>
    where
        F: FnOnce(&Path) -> Result<Symbols, SensorError>,
    {
        if let Some(driver) = cell.get() {
            return Self::reuse(driver, path);
        }

        let symbols = load(path)?;
        let driver = cell.get_or_init(|| {
            // SAFETY: `init` takes an unused context pointer.
            let status = unsafe { (symbols.init)(ptr::null_mut()) };
            tracing::info!("Initialised SHTC3 from {} (status {})", path.display(), status);
            NativeDriver {
                read_rh: symbols.read_rh,
                path: path.to_path_buf(),
                _library: symbols.library,
            }
        });

        Self::reuse(driver, path)
    }

    fn reuse(driver: &'static NativeDriver, path: &Path) -> Result<Self, SensorError> {
        if driver.path.as_path() != path {
            return Err(SensorError::Library(format!(
                "SHTC3 library already loaded from {}, cannot load {}",
                driver.path.display(),
                path.display()
            )));
        }
        Ok(Self { driver })
    }
}

impl HumiditySensor for Shtc3 {
    fn humidity(&mut self) -> Result<f64, SensorError> {
        // SAFETY: the library stays loaded for 'static and the call takes an unused context.
        let rh = unsafe { (self.driver.read_rh)(ptr::null_mut()) };
        Ok(rh as f64)
    }
}
