//! Hardware capability port - the boundary between the positioning core and
//! the physical (or simulated) device.
//!
//! To add a new backend, implement [`HardwarePort`] and register it in
//! [`create_hardware`]. See [`sim::SimulatedHardware`] for a complete
//! implementation example.

pub mod sim;

#[cfg(feature = "rpi")]
pub mod rpi;

pub use sim::SimulatedHardware;

use crate::config::Config;
use crate::core::types::{BleReading, ImuSample, KeyPress};
use crate::error::{Error, Result};

/// Capability set the control loop consumes.
///
/// # Timing contract
/// Every call except [`scan_ble`](Self::scan_ble) returns within one tick
/// (≤ 20 ms). `scan_ble` may block for up to ~1 s and is therefore only
/// invoked on the slow correction cadence or an explicit user request.
/// [`play_audio`](Self::play_audio) is fire-and-forget: the call returns
/// promptly even while the sound keeps playing.
///
/// # Units
/// IMU samples are delivered in m/s² and rad/s; backends convert device
/// units before returning.
pub trait HardwarePort: Send {
    /// Bring up the device. Called once at startup; failure is fatal.
    fn initialize(&mut self) -> Result<()>;

    /// Read the current IMU sample. Non-blocking.
    fn read_imu(&mut self) -> ImuSample;

    /// Perform a BLE scan. May block up to ~1 s; the backend bounds its own
    /// runtime. An empty result means no advertisers were observed.
    fn scan_ble(&mut self) -> Vec<BleReading>;

    /// Poll the keypad. The backend owns debouncing; the core may assume a
    /// `None -> key -> None` transition per physical press.
    fn poll_key(&mut self) -> KeyPress;

    /// Queue an audio cue for playback.
    fn play_audio(&mut self, cue: &str);

    /// Whether the power switch is on. The control loop exits when this
    /// turns false.
    fn power_on(&self) -> bool;
}

/// Create the hardware backend selected by the configuration.
pub fn create_hardware(config: &Config) -> Result<Box<dyn HardwarePort>> {
    match config.hardware.backend.as_str() {
        "sim" => Ok(Box::new(SimulatedHardware::new(&config.hardware.sim))),
        #[cfg(feature = "rpi")]
        "rpi" => Ok(Box::new(rpi::RpiHardware::new())),
        #[cfg(not(feature = "rpi"))]
        "rpi" => Err(Error::Config(
            "rpi backend not available: rebuild with --features rpi".to_string(),
        )),
        other => Err(Error::UnknownBackend(other.to_string())),
    }
}

#[cfg(test)]
pub mod testing {
    //! Test doubles shared by unit tests across the crate.

    use super::*;

    /// Records audio cues and feeds canned sensor data.
    #[derive(Default)]
    pub struct CueRecorder {
        pub cues: Vec<String>,
        pub scan: Vec<BleReading>,
    }

    impl HardwarePort for CueRecorder {
        fn initialize(&mut self) -> Result<()> {
            Ok(())
        }

        fn read_imu(&mut self) -> ImuSample {
            ImuSample::default()
        }

        fn scan_ble(&mut self) -> Vec<BleReading> {
            self.scan.clone()
        }

        fn poll_key(&mut self) -> KeyPress {
            KeyPress::None
        }

        fn play_audio(&mut self, cue: &str) {
            self.cues.push(cue.to_string());
        }

        fn power_on(&self) -> bool {
            true
        }
    }
}
