//! Raspberry Pi production backend.
//!
//! - ISM330DHCX IMU over I2C (52 Hz accel + gyro)
//! - 4x3 matrix keypad and power switch on GPIO
//! - BLE scan by shelling out to `hcitool lescan` with a 1 s cap
//! - Audio by spawning `aplay` detached
//!
//! TODO: `lescan` does not emit RSSI textually, so every advertiser gets a
//! -60 dBm placeholder; replace the subprocess with a raw HCI event socket
//! to get real signal strengths.

use super::HardwarePort;
use crate::core::types::{BleReading, ImuSample, KeyPress};
use crate::error::{Error, Result};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use std::process::{Command, Stdio};
use std::time::Duration;

// ISM330DHCX I2C address and registers
const IMU_ADDRESS: u16 = 0x6A;
const REG_WHO_AM_I: u8 = 0x0F;
const REG_CTRL1_XL: u8 = 0x10;
const REG_CTRL2_G: u8 = 0x11;
const REG_OUTX_L_G: u8 = 0x22;
const REG_OUTX_L_A: u8 = 0x28;

// 250 dps range: 8.75 mdps/LSB, converted to rad/s
const GYRO_SCALE: f32 = (8.75 / 1000.0) * (std::f32::consts::PI / 180.0);
// 2 g range: 0.061 mg/LSB, converted to m/s²
const ACCEL_SCALE: f32 = 0.061 / 1000.0 * 9.81;

// BCM pin assignments from the wearable schematic
const PIN_POWER_SWITCH: u8 = 4;
const ROW_PINS: [u8; 4] = [17, 27, 22, 5];
const COL_PINS: [u8; 3] = [6, 13, 19];

/// Keypad layout, row-major. Mirrors the membrane overlay.
const KEY_MAP: [[KeyPress; 3]; 4] = [
    [
        KeyPress::ColumnUp(1),
        KeyPress::ColumnUp(2),
        KeyPress::ColumnUp(3),
    ],
    [
        KeyPress::ColumnDown(1),
        KeyPress::ColumnDown(2),
        KeyPress::ColumnDown(3),
    ],
    [
        KeyPress::ColumnUp(4),
        KeyPress::ColumnDown(4),
        KeyPress::CurrentSelection,
    ],
    [KeyPress::WhereAmI, KeyPress::StartNavigation, KeyPress::None],
];

/// Production hardware on a Raspberry Pi.
pub struct RpiHardware {
    i2c: Option<I2c>,
    rows: Vec<OutputPin>,
    cols: Vec<InputPin>,
    power_pin: Option<InputPin>,
    /// True while the last reported key is still held down, so a single
    /// press yields exactly one `None -> key -> None` transition.
    key_latched: bool,
}

impl RpiHardware {
    pub fn new() -> Self {
        Self {
            i2c: None,
            rows: Vec::new(),
            cols: Vec::new(),
            power_pin: None,
            key_latched: false,
        }
    }

    fn init_imu_registers(i2c: &mut I2c) -> Result<()> {
        let who_am_i = i2c
            .smbus_read_byte(REG_WHO_AM_I)
            .map_err(|e| Error::Hardware(format!("IMU WHO_AM_I read failed: {}", e)))?;
        log::info!("[rpi] IMU WHO_AM_I: 0x{:02x}", who_am_i);

        // Accelerometer: 52 Hz, 2 g
        i2c.smbus_write_byte(REG_CTRL1_XL, 0x30)
            .map_err(|e| Error::Hardware(format!("IMU accel config failed: {}", e)))?;
        // Gyroscope: 52 Hz, 250 dps
        i2c.smbus_write_byte(REG_CTRL2_G, 0x30)
            .map_err(|e| Error::Hardware(format!("IMU gyro config failed: {}", e)))?;
        Ok(())
    }

    /// Read a little-endian signed word from two consecutive registers.
    /// A transient bus error reads as zero; the filter simply sees no
    /// motion for that tick.
    fn read_word(&mut self, reg_low: u8) -> i16 {
        let i2c = match self.i2c.as_mut() {
            Some(i2c) => i2c,
            None => return 0,
        };
        let low = i2c.smbus_read_byte(reg_low).unwrap_or(0);
        let high = i2c.smbus_read_byte(reg_low + 1).unwrap_or(0);
        i16::from_le_bytes([low, high])
    }
}

impl Default for RpiHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwarePort for RpiHardware {
    fn initialize(&mut self) -> Result<()> {
        log::info!("[rpi] Initializing hardware...");

        let gpio =
            Gpio::new().map_err(|e| Error::Hardware(format!("GPIO init failed: {}", e)))?;

        let power_pin = gpio
            .get(PIN_POWER_SWITCH)
            .map_err(|e| Error::Hardware(format!("Power switch pin: {}", e)))?
            .into_input_pullup();
        self.power_pin = Some(power_pin);

        for pin in ROW_PINS {
            let row = gpio
                .get(pin)
                .map_err(|e| Error::Hardware(format!("Keypad row pin {}: {}", pin, e)))?
                .into_output_high();
            self.rows.push(row);
        }
        for pin in COL_PINS {
            let col = gpio
                .get(pin)
                .map_err(|e| Error::Hardware(format!("Keypad col pin {}: {}", pin, e)))?
                .into_input_pullup();
            self.cols.push(col);
        }

        let mut i2c =
            I2c::new().map_err(|e| Error::Hardware(format!("I2C init failed: {}", e)))?;
        i2c.set_slave_address(IMU_ADDRESS)
            .map_err(|e| Error::Hardware(format!("I2C address: {}", e)))?;
        Self::init_imu_registers(&mut i2c)?;
        self.i2c = Some(i2c);

        // The bluetooth service is expected to be running already.
        let bt_status = Command::new("hciconfig").args(["hci0", "up"]).status();
        if !matches!(bt_status, Ok(s) if s.success()) {
            log::warn!("[rpi] Could not bring up hci0; BLE scans may be empty");
        }

        log::info!("[rpi] Initialization complete");
        Ok(())
    }

    fn read_imu(&mut self) -> ImuSample {
        if self.i2c.is_none() {
            return ImuSample::default();
        }

        ImuSample {
            gx: self.read_word(REG_OUTX_L_G) as f32 * GYRO_SCALE,
            gy: self.read_word(REG_OUTX_L_G + 2) as f32 * GYRO_SCALE,
            gz: self.read_word(REG_OUTX_L_G + 4) as f32 * GYRO_SCALE,
            ax: self.read_word(REG_OUTX_L_A) as f32 * ACCEL_SCALE,
            ay: self.read_word(REG_OUTX_L_A + 2) as f32 * ACCEL_SCALE,
            az: self.read_word(REG_OUTX_L_A + 4) as f32 * ACCEL_SCALE,
        }
    }

    fn scan_ble(&mut self) -> Vec<BleReading> {
        let output = Command::new("timeout")
            .args(["1s", "hcitool", "lescan", "--duplicates"])
            .stderr(Stdio::null())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                log::error!("[rpi] BLE scan failed to launch: {}", e);
                return Vec::new();
            }
        };

        let mut beacons: Vec<BleReading> = Vec::new();
        for line in String::from_utf8_lossy(&output.stdout).lines() {
            // Expected line format: "MAC_ADDRESS NAME"
            if line.len() < 17 {
                continue;
            }
            let mac = &line[..17];
            if !mac.bytes().all(|b| b.is_ascii_hexdigit() || b == b':') {
                continue;
            }
            if beacons.iter().any(|b| b.beacon_id == mac) {
                continue;
            }
            // Placeholder RSSI, see the module TODO.
            beacons.push(BleReading::new(mac, -60));
        }

        log::debug!("[rpi] BLE scan found {} advertisers", beacons.len());
        beacons
    }

    fn poll_key(&mut self) -> KeyPress {
        let mut pressed = KeyPress::None;

        'scan: for (r, key_row) in KEY_MAP.iter().enumerate() {
            self.rows[r].set_low();

            for (c, &key) in key_row.iter().enumerate() {
                // Pull-ups make a pressed key read low
                if self.cols[c].is_low() {
                    // Confirm after a short settle to reject bounce
                    std::thread::sleep(Duration::from_millis(5));
                    if self.cols[c].is_low() && key != KeyPress::None {
                        pressed = key;
                        self.rows[r].set_high();
                        break 'scan;
                    }
                }
            }
            self.rows[r].set_high();
        }

        // Report each physical press once: suppress repeats until release
        match pressed {
            KeyPress::None => {
                self.key_latched = false;
                KeyPress::None
            }
            _ if self.key_latched => KeyPress::None,
            key => {
                self.key_latched = true;
                key
            }
        }
    }

    fn play_audio(&mut self, cue: &str) {
        let path = format!("data/audio/{}.wav", cue);
        match Command::new("aplay")
            .args(["-q", &path])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(_) => log::debug!("[rpi] Playing audio cue: '{}'", cue),
            Err(e) => log::warn!("[rpi] Failed to play '{}': {}", cue, e),
        }
    }

    fn power_on(&self) -> bool {
        match &self.power_pin {
            Some(pin) => pin.is_high(),
            None => true,
        }
    }
}
