use std::time::Duration;

use brewscale_traits::Clock;

use crate::error::{HwError, Result};

/// How long the HX711 driver waits for DOUT to signal a finished conversion.
///
/// At 10 SPS a conversion lands every 100 ms, so the default timeout covers
/// two conversion periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyWait {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Default for ReadyWait {
    fn default() -> Self {
        Self::with_timeout(Duration::from_millis(200))
    }
}

impl ReadyWait {
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            poll: Duration::from_micros(200),
        }
    }

    /// Poll `is_ready` on `clock` until it reports a conversion or the
    /// timeout passes. Returns how many polls found the line still busy.
    pub fn wait(&self, clock: &dyn Clock, mut is_ready: impl FnMut() -> bool) -> Result<u32> {
        let start = clock.now();
        let mut busy = 0u32;
        while !is_ready() {
            if clock.now().saturating_duration_since(start) >= self.timeout {
                return Err(HwError::DataReadyTimeout);
            }
            busy = busy.saturating_add(1);
            clock.sleep(self.poll);
        }
        Ok(busy)
    }
}

/// Sign-extend a 24-bit two's complement conversion to i32.
#[inline]
pub fn sign_extend_24(value: u32) -> i32 {
    let v = (value & 0x00FF_FFFF) as i32;
    if (v & 0x0080_0000) != 0 { v | !0x00FF_FFFF } else { v }
}

#[cfg(test)]
mod tests {
    use super::sign_extend_24;

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend_24(0x00_0001), 1);
        assert_eq!(sign_extend_24(0x7F_FFFF), 8_388_607);
        assert_eq!(sign_extend_24(0x80_0000), -8_388_608);
        assert_eq!(sign_extend_24(0xFF_FFFF), -1);
    }
}
