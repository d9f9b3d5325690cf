//! Band switch decoding and the VFO frequency plan.
//!
//! The VFO board reports a rotary band switch position in the low three
//! bits of its status byte and the transmit line in bit 3. Each switch
//! position selects a band label and sideband; each band label has a
//! frequency plan used to turn an operating frequency into the 32-bit DDS
//! tuning word sent with `setTx`/`setRx`.

use std::fmt;

use shack_core::{Error, Result};

/// DDS reference clock in MHz.
const DDS_CLOCK_MHZ: f64 = 125.0;

/// Mask for the band switch bits of the status byte.
const SWITCH_MASK: u8 = 0x07;

/// Transmit-active bit of the status byte.
const TX_BIT: u8 = 0x08;

/// Voice sideband for a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sideband {
    Usb,
    Lsb,
}

impl fmt::Display for Sideband {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sideband::Usb => write!(f, "USB"),
            Sideband::Lsb => write!(f, "LSB"),
        }
    }
}

/// What one band switch position selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandSelection {
    /// Band label (`"20m"`, `"WWV"`, ...).
    pub label: &'static str,
    /// Default sideband for voice.
    pub sideband: Sideband,
}

/// Switch positions 0 through 7.
#[rustfmt::skip]
pub const SWITCH_TABLE: [BandSelection; 8] = [
    BandSelection { label: "10m", sideband: Sideband::Usb },
    BandSelection { label: "15m", sideband: Sideband::Usb },
    BandSelection { label: "Aux", sideband: Sideband::Usb },
    BandSelection { label: "20m", sideband: Sideband::Usb },
    BandSelection { label: "WWV", sideband: Sideband::Usb },
    BandSelection { label: "40m", sideband: Sideband::Lsb },
    BandSelection { label: "80m", sideband: Sideband::Lsb },
    BandSelection { label: "160m", sideband: Sideband::Lsb },
];

impl BandSelection {
    /// Selection for a switch position, or `None` above 7.
    pub fn from_switch(position: u8) -> Option<BandSelection> {
        SWITCH_TABLE.get(position as usize).copied()
    }

    /// Whether DX cluster spots exist for this band. The auxiliary input
    /// and the WWV receiver position are not amateur bands.
    pub fn has_spots(&self) -> bool {
        !matches!(self.label, "Aux" | "WWV")
    }

    /// The frequency plan for this band.
    pub fn plan(&self) -> Option<&'static VfoPlan> {
        VfoPlan::for_label(self.label)
    }
}

impl fmt::Display for BandSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label, self.sideband)
    }
}

/// Decoded status byte from a band read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BandStatus(pub u8);

impl BandStatus {
    /// Rotary switch position, 0 through 7.
    pub fn switch_position(&self) -> u8 {
        self.0 & SWITCH_MASK
    }

    /// Whether the transmit line is active.
    pub fn transmitting(&self) -> bool {
        self.0 & TX_BIT != 0
    }

    /// The band the switch selects.
    pub fn selection(&self) -> BandSelection {
        // The mask keeps the index in range.
        SWITCH_TABLE[self.switch_position() as usize]
    }
}

impl fmt::Display for BandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selection())?;
        if self.transmitting() {
            write!(f, " TX")?;
        }
        Ok(())
    }
}

/// Frequency plan for one band, all values in MHz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VfoPlan {
    pub label: &'static str,
    pub lower_mhz: f64,
    pub upper_mhz: f64,
    /// Top of the CW sub-band.
    pub cw_boundary_mhz: f64,
    /// Synthesizer output at the lower band edge.
    pub base_mhz: f64,
}

/// Plans for every switch label.
#[rustfmt::skip]
pub const VFO_PLANS: [VfoPlan; 8] = [
    VfoPlan { label: "10m", lower_mhz: 28.0, upper_mhz: 29.7, cw_boundary_mhz: 28.3, base_mhz: 5.010847 },
    VfoPlan { label: "15m", lower_mhz: 21.0, upper_mhz: 21.45, cw_boundary_mhz: 21.2, base_mhz: 5.010382 },
    VfoPlan { label: "Aux", lower_mhz: 10.0, upper_mhz: 10.5, cw_boundary_mhz: 10.5, base_mhz: 5.0 },
    VfoPlan { label: "20m", lower_mhz: 14.0, upper_mhz: 14.35, cw_boundary_mhz: 14.15, base_mhz: 5.000305 },
    VfoPlan { label: "WWV", lower_mhz: 10.0, upper_mhz: 10.5, cw_boundary_mhz: 10.5, base_mhz: 5.011585 },
    VfoPlan { label: "40m", lower_mhz: 7.0, upper_mhz: 7.3, cw_boundary_mhz: 7.125, base_mhz: 5.0002 },
    VfoPlan { label: "80m", lower_mhz: 3.5, upper_mhz: 4.0, cw_boundary_mhz: 3.6, base_mhz: 5.0 },
    VfoPlan { label: "160m", lower_mhz: 1.8, upper_mhz: 2.0, cw_boundary_mhz: 1.9, base_mhz: 5.0 },
];

impl VfoPlan {
    /// Look up a plan by band label (case-insensitive).
    pub fn for_label(label: &str) -> Option<&'static VfoPlan> {
        VFO_PLANS.iter().find(|p| p.label.eq_ignore_ascii_case(label))
    }

    /// Whether `freq_mhz` lies inside the band edges (inclusive).
    pub fn contains(&self, freq_mhz: f64) -> bool {
        freq_mhz >= self.lower_mhz && freq_mhz <= self.upper_mhz
    }

    /// Whether `freq_mhz` is in the CW portion of the band.
    pub fn is_cw(&self, freq_mhz: f64) -> bool {
        self.contains(freq_mhz) && freq_mhz < self.cw_boundary_mhz
    }

    /// DDS tuning word for an operating frequency.
    ///
    /// `round((f - lower + base) * 2^32 / 125)`
    ///
    /// ```
    /// use shack_remote::VfoPlan;
    ///
    /// let plan = VfoPlan::for_label("20m").unwrap();
    /// assert_eq!(plan.tuning_word(14.025).unwrap(), 172_668_165);
    /// ```
    pub fn tuning_word(&self, freq_mhz: f64) -> Result<u32> {
        if !freq_mhz.is_finite() || !self.contains(freq_mhz) {
            return Err(Error::InvalidParameter(format!(
                "{freq_mhz} MHz is outside {} ({}-{} MHz)",
                self.label, self.lower_mhz, self.upper_mhz
            )));
        }
        let vfo_mhz = freq_mhz - self.lower_mhz + self.base_mhz;
        let word = (vfo_mhz * 4_294_967_296.0 / DDS_CLOCK_MHZ).round();
        Ok(word as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switch_table_matches_wiring() {
        let labels: Vec<_> = SWITCH_TABLE.iter().map(|s| s.label).collect();
        assert_eq!(
            labels,
            ["10m", "15m", "Aux", "20m", "WWV", "40m", "80m", "160m"]
        );
        assert_eq!(BandSelection::from_switch(5).unwrap().sideband, Sideband::Lsb);
        assert_eq!(BandSelection::from_switch(3).unwrap().sideband, Sideband::Usb);
        assert_eq!(BandSelection::from_switch(8), None);
    }

    #[test]
    fn status_bits() {
        let status = BandStatus(0x0B);
        assert_eq!(status.switch_position(), 3);
        assert!(status.transmitting());
        assert_eq!(status.selection().label, "20m");
        assert_eq!(status.to_string(), "20m USB TX");

        let status = BandStatus(0x05);
        assert!(!status.transmitting());
        assert_eq!(status.to_string(), "40m LSB");
    }

    #[test]
    fn aux_and_wwv_have_no_spots() {
        assert!(!BandSelection::from_switch(2).unwrap().has_spots());
        assert!(!BandSelection::from_switch(4).unwrap().has_spots());
        assert!(BandSelection::from_switch(0).unwrap().has_spots());
    }

    #[test]
    fn every_selection_has_a_plan() {
        for sel in SWITCH_TABLE {
            assert!(sel.plan().is_some(), "no plan for {}", sel.label);
        }
    }

    #[test]
    fn tuning_words() {
        let p20 = VfoPlan::for_label("20m").unwrap();
        assert_eq!(p20.tuning_word(14.025).unwrap(), 172_668_165);
        let p40 = VfoPlan::for_label("40m").unwrap();
        assert_eq!(p40.tuning_word(7.0).unwrap(), 171_805_564);
        let p10 = VfoPlan::for_label("10M").unwrap();
        assert_eq!(p10.tuning_word(28.3).unwrap(), 182_479_313);
    }

    #[test]
    fn out_of_band_rejected() {
        let p40 = VfoPlan::for_label("40m").unwrap();
        assert!(matches!(p40.tuning_word(7.35), Err(Error::InvalidParameter(_))));
        assert!(p40.tuning_word(f64::NAN).is_err());
    }

    #[test]
    fn cw_portion() {
        let p80 = VfoPlan::for_label("80m").unwrap();
        assert!(p80.is_cw(3.525));
        assert!(!p80.is_cw(3.8));
    }
}
