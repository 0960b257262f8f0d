//! Measurement records and their CSV export.

use std::{fs::File, io::Write, path::Path};

use measurements::{Current, Power, Voltage};
use serde::Serialize;

use crate::BenchError;

/// Efficiency recorded when the input power is not positive.
pub const EFFICIENCY_UNDEFINED: f64 = -1.0;

/// Efficiency in percent, or [`EFFICIENCY_UNDEFINED`] if `input_power` is zero or negative.
pub fn efficiency_percent(input_power: Power, output_power: Power) -> f64 {
    let pin = input_power.as_watts();
    if pin > 0.0 {
        output_power.as_watts() / pin * 100.0
    } else {
        EFFICIENCY_UNDEFINED
    }
}

/// Electrical power from a voltage and current reading.
pub fn power(voltage: Voltage, current: Current) -> Power {
    Power::from_watts(voltage.as_volts() * current.as_amperes())
}

/// One point of an efficiency sweep. All values in SI base units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EfficiencySample {
    /// One-based index of the input voltage step this sample belongs to.
    #[serde(rename = "Sweep")]
    pub sweep_index: usize,
    /// Input voltage at the source, in volt.
    #[serde(rename = "Vin")]
    pub input_voltage: f64,
    /// Input current from the source, in ampere.
    #[serde(rename = "Iin")]
    pub input_current: f64,
    /// Input power, in watt.
    #[serde(rename = "Pin")]
    pub input_power: f64,
    /// Output voltage at the load, in volt.
    #[serde(rename = "Vout")]
    pub output_voltage: f64,
    /// Output current into the load, in ampere.
    #[serde(rename = "Iout")]
    pub output_current: f64,
    /// Output power, in watt.
    #[serde(rename = "Pout")]
    pub output_power: f64,
    /// Efficiency in percent, [`EFFICIENCY_UNDEFINED`] if the input power was not positive.
    #[serde(rename = "Eff")]
    pub efficiency_percent: f64,
}

impl EfficiencySample {
    /// Build a sample from the four readings, deriving powers and efficiency.
    pub fn new(
        sweep_index: usize,
        input_voltage: Voltage,
        input_current: Current,
        output_voltage: Voltage,
        output_current: Current,
    ) -> Self {
        let pin = power(input_voltage, input_current);
        let pout = power(output_voltage, output_current);
        Self {
            sweep_index,
            input_voltage: input_voltage.as_volts(),
            input_current: input_current.as_amperes(),
            input_power: pin.as_watts(),
            output_voltage: output_voltage.as_volts(),
            output_current: output_current.as_amperes(),
            output_power: pout.as_watts(),
            efficiency_percent: efficiency_percent(pin, pout),
        }
    }

    /// The efficiency in percent, `None` where it is undefined.
    pub fn efficiency(&self) -> Option<f64> {
        (self.efficiency_percent != EFFICIENCY_UNDEFINED).then_some(self.efficiency_percent)
    }
}

/// One point of a panel I-V sweep. All values in SI base units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IvSample {
    /// Load voltage, in volt.
    #[serde(rename = "Vout")]
    pub voltage: f64,
    /// Panel current, in ampere.
    #[serde(rename = "Iout")]
    pub current: f64,
    /// Panel power, in watt.
    #[serde(rename = "Pout")]
    pub power: f64,
}

impl IvSample {
    /// Build a sample from a voltage and current reading.
    pub fn new(voltage: Voltage, current: Current) -> Self {
        Self {
            voltage: voltage.as_volts(),
            current: current.as_amperes(),
            power: power(voltage, current).as_watts(),
        }
    }
}

/// The sample with the highest power. The first one wins on ties.
pub fn max_power_point(samples: &[IvSample]) -> Option<&IvSample> {
    samples.iter().reduce(|best, s| if s.power > best.power { s } else { best })
}

/// Write records as CSV with a header row.
pub fn write_csv<T: Serialize, W: Write>(writer: W, records: &[T]) -> Result<(), BenchError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write records as CSV to a file, replacing it if it exists.
pub fn write_csv_file<T: Serialize>(path: &Path, records: &[T]) -> Result<(), BenchError> {
    write_csv(File::create(path)?, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(100.0, 90.0, 90.0)]
    #[case(50.0, 50.0, 100.0)]
    #[case(0.0, 10.0, EFFICIENCY_UNDEFINED)]
    #[case(-0.5, 10.0, EFFICIENCY_UNDEFINED)]
    fn test_efficiency_percent(#[case] pin: f64, #[case] pout: f64, #[case] exp: f64) {
        let eff = efficiency_percent(Power::from_watts(pin), Power::from_watts(pout));
        assert!((eff - exp).abs() < 1e-12);
    }

    #[rstest]
    fn test_sample_derives_powers() {
        let sample = EfficiencySample::new(
            2,
            Voltage::from_volts(18.0),
            Current::from_amperes(3.0),
            Voltage::from_volts(12.0),
            Current::from_amperes(4.0),
        );
        assert_eq!(2, sample.sweep_index);
        assert!((sample.input_power - 54.0).abs() < 1e-9);
        assert!((sample.output_power - 48.0).abs() < 1e-9);
        assert!((sample.efficiency().unwrap() - 48.0 / 54.0 * 100.0).abs() < 1e-9);
    }

    #[rstest]
    fn test_max_power_point_first_on_tie() {
        let samples = vec![
            IvSample::new(Voltage::from_volts(10.0), Current::from_amperes(2.0)),
            IvSample::new(Voltage::from_volts(20.0), Current::from_amperes(1.0)),
            IvSample::new(Voltage::from_volts(5.0), Current::from_amperes(1.0)),
        ];
        assert_eq!(Some(&samples[0]), max_power_point(&samples));
        assert_eq!(None, max_power_point(&[]));
    }

    #[rstest]
    fn test_csv_columns() {
        let samples = vec![IvSample::new(
            Voltage::from_volts(2.0),
            Current::from_amperes(1.5),
        )];
        let mut buf = Vec::new();
        write_csv(&mut buf, &samples).unwrap();
        assert_eq!("Vout,Iout,Pout\n2.0,1.5,3.0\n", String::from_utf8(buf).unwrap());
    }
}
